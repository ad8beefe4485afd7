use futures::channel::mpsc::{Receiver, Sender};
use futures::future::pending;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::time::{sleep, sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::types::Config;
use crate::device::bluetooth::{Bluetooth, Disconnection, EventStream};
use crate::device::constants::{ALERT_CANNOT_ENABLE, CONNECT_DEADLINE};
use crate::device::types::{DeviceCommand, DeviceEvent, DeviceState, PeripheralInfo, SensorReading};

/// The parts of the config the sensor link depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSettings {
    pub device_name: String,
    pub scan_timeout: Duration,
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
}

impl From<&Config> for LinkSettings {
    fn from(config: &Config) -> Self {
        LinkSettings {
            device_name: config.device_name.clone(),
            scan_timeout: Duration::from_millis(config.scan_timeout_ms),
            service_uuid: config.service_uuid,
            characteristic_uuid: config.characteristic_uuid,
        }
    }
}

struct ScanSession {
    discoveries: EventStream<PeripheralInfo>,
    deadline: Instant,
}

#[derive(Default)]
struct Session {
    scan: Option<ScanSession>,
    connected: Option<PeripheralInfo>,
    disconnection: Option<Disconnection>,
    notifications: Option<EventStream<Vec<u8>>>,
}

enum ScanEvent {
    Discovered(PeripheralInfo),
    TimedOut,
}

enum Step {
    Command(DeviceCommand),
    Scan(ScanEvent),
    Notification(Vec<u8>),
    PeerDisconnected,
    Stop,
}

async fn next_scan_event(scan: &mut Option<ScanSession>) -> ScanEvent {
    let Some(scan) = scan else {
        return pending().await;
    };

    tokio::select! {
        _ = sleep_until(scan.deadline) => ScanEvent::TimedOut,
        Some(found) = scan.discoveries.next() => ScanEvent::Discovered(found),
    }
}

async fn next_notification(notifications: &mut Option<EventStream<Vec<u8>>>) -> Vec<u8> {
    match notifications {
        Some(notifications) => match notifications.next().await {
            Some(payload) => payload,
            None => pending().await,
        },
        None => pending().await,
    }
}

async fn wait_disconnection(disconnection: &mut Option<Disconnection>) {
    match disconnection {
        Some(disconnection) => disconnection.await,
        None => pending().await,
    }
}

/// Drives the sensor link: radio enablement, scanning for the named peripheral, connecting,
/// decoding notifications and tearing down on disconnect.
///
/// Every transition is reported as a [`DeviceEvent`] to all senders.
pub struct Controller<B: Bluetooth> {
    bluetooth: B,
    settings: LinkSettings,
    session: Session,
    state: DeviceState,
    senders: Vec<Sender<DeviceEvent>>,
    // also interrupts enabling and connecting, which are awaited outside of the main select
    cancel: CancellationToken,
}

impl<B: Bluetooth> Controller<B> {
    pub fn new(bluetooth: B, settings: LinkSettings, senders: Vec<Sender<DeviceEvent>>) -> Self {
        Controller {
            bluetooth,
            settings,
            session: Session::default(),
            state: DeviceState::Idle,
            senders,
            cancel: CancellationToken::new(),
        }
    }

    async fn emit(&mut self, event: DeviceEvent) {
        for sender in &mut self.senders {
            if let Err(err) = sender.send(event.clone()).await {
                warn!("Failed to send DeviceEvent: {:?}", err);
            }
        }
    }

    async fn set_state(&mut self, state: DeviceState) {
        if self.state != state {
            debug!("State {:?} -> {:?}", self.state, state);
            self.state = state.clone();
            self.emit(DeviceEvent::StateChange(state)).await;
        }
    }

    /// Processes commands and bluetooth events until cancelled, or until the command channel
    /// is closed.
    pub async fn run(mut self, cancel: CancellationToken, mut commands: Receiver<DeviceCommand>) {
        self.cancel = cancel;
        self.emit(DeviceEvent::StateChange(self.state.clone())).await;

        loop {
            let step = tokio::select! {
                _ = self.cancel.cancelled() => Step::Stop,
                command = commands.next() => match command {
                    Some(command) => Step::Command(command),
                    None => Step::Stop,
                },
                event = next_scan_event(&mut self.session.scan) => Step::Scan(event),
                payload = next_notification(&mut self.session.notifications) => Step::Notification(payload),
                _ = wait_disconnection(&mut self.session.disconnection) => Step::PeerDisconnected,
            };

            match step {
                Step::Stop => break,
                Step::Command(DeviceCommand::Scan) => self.scan().await,
                Step::Command(DeviceCommand::Disconnect) => self.disconnect().await,
                Step::Scan(ScanEvent::Discovered(peripheral)) => self.discovered(peripheral).await,
                Step::Scan(ScanEvent::TimedOut) => self.scan_timed_out().await,
                Step::Notification(payload) => self.notification(&payload).await,
                Step::PeerDisconnected => {
                    info!("Connection lost");
                    self.session.disconnection = None;
                    self.disconnected().await;
                },
            }
        }

        self.shutdown().await;
    }

    async fn scan(&mut self) {
        if self.state.is_busy() || self.state.is_connected() {
            debug!("Ignoring scan request while {:?}", self.state);
            return;
        }

        let enabled = match self.bluetooth.is_enabled().await {
            Ok(enabled) => enabled,
            Err(err) => {
                warn!("Failed to query bluetooth state: {:?}", err);
                false
            },
        };

        if !enabled {
            self.set_state(DeviceState::Enabling).await;
            info!("Bluetooth is not enabled, requesting it");

            let result = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Enabling bluetooth cancelled");
                    return;
                }
                result = self.bluetooth.enable() => result,
            };

            if let Err(err) = result {
                error!("Failed to enable bluetooth: {:?}", err);
                self.emit(DeviceEvent::Alert(ALERT_CANNOT_ENABLE.to_string())).await;
                self.set_state(DeviceState::Idle).await;
                return;
            }
        }

        match self.bluetooth.start_scan().await {
            Ok(discoveries) => {
                self.session.scan = Some(ScanSession {
                    discoveries,
                    deadline: Instant::now() + self.settings.scan_timeout,
                });
                self.set_state(DeviceState::Scanning).await;
            },
            Err(err) => {
                error!("Scanning failed {:?}", err);
                self.set_state(DeviceState::Idle).await;
            },
        }
    }

    async fn stop_scan(&mut self) {
        // dropping the session also disarms the timeout
        self.session.scan = None;

        if let Err(err) = self.bluetooth.stop_scan().await {
            warn!("Failed to stop scanning: {:?}", err);
        }
    }

    async fn discovered(&mut self, peripheral: PeripheralInfo) {
        if peripheral.local_name.as_deref() != Some(self.settings.device_name.as_str()) {
            return;
        }

        info!("Found {} ({})", self.settings.device_name, peripheral.id);
        self.stop_scan().await;
        self.set_state(DeviceState::Connecting { name: self.settings.device_name.clone() }).await;

        let result = tokio::select! {
            _ = self.cancel.cancelled() => {
                info!("Connecting cancelled");
                return;
            }
            _ = sleep(Duration::from_millis(CONNECT_DEADLINE)) => {
                warn!("Connecting to peripheral took too long");
                // abandon the pending connection attempt
                if let Err(err) = self.bluetooth.disconnect(&peripheral.id).await {
                    debug!("Failed to cancel the connection attempt: {:?}", err);
                }
                None
            }
            result = self.bluetooth.connect(&peripheral.id) => match result {
                Ok(disconnection) => Some(disconnection),
                Err(err) => {
                    warn!("Connecting to peripheral failed: {:?}", err);
                    None
                },
            },
        };

        match result {
            Some(disconnection) => self.connected(peripheral, disconnection).await,
            None => self.disconnected().await,
        }
    }

    async fn scan_timed_out(&mut self) {
        info!("No {} found, stopping scan", self.settings.device_name);
        self.stop_scan().await;
        self.set_state(DeviceState::ScanStopped).await;
    }

    async fn connected(&mut self, peripheral: PeripheralInfo, disconnection: Disconnection) {
        let name = peripheral.local_name.clone().unwrap_or_else(|| self.settings.device_name.clone());
        let id = peripheral.id.clone();

        self.session.connected = Some(peripheral);
        self.session.disconnection = Some(disconnection);
        self.set_state(DeviceState::Connected { name }).await;

        let result = self.bluetooth.start_notification(
            &id,
            self.settings.service_uuid,
            self.settings.characteristic_uuid,
        ).await;

        match result {
            Ok(notifications) => {
                info!("Peripheral ready");
                self.session.notifications = Some(notifications);
            },
            Err(err) => warn!("Failed to subscribe to sensor notifications: {:?}", err),
        }
    }

    async fn notification(&mut self, payload: &[u8]) {
        let reading = SensorReading::decode(payload);

        if reading.raw.is_nan() {
            warn!("Failed to decode sensor value {:?}", String::from_utf8_lossy(payload));
        }

        self.emit(DeviceEvent::Reading(reading)).await;
    }

    async fn disconnect(&mut self) {
        let Some(peripheral) = self.session.connected.as_ref() else {
            debug!("Ignoring disconnect request, not connected");
            return;
        };
        let id = peripheral.id.clone();

        // the disconnect is handled here, not by the link watcher
        self.session.disconnection = None;

        if let Err(err) = self.bluetooth.disconnect(&id).await {
            warn!("Failed to disconnect: {:?}", err);
        }

        self.disconnected().await;
    }

    async fn disconnected(&mut self) {
        self.session.connected = None;
        self.session.disconnection = None;
        self.session.notifications = None;
        self.set_state(DeviceState::Disconnected).await;
    }

    async fn shutdown(&mut self) {
        if self.session.scan.is_some() {
            self.stop_scan().await;
        }

        if let Some(peripheral) = self.session.connected.take() {
            info!("Disconnecting before exit");
            if let Err(err) = self.bluetooth.disconnect(&peripheral.id).await {
                warn!("Failed to disconnect: {:?}", err);
            }
        }
    }
}
