//! In-memory [`Bluetooth`] for exercising the controller without a radio.

use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::channel::oneshot;
use futures::future::pending;
use futures::{stream, FutureExt, StreamExt};
use uuid::Uuid;

use crate::device::bluetooth::{Bluetooth, Disconnection, EventStream};
use crate::device::types::{PeripheralId, PeripheralInfo};
use crate::error::DeviceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    IsEnabled,
    Enable,
    StartScan,
    StopScan,
    Connect(PeripheralId),
    Disconnect(PeripheralId),
    StartNotification { service: Uuid, characteristic: Uuid },
}

struct MockInner {
    enabled: bool,
    enable_succeeds: bool,
    enable_hangs: bool,
    scan_fails: bool,
    connect_fails: bool,
    connect_hangs: bool,
    calls: Vec<Call>,
    discoveries: Option<UnboundedReceiver<PeripheralInfo>>,
    notifications: Option<UnboundedReceiver<Vec<u8>>>,
    link: Option<oneshot::Sender<()>>,
}

#[derive(Clone)]
pub struct MockBluetooth {
    inner: Arc<Mutex<MockInner>>,
    discover_tx: UnboundedSender<PeripheralInfo>,
    notify_tx: UnboundedSender<Vec<u8>>,
}

impl MockBluetooth {
    pub fn new() -> Self {
        let (discover_tx, discover_rx) = unbounded();
        let (notify_tx, notify_rx) = unbounded();

        MockBluetooth {
            inner: Arc::new(Mutex::new(MockInner {
                enabled: true,
                enable_succeeds: true,
                enable_hangs: false,
                scan_fails: false,
                connect_fails: false,
                connect_hangs: false,
                calls: Vec::new(),
                discoveries: Some(discover_rx),
                notifications: Some(notify_rx),
                link: None,
            })),
            discover_tx,
            notify_tx,
        }
    }

    pub fn disabled(self, enable_succeeds: bool) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.enabled = false;
            inner.enable_succeeds = enable_succeeds;
        }
        self
    }

    pub fn failing_scan(self) -> Self {
        self.inner.lock().unwrap().scan_fails = true;
        self
    }

    pub fn failing_connect(self) -> Self {
        self.inner.lock().unwrap().connect_fails = true;
        self
    }

    /// Enable never completes.
    pub fn hanging_enable(self) -> Self {
        self.inner.lock().unwrap().enable_hangs = true;
        self
    }

    /// Connect never completes.
    pub fn hanging_connect(self) -> Self {
        self.inner.lock().unwrap().connect_hangs = true;
        self
    }

    /// Returns false if the advertisement was not delivered, the receiver is gone once the
    /// scan has ended.
    pub fn discover(&self, id: &str, local_name: Option<&str>) -> bool {
        self.discover_tx.unbounded_send(PeripheralInfo {
            id: PeripheralId(id.to_string()),
            local_name: local_name.map(String::from),
        }).is_ok()
    }

    pub fn notify(&self, payload: &[u8]) {
        let _ = self.notify_tx.unbounded_send(payload.to_vec());
    }

    /// Simulates the peer dropping the connection.
    pub fn drop_link(&self) {
        if let Some(link) = self.inner.lock().unwrap().link.take() {
            let _ = link.send(());
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn connect_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Connect(_))).count()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Bluetooth for MockBluetooth {
    async fn is_enabled(&self) -> Result<bool, DeviceError> {
        self.record(Call::IsEnabled);
        Ok(self.inner.lock().unwrap().enabled)
    }

    async fn enable(&self) -> Result<(), DeviceError> {
        self.record(Call::Enable);
        let hangs = self.inner.lock().unwrap().enable_hangs;
        if hangs {
            return pending().await;
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.enable_succeeds {
            inner.enabled = true;
            Ok(())
        } else {
            Err(DeviceError::NoAdapter)
        }
    }

    async fn start_scan(&self) -> Result<EventStream<PeripheralInfo>, DeviceError> {
        self.record(Call::StartScan);
        let mut inner = self.inner.lock().unwrap();
        if inner.scan_fails {
            return Err(DeviceError::NoAdapter);
        }

        match inner.discoveries.take() {
            Some(discoveries) => Ok(discoveries.boxed()),
            None => Ok(stream::pending().boxed()),
        }
    }

    async fn stop_scan(&self) -> Result<(), DeviceError> {
        self.record(Call::StopScan);
        Ok(())
    }

    async fn connect(&self, id: &PeripheralId) -> Result<Disconnection, DeviceError> {
        self.record(Call::Connect(id.clone()));
        let hangs = self.inner.lock().unwrap().connect_hangs;
        if hangs {
            return pending().await;
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.connect_fails {
            return Err(DeviceError::UnknownPeripheral(id.clone()));
        }

        let (link_tx, link_rx) = oneshot::channel();
        inner.link = Some(link_tx);
        Ok(link_rx.map(|_| ()).boxed())
    }

    async fn disconnect(&self, id: &PeripheralId) -> Result<(), DeviceError> {
        self.record(Call::Disconnect(id.clone()));
        self.inner.lock().unwrap().link = None;
        Ok(())
    }

    async fn start_notification(
        &self,
        _id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<EventStream<Vec<u8>>, DeviceError> {
        self.record(Call::StartNotification { service, characteristic });
        match self.inner.lock().unwrap().notifications.take() {
            Some(notifications) => Ok(notifications.boxed()),
            None => Ok(stream::pending().boxed()),
        }
    }
}
