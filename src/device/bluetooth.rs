use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use log::{debug, info, warn};
use tokio::time::{sleep, Duration, Instant};
use uuid::Uuid;

use crate::device::constants::{ENABLE_DEADLINE, ENABLE_POLL_DELAY};
use crate::device::types::{PeripheralId, PeripheralInfo};
use crate::error::DeviceError;

pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Resolves once the link to a connected peripheral is lost.
pub type Disconnection = BoxFuture<'static, ()>;

/// The bluetooth primitives the sensor link is built on.
#[async_trait]
pub trait Bluetooth: Send + Sync + 'static {
    /// Whether the radio is powered on and able to scan.
    async fn is_enabled(&self) -> Result<bool, DeviceError>;

    /// Request the radio to be enabled. Returns an error if it was not powered on in time.
    async fn enable(&self) -> Result<(), DeviceError>;

    /// Start an unfiltered scan. The stream yields every discovered (or updated) peripheral.
    async fn start_scan(&self) -> Result<EventStream<PeripheralInfo>, DeviceError>;

    async fn stop_scan(&self) -> Result<(), DeviceError>;

    async fn connect(&self, id: &PeripheralId) -> Result<Disconnection, DeviceError>;

    async fn disconnect(&self, id: &PeripheralId) -> Result<(), DeviceError>;

    /// Subscribe to a characteristic; the stream yields the value of every notification.
    async fn start_notification(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<EventStream<Vec<u8>>, DeviceError>;
}

/// [`Bluetooth`] on top of the platform stack, using the first adapter.
pub struct BtleBluetooth {
    manager: Manager,
    adapter: Mutex<Option<Adapter>>,
    // peripherals seen during scanning, so that they can be connected to by id
    peripherals: Arc<Mutex<HashMap<PeripheralId, Peripheral>>>,
}

// an adapter that is present but switched off can not scan
fn is_powered_on(state: &CentralState) -> bool {
    matches!(state, CentralState::PoweredOn)
}

fn make_peripheral_id(peripheral: &Peripheral) -> PeripheralId {
    PeripheralId(format!("{:?}", peripheral.id()))
}

impl BtleBluetooth {
    pub async fn new() -> Result<Self, DeviceError> {
        Ok(BtleBluetooth {
            manager: Manager::new().await?,
            adapter: Mutex::new(None),
            peripherals: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    async fn find_adapter(&self) -> Result<Option<Adapter>, DeviceError> {
        let adapters = self.manager.adapters().await?;

        let adapter = match adapters.into_iter().next() {
            None => return Ok(None),
            Some(adapter) => adapter,
        };

        let adapter_info = adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string());
        info!("Using adapter {}", adapter_info);
        *self.adapter.lock().expect("Failed to lock adapter") = Some(adapter.clone());
        Ok(Some(adapter))
    }

    async fn adapter(&self) -> Result<Adapter, DeviceError> {
        let adapter = self.adapter.lock().expect("Failed to lock adapter").clone();

        match adapter {
            Some(adapter) => Ok(adapter),
            None => self.find_adapter().await?.ok_or(DeviceError::NoAdapter),
        }
    }

    async fn radio_powered_on(&self) -> Result<bool, DeviceError> {
        let Some(adapter) = self.find_adapter().await? else {
            return Ok(false);
        };

        let state = adapter.adapter_state().await?;
        debug!("Adapter state {:?}", state);
        Ok(is_powered_on(&state))
    }

    fn peripheral(&self, id: &PeripheralId) -> Result<Peripheral, DeviceError> {
        self.peripherals.lock().expect("Failed to lock peripherals")
            .get(id)
            .cloned()
            .ok_or_else(|| DeviceError::UnknownPeripheral(id.clone()))
    }
}

#[async_trait]
impl Bluetooth for BtleBluetooth {
    async fn is_enabled(&self) -> Result<bool, DeviceError> {
        self.radio_powered_on().await
    }

    async fn enable(&self) -> Result<(), DeviceError> {
        // btleplug can not power on the radio, wait for the user or the OS to do so
        let deadline = Instant::now() + Duration::from_millis(ENABLE_DEADLINE);

        while Instant::now() < deadline {
            if self.radio_powered_on().await? {
                return Ok(());
            }
            sleep(Duration::from_millis(ENABLE_POLL_DELAY)).await;
        }

        match self.adapter.lock().expect("Failed to lock adapter").as_ref() {
            Some(_) => Err(DeviceError::RadioOff),
            None => Err(DeviceError::NoAdapter),
        }
    }

    async fn start_scan(&self) -> Result<EventStream<PeripheralInfo>, DeviceError> {
        let adapter = self.adapter().await?;
        let events = adapter.events().await?;

        adapter.start_scan(ScanFilter::default()).await?;
        info!("Scanning...");

        let peripherals = self.peripherals.clone();
        let discoveries = events.filter_map(move |event| {
            let adapter = adapter.clone();
            let peripherals = peripherals.clone();

            async move {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => return None,
                };

                let peripheral = match adapter.peripheral(&id).await {
                    Ok(v) => v,
                    Err(err) => {
                        warn!("Failed to query BLE adapter for peripheral: {}", err);
                        return None;
                    },
                };

                let local_name = match peripheral.properties().await {
                    Err(err) => {
                        warn!("Could not query peripheral for properties: {:?}", err);
                        return None;
                    },
                    Ok(None) => None,
                    Ok(Some(properties)) => properties.local_name,
                };

                let info = PeripheralInfo {
                    id: make_peripheral_id(&peripheral),
                    local_name,
                };
                debug!("Discovered {} {:?}", info.id, info.local_name);

                peripherals.lock().expect("Failed to lock peripherals")
                    .insert(info.id.clone(), peripheral);

                Some(info)
            }
        });

        Ok(Box::pin(discoveries))
    }

    async fn stop_scan(&self) -> Result<(), DeviceError> {
        let adapter = self.adapter.lock().expect("Failed to lock adapter").clone();
        match adapter {
            Some(adapter) => Ok(adapter.stop_scan().await?),
            None => Err(DeviceError::NotScanning),
        }
    }

    async fn connect(&self, id: &PeripheralId) -> Result<Disconnection, DeviceError> {
        let adapter = self.adapter().await?;
        let peripheral = self.peripheral(id)?;
        let btle_id = peripheral.id();

        // listen before connecting, so that a disconnect right after connecting is not missed
        let mut events = adapter.events().await?;

        info!("Connecting to peripheral {}...", id);
        peripheral.connect().await?;

        info!("Connected; Discovering services...");
        peripheral.discover_services().await?;

        let disconnection = async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(disconnected_id) = event {
                    if disconnected_id == btle_id {
                        break;
                    }
                }
            }
        };

        Ok(disconnection.boxed())
    }

    async fn disconnect(&self, id: &PeripheralId) -> Result<(), DeviceError> {
        let peripheral = self.peripheral(id)?;
        info!("Disconnecting from peripheral {}", id);
        peripheral.disconnect().await?;
        Ok(())
    }

    async fn start_notification(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<EventStream<Vec<u8>>, DeviceError> {
        let peripheral = self.peripheral(id)?;

        let data_char = peripheral.characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or(DeviceError::MissingCharacteristic)?;

        info!("Subscribing to characteristic {:?} {:?}", service, characteristic);
        let notifications = peripheral.notifications().await?;
        peripheral.subscribe(&data_char).await?;

        let values = notifications
            .filter(move |data| futures::future::ready(data.uuid == characteristic))
            .map(|data| data.value);

        Ok(Box::pin(values))
    }
}
