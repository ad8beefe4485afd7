use std::convert::Infallible;
use futures::channel::mpsc::{channel, Sender};
use futures::future::pending;
use futures::SinkExt;
use iced::subscription::{self, Subscription};
use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::device::bluetooth::BtleBluetooth;
use crate::device::controller::{Controller, LinkSettings};
use crate::device::types::{DeviceCommand, DeviceEvent};

async fn connect_device(cancel: CancellationToken, settings: LinkSettings, mut senders: Vec<Sender<DeviceEvent>>) -> Infallible {
    let (command_sender, command_receiver) = channel::<DeviceCommand>(8);

    let bluetooth = match BtleBluetooth::new().await {
        Ok(bluetooth) => Some(bluetooth),
        Err(err) => {
            error!("Failed to initialize bluetooth: {:?}", err);
            None
        },
    };

    if let Some(bluetooth) = bluetooth {
        for sender in &mut senders {
            if let Err(err) = sender.send(DeviceEvent::Ready(command_sender.clone())).await {
                error!("Failed to send DeviceEvent: {:?}", err);
            }
        }

        info!("Looking for {}", settings.device_name);
        Controller::new(bluetooth, settings, senders)
            .run(cancel, command_receiver)
            .await;
        info!("Sensor link stopped");
    } else {
        for sender in &mut senders {
            if let Err(err) = sender.send(DeviceEvent::Alert("Bluetooth is not available on this system".to_string())).await {
                error!("Failed to send DeviceEvent: {:?}", err);
            }
        }
    }

    // note: subscription::channel expects the future to never resolve (Infallible)
    pending().await
}

pub fn connect_device_subscription(cancel: CancellationToken, settings: LinkSettings) -> Subscription<DeviceEvent> {
    struct Connect;

    subscription::channel(
        std::any::TypeId::of::<Connect>(),
        64,
        move |subscription_sender| {
            async move {
                connect_device(cancel, settings, vec![subscription_sender]).await
            }
        },
    )
}
