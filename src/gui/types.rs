use iced::{Event};

use crate::config::types::Config;
use crate::device::types::{DeviceEvent};

#[derive(Debug, Clone)]
pub enum Message {
    EventOccurred(Event),
    ConfigLoadComplete((Config, Option<String>)), // config, error message to display
    DeviceEvent(DeviceEvent),
    ScanPress,
    DisconnectPress,
    CommandSent(bool), // true if success, false if the controller is gone
    NoticeConfirmed,
}
