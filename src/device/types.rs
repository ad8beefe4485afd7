use std::fmt;
use futures::channel::mpsc::Sender;

/// Identifies a peripheral for the lifetime of the bluetooth capability that discovered it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeripheralId(pub String);

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeripheralInfo {
    pub id: PeripheralId,
    pub local_name: Option<String>,
}

/// Width/height and border thickness of the circle, in length units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleStyle {
    pub size: f64,
    pub border: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub raw: f64, // NaN if the payload is not a number
    pub normalized: f64, // [0, 1] for raw values in range, inverted
    pub circle: CircleStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Enabling,
    Scanning,
    ScanStopped,
    Connecting { name: String },
    Connected { name: String },
    Disconnected,
}

/// What the UI should show for a given state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordances {
    pub device_text: String,
    pub scan_control: bool,
    pub scan_enabled: bool,
    pub disconnect_control: bool,
}

impl DeviceState {
    pub fn is_busy(&self) -> bool {
        matches!(self, DeviceState::Enabling | DeviceState::Scanning | DeviceState::Connecting { .. })
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, DeviceState::Connected { .. })
    }

    pub fn affordances(&self) -> Affordances {
        let device_text = match self {
            DeviceState::Idle => "".to_string(),
            DeviceState::Enabling => "Enabling bluetooth…".to_string(),
            DeviceState::Scanning => "Scanning…".to_string(),
            DeviceState::ScanStopped => "Stopped scanning".to_string(),
            DeviceState::Connecting { name } => format!("Connecting to {}…", name),
            DeviceState::Connected { name } => format!("Connected to {}", name),
            DeviceState::Disconnected => "Disconnected".to_string(),
        };

        let connected = self.is_connected();

        Affordances {
            device_text,
            scan_control: !connected,
            scan_enabled: !connected && !self.is_busy(),
            disconnect_control: connected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Scan,
    Disconnect,
}

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    // the controller is running and accepts commands on this sender
    Ready(Sender<DeviceCommand>),
    StateChange(DeviceState),
    Reading(SensorReading),
    // must be confirmed by the user
    Alert(String),
}
