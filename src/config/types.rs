use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::constants::{DEVICE_NAME, SCAN_TIMEOUT, make_sensor_service_uuid, make_sensor_value_uuid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    // the exact advertised name to connect to
    pub device_name: String,
    pub scan_timeout_ms: u64,
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    // start scanning as soon as the window opens
    pub scan_on_start: bool,
    // pixels per length unit of the circle
    pub circle_unit: f32,
}

impl Config {
    pub fn sanitize(&mut self) {
        if !self.circle_unit.is_finite() || self.circle_unit <= 0.0 {
            self.circle_unit = Config::default().circle_unit;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_name: DEVICE_NAME.to_string(),
            scan_timeout_ms: SCAN_TIMEOUT,
            service_uuid: make_sensor_service_uuid(),
            characteristic_uuid: make_sensor_value_uuid(),
            scan_on_start: false,
            circle_unit: 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.device_name, "DLG-CAP");
        assert_eq!(config.scan_timeout_ms, 5000);
        assert_eq!(config.service_uuid.to_string(), "502678e8-dc28-749a-ff4d-a546a6280f3b");
        assert_eq!(config.characteristic_uuid.to_string(), "5b3d31fe-ba78-9c90-d24b-a78de25e41e0");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"deviceName": "DLG-CAP-2", "scanOnStart": true}"#).unwrap();
        assert_eq!(config.device_name, "DLG-CAP-2");
        assert!(config.scan_on_start);
        assert_eq!(config.scan_timeout_ms, 5000);
        assert_eq!(config.circle_unit, 4.0);
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["scanTimeoutMs"], 5000);
        assert_eq!(json["serviceUuid"], "502678e8-dc28-749a-ff4d-a546a6280f3b");
        assert_eq!(json["characteristicUuid"], "5b3d31fe-ba78-9c90-d24b-a78de25e41e0");
    }

    #[test]
    fn test_sanitize_circle_unit() {
        let mut config = Config { circle_unit: -1.0, ..Config::default() };
        config.sanitize();
        assert_eq!(config.circle_unit, 4.0);

        let mut config = Config { circle_unit: 2.5, ..Config::default() };
        config.sanitize();
        assert_eq!(config.circle_unit, 2.5);
    }
}
