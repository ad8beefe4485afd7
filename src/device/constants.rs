use uuid::Uuid;

/**
 * The advertised name of the sensor board.
 */
pub const DEVICE_NAME: &str = "DLG-CAP";

/**
 * How long (milliseconds) a scan may run before it is stopped without a match.
 */
pub const SCAN_TIMEOUT: u64 = 5000;

/**
 * How long (milliseconds) to wait for the bluetooth radio to be powered on after enablement
 * has been requested.
 */
pub const ENABLE_DEADLINE: u64 = 5000;

/**
 * How often (milliseconds) to query the adapter state while waiting for enablement.
 */
pub const ENABLE_POLL_DELAY: u64 = 500;

/**
 * How long (milliseconds) connecting and discovering services may take before the
 * peripheral is given up on.
 */
pub const CONNECT_DEADLINE: u64 = 10000;

/**
 * The UUID of the Bluetooth BLE service that carries the sensor value.
 */
pub const SENSOR_SERVICE: &str = "502678e8-dc28-749a-ff4d-a546a6280f3b";

/**
 * The UUID of the Bluetooth BLE characteristic that notifies the sensor value.
 */
pub const SENSOR_VALUE_CHARACTERISTIC: &str = "5b3d31fe-ba78-9c90-d24b-a78de25e41e0";

/**
 * The raw value reported with no pressure applied.
 * - towards 0 represents increasing pressure
 * Note that the normalized value inverts this range: RAW_MAX maps to 0, and 0 maps to 1.
 */
pub const RAW_MAX: f64 = 2450.0;

pub const RAW_MIN: f64 = 0.0;

/**
 * Outer size of the circle, in length units. The filled part is CIRCLE_SIZE * normalized,
 * the remainder is split over the border on both sides.
 */
pub const CIRCLE_SIZE: f64 = 50.0;

pub const ALERT_CANNOT_ENABLE: &str = "Cannot enable bluetooth";

pub fn make_sensor_service_uuid() -> Uuid {
    Uuid::parse_str(SENSOR_SERVICE).unwrap()
}

pub fn make_sensor_value_uuid() -> Uuid {
    Uuid::parse_str(SENSOR_VALUE_CHARACTERISTIC).unwrap()
}
