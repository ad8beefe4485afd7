use crate::device::constants::{CIRCLE_SIZE, RAW_MAX, RAW_MIN};
use crate::device::types::{CircleStyle, SensorReading};

/// Linearly maps `x` from `[in_min, in_max]` to `[out_min, out_max]`.
///
/// The input range may be inverted (`in_min > in_max`). Values outside the input range are
/// extrapolated, not clamped.
pub fn map_range(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Parses a notification payload as a base-10 integer.
///
/// Every byte is taken as one Latin-1 character. Leading whitespace and a sign are accepted,
/// digits are consumed up to the first other character (so a trailing NUL terminator or line
/// ending is ignored). Returns NaN if there are no digits.
pub fn decode_raw(payload: &[u8]) -> f64 {
    let text: String = payload.iter().map(|&b| char::from(b)).collect();
    // the whitespace an integer parse skips; U+0085 is not part of it
    let text = text.trim_start_matches(|c: char| matches!(c, '\t' | '\n' | '\x0b' | '\x0c' | '\r' | ' ' | '\u{a0}'));

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let mut value: Option<f64> = None;
    for digit in digits.chars().map_while(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0.0) * 10.0 + f64::from(digit));
    }

    match value {
        None => f64::NAN,
        Some(value) if negative => -value,
        Some(value) => value,
    }
}

/// Converts a raw value to [0, 1], where 0 is RAW_MAX (no pressure) and 1 is RAW_MIN.
pub fn normalize(raw: f64) -> f64 {
    map_range(raw, RAW_MAX, RAW_MIN, 0.0, 1.0)
}

impl CircleStyle {
    pub fn from_normalized(normalized: f64) -> Self {
        let size = CIRCLE_SIZE * normalized;
        CircleStyle {
            size,
            border: (CIRCLE_SIZE - size) / 2.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.size.is_finite() && self.border.is_finite()
    }
}

impl SensorReading {
    pub fn decode(payload: &[u8]) -> Self {
        let raw = decode_raw(payload);
        let normalized = normalize(raw);

        SensorReading {
            raw,
            normalized,
            circle: CircleStyle::from_normalized(normalized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoints() {
        assert_eq!(normalize(0.0), 1.0);
        assert_eq!(normalize(2450.0), 0.0);
    }

    #[test]
    fn test_normalize_is_inverse_linear() {
        for raw in (0..=2450).step_by(7) {
            let raw = f64::from(raw);
            assert!((normalize(raw) - (1.0 - raw / 2450.0)).abs() < 1e-12, "raw {}", raw);
        }
    }

    #[test]
    fn test_map_range_does_not_clamp() {
        assert!(normalize(4900.0) < -0.99);
        assert!(normalize(-2450.0) > 1.99);
        assert_eq!(map_range(5.0, 0.0, 10.0, 100.0, 200.0), 150.0);
    }

    #[test]
    fn test_decode_raw() {
        assert_eq!(decode_raw(b"1225"), 1225.0);
        assert_eq!(decode_raw(b"  42"), 42.0);
        assert_eq!(decode_raw(b"-7"), -7.0);
        assert_eq!(decode_raw(b"+7"), 7.0);
        assert_eq!(decode_raw(b"2450\0"), 2450.0);
        assert_eq!(decode_raw(b"812\r\n"), 812.0);
        assert_eq!(decode_raw(b"12ab"), 12.0);
    }

    #[test]
    fn test_decode_raw_not_a_number() {
        assert!(decode_raw(b"").is_nan());
        assert!(decode_raw(b"abc").is_nan());
        assert!(decode_raw(b"-").is_nan());
        assert!(decode_raw(&[0xff, 0xfe]).is_nan());
        // NEL is not skipped as leading whitespace, a no-break space is
        assert!(decode_raw(&[0x85, b'5']).is_nan());
        assert_eq!(decode_raw(&[0xa0, b'5']), 5.0);
        assert_eq!(decode_raw(b"\x0b\x0c\r\n\t 7"), 7.0);
    }

    #[test]
    fn test_reading_half_pressure() {
        let reading = SensorReading::decode(b"1225");
        assert_eq!(reading.raw, 1225.0);
        assert_eq!(reading.normalized, 0.5);
        assert_eq!(reading.circle, CircleStyle { size: 25.0, border: 12.5 });
        assert!(reading.circle.is_finite());
    }

    #[test]
    fn test_reading_extremes() {
        let idle = SensorReading::decode(b"2450");
        assert_eq!(idle.circle, CircleStyle { size: 0.0, border: 25.0 });

        let full = SensorReading::decode(b"0");
        assert_eq!(full.circle, CircleStyle { size: 50.0, border: 0.0 });
    }

    #[test]
    fn test_reading_non_numeric_propagates_nan() {
        let reading = SensorReading::decode(b"n/a");
        assert!(reading.raw.is_nan());
        assert!(reading.normalized.is_nan());
        assert!(reading.circle.size.is_nan());
        assert!(reading.circle.border.is_nan());
        assert!(!reading.circle.is_finite());
    }
}
