//! Decoding raw register words into device readings.

use tracing::warn;

use kermi_common::{DeviceReading, ReadGroup, ReadingValue};

use crate::config::{DataType, GroupPollConfig, PointConfig};

/// Decode one point from the raw words of its group's range.
///
/// Returns `None` when the point lies outside the polled range (the response
/// was shorter than the configured layout expects).
pub fn decode_point(words: &[u16], point: &PointConfig) -> Option<f64> {
    let start = point.index;
    let chunk = words.get(start..start + point.data_type.words())?;

    let raw = match point.data_type {
        DataType::U16 => chunk[0] as f64,
        DataType::I16 => chunk[0] as i16 as f64,
        DataType::U32 => (((chunk[0] as u32) << 16) | (chunk[1] as u32)) as f64,
        DataType::I32 => (((chunk[0] as u32) << 16) | (chunk[1] as u32)) as i32 as f64,
        DataType::F32 => {
            let bits = ((chunk[0] as u32) << 16) | (chunk[1] as u32);
            f32::from_bits(bits) as f64
        }
        DataType::U32Le => (((chunk[1] as u32) << 16) | (chunk[0] as u32)) as f64,
        DataType::I32Le => (((chunk[1] as u32) << 16) | (chunk[0] as u32)) as i32 as f64,
        DataType::F32Le => {
            let bits = ((chunk[1] as u32) << 16) | (chunk[0] as u32);
            f32::from_bits(bits) as f64
        }
    };

    // Apply scale and offset
    Some(raw * point.scale + point.offset)
}

/// Decode every configured point of a group into device readings.
pub fn decode_group(
    device: &str,
    group: ReadGroup,
    config: &GroupPollConfig,
    words: &[u16],
) -> Vec<DeviceReading> {
    let mut readings = Vec::with_capacity(config.points.len());

    for point in &config.points {
        match decode_point(words, point) {
            Some(value) => {
                let mut reading =
                    DeviceReading::new(device, group, &point.name, ReadingValue::Gauge(value));
                if let Some(unit) = &point.unit {
                    reading = reading.with_unit(unit);
                }
                readings.push(reading);
            }
            None => {
                warn!(
                    group = %group,
                    point = %point.name,
                    received = words.len(),
                    "Point lies outside the received register range"
                );
            }
        }
    }

    readings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PointConfig;

    #[test]
    fn test_decode_u16_with_scale_offset() {
        let point = PointConfig {
            scale: 0.1,
            offset: -50.0,
            ..PointConfig::named("temperature", 0)
        };

        // 1000 * 0.1 - 50 = 50
        assert_eq!(decode_point(&[1000], &point), Some(50.0));
    }

    #[test]
    fn test_decode_i16_negative() {
        let point = PointConfig {
            data_type: DataType::I16,
            ..PointConfig::named("delta", 0)
        };

        assert_eq!(decode_point(&[0xFFF6], &point), Some(-10.0));
    }

    #[test]
    fn test_decode_f32_big_endian() {
        // 123.456 in IEEE 754 = 0x42F6E979
        let point = PointConfig {
            data_type: DataType::F32,
            ..PointConfig::named("flow", 0)
        };

        let value = decode_point(&[0x42F6, 0xE979], &point).unwrap();
        assert!((value - 123.456).abs() < 0.001);
    }

    #[test]
    fn test_decode_u32_word_order() {
        let be = PointConfig {
            data_type: DataType::U32,
            ..PointConfig::named("hours", 0)
        };
        let le = PointConfig {
            data_type: DataType::U32Le,
            ..PointConfig::named("hours", 0)
        };

        let words = [0x0001, 0x0002];
        assert_eq!(decode_point(&words, &be), Some(65538.0));
        assert_eq!(decode_point(&words, &le), Some(131073.0));
    }

    #[test]
    fn test_decode_point_outside_range() {
        let point = PointConfig {
            data_type: DataType::U32,
            ..PointConfig::named("wide", 1)
        };

        // only two words received, the u32 at index 1 needs words 1..3
        assert_eq!(decode_point(&[1, 2], &point), None);
    }

    #[test]
    fn test_decode_group_readings() {
        let config = GroupPollConfig {
            kind: Default::default(),
            address: 120,
            count: 2,
            interval_ms: 5000,
            points: vec![
                PointConfig::named("combined_power", 0).with_unit("W"),
                PointConfig::named("charge_power", 1).with_unit("W"),
            ],
        };

        let readings = decode_group("xcenter01", ReadGroup::Power, &config, &[1500, 320]);

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].metric, "combined_power");
        assert_eq!(readings[0].value, ReadingValue::Gauge(1500.0));
        assert_eq!(readings[0].unit.as_deref(), Some("W"));
        assert_eq!(readings[1].value, ReadingValue::Gauge(320.0));
    }

    #[test]
    fn test_decode_group_skips_truncated_point() {
        let config = GroupPollConfig {
            kind: Default::default(),
            address: 120,
            count: 2,
            interval_ms: 5000,
            points: vec![
                PointConfig::named("ok", 0),
                PointConfig::named("truncated", 3),
            ],
        };

        let readings = decode_group("xcenter01", ReadGroup::Power, &config, &[7, 8]);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].metric, "ok");
    }
}
