//! Length units for positional parameters.
//!
//! The engine stores all positional state in one global unit (meters by
//! default). Callers working in another unit can pass it alongside their
//! values and have them converted on the way in or out. Each variant's
//! discriminant is its power of ten relative to millimeters, so converting
//! between units is a pure power-of-ten scale.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    MilliMeter = 0,
    CentiMeter = 1,
    DeciMeter = 2,
    Meter = 3,
    KiloMeter = 6,
}

impl Default for LengthUnit {
    fn default() -> Self {
        Self::Meter
    }
}

fn pow10(mut p: i32) -> f32 {
    let mut r = 1.0f32;
    while p > 0 {
        r *= 10.0;
        p -= 1;
    }
    r
}

/// Scale a length from one unit into another. With either side `None`
/// there is nothing to convert from or to and the value passes through.
pub fn convert_length(value: f32, from: Option<LengthUnit>, to: Option<LengthUnit>) -> f32 {
    let (Some(from), Some(to)) = (from, to) else {
        return value;
    };
    let idx_from = from as i32;
    let idx_to = to as i32;
    if idx_from > idx_to {
        value * pow10(idx_from - idx_to)
    } else if idx_to > idx_from {
        value / pow10(idx_to - idx_from)
    } else {
        value
    }
}

/// Component-wise [`convert_length`] over a vector.
pub fn convert_vec(value: Vec3, from: Option<LengthUnit>, to: Option<LengthUnit>) -> Vec3 {
    Vec3::new(
        convert_length(value.x, from, to),
        convert_length(value.y, from, to),
        convert_length(value.z, from, to),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meters_to_millimeters_scales_up() {
        let mm = convert_length(2.5, Some(LengthUnit::Meter), Some(LengthUnit::MilliMeter));
        assert_eq!(mm, 2500.0);
    }

    #[test]
    fn millimeters_to_kilometers_scales_down() {
        let km = convert_length(
            1_000_000.0,
            Some(LengthUnit::MilliMeter),
            Some(LengthUnit::KiloMeter),
        );
        assert_eq!(km, 1.0);
    }

    #[test]
    fn same_unit_and_missing_units_pass_through() {
        assert_eq!(
            convert_length(7.0, Some(LengthUnit::Meter), Some(LengthUnit::Meter)),
            7.0
        );
        assert_eq!(convert_length(7.0, None, Some(LengthUnit::Meter)), 7.0);
        assert_eq!(convert_length(7.0, Some(LengthUnit::Meter), None), 7.0);
    }

    #[test]
    fn vectors_convert_per_component() {
        let v = convert_vec(
            Vec3::new(1.0, 2.0, 3.0),
            Some(LengthUnit::Meter),
            Some(LengthUnit::CentiMeter),
        );
        assert_eq!(v, Vec3::new(100.0, 200.0, 300.0));
    }
}
