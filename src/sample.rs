//! Canonical sample type and PCM format conversion.
//!
//! The engine mixes in one canonical PCM representation chosen at build
//! time: normalized `f32` in `[-1.0, 1.0]` by default, or `i16` in
//! `[-32768, 32767]` with the `int16-samples` feature. The choice drives
//! the saturation arithmetic here and in the mixer.

/// Canonical internal sample type.
#[cfg(not(feature = "int16-samples"))]
pub type Sample = f32;
#[cfg(feature = "int16-samples")]
pub type Sample = i16;

/// Canonical zero.
#[cfg(not(feature = "int16-samples"))]
pub const SILENCE: Sample = 0.0;
#[cfg(feature = "int16-samples")]
pub const SILENCE: Sample = 0;

/// Bits per canonical sample, as reported by the silent backend.
#[cfg(not(feature = "int16-samples"))]
pub const SAMPLE_BITS: u16 = 32;
#[cfg(feature = "int16-samples")]
pub const SAMPLE_BITS: u16 = 16;

const I16_SCALE: f32 = 32768.0;

/// Round and clamp a float in 16-bit units into an `i16`.
#[inline]
fn saturate_i16(x: f32) -> i16 {
    x.round().clamp(-32768.0, 32767.0) as i16
}

/// Value of a canonical sample as `f32`, in canonical units. The mixer
/// interpolates and applies gains in this widened form before saturating
/// back into the accumulator.
#[inline]
pub(crate) fn sample_value(s: Sample) -> f32 {
    #[cfg(not(feature = "int16-samples"))]
    {
        s
    }
    #[cfg(feature = "int16-samples")]
    {
        s as f32
    }
}

/// Add `v` (canonical units, widened) into an accumulator slot, saturating
/// to the canonical range.
#[inline]
pub(crate) fn accumulate(acc: &mut Sample, v: f32) {
    #[cfg(not(feature = "int16-samples"))]
    {
        *acc = (*acc + v).clamp(-1.0, 1.0);
    }
    #[cfg(feature = "int16-samples")]
    {
        *acc = (*acc as i32 + v.round() as i32).clamp(-32768, 32767) as i16;
    }
}

/// Convert unsigned 8-bit PCM (bias 128) into canonical samples.
pub fn convert_u8(data: &[u8]) -> Vec<Sample> {
    data.iter()
        .map(|&x| from_normalized((x as f32 - 128.0) / 128.0))
        .collect()
}

/// Convert signed 8-bit PCM into canonical samples.
pub fn convert_i8(data: &[i8]) -> Vec<Sample> {
    data.iter()
        .map(|&x| from_normalized(x as f32 / 128.0))
        .collect()
}

/// Convert signed 16-bit PCM into canonical samples.
pub fn convert_i16(data: &[i16]) -> Vec<Sample> {
    #[cfg(not(feature = "int16-samples"))]
    {
        data.iter().map(|&x| x as f32 / I16_SCALE).collect()
    }
    #[cfg(feature = "int16-samples")]
    {
        data.to_vec()
    }
}

/// Convert 32-bit float PCM (nominal range `[-1.0, 1.0]`) into canonical
/// samples.
pub fn convert_f32(data: &[f32]) -> Vec<Sample> {
    #[cfg(not(feature = "int16-samples"))]
    {
        data.to_vec()
    }
    #[cfg(feature = "int16-samples")]
    {
        data.iter().map(|&x| saturate_i16(x * I16_SCALE)).collect()
    }
}

/// Map a normalized float (`[-1.0, 1.0]` nominal) to the canonical type.
#[inline]
fn from_normalized(x: f32) -> Sample {
    #[cfg(not(feature = "int16-samples"))]
    {
        x
    }
    #[cfg(feature = "int16-samples")]
    {
        saturate_i16(x * I16_SCALE)
    }
}

/// Canonical sample back to signed 16-bit PCM.
pub fn sample_to_i16(s: Sample) -> i16 {
    #[cfg(not(feature = "int16-samples"))]
    {
        saturate_i16(s * I16_SCALE)
    }
    #[cfg(feature = "int16-samples")]
    {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i16_round_trips_through_canonical() {
        let data: Vec<i16> = vec![i16::MIN, -12345, -1, 0, 1, 255, 12345, i16::MAX];
        let canonical = convert_i16(&data);
        for (orig, s) in data.iter().zip(&canonical) {
            let back = sample_to_i16(*s);
            // Bit-exact for i16 canonical, within one LSB for f32 canonical.
            assert!((back as i32 - *orig as i32).abs() <= 1, "{orig} -> {back}");
        }
    }

    #[test]
    fn u8_midpoint_is_silence() {
        let canonical = convert_u8(&[128]);
        assert_eq!(canonical[0], SILENCE);
    }

    #[test]
    fn u8_extremes_reach_canonical_range() {
        let canonical = convert_u8(&[0, 255]);
        assert_eq!(sample_to_i16(canonical[0]), i16::MIN);
        // 255 maps to 127/128 of full scale, not quite the positive limit.
        assert!(sample_to_i16(canonical[1]) >= 32511);
    }

    #[test]
    fn i8_scales_like_u8() {
        let from_i8 = convert_i8(&[-128, -64, 0, 64, 127]);
        let from_u8 = convert_u8(&[0, 64, 128, 192, 255]);
        assert_eq!(from_i8, from_u8);
    }

    #[test]
    fn f32_out_of_range_saturates_on_accumulate() {
        let mut acc = SILENCE;
        accumulate(&mut acc, sample_value(convert_f32(&[0.75])[0]));
        accumulate(&mut acc, sample_value(convert_f32(&[0.75])[0]));
        assert_eq!(sample_to_i16(acc), i16::MAX);

        let mut acc = SILENCE;
        accumulate(&mut acc, 4.0 * sample_value(convert_f32(&[-1.0])[0]));
        assert_eq!(sample_to_i16(acc), i16::MIN);
    }

    #[test]
    fn conversion_preserves_sample_count() {
        assert_eq!(convert_u8(&[1, 2, 3]).len(), 3);
        assert_eq!(convert_i8(&[1, 2, 3]).len(), 3);
        assert_eq!(convert_i16(&[1, 2, 3]).len(), 3);
        assert_eq!(convert_f32(&[0.1, 0.2, 0.3]).len(), 3);
    }
}
