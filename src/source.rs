//! Playback state records: transport, gain, pitch, pan, distance model
//! and directivity for one playable source.

use crate::buffer::BufferId;
use crate::math::lerp;
use crate::spatial::SpatialObject;

pub type SourceId = u32;

/// Radiation pattern of a directional source, evaluated against the cosine
/// of the angle between the source's forward axis and the direction to the
/// listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectivityPattern {
    Cardioid,
    SuperCardioid,
    HalfRectifiedDipole,
    Dipole,
}

/// Directivity shaping for a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Directivity {
    /// Blend between omnidirectional (0) and the full pattern (1).
    pub alpha: f32,
    /// Exponent applied to the blended pattern, in `[1, 8]`.
    pub sharpness: f32,
    pub pattern: DirectivityPattern,
    /// Residual gain for sound arriving from behind the listener, `[0, 1]`.
    pub rear_attenuation: f32,
}

impl Default for Directivity {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            sharpness: 1.0,
            pattern: DirectivityPattern::Cardioid,
            rear_attenuation: 1.0,
        }
    }
}

impl Directivity {
    /// Pattern weight for a given `cos(angle)`, blended with omni by
    /// `alpha`, clamped to `[0, 1]` and raised to `sharpness`.
    pub(crate) fn weight(&self, cos_angle: f32) -> f32 {
        let raw = match self.pattern {
            DirectivityPattern::Cardioid => 0.5 * (1.0 + cos_angle),
            DirectivityPattern::SuperCardioid => 0.25 + 0.75 * cos_angle,
            DirectivityPattern::HalfRectifiedDipole => cos_angle.max(0.0),
            DirectivityPattern::Dipole => cos_angle.abs(),
        };
        lerp(1.0, raw, self.alpha).clamp(0.0, 1.0).powf(self.sharpness)
    }
}

/// Inverse-polynomial distance falloff `1 / (c + l·d + q·d²)`, normalized
/// so gain is unity at and inside `min_distance` and frozen beyond
/// `max_distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Falloff {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Cached `attenuate(min_distance)`; refreshed by every falloff mutator.
    pub(crate) attenuation_at_min_distance: f32,
}

impl Default for Falloff {
    fn default() -> Self {
        let mut falloff = Self {
            constant: 1.0,
            linear: 0.2,
            quadratic: 0.08,
            min_distance: 1.0,
            max_distance: 500.0,
            attenuation_at_min_distance: 1.0,
        };
        falloff.attenuation_at_min_distance = falloff.attenuate(falloff.min_distance);
        falloff
    }
}

impl Falloff {
    fn attenuate(&self, d: f32) -> f32 {
        1.0 / (self.constant + self.linear * d + self.quadratic * d * d)
    }

    fn cache_is_valid(value: f32) -> bool {
        value.is_finite() && (1e-6..=1e6).contains(&value)
    }

    /// Replace the falloff coefficients, refusing sets whose attenuation at
    /// `min_distance` is non-finite or numerically extreme.
    pub(crate) fn set_coefficients(&mut self, constant: f32, linear: f32, quadratic: f32) -> bool {
        let candidate = Self {
            constant,
            linear,
            quadratic,
            ..*self
        };
        let at_min = candidate.attenuate(candidate.min_distance);
        if !Self::cache_is_valid(at_min) {
            return false;
        }
        *self = Self {
            attenuation_at_min_distance: at_min,
            ..candidate
        };
        true
    }

    /// Replace the reference distances (`0 < min ≤ max`).
    pub(crate) fn set_distances(&mut self, min_distance: f32, max_distance: f32) -> bool {
        if !min_distance.is_finite() || !max_distance.is_finite() {
            return false;
        }
        if min_distance <= 0.0 || max_distance < min_distance {
            return false;
        }
        let candidate = Self {
            min_distance,
            max_distance,
            ..*self
        };
        let at_min = candidate.attenuate(min_distance);
        if !Self::cache_is_valid(at_min) {
            return false;
        }
        *self = Self {
            attenuation_at_min_distance: at_min,
            ..candidate
        };
        true
    }

    /// Normalized distance gain: unity inside `min_distance`, the
    /// attenuation ratio between the distances, frozen past `max_distance`.
    pub(crate) fn distance_gain(&self, d: f32) -> f32 {
        if d < self.min_distance {
            return 1.0;
        }
        let clamped = d.min(self.max_distance);
        self.attenuate(clamped) / self.attenuation_at_min_distance
    }
}

/// One playable instance. Holds a buffer handle (never a reference), its
/// own transport cursor, and all per-source audio parameters.
#[derive(Debug, Clone, Default)]
pub struct Source {
    pub(crate) buffer_id: BufferId,
    pub(crate) playing: bool,
    pub(crate) paused: bool,
    pub(crate) looping: bool,
    /// Fractional frame cursor into the attached buffer.
    pub(crate) play_pos: f64,
    pub(crate) gain: f32,
    pub(crate) pitch: f32,
    /// `Some(p)` pans a stereo buffer: 0 = full left, 1 = full right.
    pub(crate) pan: Option<f32>,
    pub(crate) spatial: SpatialObject,
    /// 0 disables Doppler for this source.
    pub(crate) speed_of_sound: f32,
    pub(crate) falloff: Falloff,
    pub(crate) directivity: Directivity,
}

impl Source {
    pub(crate) fn new() -> Self {
        Self {
            gain: 1.0,
            pitch: 1.0,
            ..Default::default()
        }
    }

    /// `play` rewinds a stopped source; a paused source resumes from its
    /// current position instead.
    pub(crate) fn play(&mut self) {
        if !self.paused {
            self.play_pos = 0.0;
        }
        self.playing = true;
        self.paused = false;
    }

    pub(crate) fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.paused = true;
        }
    }

    pub(crate) fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.playing = true;
        }
    }

    pub(crate) fn stop(&mut self) {
        self.playing = false;
        self.paused = false;
        self.play_pos = 0.0;
    }

    pub(crate) fn attach(&mut self, buffer_id: BufferId) {
        self.buffer_id = buffer_id;
        self.playing = false;
        self.paused = false;
        self.play_pos = 0.0;
    }

    pub(crate) fn detach(&mut self) {
        self.attach(0);
    }
}

/// `gain = 10^(dB/20)`.
pub(crate) fn gain_from_db(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

pub(crate) fn db_from_gain(gain: f32) -> f32 {
    20.0 * gain.log10()
}

/// Slider position `v ∈ [0, 1]` to gain via a tapered dB ramp:
/// `gain = 10^((min_db · (1 − v^taper)) / 20)`. `v = 1` is unity gain,
/// `v = 0` sits `min_db` down.
pub(crate) fn gain_from_slider(v: f32, min_db: f32, taper: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    gain_from_db(min_db * (1.0 - v.powf(taper)))
}

pub(crate) fn slider_from_gain(gain: f32, min_db: f32, taper: f32) -> f32 {
    if gain <= 0.0 {
        return 0.0;
    }
    let inner = 1.0 - db_from_gain(gain) / min_db;
    inner.clamp(0.0, 1.0).powf(1.0 / taper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_rewinds_unless_paused() {
        let mut src = Source::new();
        src.play_pos = 100.0;
        src.play();
        assert!(src.playing);
        assert_eq!(src.play_pos, 0.0);

        src.play_pos = 50.0;
        src.pause();
        assert!(src.paused && !src.playing);
        src.play();
        assert!(src.playing && !src.paused);
        assert_eq!(src.play_pos, 50.0);
    }

    #[test]
    fn pause_ignores_stopped_sources() {
        let mut src = Source::new();
        src.pause();
        assert!(!src.paused);
        src.resume();
        assert!(!src.playing);
    }

    #[test]
    fn attach_resets_transport() {
        let mut src = Source::new();
        src.play();
        src.play_pos = 12.0;
        src.attach(7);
        assert_eq!(src.buffer_id, 7);
        assert!(!src.playing && !src.paused);
        assert_eq!(src.play_pos, 0.0);
    }

    #[test]
    fn falloff_gain_is_unity_inside_min_distance() {
        let falloff = Falloff::default();
        assert_eq!(falloff.distance_gain(0.5), 1.0);
        assert!((falloff.distance_gain(falloff.min_distance) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn falloff_freezes_past_max_distance() {
        let mut falloff = Falloff::default();
        assert!(falloff.set_distances(1.0, 10.0));
        let at_max = falloff.distance_gain(10.0);
        assert_eq!(falloff.distance_gain(1000.0), at_max);
    }

    #[test]
    fn falloff_rejects_degenerate_coefficients() {
        let mut falloff = Falloff::default();
        let before = falloff;
        assert!(!falloff.set_coefficients(0.0, 0.0, 0.0));
        assert!(!falloff.set_coefficients(f32::NAN, 0.2, 0.08));
        assert!(!falloff.set_distances(0.0, 10.0));
        assert!(!falloff.set_distances(5.0, 1.0));
        assert_eq!(falloff, before);
    }

    #[test]
    fn db_mapping_round_trips() {
        let gain = gain_from_db(-6.0);
        assert!((db_from_gain(gain) + 6.0).abs() < 1e-4);
        assert!((gain_from_db(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn slider_endpoints() {
        assert!((gain_from_slider(1.0, -60.0, 1.0) - 1.0).abs() < 1e-6);
        assert!((gain_from_slider(0.0, -60.0, 1.0) - 0.001).abs() < 1e-6);
        let v = 0.3;
        let gain = gain_from_slider(v, -60.0, 2.0);
        assert!((slider_from_gain(gain, -60.0, 2.0) - v).abs() < 1e-4);
    }

    #[test]
    fn cardioid_weight_hits_unity_on_axis_and_zero_behind() {
        let directivity = Directivity {
            alpha: 1.0,
            ..Default::default()
        };
        assert!((directivity.weight(1.0) - 1.0).abs() < 1e-6);
        assert!(directivity.weight(-1.0).abs() < 1e-6);
    }

    #[test]
    fn omni_blend_ignores_pattern() {
        let directivity = Directivity::default();
        assert!((directivity.weight(-1.0) - 1.0).abs() < 1e-6);
    }
}
