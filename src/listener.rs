//! The singleton listener: one emitter per output channel (the "ears").

use crate::spatial::SpatialObject;

#[derive(Debug, Clone)]
pub struct Listener {
    pub(crate) spatial: SpatialObject,
    /// Residual gain for sound arriving from behind, `[0, 1]`.
    pub(crate) rear_attenuation: f32,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            spatial: SpatialObject::default(),
            rear_attenuation: 0.8,
        }
    }
}
