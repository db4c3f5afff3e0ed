//! Math types for Aurica
//!
//! The public 3D API speaks in glam types: `Mat3` for orientations, `Mat4`
//! for rigid transforms, `Vec3` for positions and velocities.

pub use glam::{Mat3, Mat4, Quat, Vec3};

#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
