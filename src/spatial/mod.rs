//! Positional audio: per-channel emitter state and the scene solver.

mod object;
pub(crate) mod solver;
mod units;

pub use object::{CoordFrame, EmitterState, MixParam, SpatialObject};
pub use units::{convert_length, convert_vec, LengthUnit};
