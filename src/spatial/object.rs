//! Per-channel 3D emitter state and coordinate-convention resolution.
//!
//! Every 3D object (each source, and the listener) carries one emitter per
//! audio channel: a stereo source has two emitters, the stereo listener's
//! emitters are its ears. An emitter is a rotation, a world position and a
//! world velocity, plus the gain/Doppler table the scene solver fills in
//! against the listener's channels.

use glam::{Mat3, Mat4, Vec3};

/// Gain and pitch-shift pair computed by the scene solver for one
/// (source channel, listener channel) pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixParam {
    pub gain: f32,
    pub doppler_shift: f32,
}

impl Default for MixParam {
    fn default() -> Self {
        Self {
            gain: 1.0,
            doppler_shift: 1.0,
        }
    }
}

/// State of a single channel emitter.
#[derive(Debug, Clone, Default)]
pub struct EmitterState {
    pub rotation: Mat3,
    pub position: Vec3,
    pub velocity: Vec3,
    /// One entry per listener channel; sized by the solver each tick.
    pub(crate) mix: Vec<MixParam>,
}

/// Names which rotation-matrix axis points right, up and forward, with
/// sign. Handedness is never changed and the matrix itself is never
/// rewritten; direction queries resolve the convention on the fly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordFrame {
    XRightYUpZBack,
    XLeftYUpZFront,
    XRightYDownZFront,
    XLeftYDownZBack,
}

impl Default for CoordFrame {
    fn default() -> Self {
        // +Z forward by default.
        Self::XLeftYUpZFront
    }
}

impl CoordFrame {
    fn right_sign(self) -> f32 {
        match self {
            Self::XRightYUpZBack | Self::XRightYDownZFront => 1.0,
            Self::XLeftYUpZFront | Self::XLeftYDownZBack => -1.0,
        }
    }

    fn up_sign(self) -> f32 {
        match self {
            Self::XRightYUpZBack | Self::XLeftYUpZFront => 1.0,
            Self::XRightYDownZFront | Self::XLeftYDownZBack => -1.0,
        }
    }

    fn forward_sign(self) -> f32 {
        match self {
            Self::XLeftYUpZFront | Self::XRightYDownZFront => 1.0,
            Self::XRightYUpZBack | Self::XLeftYDownZBack => -1.0,
        }
    }
}

/// Channel emitters plus the object's coordinate convention and the 3D
/// enable flag.
#[derive(Debug, Clone, Default)]
pub struct SpatialObject {
    channels: Vec<EmitterState>,
    enabled: bool,
    frame: CoordFrame,
}

impl SpatialObject {
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn set_num_channels(&mut self, count: usize) {
        self.channels.resize_with(count, EmitterState::default);
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn frame(&self) -> CoordFrame {
        self.frame
    }

    pub fn set_frame(&mut self, frame: CoordFrame) {
        self.frame = frame;
    }

    /// Emitter for `ch`, falling back to the first emitter when the index
    /// runs past the list (a mono object answers for every channel).
    pub(crate) fn state(&self, ch: usize) -> Option<&EmitterState> {
        self.channels.get(ch).or_else(|| self.channels.first())
    }

    pub(crate) fn state_mut(&mut self, ch: usize) -> Option<&mut EmitterState> {
        if ch < self.channels.len() {
            self.channels.get_mut(ch)
        } else {
            self.channels.first_mut()
        }
    }

    pub(crate) fn states_mut(&mut self) -> &mut [EmitterState] {
        &mut self.channels
    }

    /// Overwrite one emitter directly. Strict bounds: out-of-range channels
    /// are refused, unlike the read-side fallback.
    pub fn set_channel_state(
        &mut self,
        ch: usize,
        rotation: Mat3,
        position: Vec3,
        velocity: Vec3,
    ) -> bool {
        match self.channels.get_mut(ch) {
            Some(state) => {
                state.rotation = rotation;
                state.position = position;
                state.velocity = velocity;
                true
            }
            None => false,
        }
    }

    pub fn channel_state(&self, ch: usize) -> Option<(Mat3, Vec3, Vec3)> {
        self.channels
            .get(ch)
            .map(|s| (s.rotation, s.position, s.velocity))
    }

    /// Semantic right direction of channel `ch` in world space.
    pub fn dir_right(&self, ch: usize) -> Vec3 {
        self.state(ch)
            .map(|s| s.rotation.x_axis * self.frame.right_sign())
            .unwrap_or(Vec3::ZERO)
    }

    /// Semantic up direction of channel `ch` in world space.
    pub fn dir_up(&self, ch: usize) -> Vec3 {
        self.state(ch)
            .map(|s| s.rotation.y_axis * self.frame.up_sign())
            .unwrap_or(Vec3::ZERO)
    }

    /// Semantic forward direction of channel `ch` in world space.
    pub fn dir_forward(&self, ch: usize) -> Vec3 {
        self.state(ch)
            .map(|s| s.rotation.z_axis * self.frame.forward_sign())
            .unwrap_or(Vec3::ZERO)
    }

    /// Pose every emitter from one rigid-body state: channel positions are
    /// the transformed local offsets, channel velocities add the spin term
    /// `ω × r` to the body velocity. Resizes the emitter list to the
    /// offsets' length.
    pub fn apply_rigid_state(
        &mut self,
        transform: Mat4,
        velocity_world: Vec3,
        angular_velocity_local: Vec3,
        channel_offsets_local: &[Vec3],
    ) {
        if self.channels.len() != channel_offsets_local.len() {
            self.set_num_channels(channel_offsets_local.len());
        }
        let rotation = Mat3::from_mat4(transform);
        let center = transform.w_axis.truncate();
        let angular_velocity_world = rotation * angular_velocity_local;
        for (state, offset) in self.channels.iter_mut().zip(channel_offsets_local) {
            let position = transform.transform_point3(*offset);
            state.rotation = rotation;
            state.position = position;
            state.velocity = velocity_world + angular_velocity_world.cross(position - center);
        }
    }
}
