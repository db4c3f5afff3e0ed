//! Device backends.
//!
//! A backend owns the OS audio stream and its render path. The engine's
//! mix thread and the backend's render path communicate only through the
//! backend's `SampleRing`: the mix thread enqueues blocks, the render path
//! drains them into the device.

mod cpal_backend;
mod null_backend;

pub use cpal_backend::CpalBackend;
pub use null_backend::NullBackend;

use std::sync::Arc;

use crate::error::Result;
use crate::ring::SampleRing;

/// Stream parameters the engine asks the OS for. The negotiated values may
/// differ; query the backend getters after `startup`.
#[derive(Debug, Clone, Copy)]
pub struct StreamRequest {
    pub sample_rate: u32,
    pub channels: u16,
    pub exclusive_if_possible: bool,
    pub verbose: bool,
}

/// Uniform contract over the OS audio services.
pub trait Backend {
    /// Initialize OS audio and start the render path. The backend may
    /// substitute a different rate, channel count or bit format than
    /// requested.
    fn startup(&mut self, request: &StreamRequest) -> Result<()>;

    /// Stop the stream and release OS resources. Idempotent.
    fn shutdown(&mut self);

    /// Producer handle for the backend's sample queue.
    fn ring(&self) -> Arc<SampleRing>;

    /// Negotiated sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Negotiated channel count.
    fn num_channels(&self) -> u16;

    /// Bits per sample of the device-side format.
    fn bit_format(&self) -> u16;

    /// The device's preferred block size in frames, 0 if unknown.
    fn buffer_size_frames(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Pick the backend for this process: the OS audio service for the build
/// target, or the silent backend when audio is disabled or no real device
/// can work (WSL has no audio service behind ALSA).
pub(crate) fn select_backend(enable_audio: bool) -> Box<dyn Backend> {
    if !enable_audio {
        return Box::new(NullBackend::new());
    }
    if cfg!(target_os = "linux") && is_wsl() {
        log::warn!("WSL detected; using the silent backend");
        return Box::new(NullBackend::new());
    }
    Box::new(CpalBackend::new())
}

/// Detect Windows Subsystem for Linux by its kernel signature.
#[cfg(target_os = "linux")]
fn is_wsl() -> bool {
    use std::sync::OnceLock;
    static WSL: OnceLock<bool> = OnceLock::new();
    *WSL.get_or_init(|| {
        std::fs::read_to_string("/proc/version")
            .map(|version| {
                let version = version.to_lowercase();
                version.contains("microsoft") || version.contains("wsl")
            })
            .unwrap_or(false)
    })
}

#[cfg(not(target_os = "linux"))]
fn is_wsl() -> bool {
    false
}
