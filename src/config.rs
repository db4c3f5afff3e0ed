//! Startup configuration for Aurica

/// Describes the output stream the engine should request from the device
/// backend. The backend may substitute a different rate, channel count or
/// bit format; query the engine for the negotiated values after `startup`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineDesc {
    pub sample_rate: u32,
    pub channels: u16,
    /// Ask for exclusive device access where the OS audio service offers it.
    pub exclusive_if_possible: bool,
    /// Log the negotiated stream details on startup.
    pub verbose: bool,
}

impl Default for EngineDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            exclusive_if_possible: false,
            verbose: false,
        }
    }
}

impl EngineDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn exclusive_if_possible(mut self, exclusive: bool) -> Self {
        self.exclusive_if_possible = exclusive;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
