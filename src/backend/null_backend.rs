//! Silent fallback backend.
//!
//! Accepts the requested format verbatim and never drains its ring; writes
//! still succeed because the ring discards its oldest samples on overflow,
//! so the engine runs identically with audio disabled.

use std::sync::Arc;

use crate::error::Result;
use crate::ring::SampleRing;
use crate::sample::SAMPLE_BITS;

use super::{Backend, StreamRequest};

const FALLBACK_FRAMES: usize = 512;

pub struct NullBackend {
    ring: Arc<SampleRing>,
    sample_rate: u32,
    channels: u16,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            ring: Arc::new(SampleRing::new(0)),
            sample_rate: 0,
            channels: 0,
        }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for NullBackend {
    fn startup(&mut self, request: &StreamRequest) -> Result<()> {
        self.sample_rate = request.sample_rate;
        self.channels = request.channels;
        self.ring = Arc::new(SampleRing::for_stream(self.sample_rate, self.channels));
        if request.verbose {
            log::info!(
                "NullBackend: {} Hz, {} channels (no audio output)",
                self.sample_rate,
                self.channels
            );
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.ring.clear();
    }

    fn ring(&self) -> Arc<SampleRing> {
        self.ring.clone()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn num_channels(&self) -> u16 {
        self.channels
    }

    fn bit_format(&self) -> u16 {
        SAMPLE_BITS
    }

    fn buffer_size_frames(&self) -> usize {
        FALLBACK_FRAMES
    }

    fn name(&self) -> &'static str {
        "No Audio"
    }
}
