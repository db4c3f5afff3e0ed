//! Aurica - embeddable real-time audio engine
//!
//! Mixes any number of in-memory PCM buffers into one output stream
//! through the OS audio device, with per-source transport, gain, pitch and
//! panning, plus a positional layer that places sources and a listener in
//! 3D space with distance falloff, Doppler shift and source directivity.
//!
//! ```no_run
//! use aurica::{AuricaEngine, EngineDesc};
//!
//! let mut engine = AuricaEngine::new(true);
//! engine.startup(EngineDesc::default())?;
//!
//! let buffer = engine.create_buffer();
//! let samples: Vec<f32> = (0..48000)
//!     .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 48000.0).sin())
//!     .collect();
//! engine.set_buffer_data_32f(buffer, &samples, 1, 48000);
//!
//! let source = engine.create_source();
//! engine.attach_buffer_to_source(source, buffer);
//! engine.set_source_gain(source, 0.2);
//! engine.play_source(source);
//!
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! engine.shutdown();
//! # Ok::<(), aurica::AuricaError>(())
//! ```

pub mod backend;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod listener;
pub mod math;
mod mixer;
pub mod ring;
pub mod sample;
pub mod source;
pub mod spatial;

pub use buffer::BufferId;
pub use config::EngineDesc;
pub use engine::AuricaEngine;
pub use error::{AuricaError, Result};
pub use events::AuricaEvent;
pub use sample::Sample;
pub use source::{DirectivityPattern, SourceId};
pub use spatial::{CoordFrame, LengthUnit};
