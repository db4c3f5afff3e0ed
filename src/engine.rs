//! The audio engine: owns the device backend, the buffer and source
//! stores, the listener, and the mix thread that clocks the solver and
//! mixer.
//!
//! Every public mutator and query serializes on one state mutex, the same
//! mutex the mix thread holds while solving and mixing a block. The ring
//! handoff to the backend happens after that lock is released, so the
//! ring's own lock never nests inside the engine lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use glam::{Mat3, Mat4, Vec3};

use crossbeam_channel::{Receiver, Sender};

use crate::backend::{self, Backend, StreamRequest};
use crate::buffer::{AudioBuffer, BufferId};
use crate::config::EngineDesc;
use crate::error::{AuricaError, Result};
use crate::events::AuricaEvent;
use crate::listener::Listener;
use crate::mixer;
use crate::ring::SampleRing;
use crate::sample::{self, SILENCE};
use crate::source::{self, DirectivityPattern, Source, SourceId};
use crate::spatial::{self, solver, CoordFrame, LengthUnit};

const FALLBACK_FRAMES: usize = 512;
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Everything behind the engine-wide mutex.
struct EngineState {
    sources: HashMap<SourceId, Source>,
    buffers: HashMap<BufferId, AudioBuffer>,
    next_source_id: SourceId,
    next_buffer_id: BufferId,
    listener: Listener,
    scene_ready: bool,
    master_gain: f32,
    length_unit: LengthUnit,
}

impl EngineState {
    fn new() -> Self {
        Self {
            sources: HashMap::new(),
            buffers: HashMap::new(),
            next_source_id: 1,
            next_buffer_id: 1,
            listener: Listener::default(),
            scene_ready: false,
            master_gain: 1.0,
            length_unit: LengthUnit::Meter,
        }
    }
}

/// The engine. Create one, `startup` it, upload buffers, attach them to
/// sources and play. All handles are plain integers; 0 is never issued and
/// means "none".
pub struct AuricaEngine {
    backend: Box<dyn Backend>,
    state: Arc<Mutex<EngineState>>,
    running: Arc<AtomicBool>,
    mix_thread: Option<JoinHandle<()>>,
    started: bool,
    output_sample_rate: u32,
    output_channels: u16,
    frame_count: usize,
    event_tx: Sender<AuricaEvent>,
    event_rx: Receiver<AuricaEvent>,
}

impl AuricaEngine {
    /// Pick the device backend for this process. `enable_audio = false`
    /// selects the silent backend; so does running under WSL, which has no
    /// real audio service.
    pub fn new(enable_audio: bool) -> Self {
        let (event_tx, event_rx) = crossbeam_channel::bounded(EVENT_QUEUE_CAPACITY);
        Self {
            backend: backend::select_backend(enable_audio),
            state: Arc::new(Mutex::new(EngineState::new())),
            running: Arc::new(AtomicBool::new(false)),
            mix_thread: None,
            started: false,
            output_sample_rate: 0,
            output_channels: 0,
            frame_count: 0,
            event_tx,
            event_rx,
        }
    }

    /// Initialize the device and spawn the mix thread. On failure nothing
    /// is spawned and the engine stays down.
    pub fn startup(&mut self, desc: EngineDesc) -> Result<()> {
        if self.started {
            return Ok(());
        }

        let request = StreamRequest {
            sample_rate: desc.sample_rate,
            channels: desc.channels,
            exclusive_if_possible: desc.exclusive_if_possible,
            verbose: desc.verbose,
        };
        if let Err(e) = self.backend.startup(&request) {
            log::error!("failed to initialize the audio device: {e}");
            return Err(e);
        }

        self.output_sample_rate = self.backend.sample_rate();
        self.output_channels = self.backend.num_channels();
        if self.output_sample_rate == 0 || self.output_channels == 0 {
            self.backend.shutdown();
            return Err(AuricaError::Device(
                "backend reported a degenerate stream format".into(),
            ));
        }
        self.frame_count = match self.backend.buffer_size_frames() {
            0 => FALLBACK_FRAMES,
            frames => frames,
        };

        if desc.verbose {
            log::info!(
                "engine initialized: {} Hz, {} output channels, {} frames per mix",
                self.output_sample_rate,
                self.output_channels,
                self.frame_count
            );
        }

        self.running.store(true, Ordering::SeqCst);
        let state = self.state.clone();
        let running = self.running.clone();
        let ring = self.backend.ring();
        let events = self.event_tx.clone();
        let frame_count = self.frame_count;
        let channels = self.output_channels;
        let sample_rate = self.output_sample_rate;
        let spawned = std::thread::Builder::new()
            .name("aurica-mix".into())
            .spawn(move || {
                mix_thread_loop(state, ring, events, running, frame_count, channels, sample_rate)
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.backend.shutdown();
                return Err(AuricaError::Engine(format!(
                    "failed to spawn mix thread: {e}"
                )));
            }
        };
        self.mix_thread = Some(thread);
        self.started = true;
        Ok(())
    }

    /// Stop the mix thread and tear the backend down. Safe to call twice;
    /// also runs on drop.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.mix_thread.take() {
            if thread.join().is_err() {
                log::error!("mix thread panicked during shutdown");
            }
        }
        self.backend.shutdown();
        if self.started {
            log::debug!("engine shut down");
        }
        self.started = false;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Negotiated output rate; 0 before a successful `startup`.
    pub fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate
    }

    pub fn num_output_channels(&self) -> u16 {
        self.output_channels
    }

    pub fn num_bits_per_sample(&self) -> u16 {
        self.backend.bit_format()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn print_backend_name(&self) {
        println!("{}", self.backend.name());
    }

    /// Gain applied on top of every source's own gain.
    pub fn set_master_gain(&self, gain: f32) -> bool {
        if !gain.is_finite() || gain < 0.0 {
            return false;
        }
        self.state().master_gain = gain;
        true
    }

    pub fn get_master_gain(&self) -> f32 {
        self.state().master_gain
    }

    /// Drain every playback event queued since the last poll: sources that
    /// completed, looped, or were detached from a destroyed buffer.
    pub fn poll_events(&self) -> Vec<AuricaEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    // --- buffers ---------------------------------------------------------

    pub fn create_buffer(&self) -> BufferId {
        let mut state = self.state();
        let id = state.next_buffer_id;
        state.next_buffer_id += 1;
        state.buffers.insert(id, AudioBuffer::default());
        id
    }

    pub fn destroy_buffer(&self, buffer: BufferId) -> bool {
        self.state().buffers.remove(&buffer).is_some()
    }

    pub fn get_buffer_frames(&self, buffer: BufferId) -> Option<usize> {
        self.state().buffers.get(&buffer).map(AudioBuffer::frames)
    }

    pub fn get_buffer_channels(&self, buffer: BufferId) -> Option<u16> {
        self.state().buffers.get(&buffer).map(AudioBuffer::channels)
    }

    pub fn get_buffer_sample_rate(&self, buffer: BufferId) -> Option<u32> {
        self.state().buffers.get(&buffer).map(AudioBuffer::sample_rate)
    }

    /// Uploaded duration in seconds, `None` for unknown or empty handles.
    pub fn get_buffer_duration(&self, buffer: BufferId) -> Option<f64> {
        let state = self.state();
        let buf = state.buffers.get(&buffer)?;
        if !buf.is_uploaded() {
            return None;
        }
        Some(buf.frames() as f64 / buf.sample_rate() as f64)
    }

    pub fn set_buffer_data_8u(
        &self,
        buffer: BufferId,
        data: &[u8],
        channels: u16,
        sample_rate: u32,
    ) -> bool {
        self.upload(buffer, sample::convert_u8(data), channels, sample_rate)
    }

    pub fn set_buffer_data_8s(
        &self,
        buffer: BufferId,
        data: &[i8],
        channels: u16,
        sample_rate: u32,
    ) -> bool {
        self.upload(buffer, sample::convert_i8(data), channels, sample_rate)
    }

    pub fn set_buffer_data_16s(
        &self,
        buffer: BufferId,
        data: &[i16],
        channels: u16,
        sample_rate: u32,
    ) -> bool {
        self.upload(buffer, sample::convert_i16(data), channels, sample_rate)
    }

    pub fn set_buffer_data_32f(
        &self,
        buffer: BufferId,
        data: &[f32],
        channels: u16,
        sample_rate: u32,
    ) -> bool {
        self.upload(buffer, sample::convert_f32(data), channels, sample_rate)
    }

    fn upload(
        &self,
        id: BufferId,
        samples: Vec<crate::sample::Sample>,
        channels: u16,
        sample_rate: u32,
    ) -> bool {
        let mut state = self.state();
        if !state.buffers.contains_key(&id) {
            return false;
        }
        match AudioBuffer::new(samples, channels, sample_rate) {
            Ok(buffer) => {
                state.buffers.insert(id, buffer);
                true
            }
            Err(e) => {
                log::warn!("buffer {id}: upload rejected: {e}");
                false
            }
        }
    }

    // --- sources ---------------------------------------------------------

    pub fn create_source(&self) -> SourceId {
        let mut state = self.state();
        let id = state.next_source_id;
        state.next_source_id += 1;
        state.sources.insert(id, Source::new());
        id
    }

    pub fn destroy_source(&self, source: SourceId) -> bool {
        self.state().sources.remove(&source).is_some()
    }

    /// Attach a buffer: stops playback, clears pause, rewinds.
    pub fn attach_buffer_to_source(&self, source: SourceId, buffer: BufferId) -> bool {
        let mut state = self.state();
        if buffer != 0 && !state.buffers.contains_key(&buffer) {
            return false;
        }
        match state.sources.get_mut(&source) {
            Some(src) => {
                src.attach(buffer);
                true
            }
            None => false,
        }
    }

    pub fn detach_buffer_from_source(&self, source: SourceId) -> bool {
        self.with_source(source, Source::detach).is_some()
    }

    /// Start playback. A paused source resumes; anything else rewinds to
    /// the top, including a source that is already playing.
    pub fn play_source(&self, source: SourceId) -> bool {
        self.with_source(source, Source::play).is_some()
    }

    pub fn pause_source(&self, source: SourceId) -> bool {
        self.with_source(source, Source::pause).is_some()
    }

    pub fn resume_source(&self, source: SourceId) -> bool {
        self.with_source(source, Source::resume).is_some()
    }

    /// Stop playback and rewind.
    pub fn stop_source(&self, source: SourceId) -> bool {
        self.with_source(source, Source::stop).is_some()
    }

    pub fn is_source_playing(&self, source: SourceId) -> Option<bool> {
        self.with_source(source, |s| s.playing)
    }

    pub fn is_source_paused(&self, source: SourceId) -> Option<bool> {
        self.with_source(source, |s| s.paused)
    }

    /// Stop and rewind every source.
    pub fn stop_all_sources(&self) {
        for source in self.state().sources.values_mut() {
            source.stop();
        }
    }

    /// The playback cursor in buffer frames (fractional).
    pub fn get_source_play_position(&self, source: SourceId) -> Option<f64> {
        self.with_source(source, |s| s.play_pos)
    }

    /// The playback cursor in seconds; `None` without an uploaded buffer.
    pub fn get_source_play_time(&self, source: SourceId) -> Option<f64> {
        let state = self.state();
        let src = state.sources.get(&source)?;
        let buffer = state.buffers.get(&src.buffer_id)?;
        if !buffer.is_uploaded() {
            return None;
        }
        Some(src.play_pos / buffer.sample_rate() as f64)
    }

    pub fn set_source_gain(&self, source: SourceId, gain: f32) -> bool {
        if !gain.is_finite() || gain < 0.0 {
            return false;
        }
        self.with_source(source, |s| s.gain = gain).is_some()
    }

    pub fn get_source_gain(&self, source: SourceId) -> Option<f32> {
        self.with_source(source, |s| s.gain)
    }

    /// Set gain from a decibel value: `gain = 10^(dB/20)`.
    pub fn set_source_volume_db(&self, source: SourceId, db: f32) -> bool {
        if !db.is_finite() {
            return false;
        }
        self.with_source(source, |s| s.gain = source::gain_from_db(db))
            .is_some()
    }

    pub fn get_source_volume_db(&self, source: SourceId) -> Option<f32> {
        self.with_source(source, |s| source::db_from_gain(s.gain))
    }

    /// Set gain from a fader position `v ∈ [0, 1]` over a tapered dB ramp
    /// ending `min_db` down at `v = 0`. A taper of 1 is a straight ramp.
    pub fn set_source_volume_slider(
        &self,
        source: SourceId,
        v: f32,
        min_db: f32,
        taper: f32,
    ) -> bool {
        if !v.is_finite() || !min_db.is_finite() || !taper.is_finite() {
            return false;
        }
        if min_db >= 0.0 || taper <= 0.0 {
            return false;
        }
        self.with_source(source, |s| s.gain = source::gain_from_slider(v, min_db, taper))
            .is_some()
    }

    pub fn get_source_volume_slider(
        &self,
        source: SourceId,
        min_db: f32,
        taper: f32,
    ) -> Option<f32> {
        if min_db >= 0.0 || taper <= 0.0 {
            return None;
        }
        self.with_source(source, |s| source::slider_from_gain(s.gain, min_db, taper))
    }

    pub fn set_source_pitch(&self, source: SourceId, pitch: f32) -> bool {
        if !pitch.is_finite() || pitch <= 0.0 {
            return false;
        }
        self.with_source(source, |s| s.pitch = pitch).is_some()
    }

    pub fn get_source_pitch(&self, source: SourceId) -> Option<f32> {
        self.with_source(source, |s| s.pitch)
    }

    pub fn set_source_looping(&self, source: SourceId, looping: bool) -> bool {
        self.with_source(source, |s| s.looping = looping).is_some()
    }

    pub fn get_source_looping(&self, source: SourceId) -> Option<bool> {
        self.with_source(source, |s| s.looping)
    }

    /// Pan a stereo buffer: 0 is full left, 1 full right. Ignored by the
    /// mixer for mono buffers.
    pub fn set_source_panning(&self, source: SourceId, pan: f32) -> bool {
        if !pan.is_finite() || !(0.0..=1.0).contains(&pan) {
            return false;
        }
        self.with_source(source, |s| s.pan = Some(pan)).is_some()
    }

    pub fn reset_source_panning(&self, source: SourceId) -> bool {
        self.with_source(source, |s| s.pan = None).is_some()
    }

    /// The pan position, `None` when unknown or never set.
    pub fn get_source_panning(&self, source: SourceId) -> Option<f32> {
        self.with_source(source, |s| s.pan).flatten()
    }

    // --- positional audio ------------------------------------------------

    /// Initialize the 3D scene: sizes the listener to one emitter per
    /// output channel. Requires a successful `startup` first. Until this
    /// is called every source mixes flat, whatever its 3D flag says.
    pub fn init_3d_scene(&self) -> bool {
        if !self.started {
            return false;
        }
        let channels = self.output_channels as usize;
        let mut state = self.state();
        state.listener.spatial.set_num_channels(channels);
        state.scene_ready = true;
        true
    }

    pub fn is_3d_scene_initialized(&self) -> bool {
        self.state().scene_ready
    }

    /// Toggle positional mixing for a source. Enabling sizes the source's
    /// emitter list to the attached buffer's channel count.
    pub fn enable_source_3d_audio(&self, source: SourceId, enable: bool) -> bool {
        let mut state = self.state();
        let EngineState {
            sources, buffers, ..
        } = &mut *state;
        let Some(src) = sources.get_mut(&source) else {
            return false;
        };
        if enable {
            let channels = buffers
                .get(&src.buffer_id)
                .filter(|b| b.is_uploaded())
                .map(|b| b.channels() as usize)
                .unwrap_or(1);
            if src.spatial.num_channels() != channels {
                src.spatial.set_num_channels(channels);
            }
        }
        src.spatial.set_enabled(enable);
        true
    }

    pub fn is_source_3d_audio_enabled(&self, source: SourceId) -> Option<bool> {
        self.with_source(source, |s| s.spatial.enabled())
    }

    /// Pose one source channel emitter directly.
    pub fn set_source_3d_state_channel(
        &self,
        source: SourceId,
        channel: usize,
        rotation: Mat3,
        position: Vec3,
        velocity: Vec3,
    ) -> bool {
        if !rotation.is_finite() || !position.is_finite() || !velocity.is_finite() {
            return false;
        }
        self.with_source(source, |s| {
            s.spatial.set_channel_state(channel, rotation, position, velocity)
        })
        .unwrap_or(false)
    }

    pub fn get_source_3d_state_channel(
        &self,
        source: SourceId,
        channel: usize,
    ) -> Option<(Mat3, Vec3, Vec3)> {
        self.with_source(source, |s| s.spatial.channel_state(channel))
            .flatten()
    }

    /// Pose every source channel from one rigid-body state. The offsets
    /// list must match the attached buffer's channel count; the emitter
    /// list is resized to it, which also absorbs a buffer channel change.
    pub fn set_source_3d_state(
        &self,
        source: SourceId,
        transform: Mat4,
        velocity_world: Vec3,
        angular_velocity_local: Vec3,
        channel_offsets_local: &[Vec3],
    ) -> bool {
        if !rigid_state_is_finite(
            transform,
            velocity_world,
            angular_velocity_local,
            channel_offsets_local,
        ) {
            return false;
        }
        let mut state = self.state();
        let EngineState {
            sources, buffers, ..
        } = &mut *state;
        let Some(src) = sources.get_mut(&source) else {
            return false;
        };
        if let Some(buffer) = buffers.get(&src.buffer_id) {
            if buffer.is_uploaded() && buffer.channels() as usize != channel_offsets_local.len() {
                log::debug!(
                    "source {source}: {} channel offsets against a {}-channel buffer",
                    channel_offsets_local.len(),
                    buffer.channels()
                );
                return false;
            }
        }
        src.spatial.apply_rigid_state(
            transform,
            velocity_world,
            angular_velocity_local,
            channel_offsets_local,
        );
        true
    }

    /// Pose one listener ear directly.
    pub fn set_listener_3d_state_channel(
        &self,
        channel: usize,
        rotation: Mat3,
        position: Vec3,
        velocity: Vec3,
    ) -> bool {
        if !rotation.is_finite() || !position.is_finite() || !velocity.is_finite() {
            return false;
        }
        self.state()
            .listener
            .spatial
            .set_channel_state(channel, rotation, position, velocity)
    }

    pub fn get_listener_3d_state_channel(&self, channel: usize) -> Option<(Mat3, Vec3, Vec3)> {
        self.state().listener.spatial.channel_state(channel)
    }

    /// Pose every listener ear from one rigid-body state. After
    /// `init_3d_scene` the offsets list must match the output channel
    /// count.
    pub fn set_listener_3d_state(
        &self,
        transform: Mat4,
        velocity_world: Vec3,
        angular_velocity_local: Vec3,
        channel_offsets_local: &[Vec3],
    ) -> bool {
        if !rigid_state_is_finite(
            transform,
            velocity_world,
            angular_velocity_local,
            channel_offsets_local,
        ) {
            return false;
        }
        let mut state = self.state();
        let expected = state.listener.spatial.num_channels();
        if expected != 0 && channel_offsets_local.len() != expected {
            return false;
        }
        state.listener.spatial.apply_rigid_state(
            transform,
            velocity_world,
            angular_velocity_local,
            channel_offsets_local,
        );
        true
    }

    /// Positional state is stored in one global unit, meters by default.
    /// Pick the unit before populating the scene; existing values are not
    /// rescaled.
    pub fn set_global_length_unit(&self, unit: LengthUnit) {
        self.state().length_unit = unit;
    }

    pub fn get_global_length_unit(&self) -> LengthUnit {
        self.state().length_unit
    }

    /// [`set_source_3d_state`](Self::set_source_3d_state) with the lengths
    /// (transform translation, velocity, channel offsets) expressed in
    /// `unit` instead of the global unit.
    pub fn set_source_3d_state_with_unit(
        &self,
        source: SourceId,
        transform: Mat4,
        velocity_world: Vec3,
        angular_velocity_local: Vec3,
        channel_offsets_local: &[Vec3],
        unit: Option<LengthUnit>,
    ) -> bool {
        let (transform, velocity, offsets) = self.lengths_to_global(
            transform,
            velocity_world,
            channel_offsets_local,
            unit,
        );
        self.set_source_3d_state(source, transform, velocity, angular_velocity_local, &offsets)
    }

    /// [`set_listener_3d_state`](Self::set_listener_3d_state) with lengths
    /// expressed in `unit` instead of the global unit.
    pub fn set_listener_3d_state_with_unit(
        &self,
        transform: Mat4,
        velocity_world: Vec3,
        angular_velocity_local: Vec3,
        channel_offsets_local: &[Vec3],
        unit: Option<LengthUnit>,
    ) -> bool {
        let (transform, velocity, offsets) = self.lengths_to_global(
            transform,
            velocity_world,
            channel_offsets_local,
            unit,
        );
        self.set_listener_3d_state(transform, velocity, angular_velocity_local, &offsets)
    }

    fn lengths_to_global(
        &self,
        transform: Mat4,
        velocity_world: Vec3,
        channel_offsets_local: &[Vec3],
        unit: Option<LengthUnit>,
    ) -> (Mat4, Vec3, Vec<Vec3>) {
        let to = Some(self.get_global_length_unit());
        let mut transform = transform;
        let translation = spatial::convert_vec(transform.w_axis.truncate(), unit, to);
        transform.w_axis = translation.extend(transform.w_axis.w);
        let velocity = spatial::convert_vec(velocity_world, unit, to);
        let offsets = channel_offsets_local
            .iter()
            .map(|offset| spatial::convert_vec(*offset, unit, to))
            .collect();
        (transform, velocity, offsets)
    }

    /// Set the distance falloff coefficients `1/(c + l·d + q·d²)`. Sets
    /// producing a non-finite or numerically extreme attenuation at the
    /// minimum distance are rejected.
    pub fn set_source_falloff(
        &self,
        source: SourceId,
        constant: f32,
        linear: f32,
        quadratic: f32,
    ) -> bool {
        if !constant.is_finite() || !linear.is_finite() || !quadratic.is_finite() {
            return false;
        }
        self.with_source(source, |s| {
            s.falloff.set_coefficients(constant, linear, quadratic)
        })
        .unwrap_or(false)
    }

    pub fn get_source_falloff(&self, source: SourceId) -> Option<(f32, f32, f32)> {
        self.with_source(source, |s| {
            (s.falloff.constant, s.falloff.linear, s.falloff.quadratic)
        })
    }

    pub fn set_source_falloff_distances(
        &self,
        source: SourceId,
        min_distance: f32,
        max_distance: f32,
    ) -> bool {
        self.with_source(source, |s| s.falloff.set_distances(min_distance, max_distance))
            .unwrap_or(false)
    }

    pub fn get_source_falloff_distances(&self, source: SourceId) -> Option<(f32, f32)> {
        self.with_source(source, |s| (s.falloff.min_distance, s.falloff.max_distance))
    }

    /// Set the radiation pattern: `alpha ∈ [0, 1]` blends omni toward the
    /// pattern, `sharpness ∈ [1, 8]` is the exponent.
    pub fn set_source_directivity(
        &self,
        source: SourceId,
        pattern: DirectivityPattern,
        alpha: f32,
        sharpness: f32,
    ) -> bool {
        if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
            return false;
        }
        if !sharpness.is_finite() || !(1.0..=8.0).contains(&sharpness) {
            return false;
        }
        self.with_source(source, |s| {
            s.directivity.pattern = pattern;
            s.directivity.alpha = alpha;
            s.directivity.sharpness = sharpness;
        })
        .is_some()
    }

    pub fn get_source_directivity(
        &self,
        source: SourceId,
    ) -> Option<(DirectivityPattern, f32, f32)> {
        self.with_source(source, |s| {
            (s.directivity.pattern, s.directivity.alpha, s.directivity.sharpness)
        })
    }

    pub fn set_source_rear_attenuation(&self, source: SourceId, rear: f32) -> bool {
        if !rear.is_finite() || !(0.0..=1.0).contains(&rear) {
            return false;
        }
        self.with_source(source, |s| s.directivity.rear_attenuation = rear)
            .is_some()
    }

    pub fn get_source_rear_attenuation(&self, source: SourceId) -> Option<f32> {
        self.with_source(source, |s| s.directivity.rear_attenuation)
    }

    /// Speed of sound used for this source's Doppler shift; 0 disables
    /// Doppler entirely.
    pub fn set_source_speed_of_sound(&self, source: SourceId, speed: f32) -> bool {
        if !speed.is_finite() || speed < 0.0 {
            return false;
        }
        self.with_source(source, |s| s.speed_of_sound = speed).is_some()
    }

    pub fn get_source_speed_of_sound(&self, source: SourceId) -> Option<f32> {
        self.with_source(source, |s| s.speed_of_sound)
    }

    /// [`set_source_speed_of_sound`](Self::set_source_speed_of_sound) with
    /// the speed expressed in `unit` per second.
    pub fn set_source_speed_of_sound_with_unit(
        &self,
        source: SourceId,
        speed: f32,
        unit: Option<LengthUnit>,
    ) -> bool {
        let speed = spatial::convert_length(speed, unit, Some(self.get_global_length_unit()));
        self.set_source_speed_of_sound(source, speed)
    }

    pub fn set_source_coordsys_convention(&self, source: SourceId, frame: CoordFrame) -> bool {
        self.with_source(source, |s| s.spatial.set_frame(frame)).is_some()
    }

    pub fn get_source_coordsys_convention(&self, source: SourceId) -> Option<CoordFrame> {
        self.with_source(source, |s| s.spatial.frame())
    }

    pub fn set_listener_coordsys_convention(&self, frame: CoordFrame) {
        self.state().listener.spatial.set_frame(frame);
    }

    pub fn get_listener_coordsys_convention(&self) -> CoordFrame {
        self.state().listener.spatial.frame()
    }

    pub fn set_listener_rear_attenuation(&self, rear: f32) -> bool {
        if !rear.is_finite() || !(0.0..=1.0).contains(&rear) {
            return false;
        }
        self.state().listener.rear_attenuation = rear;
        true
    }

    pub fn get_listener_rear_attenuation(&self) -> f32 {
        self.state().listener.rear_attenuation
    }

    // --- internals -------------------------------------------------------

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_source<R>(&self, id: SourceId, f: impl FnOnce(&mut Source) -> R) -> Option<R> {
        self.state().sources.get_mut(&id).map(f)
    }
}

impl Drop for AuricaEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn rigid_state_is_finite(
    transform: Mat4,
    velocity_world: Vec3,
    angular_velocity_local: Vec3,
    channel_offsets_local: &[Vec3],
) -> bool {
    !channel_offsets_local.is_empty()
        && transform.is_finite()
        && velocity_world.is_finite()
        && angular_velocity_local.is_finite()
        && channel_offsets_local.iter().all(|offset| offset.is_finite())
}

/// One tick: solve the scene (when ready), mix a block under the state
/// lock, then hand the block to the backend ring, publish what happened,
/// and sleep until the next block is due. Wall-clock pacing, not a spin.
fn mix_thread_loop(
    state: Arc<Mutex<EngineState>>,
    ring: Arc<SampleRing>,
    events: Sender<AuricaEvent>,
    running: Arc<AtomicBool>,
    frame_count: usize,
    channels: u16,
    sample_rate: u32,
) {
    let channels = channels as usize;
    let mut block = vec![SILENCE; frame_count * channels];
    let period = Duration::from_secs_f64(frame_count as f64 / sample_rate as f64);
    let mut next_wake = Instant::now();

    log::debug!("mix thread started ({frame_count} frames / {period:?} per tick)");
    while running.load(Ordering::SeqCst) {
        let result = {
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            let EngineState {
                sources,
                buffers,
                listener,
                scene_ready,
                master_gain,
                ..
            } = &mut *state;
            if *scene_ready {
                solver::update_scene(listener, sources);
            }
            mixer::mix_block(
                sources,
                buffers,
                &mut block,
                channels,
                sample_rate,
                *scene_ready,
                *master_gain,
            )
        };
        ring.write(&block);

        // Dropped events are acceptable; the queue only backs up when
        // nobody polls.
        for source in result.completed {
            let _ = events.try_send(AuricaEvent::SourceCompleted { source });
        }
        for source in result.looped {
            let _ = events.try_send(AuricaEvent::SourceLooped { source });
        }
        for (source, buffer) in result.detached {
            let _ = events.try_send(AuricaEvent::SourceDetached { source, buffer });
        }

        next_wake += period;
        let now = Instant::now();
        if next_wake > now {
            std::thread::sleep(next_wake - now);
        } else {
            // Fell behind (debugger, scheduler stall); resynchronize
            // instead of burning a catch-up burst.
            next_wake = now;
        }
    }
    log::debug!("mix thread finished");
}
