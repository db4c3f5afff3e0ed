//! Interleaved sample queue between the mix thread and the device callback.
//!
//! Single producer (the engine's mix thread), single consumer (the
//! backend's render path). The two threads share nothing else; the queue's
//! own mutex is held only long enough to copy samples in or out and never
//! nests with the engine state lock.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::sample::{Sample, SILENCE};

pub struct SampleRing {
    queue: Mutex<VecDeque<Sample>>,
    capacity: usize,
}

impl SampleRing {
    /// Create a ring holding at most `capacity` interleaved samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Capacity for a two-second queue at the given stream format.
    pub fn for_stream(sample_rate: u32, channels: u16) -> Self {
        Self::new(sample_rate as usize * channels as usize * 2)
    }

    /// Enqueue samples. Never blocks; when the queue is full the *oldest*
    /// pending samples are discarded so the freshest audio survives.
    pub fn write(&self, samples: &[Sample]) -> bool {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if samples.len() >= self.capacity {
            // The new block alone overflows the ring; only its tail fits.
            queue.clear();
            queue.extend(&samples[samples.len() - self.capacity..]);
            return true;
        }
        let overflow = (queue.len() + samples.len()).saturating_sub(self.capacity);
        queue.drain(..overflow);
        queue.extend(samples);
        true
    }

    /// Dequeue into `out`, padding with silence when the queue runs dry.
    pub fn drain(&self, out: &mut [Sample]) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        for slot in out.iter_mut() {
            *slot = queue.pop_front().unwrap_or(SILENCE);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
