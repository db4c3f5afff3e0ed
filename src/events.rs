//! Playback events emitted by the mix thread.
//!
//! Events are queued on a bounded channel and drained by
//! [`poll_events`](crate::AuricaEngine::poll_events); nothing is delivered
//! on user threads unprompted. When nobody polls, the oldest events are
//! simply lost once the queue fills.

use crate::buffer::BufferId;
use crate::source::SourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuricaEvent {
    /// A non-looping source reached the end of its buffer and stopped.
    SourceCompleted { source: SourceId },
    /// A looping source wrapped back to the top at least once this block.
    SourceLooped { source: SourceId },
    /// A source's buffer was destroyed while it played; the source was
    /// detached and stopped.
    SourceDetached { source: SourceId, buffer: BufferId },
}

impl AuricaEvent {
    pub fn source(&self) -> SourceId {
        match self {
            Self::SourceCompleted { source }
            | Self::SourceLooped { source }
            | Self::SourceDetached { source, .. } => *source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_report_their_source() {
        assert_eq!(AuricaEvent::SourceCompleted { source: 3 }.source(), 3);
        assert_eq!(
            AuricaEvent::SourceDetached {
                source: 5,
                buffer: 9
            }
            .source(),
            5
        );
    }
}
