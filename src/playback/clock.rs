//! Wall-clock to frame index mapping.

/// Clock state: either waiting for the first tick or running from a latched start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    #[default]
    NotStarted,
    Running {
        start_ms: u64,
    },
}

/// Selects the frame to display from the current time.
///
/// The first query after a reset latches the start time. Without looping the
/// clock holds on the last frame forever once it gets there.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    state: ClockState,
    looping: bool,
}

impl PlaybackClock {
    pub fn new(looping: bool) -> Self {
        Self {
            state: ClockState::NotStarted,
            looping,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Return to `NotStarted`; the next query re-latches the start time.
    pub fn reset(&mut self) {
        if self.state != ClockState::NotStarted {
            tracing::debug!("Playback clock reset");
        }
        self.state = ClockState::NotStarted;
    }

    /// Frame index for `now_ms`, within `[0, frame_count - 1]`.
    pub fn current_frame_index(&mut self, frame_count: usize, fps: f64, now_ms: u64) -> usize {
        let start_ms = match self.state {
            ClockState::NotStarted => {
                tracing::debug!("Playback clock latched at {} ms", now_ms);
                self.state = ClockState::Running { start_ms: now_ms };
                now_ms
            }
            ClockState::Running { start_ms } => start_ms,
        };

        if frame_count == 0 {
            return 0;
        }

        let elapsed = now_ms.saturating_sub(start_ms) as f64;
        let raw = (elapsed * fps / 1000.0).floor();
        // `as` saturates, so an infinite position holds the last frame
        let raw = if raw > 0.0 { raw as usize } else { 0 };

        if self.looping {
            raw % frame_count
        } else {
            raw.min(frame_count - 1)
        }
    }
}
