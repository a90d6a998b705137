//! Time-driven playback of an animation onto an avatar.

pub mod clock;
pub mod session;
pub mod slot;

pub use clock::{ClockState, PlaybackClock};
pub use session::{GpuState, PlaybackSession, SessionStatus, TickOutcome};
pub use slot::{AssetSlot, AssetState};
