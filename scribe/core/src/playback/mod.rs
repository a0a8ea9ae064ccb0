//! Diff/Playback Engine
//!
//! Animates a text buffer from its current content to a new target as a
//! sequence of tail edits around the longest common prefix.
//!
//! # Layers
//!
//! - [`build_plan`]: pure snapshot computation
//! - [`PlaybackScheduler`]: pure queue state (retarget, step, stop)
//! - [`PlaybackDriver`]: tokio task adding the timing

pub mod driver;
pub mod plan;
pub mod scheduler;

pub use driver::{PlaybackCommand, PlaybackDriver, PlaybackFrame, PlaybackHandle};
pub use plan::{build_plan, longest_common_prefix, PlaybackPlan, PlaybackTiming};
pub use scheduler::{PlaybackScheduler, PlaybackStep};
