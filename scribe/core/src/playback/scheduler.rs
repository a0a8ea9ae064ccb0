//! Playback Scheduler
//!
//! Pure state of one animated buffer: what is displayed, where it is heading,
//! and which snapshots remain. It never sleeps and never touches an editor;
//! callers ask for the next step and apply it themselves. The timed loop lives
//! in [`PlaybackDriver`](super::PlaybackDriver).

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;

use super::plan::{build_plan, PlaybackTiming};

/// One snapshot to display, and how long to wait before the next one
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackStep {
    /// Buffer content to display
    pub snapshot: String,
    /// Pause before the following step
    pub delay: Duration,
    /// Snapshots still queued after this one
    pub remaining: usize,
}

/// Queue of pending snapshots for one buffer
#[derive(Clone, Debug)]
pub struct PlaybackScheduler {
    timing: PlaybackTiming,
    displayed: String,
    target: String,
    queue: VecDeque<String>,
}

impl PlaybackScheduler {
    /// Start idle, showing `initial`
    pub fn new(initial: impl Into<String>, timing: PlaybackTiming) -> Self {
        let initial = initial.into();
        Self {
            timing: timing.sanitized(),
            target: initial.clone(),
            displayed: initial,
            queue: VecDeque::new(),
        }
    }

    /// Head toward a new target
    ///
    /// Any remaining snapshots are discarded and a fresh plan is computed from
    /// the buffer as currently displayed, which may be a partial snapshot of
    /// an earlier plan. Returns the number of queued snapshots.
    pub fn retarget(&mut self, target: impl Into<String>) -> usize {
        let target = target.into();
        let plan = build_plan(&self.displayed, &target, &self.timing);
        if !self.queue.is_empty() {
            tracing::trace!(dropped = self.queue.len(), "retarget discards queued snapshots");
        }
        self.queue = plan.into_snapshots().into();
        self.target = target;
        self.queue.len()
    }

    /// The buffer was replaced outside playback; adopt it without animating
    pub fn replace(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.queue.clear();
        self.target = content.clone();
        self.displayed = content;
    }

    /// Pop the next snapshot and mark it displayed
    pub fn next_step<R: Rng>(&mut self, rng: &mut R) -> Option<PlaybackStep> {
        let snapshot = self.queue.pop_front()?;
        self.displayed.clone_from(&snapshot);
        Some(PlaybackStep {
            snapshot,
            delay: self.timing.sample_delay(rng),
            remaining: self.queue.len(),
        })
    }

    /// Stop playback
    ///
    /// Without `flush` the partially played buffer stays displayed. With
    /// `flush` the target is applied at once; the returned content must be
    /// shown by the caller.
    pub fn stop(&mut self, flush: bool) -> Option<String> {
        self.queue.clear();
        if flush && self.displayed != self.target {
            self.displayed.clone_from(&self.target);
            return Some(self.target.clone());
        }
        if !flush {
            self.target.clone_from(&self.displayed);
        }
        None
    }

    /// Buffer as currently displayed
    #[must_use]
    pub fn displayed(&self) -> &str {
        &self.displayed
    }

    /// Buffer playback is heading toward
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether snapshots remain
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Number of queued snapshots
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Timing in effect
    #[must_use]
    pub fn timing(&self) -> &PlaybackTiming {
        &self.timing
    }
}
