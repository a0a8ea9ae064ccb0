//! Session Messages
//!
//! Outputs of an [`EditSession`](crate::session::EditSession): stream
//! requests for the transport, events for the renderer, tool requests for the
//! executor, content for the editor surface, and history notifications.
//!
//! # Design Philosophy
//!
//! The session computes transitions; collaborators apply them. A message is
//! plain data and carries everything its recipient needs, so the same session
//! can drive a UI, a CLI, or a test harness.

use serde::{Deserialize, Serialize};

use crate::checkpoint::Checkpoint;
use crate::streaming::StreamEvent;
use crate::tools::ToolInvocation;

/// Identifier of one request/response turn
///
/// Results tagged with any turn other than the session's current one are
/// stale and discarded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub String);

impl TurnId {
    /// Generate a fresh turn id
    #[must_use]
    pub fn new() -> Self {
        Self(format!("turn_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an agentic chain stopped early
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    /// The configured maximum chain depth was reached
    MaxDepth {
        /// The limit in effect
        limit: u32,
    },
    /// A step of the chain failed
    StepFailed {
        /// Tool that failed
        tool: String,
        /// Failure description
        error: String,
    },
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxDepth { limit } => write!(f, "maximum chain depth {limit} reached"),
            Self::StepFailed { tool, error } => write!(f, "tool {tool} failed: {error}"),
        }
    }
}

/// Messages out of the session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionMessage {
    // ============================================
    // Streaming
    // ============================================
    /// Open a response stream for a turn
    StreamRequested {
        /// Turn the stream belongs to
        turn: TurnId,
        /// Prompt to send
        prompt: String,
        /// Position in an agentic chain (0 for a user prompt)
        depth: u32,
    },

    /// A classified event for the renderer
    Event {
        /// Turn the event belongs to
        turn: TurnId,
        /// The event
        event: StreamEvent,
    },

    /// A turn finished; no further messages for it will follow
    TurnComplete {
        /// The finished turn
        turn: TurnId,
        /// Accumulated answer text of the turn
        text: String,
    },

    /// The running turn was cancelled
    TurnCancelled {
        /// The cancelled turn
        turn: TurnId,
    },

    // ============================================
    // Tools
    // ============================================
    /// Run this invocation and report back with `ToolFinished`
    ToolRequested {
        /// Requesting turn
        turn: TurnId,
        /// What to run
        invocation: ToolInvocation,
    },

    /// An invocation was found but policy requires the user to confirm it
    ToolSuggested {
        /// Turn it was found in
        turn: TurnId,
        /// The invocation
        invocation: ToolInvocation,
    },

    /// An agentic chain stopped
    ChainHalted {
        /// Turn the chain stopped at
        turn: TurnId,
        /// Why
        reason: HaltReason,
    },

    // ============================================
    // Editor Surface
    // ============================================
    /// Animate the open editor toward new content
    AnimateTo {
        /// Resource being animated
        path: String,
        /// Target content
        content: String,
    },

    /// Replace the open editor's content at once
    ApplyContent {
        /// Resource being replaced
        path: String,
        /// New content
        content: String,
    },

    // ============================================
    // History
    // ============================================
    /// A checkpoint was recorded
    CheckpointCreated {
        /// The new checkpoint
        checkpoint: Checkpoint,
    },

    /// A checkpoint was restored
    Restored {
        /// Restored checkpoint
        checkpoint_id: String,
        /// Redo entry that can reverse the restore
        redo_entry_id: String,
        /// Prompt that triggered the restored edit, for re-editing
        trigger_prompt: String,
    },

    /// A redo entry was re-applied
    Redone {
        /// Redo entry applied
        entry_id: String,
        /// Checkpoint whose content is now active
        checkpoint_id: String,
    },

    /// Restore referenced an unknown checkpoint (stale UI)
    CheckpointNotFound {
        /// The unknown id
        checkpoint_id: String,
    },

    /// Redo referenced an unknown entry (stale UI)
    RedoEntryNotFound {
        /// The unknown id
        entry_id: String,
    },

    /// Restore or redo targets a resource that is not open
    TargetMismatch {
        /// Resource the checkpoint applies to
        path: String,
    },

    /// Checkpoint history changed and should be persisted
    LedgerChanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_ids_unique() {
        let a = TurnId::new();
        let b = TurnId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("turn_"));
        assert_eq!(a.to_string(), a.0);
    }

    #[test]
    fn test_halt_reason_display() {
        assert_eq!(
            HaltReason::MaxDepth { limit: 10 }.to_string(),
            "maximum chain depth 10 reached"
        );
        assert_eq!(
            HaltReason::StepFailed {
                tool: "sandbox_exec".into(),
                error: "timeout".into()
            }
            .to_string(),
            "tool sandbox_exec failed: timeout"
        );
    }
}
