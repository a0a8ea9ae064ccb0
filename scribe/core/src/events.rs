//! Session Events
//!
//! Inputs to an [`EditSession`](crate::session::EditSession). Everything
//! that can happen to a session arrives as one of these: user actions from the
//! UI, fragments from the transport, and completions from the tool executor.
//!
//! # Design Philosophy
//!
//! Collaborators report what happened; the session decides what it means.
//! There are no callbacks into the core, only events into one dispatch loop.

use serde::{Deserialize, Serialize};

use crate::messages::TurnId;
use crate::tools::{ToolInvocation, ToolOutcome};

/// Events into the session dispatch loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    // ============================================
    // User Actions
    // ============================================
    /// User submitted a prompt; starts a new turn
    UserPrompt {
        /// Prompt text
        prompt: String,
    },

    /// User cancelled the running turn
    Cancel,

    /// User asked to restore a checkpoint
    RestoreRequested {
        /// Checkpoint to restore
        checkpoint_id: String,
    },

    /// User asked to redo a restore
    RedoRequested {
        /// Redo entry to re-apply
        entry_id: String,
    },

    // ============================================
    // Editor Surface
    // ============================================
    /// A resource is now open in the editor
    EditorOpened {
        /// Resource path
        path: String,
        /// Content as loaded
        content: String,
    },

    /// The editor closed its resource
    EditorClosed,

    // ============================================
    // Transport
    // ============================================
    /// Raw fragment of the response channel for a turn
    Fragment {
        /// Turn the stream belongs to
        turn: TurnId,
        /// Fragment text
        text: String,
    },

    /// The response channel for a turn closed
    StreamClosed {
        /// Turn the stream belongs to
        turn: TurnId,
    },

    // ============================================
    // Tool Executor
    // ============================================
    /// A requested tool finished (successfully or not)
    ToolFinished {
        /// Turn that requested the tool
        turn: TurnId,
        /// The invocation that ran
        invocation: ToolInvocation,
        /// Its result
        outcome: ToolOutcome,
    },
}

impl SessionEvent {
    /// Turn this event belongs to, for transport and executor events
    #[must_use]
    pub fn turn(&self) -> Option<&TurnId> {
        match self {
            Self::Fragment { turn, .. }
            | Self::StreamClosed { turn }
            | Self::ToolFinished { turn, .. } => Some(turn),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_accessor() {
        let turn = TurnId::new();
        let event = SessionEvent::StreamClosed { turn: turn.clone() };
        assert_eq!(event.turn(), Some(&turn));
        assert_eq!(SessionEvent::Cancel.turn(), None);
    }
}
