//! Stream Events
//!
//! Typed events produced by the [`EventClassifier`](super::EventClassifier),
//! one per decoded payload. These are what the rendering collaborator
//! consumes.
//!
//! # Design Philosophy
//!
//! Every payload the backend sends lands in exactly one variant. Lifecycle
//! notices (tool progress, errors, activity) get their own variants so the
//! renderer never has to sniff text for them. Anything unrecognized is kept
//! verbatim in [`StreamEvent::Unknown`] for passive display.

use serde::{Deserialize, Serialize};

/// One semantic event decoded from the response channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental answer text
    TextDelta {
        /// Text to append
        text: String,
    },

    /// Incremental reasoning ("thinking") text
    ReasoningDelta {
        /// Reasoning text to append
        text: String,
    },

    /// The backend is doing something other than generating text
    Activity(ActivityNotice),

    /// Server-side tool progress
    ToolExecution(ToolExecutionNotice),

    /// End-of-response summary
    Final {
        /// Pre-rendered answer markup, if the backend supplies one
        html: Option<String>,
        /// Pre-rendered reasoning markup
        reasoning_html: Option<String>,
        /// The answer ended up empty
        content_empty: bool,
    },

    /// Backend-reported error
    Error {
        /// Error message
        message: String,
    },

    /// Parsed but unrecognized payload, forwarded for passive display
    Unknown {
        /// The payload as received
        raw: String,
    },
}

impl StreamEvent {
    /// Convenience constructor for a text delta
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    /// The discriminant of this event
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TextDelta { .. } => EventKind::TextDelta,
            Self::ReasoningDelta { .. } => EventKind::ReasoningDelta,
            Self::Activity(_) => EventKind::Activity,
            Self::ToolExecution(_) => EventKind::ToolExecution,
            Self::Final { .. } => EventKind::Final,
            Self::Error { .. } => EventKind::Error,
            Self::Unknown { .. } => EventKind::Unknown,
        }
    }

    /// Text carried by a text delta, if this is one
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::TextDelta { text } => Some(text),
            _ => None,
        }
    }
}

/// Fieldless discriminant of [`StreamEvent`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// [`StreamEvent::TextDelta`]
    TextDelta,
    /// [`StreamEvent::ReasoningDelta`]
    ReasoningDelta,
    /// [`StreamEvent::Activity`]
    Activity,
    /// [`StreamEvent::ToolExecution`]
    ToolExecution,
    /// [`StreamEvent::Final`]
    Final,
    /// [`StreamEvent::Error`]
    Error,
    /// [`StreamEvent::Unknown`]
    Unknown,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::TextDelta => "text_delta",
            Self::ReasoningDelta => "reasoning_delta",
            Self::Activity => "activity",
            Self::ToolExecution => "tool_execution",
            Self::Final => "final",
            Self::Error => "error",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Activity
// ============================================================================

/// Backend activity marker (web search, page reads, ...)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityNotice {
    /// Activity name as sent by the backend (e.g. `websearch`)
    pub activity: String,
    /// What the activity is doing right now
    pub detail: ActivityDetail,
}

/// Sub-step of an activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityDetail {
    /// Running a search
    Search {
        /// Search query
        query: Option<String>,
    },
    /// Reading a page
    Read {
        /// Domain being read
        domain: Option<String>,
        /// Full URL being read
        url: Option<String>,
    },
    /// Any other activity step
    Other {
        /// The step type as sent, if any
        step: Option<String>,
    },
}

// ============================================================================
// Tool Execution
// ============================================================================

/// Progress of a tool the backend runs on its own side
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionNotice {
    /// Tool name
    pub tool: String,
    /// Lifecycle stage
    pub status: ToolExecutionStatus,
    /// Resource the tool touches, if any
    pub path: Option<String>,
    /// Content before the tool ran
    pub original: Option<String>,
    /// Content after (or while) the tool runs
    pub content: Option<String>,
    /// Success flag reported with completion
    pub success: Option<bool>,
}

/// Lifecycle stage of a server-side tool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolExecutionStatus {
    /// Tool is running
    #[default]
    Executing,
    /// Tool finished
    Completed,
    /// Tool failed
    Failed,
}

impl ToolExecutionStatus {
    /// Parse a backend status string; unknown values count as executing
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "completed" | "complete" | "done" => Self::Completed,
            "failed" | "error" => Self::Failed,
            _ => Self::Executing,
        }
    }
}
