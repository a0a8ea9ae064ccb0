//! Scribe Core - Headless Streaming Edit Engine
//!
//! This crate turns a live AI response stream into typed events, extracts the
//! tool calls embedded in answer text, keeps a bounded undo/redo history of
//! AI-authored file edits, and animates an editor buffer toward new content.
//! It has no UI and no network code; hosts supply those as collaborators.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  fragments   ┌─────────────────────────────────────────────┐
//! │  Transport   │─────────────▶│                 EditSession                 │
//! └──────────────┘              │  ┌──────────────┐   ┌───────────────────┐   │
//!                               │  │ FrameDecoder │──▶│  EventClassifier  │   │
//! ┌──────────────┐  user events │  └──────────────┘   └─────────┬─────────┘   │
//! │   UI / Host  │─────────────▶│                               ▼             │
//! └──────▲───────┘              │  ┌──────────────────┐  ┌─────────────────┐  │
//!        │                      │  │ ToolCallExtractor│  │ CheckpointStore │  │
//!        │ SessionMessage       │  └──────────────────┘  └─────────────────┘  │
//!        │                      └──────────────────────┬──────────────────────┘
//!        │                                             │
//!        │                      ┌──────────────────────┴──────────────────────┐
//!        └──────────────────────│                Orchestrator                 │
//!                               │  ToolExecutor · CheckpointStorage · Playback │
//!                               └─────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`EditSession`]: per-session context; pure `SessionEvent -> SessionMessage` dispatch
//! - [`Orchestrator`]: async loop running tools, persisting history, driving playback
//! - [`FrameDecoder`]: reassembles `data:` payloads from arbitrary fragments
//! - [`EventClassifier`]: maps payloads to [`StreamEvent`]s
//! - [`ToolCallExtractor`]: finds a [`ToolInvocation`] in free-form answer text
//! - [`CheckpointStore`]: bounded undo list with a redo stack
//! - [`build_plan`] / [`PlaybackDriver`]: tail-edit animation between two buffers
//!
//! # Quick Start
//!
//! ```
//! use scribe_core::{EditSession, SessionEvent, SessionMessage};
//!
//! let mut session = EditSession::default();
//! let turn = match session
//!     .handle(SessionEvent::UserPrompt { prompt: "hi".into() })
//!     .remove(0)
//! {
//!     SessionMessage::StreamRequested { turn, .. } => turn,
//!     other => panic!("unexpected {other:?}"),
//! };
//!
//! session.handle(SessionEvent::Fragment {
//!     turn: turn.clone(),
//!     text: "data: {\"text\":\"hello\"}\n\n".into(),
//! });
//! let done = session.handle(SessionEvent::StreamClosed { turn });
//! assert!(matches!(done.last(), Some(SessionMessage::TurnComplete { text, .. }) if text == "hello"));
//! ```
//!
//! # Module Overview
//!
//! - [`streaming`]: frame decoding and event classification
//! - [`tools`]: invocation model, extraction, executor seam and policy
//! - [`checkpoint`]: checkpoint history and its durable ledger
//! - [`playback`]: diff plans, scheduling and the timed driver
//! - [`events`]: inputs to a session
//! - [`messages`]: outputs of a session
//! - [`session`]: the per-session context object
//! - [`orchestrator`]: async collaborator wiring
//! - [`config`]: TOML/env configuration
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checkpoint;
pub mod config;
pub mod events;
pub mod messages;
pub mod orchestrator;
pub mod playback;
pub mod session;
pub mod streaming;
pub mod tools;

// Streaming exports
pub use streaming::{
    ActivityDetail, ActivityNotice, EventClassifier, EventKind, FrameDecoder, StreamEvent,
    ToolExecutionNotice, ToolExecutionStatus,
};

// Tool exports
pub use tools::{
    ArgumentKind, ArgumentRule, ToolCallExtractor, ToolExecutor, ToolInvocation, ToolOutcome,
    ToolPolicy,
};

// Checkpoint exports
pub use checkpoint::{
    normalize_resource_path, Checkpoint, CheckpointLedger, CheckpointStorage, CheckpointStore,
    JsonFileStorage, MemoryStorage, RedoEntry, RedoOutcome, RestoreOutcome, StorageError,
};

// Playback exports
pub use playback::{
    build_plan, PlaybackCommand, PlaybackDriver, PlaybackFrame, PlaybackHandle, PlaybackPlan,
    PlaybackScheduler, PlaybackTiming,
};

// Session exports
pub use events::SessionEvent;
pub use messages::{HaltReason, SessionMessage, TurnId};
pub use orchestrator::Orchestrator;
pub use session::{EditSession, OpenResource, SessionSettings};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, ScribeConfig, ScribeToml,
};
