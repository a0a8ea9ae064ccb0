//! Streaming Decode Pipeline
//!
//! Turns a live, chunked response channel into typed events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  fragments   ┌──────────────┐  payloads   ┌─────────────────┐
//! │  Transport   │ ───────────▶ │ FrameDecoder │ ──────────▶ │ EventClassifier │
//! │ (collaborator)│             │  (buffered)  │             │   (stateless)   │
//! └──────────────┘              └──────────────┘             └────────┬────────┘
//!                                                                     │
//!                                                                     ▼
//!                                                              StreamEvent
//! ```
//!
//! # Example
//!
//! ```
//! use scribe_core::streaming::{EventClassifier, FrameDecoder, StreamEvent};
//!
//! let mut decoder = FrameDecoder::new();
//! let classifier = EventClassifier::new();
//!
//! let mut events = Vec::new();
//! for fragment in ["data: {\"text\":\"he", "llo\"}\n\n"] {
//!     for payload in decoder.feed(fragment) {
//!         events.extend(classifier.classify(&payload));
//!     }
//! }
//! assert_eq!(events, vec![StreamEvent::text("hello")]);
//! ```

pub mod classify;
pub mod event;
pub mod frame;

pub use classify::{EventClassifier, DEFAULT_SENTINELS};
pub use event::{
    ActivityDetail, ActivityNotice, EventKind, StreamEvent, ToolExecutionNotice,
    ToolExecutionStatus,
};
pub use frame::FrameDecoder;
