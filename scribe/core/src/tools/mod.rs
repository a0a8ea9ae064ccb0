//! Tool Invocations
//!
//! Extraction of tool requests from generated text, plus the seam through
//! which a host executes them.
//!
//! # Design Philosophy
//!
//! The core decodes and records; it never decides which tool to call and never
//! executes one. When extraction is unsure it returns nothing, and callers
//! proceed as if no tool was requested.

pub mod executor;
pub mod extract;
pub mod invocation;

pub use executor::{ToolExecutor, ToolPolicy};
pub use extract::{
    default_argument_rules, parse_lenient, ArgumentKind, ArgumentRule, ToolCallExtractor,
    INVOCATION_MARKERS,
};
pub use invocation::{ToolInvocation, ToolOutcome};
