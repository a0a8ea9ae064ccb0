//! Tool Invocation Types
//!
//! The shape of a tool request extracted from generated text, and the result
//! object an executor hands back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured request to run a named tool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name
    pub name: String,
    /// Named arguments
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    /// Create an invocation with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// String argument by key
    #[must_use]
    pub fn string_argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    /// Target resource path (`path`, falling back to `file_path`)
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.string_argument("path")
            .or_else(|| self.string_argument("file_path"))
    }

    /// Content argument, if any
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.string_argument("content")
    }
}

/// Completion result of an externally executed tool
///
/// Failures are values, never panics or errors: the session decides how a
/// failed step affects any continuation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Whether the tool succeeded
    pub success: bool,
    /// Resource the tool modified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Resulting content, for file-mutation tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Content before the mutation, for checkpointing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Arbitrary tool output, echoed into continuation prompts
    #[serde(default)]
    pub output: Value,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// A successful outcome carrying free-form output
    pub fn succeeded(output: Value) -> Self {
        Self {
            success: true,
            output,
            ..Default::default()
        }
    }

    /// A failed outcome
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Attach a file mutation (path, original and new content)
    pub fn with_mutation(
        mut self,
        path: impl Into<String>,
        original: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.path = Some(path.into());
        self.original = Some(original.into());
        self.content = Some(content.into());
        self
    }

    /// Whether this outcome describes a recordable file mutation
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        self.success && self.path.is_some() && self.original.is_some() && self.content.is_some()
    }
}
