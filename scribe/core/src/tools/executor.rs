//! Tool Execution Seam
//!
//! The core never runs tools itself. It hands a [`ToolInvocation`] to a
//! [`ToolExecutor`] supplied by the host and consumes the returned
//! [`ToolOutcome`].
//!
//! [`ToolPolicy`] decides which extracted invocations are run automatically
//! and which continue an agentic chain.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::invocation::{ToolInvocation, ToolOutcome};

/// External tool executor
///
/// Implementations may take arbitrarily long or fail; the orchestrator wraps
/// every call in a timeout and converts errors into failed outcomes.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Executor name for logging
    fn name(&self) -> &str {
        "executor"
    }

    /// Run one invocation to completion
    async fn execute(&self, invocation: &ToolInvocation) -> anyhow::Result<ToolOutcome>;
}

/// Which invocations run without asking, and which chain onward
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPolicy {
    /// Run every extracted invocation automatically
    pub auto_run: bool,
    /// Tools that mutate a file and always run
    pub file_mutation_tools: Vec<String>,
    /// Name prefixes of tools whose results feed a follow-up stream
    pub continuation_prefixes: Vec<String>,
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self {
            auto_run: false,
            file_mutation_tools: vec![
                "write_file".to_string(),
                "create_file".to_string(),
                "replace_in_file".to_string(),
            ],
            continuation_prefixes: vec!["sandbox_".to_string()],
        }
    }
}

impl ToolPolicy {
    /// Whether the tool mutates a file
    #[must_use]
    pub fn is_file_mutation(&self, tool: &str) -> bool {
        self.file_mutation_tools.iter().any(|t| t == tool)
    }

    /// Whether a successful run of the tool continues the chain
    #[must_use]
    pub fn is_continuation(&self, tool: &str) -> bool {
        self.continuation_prefixes
            .iter()
            .any(|prefix| tool.starts_with(prefix.as_str()))
    }

    /// Whether the tool may run without user confirmation
    #[must_use]
    pub fn permits(&self, tool: &str) -> bool {
        self.auto_run || self.is_file_mutation(tool) || self.is_continuation(tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        async fn execute(&self, invocation: &ToolInvocation) -> anyhow::Result<ToolOutcome> {
            Ok(ToolOutcome::succeeded(serde_json::Value::String(
                invocation.name.clone(),
            )))
        }
    }

    #[tokio::test]
    async fn test_executor_trait_object() {
        let executor: Box<dyn ToolExecutor> = Box::new(Echo);
        let outcome = executor
            .execute(&ToolInvocation::new("sandbox_list_files"))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output, "sandbox_list_files");
        assert_eq!(executor.name(), "executor");
    }

    #[test]
    fn test_default_policy() {
        let policy = ToolPolicy::default();
        assert!(policy.permits("write_file"));
        assert!(policy.permits("sandbox_exec"));
        assert!(!policy.permits("compose_project"));
        assert!(policy.is_continuation("sandbox_read_file"));
        assert!(!policy.is_continuation("write_file"));
    }

    #[test]
    fn test_auto_run_permits_everything() {
        let policy = ToolPolicy {
            auto_run: true,
            ..Default::default()
        };
        assert!(policy.permits("compose_project"));
    }
}
