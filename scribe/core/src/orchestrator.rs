//! Session Orchestrator
//!
//! Async shell around an [`EditSession`]. The session decides; the
//! orchestrator carries out the decisions that need I/O or time:
//!
//! - runs requested tools on the [`ToolExecutor`] with a timeout, feeding the
//!   result back into the session as [`SessionEvent::ToolFinished`]
//! - persists the checkpoint ledger through [`CheckpointStorage`] whenever the
//!   session reports [`SessionMessage::LedgerChanged`]
//! - routes editor content to the [`PlaybackDriver`](crate::playback::PlaybackDriver)
//! - forwards every message to the host
//!
//! # Design Philosophy
//!
//! One task, one dispatch loop. Tools run in their own tasks but report back
//! through a channel into the same loop, so session state is only ever touched
//! from here. A tool result that arrives after its turn was cancelled or
//! superseded is dropped by the session's stale-turn check.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;

use crate::checkpoint::{CheckpointStorage, CheckpointStore};
use crate::events::SessionEvent;
use crate::messages::{SessionMessage, TurnId};
use crate::playback::PlaybackHandle;
use crate::session::{EditSession, SessionSettings};
use crate::tools::{ToolExecutor, ToolInvocation, ToolOutcome};

/// Tool completion channel depth
const TOOL_RESULT_BUFFER: usize = 32;

/// Drives one [`EditSession`] against real collaborators
pub struct Orchestrator<E, S> {
    session: EditSession,
    executor: Arc<E>,
    storage: Arc<S>,
    tool_timeout: Duration,
    playback: Option<PlaybackHandle>,
}

impl<E, S> Orchestrator<E, S>
where
    E: ToolExecutor + 'static,
    S: CheckpointStorage,
{
    /// Wrap an existing session
    pub fn new(
        session: EditSession,
        executor: Arc<E>,
        storage: Arc<S>,
        tool_timeout: Duration,
    ) -> Self {
        Self {
            session,
            executor,
            storage,
            tool_timeout,
            playback: None,
        }
    }

    /// Build a session whose history comes from `storage`
    ///
    /// # Errors
    ///
    /// Fails if the stored ledger cannot be read or decoded.
    pub async fn load(
        settings: SessionSettings,
        executor: Arc<E>,
        storage: Arc<S>,
        tool_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let ledger = storage
            .load()
            .await
            .context("failed to load checkpoint ledger")?;
        let store = CheckpointStore::from_ledger(ledger, settings.checkpoint_capacity);
        tracing::info!(checkpoints = store.len(), "checkpoint history loaded");

        let session = EditSession::with_store(settings, store);
        Ok(Self::new(session, executor, storage, tool_timeout))
    }

    /// Route editor content through a playback driver
    #[must_use]
    pub fn with_playback(mut self, handle: PlaybackHandle) -> Self {
        self.playback = Some(handle);
        self
    }

    /// The session being driven
    #[must_use]
    pub fn session(&self) -> &EditSession {
        &self.session
    }

    /// Run until the event channel closes or the host stops listening
    ///
    /// Returns the session so the host can inspect its final state.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        out: mpsc::Sender<SessionMessage>,
    ) -> EditSession {
        let (tool_tx, mut tool_rx) = mpsc::channel(TOOL_RESULT_BUFFER);

        loop {
            let event = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                Some(finished) = tool_rx.recv() => finished,
            };

            if !self.dispatch(event, &tool_tx, &out).await {
                tracing::debug!("message receiver dropped, stopping orchestrator");
                break;
            }
        }

        tracing::debug!("orchestrator stopped");
        self.session
    }

    /// Apply one event; returns `false` once the host has gone away
    async fn dispatch(
        &mut self,
        event: SessionEvent,
        tool_tx: &mpsc::Sender<SessionEvent>,
        out: &mpsc::Sender<SessionMessage>,
    ) -> bool {
        match &event {
            SessionEvent::EditorOpened { content, .. } => {
                if let Some(playback) = &self.playback {
                    playback.replace(content.clone()).await;
                }
            }
            SessionEvent::Cancel => {
                if let Some(playback) = &self.playback {
                    playback.stop(true).await;
                }
            }
            _ => {}
        }

        for message in self.session.handle(event) {
            self.apply(&message, tool_tx).await;
            if out.send(message).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn apply(&self, message: &SessionMessage, tool_tx: &mpsc::Sender<SessionEvent>) {
        match message {
            SessionMessage::ToolRequested { turn, invocation } => {
                self.spawn_tool(turn.clone(), invocation.clone(), tool_tx.clone());
            }
            SessionMessage::LedgerChanged => {
                let ledger = self.session.store().ledger();
                if let Err(e) = self.storage.save(&ledger).await {
                    tracing::error!(error = %e, "failed to persist checkpoint ledger");
                }
            }
            SessionMessage::AnimateTo { content, .. } => {
                if let Some(playback) = &self.playback {
                    playback.retarget(content.clone()).await;
                }
            }
            SessionMessage::ApplyContent { content, .. } => {
                if let Some(playback) = &self.playback {
                    playback.replace(content.clone()).await;
                }
            }
            _ => {}
        }
    }

    fn spawn_tool(
        &self,
        turn: TurnId,
        invocation: ToolInvocation,
        results: mpsc::Sender<SessionEvent>,
    ) {
        let executor = Arc::clone(&self.executor);
        let limit = self.tool_timeout;

        tokio::spawn(async move {
            let outcome = run_tool(executor.as_ref(), &invocation, limit).await;
            let finished = SessionEvent::ToolFinished {
                turn,
                invocation,
                outcome,
            };
            if results.send(finished).await.is_err() {
                tracing::debug!("orchestrator gone before tool finished");
            }
        });
    }
}

/// Run one invocation, turning errors and timeouts into failed outcomes
pub async fn run_tool<E>(executor: &E, invocation: &ToolInvocation, limit: Duration) -> ToolOutcome
where
    E: ToolExecutor + ?Sized,
{
    tracing::debug!(
        executor = executor.name(),
        tool = %invocation.name,
        "running tool"
    );

    match tokio::time::timeout(limit, executor.execute(invocation)).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::warn!(tool = %invocation.name, error = %e, "tool execution failed");
            ToolOutcome::failed(format!("{e:#}"))
        }
        Err(_) => {
            tracing::warn!(
                tool = %invocation.name,
                timeout_secs = limit.as_secs_f64(),
                "tool execution timed out"
            );
            ToolOutcome::failed(format!("timed out after {}s", limit.as_secs()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        async fn execute(&self, invocation: &ToolInvocation) -> anyhow::Result<ToolOutcome> {
            Ok(ToolOutcome::succeeded(json!(invocation.arguments)))
        }
    }

    struct Broken;

    #[async_trait]
    impl ToolExecutor for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn execute(&self, _invocation: &ToolInvocation) -> anyhow::Result<ToolOutcome> {
            anyhow::bail!("sandbox unavailable")
        }
    }

    struct Hangs;

    #[async_trait]
    impl ToolExecutor for Hangs {
        async fn execute(&self, _invocation: &ToolInvocation) -> anyhow::Result<ToolOutcome> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_run_tool_passes_outcome_through() {
        let invocation = ToolInvocation::new("sandbox_echo").with_argument("x", 1);
        let outcome = run_tool(&Echo, &invocation, Duration::from_secs(1)).await;
        assert!(outcome.success);
        assert_eq!(outcome.output, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_run_tool_error_becomes_failed_outcome() {
        let outcome = run_tool(&Broken, &ToolInvocation::new("x"), Duration::from_secs(1)).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("sandbox unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_tool_timeout_becomes_failed_outcome() {
        let outcome = run_tool(&Hangs, &ToolInvocation::new("x"), Duration::from_secs(5)).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("timed out after 5s"));
    }
}
