//! Edit Session
//!
//! One explicit context object per active session. It owns the frame decoder,
//! classifier, extractor and checkpoint store for that session, and turns
//! [`SessionEvent`]s into [`SessionMessage`]s.
//!
//! # Design Philosophy
//!
//! `handle` is a pure state transition: no I/O, no timers, no awaiting. The
//! [`Orchestrator`](crate::orchestrator::Orchestrator) or any other host
//! applies the returned messages (opening streams, running tools, animating
//! the editor, persisting the ledger).
//!
//! # Turn Lifecycle
//!
//! ```text
//! UserPrompt ─▶ StreamRequested ─▶ Fragment* ─▶ StreamClosed
//!                                                   │
//!                    ┌──────────── no tool ─────────┤
//!                    ▼                              ▼ tool found
//!              TurnComplete          ToolRequested ─▶ ToolFinished
//!                                                        │
//!                         continuation tool, success ────┤──── otherwise
//!                                   ▼                    ▼
//!                 StreamRequested (depth + 1)      TurnComplete
//! ```
//!
//! Any transport or executor event for a turn other than the current one is
//! stale and dropped.

use serde_json::Value;

use crate::checkpoint::{
    paths_match, Checkpoint, CheckpointStore, RedoOutcome, RestoreOutcome, DEFAULT_CAPACITY,
};
use crate::config::ScribeConfig;
use crate::events::SessionEvent;
use crate::messages::{HaltReason, SessionMessage, TurnId};
use crate::streaming::{
    EventClassifier, FrameDecoder, StreamEvent, ToolExecutionNotice, ToolExecutionStatus,
    DEFAULT_SENTINELS,
};
use crate::tools::{
    default_argument_rules, ArgumentRule, ToolCallExtractor, ToolInvocation, ToolOutcome,
    ToolPolicy,
};

/// Default limit on chained tool continuations
pub const DEFAULT_MAX_CHAIN_DEPTH: u32 = 10;

/// Per-session settings
#[derive(Clone, Debug)]
pub struct SessionSettings {
    /// Checkpoints retained
    pub checkpoint_capacity: usize,
    /// Sentinel end-tokens dropped by the classifier
    pub sentinels: Vec<String>,
    /// Tool gating and continuation policy
    pub policy: ToolPolicy,
    /// Maximum number of chained continuations after a user prompt
    pub max_chain_depth: u32,
    /// Required-argument rules for extracted invocations
    pub argument_rules: Vec<ArgumentRule>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            checkpoint_capacity: DEFAULT_CAPACITY,
            sentinels: DEFAULT_SENTINELS.iter().map(|s| (*s).to_string()).collect(),
            policy: ToolPolicy::default(),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            argument_rules: default_argument_rules(),
        }
    }
}

impl From<&ScribeConfig> for SessionSettings {
    fn from(config: &ScribeConfig) -> Self {
        Self {
            checkpoint_capacity: config.checkpoints.capacity,
            sentinels: config.stream.sentinels.clone(),
            policy: config.agent.policy.clone(),
            max_chain_depth: config.agent.max_chain_depth,
            argument_rules: default_argument_rules(),
        }
    }
}

/// Resource currently open in the editor surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenResource {
    /// Resource path as reported by the editor
    pub path: String,
    /// Last content the session knows the editor holds (or is animating to)
    pub content: String,
}

#[derive(Debug)]
struct ActiveTurn {
    id: TurnId,
    depth: u32,
    text: String,
    streaming: bool,
    awaiting_tool: Option<String>,
}

/// Per-session context and dispatch
#[derive(Debug)]
pub struct EditSession {
    settings: SessionSettings,
    decoder: FrameDecoder,
    classifier: EventClassifier,
    extractor: ToolCallExtractor,
    store: CheckpointStore,
    turn: Option<ActiveTurn>,
    last_prompt: String,
    editor: Option<OpenResource>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl EditSession {
    /// Create a session with empty history
    #[must_use]
    pub fn new(settings: SessionSettings) -> Self {
        let store = CheckpointStore::new(settings.checkpoint_capacity);
        Self::with_store(settings, store)
    }

    /// Create a session around existing history
    #[must_use]
    pub fn with_store(settings: SessionSettings, store: CheckpointStore) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            classifier: EventClassifier::with_sentinels(&settings.sentinels),
            extractor: ToolCallExtractor::with_rules(settings.argument_rules.clone()),
            store,
            turn: None,
            last_prompt: String::new(),
            editor: None,
            settings,
        }
    }

    /// Apply one event and return the resulting messages
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionMessage> {
        match event {
            SessionEvent::UserPrompt { prompt } => {
                self.last_prompt.clone_from(&prompt);
                self.start_turn(prompt, 0)
            }

            SessionEvent::Cancel => self.cancel(),

            SessionEvent::Fragment { turn, text } => {
                if !self.accepts_stream(&turn, "fragment") {
                    return Vec::new();
                }
                let payloads = self.decoder.feed(&text);
                self.process_payloads(&turn, payloads)
            }

            SessionEvent::StreamClosed { turn } => {
                if !self.accepts_stream(&turn, "stream close") {
                    return Vec::new();
                }
                self.close_stream(&turn)
            }

            SessionEvent::ToolFinished {
                turn,
                invocation,
                outcome,
            } => self.tool_finished(turn, invocation, outcome),

            SessionEvent::EditorOpened { path, content } => {
                tracing::debug!(path = %path, "editor opened resource");
                self.editor = Some(OpenResource { path, content });
                Vec::new()
            }

            SessionEvent::EditorClosed => {
                self.editor = None;
                Vec::new()
            }

            SessionEvent::RestoreRequested { checkpoint_id } => self.restore(checkpoint_id),

            SessionEvent::RedoRequested { entry_id } => self.redo(entry_id),
        }
    }

    // ===== Accessors =====

    /// Checkpoint history
    #[must_use]
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Current turn, if any
    #[must_use]
    pub fn current_turn(&self) -> Option<&TurnId> {
        self.turn.as_ref().map(|t| &t.id)
    }

    /// Chain depth of the current turn
    #[must_use]
    pub fn depth(&self) -> Option<u32> {
        self.turn.as_ref().map(|t| t.depth)
    }

    /// Answer text accumulated in the current turn
    #[must_use]
    pub fn accumulated_text(&self) -> Option<&str> {
        self.turn.as_ref().map(|t| t.text.as_str())
    }

    /// Resource open in the editor
    #[must_use]
    pub fn editor(&self) -> Option<&OpenResource> {
        self.editor.as_ref()
    }

    /// Last user prompt
    #[must_use]
    pub fn last_prompt(&self) -> &str {
        &self.last_prompt
    }

    /// Settings in effect
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    // ===== Turns =====

    fn start_turn(&mut self, prompt: String, depth: u32) -> Vec<SessionMessage> {
        if let Some(previous) = self.turn.take() {
            tracing::debug!(turn = %previous.id, "turn superseded");
        }
        self.decoder.clear();

        let id = TurnId::new();
        tracing::info!(turn = %id, depth, "turn started");
        self.turn = Some(ActiveTurn {
            id: id.clone(),
            depth,
            text: String::new(),
            streaming: true,
            awaiting_tool: None,
        });

        vec![SessionMessage::StreamRequested {
            turn: id,
            prompt,
            depth,
        }]
    }

    fn cancel(&mut self) -> Vec<SessionMessage> {
        self.decoder.clear();
        match self.turn.take() {
            Some(turn) => {
                tracing::info!(turn = %turn.id, "turn cancelled");
                vec![SessionMessage::TurnCancelled { turn: turn.id }]
            }
            None => Vec::new(),
        }
    }

    fn finish_turn(&mut self) -> Vec<SessionMessage> {
        match self.turn.take() {
            Some(turn) => {
                tracing::debug!(turn = %turn.id, text_len = turn.text.len(), "turn complete");
                vec![SessionMessage::TurnComplete {
                    turn: turn.id,
                    text: turn.text,
                }]
            }
            None => Vec::new(),
        }
    }

    fn is_current(&self, turn: &TurnId) -> bool {
        self.turn.as_ref().is_some_and(|t| &t.id == turn)
    }

    fn accepts_stream(&self, turn: &TurnId, what: &str) -> bool {
        let streaming = self
            .turn
            .as_ref()
            .is_some_and(|t| &t.id == turn && t.streaming);
        if !streaming {
            tracing::warn!(turn = %turn, what, "discarding stale stream input");
        }
        streaming
    }

    // ===== Streaming =====

    fn process_payloads(&mut self, turn: &TurnId, payloads: Vec<String>) -> Vec<SessionMessage> {
        let mut out = Vec::new();
        for payload in payloads {
            if let Some(event) = self.classifier.classify(&payload) {
                self.process_event(turn, event, &mut out);
            }
        }
        out
    }

    fn process_event(&mut self, turn: &TurnId, event: StreamEvent, out: &mut Vec<SessionMessage>) {
        let notice = match &event {
            StreamEvent::TextDelta { text } => {
                if let Some(active) = self.turn.as_mut() {
                    active.text.push_str(text);
                }
                None
            }
            StreamEvent::ToolExecution(notice) => Some(notice.clone()),
            StreamEvent::Error { message } => {
                tracing::warn!(turn = %turn, error = %message, "backend reported error");
                None
            }
            _ => None,
        };

        out.push(SessionMessage::Event {
            turn: turn.clone(),
            event,
        });
        if let Some(notice) = notice {
            self.server_tool_notice(notice, out);
        }
    }

    fn close_stream(&mut self, turn: &TurnId) -> Vec<SessionMessage> {
        let mut out = Vec::new();
        if let Some(payload) = self.decoder.flush() {
            out.extend(self.process_payloads(turn, vec![payload]));
        }

        let text = match self.turn.as_mut() {
            Some(active) => {
                active.streaming = false;
                active.text.clone()
            }
            None => return out,
        };

        match self.extractor.extract(&text) {
            Some(invocation) if self.settings.policy.permits(&invocation.name) => {
                tracing::info!(turn = %turn, tool = %invocation.name, "tool requested");
                if let Some(active) = self.turn.as_mut() {
                    active.awaiting_tool = Some(invocation.name.clone());
                }
                out.push(SessionMessage::ToolRequested {
                    turn: turn.clone(),
                    invocation,
                });
            }
            Some(invocation) => {
                tracing::info!(turn = %turn, tool = %invocation.name, "tool suggested");
                out.push(SessionMessage::ToolSuggested {
                    turn: turn.clone(),
                    invocation,
                });
                out.extend(self.finish_turn());
            }
            None => out.extend(self.finish_turn()),
        }
        out
    }

    /// Tools the backend runs itself report progress in-band
    fn server_tool_notice(&mut self, notice: ToolExecutionNotice, out: &mut Vec<SessionMessage>) {
        let Some(path) = notice.path else {
            return;
        };

        match notice.status {
            ToolExecutionStatus::Executing => {
                if let Some(content) = notice.content {
                    self.animate_if_open(&path, content, out);
                }
            }
            ToolExecutionStatus::Completed => {
                let content = notice.content.unwrap_or_default();
                if let Some(original) = notice.original {
                    self.record_checkpoint(&path, original, content.clone(), out);
                }
                self.animate_if_open(&path, content, out);
            }
            ToolExecutionStatus::Failed => {
                tracing::warn!(tool = %notice.tool, path = %path, "server-side tool failed");
            }
        }
    }

    // ===== Tools =====

    fn tool_finished(
        &mut self,
        turn: TurnId,
        invocation: ToolInvocation,
        outcome: ToolOutcome,
    ) -> Vec<SessionMessage> {
        let awaiting = self
            .turn
            .as_ref()
            .filter(|t| t.id == turn)
            .and_then(|t| t.awaiting_tool.as_deref());
        if awaiting != Some(invocation.name.as_str()) {
            tracing::warn!(turn = %turn, tool = %invocation.name, "discarding stale tool result");
            return Vec::new();
        }

        let mut out = Vec::new();
        let depth = self.turn.as_ref().map_or(0, |t| t.depth);
        if let Some(active) = self.turn.as_mut() {
            active.awaiting_tool = None;
        }

        if outcome.is_mutation() {
            if let (Some(path), Some(original), Some(content)) =
                (&outcome.path, &outcome.original, &outcome.content)
            {
                self.record_checkpoint(path, original.clone(), content.clone(), &mut out);
                self.animate_if_open(path, content.clone(), &mut out);
            }
        }

        let policy = &self.settings.policy;
        if !policy.is_continuation(&invocation.name) {
            if !outcome.success {
                tracing::warn!(tool = %invocation.name, error = ?outcome.error, "tool failed");
            }
            out.extend(self.finish_turn());
            return out;
        }

        if !outcome.success {
            let reason = HaltReason::StepFailed {
                tool: invocation.name.clone(),
                error: outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            };
            tracing::info!(turn = %turn, reason = %reason, "chain halted");
            out.push(SessionMessage::ChainHalted { turn, reason });
            out.extend(self.finish_turn());
            return out;
        }

        let limit = self.settings.max_chain_depth;
        if depth >= limit {
            let reason = HaltReason::MaxDepth { limit };
            tracing::info!(turn = %turn, reason = %reason, "chain halted");
            out.push(SessionMessage::ChainHalted { turn, reason });
            out.extend(self.finish_turn());
            return out;
        }

        out.extend(self.finish_turn());
        let prompt = continuation_prompt(&invocation.name, &outcome);
        out.extend(self.start_turn(prompt, depth + 1));
        out
    }

    // ===== History =====

    fn record_checkpoint(
        &mut self,
        path: &str,
        original: String,
        content: String,
        out: &mut Vec<SessionMessage>,
    ) {
        let checkpoint =
            Checkpoint::new(path, original, content).with_trigger_prompt(self.last_prompt.clone());
        let checkpoint = self.store.record(checkpoint).clone();
        tracing::info!(checkpoint = %checkpoint.id, path = %path, "checkpoint created");
        out.push(SessionMessage::CheckpointCreated { checkpoint });
        out.push(SessionMessage::LedgerChanged);
    }

    fn animate_if_open(&mut self, path: &str, content: String, out: &mut Vec<SessionMessage>) {
        if let Some(open) = self.editor.as_mut() {
            if paths_match(&open.path, path) {
                open.content.clone_from(&content);
                out.push(SessionMessage::AnimateTo {
                    path: open.path.clone(),
                    content,
                });
            }
        }
    }

    fn active_path(&self) -> &str {
        self.editor.as_ref().map_or("", |e| e.path.as_str())
    }

    fn restore(&mut self, checkpoint_id: String) -> Vec<SessionMessage> {
        let active = self.active_path().to_string();
        match self.store.restore(&checkpoint_id, &active) {
            RestoreOutcome::Restored {
                checkpoint,
                content,
                redo_entry_id,
            } => {
                let mut out = self.apply_content(content);
                out.push(SessionMessage::Restored {
                    checkpoint_id: checkpoint.id,
                    redo_entry_id,
                    trigger_prompt: checkpoint.trigger_prompt,
                });
                out.push(SessionMessage::LedgerChanged);
                out
            }
            RestoreOutcome::NotFound => vec![SessionMessage::CheckpointNotFound { checkpoint_id }],
            RestoreOutcome::TargetMismatch { path } => {
                vec![SessionMessage::TargetMismatch { path }]
            }
        }
    }

    fn redo(&mut self, entry_id: String) -> Vec<SessionMessage> {
        let active = self.active_path().to_string();
        match self.store.redo(&entry_id, &active) {
            RedoOutcome::Redone {
                checkpoint,
                content,
                ..
            } => {
                let mut out = self.apply_content(content);
                out.push(SessionMessage::Redone {
                    entry_id,
                    checkpoint_id: checkpoint.id,
                });
                out.push(SessionMessage::LedgerChanged);
                out
            }
            RedoOutcome::NotFound => vec![SessionMessage::RedoEntryNotFound { entry_id }],
            RedoOutcome::TargetMismatch { path } => vec![SessionMessage::TargetMismatch { path }],
        }
    }

    fn apply_content(&mut self, content: String) -> Vec<SessionMessage> {
        match self.editor.as_mut() {
            Some(open) => {
                open.content.clone_from(&content);
                vec![SessionMessage::ApplyContent {
                    path: open.path.clone(),
                    content,
                }]
            }
            None => Vec::new(),
        }
    }
}

/// Prompt that feeds a tool result back into the next stream of a chain
#[must_use]
pub fn continuation_prompt(tool: &str, outcome: &ToolOutcome) -> String {
    let result = if outcome.output.is_null() {
        serde_json::to_value(outcome).unwrap_or(Value::Null)
    } else {
        outcome.output.clone()
    };
    let rendered = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());

    format!(
        "[TOOL RESULT] Tool \"{tool}\" completed:\n{rendered}\n\n\
         Continue with the next step of your plan. If there are more steps, output the next \
         tool_call JSON. If all steps are complete, provide a brief summary."
    )
}
