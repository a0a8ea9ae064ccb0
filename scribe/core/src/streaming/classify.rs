//! Event Classifier
//!
//! Maps one decoded payload to at most one [`StreamEvent`].
//!
//! # Priority
//!
//! Payloads are tried as JSON first. A parsed object is checked for
//! lifecycle notices before any text shape, in this order:
//!
//! 1. `toolExecution` notice
//! 2. `error` field
//! 3. `activity` marker
//! 4. `final` summary
//! 5. `reasoning` chunk
//! 6. text shapes: `text`, `choices[0].delta.content`,
//!    `choices[0].message.content`, `choices[0].text`, `result.content`,
//!    bare `content`
//!
//! A payload that does not parse as JSON is a raw text delta. Empty text and
//! sentinel end-tokens (`[DONE]`, `[END]`, case-insensitive) are dropped
//! silently wherever they appear.

use serde_json::{Map, Value};

use super::event::{
    ActivityDetail, ActivityNotice, StreamEvent, ToolExecutionNotice, ToolExecutionStatus,
};

/// Default sentinel tokens that end a stream without carrying content
pub const DEFAULT_SENTINELS: &[&str] = &["[DONE]", "[END]"];

/// Stateless payload classifier
#[derive(Clone, Debug)]
pub struct EventClassifier {
    /// Upper-cased sentinel tokens
    sentinels: Vec<String>,
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::with_sentinels(DEFAULT_SENTINELS.iter().copied())
    }
}

impl EventClassifier {
    /// Create a classifier with the default sentinels
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier recognizing the given sentinel tokens
    pub fn with_sentinels<I, S>(sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            sentinels: sentinels
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Whether a text fragment carries no content (empty or a sentinel)
    #[must_use]
    pub fn is_silent(&self, text: &str) -> bool {
        let trimmed = text.trim();
        trimmed.is_empty() || self.sentinels.iter().any(|s| trimmed.eq_ignore_ascii_case(s))
    }

    /// Classify one payload
    ///
    /// Returns `None` only for dropped payloads (empty, sentinel, empty
    /// reasoning).
    pub fn classify(&self, payload: &str) -> Option<StreamEvent> {
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(_) => return self.text_event(payload),
        };

        match value {
            Value::String(text) => self.text_event(&text),
            Value::Object(obj) => self.classify_object(&obj, payload),
            _ => {
                tracing::debug!(payload_len = payload.len(), "non-object payload");
                Some(StreamEvent::Unknown {
                    raw: payload.to_string(),
                })
            }
        }
    }

    fn classify_object(&self, obj: &Map<String, Value>, raw: &str) -> Option<StreamEvent> {
        if is_truthy(obj.get("toolExecution")) {
            return Some(StreamEvent::ToolExecution(tool_notice(obj)));
        }

        if let Some(error) = obj.get("error").filter(|v| is_truthy(Some(*v))) {
            let message = match error {
                Value::String(s) => s.clone(),
                Value::Object(e) => e
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string()),
                other => other.to_string(),
            };
            return Some(StreamEvent::Error { message });
        }

        if let Some(activity) = obj.get("activity").and_then(Value::as_str) {
            return Some(StreamEvent::Activity(activity_notice(activity, obj)));
        }

        if is_truthy(obj.get("final")) {
            return Some(StreamEvent::Final {
                html: string_field(obj, "html"),
                reasoning_html: string_field(obj, "reasoningHtml"),
                content_empty: obj
                    .get("contentEmpty")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            });
        }

        if let Some(reasoning) = obj.get("reasoning") {
            return match reasoning.as_str() {
                Some(text) if !text.is_empty() => Some(StreamEvent::ReasoningDelta {
                    text: text.to_string(),
                }),
                _ => None,
            };
        }

        if let Some(text) = extract_text(obj) {
            return self.text_event(text);
        }

        tracing::debug!(payload_len = raw.len(), "unrecognized payload shape");
        Some(StreamEvent::Unknown {
            raw: raw.to_string(),
        })
    }

    fn text_event(&self, text: &str) -> Option<StreamEvent> {
        if self.is_silent(text) {
            tracing::trace!(text = %text.trim(), "dropping silent payload");
            return None;
        }
        Some(StreamEvent::text(text))
    }
}

/// Known response shapes carrying answer text, in priority order
///
/// An empty `text` field defers to the other shapes but is still returned
/// when nothing else matches, so the caller drops it as silent.
fn extract_text(obj: &Map<String, Value>) -> Option<&str> {
    let direct = obj.get("text").and_then(Value::as_str);
    if let Some(text) = direct.filter(|t| !t.is_empty()) {
        return Some(text);
    }

    if let Some(choice) = obj
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    {
        let candidates = [
            choice.pointer("/delta/content"),
            choice.pointer("/message/content"),
            choice.get("text"),
        ];
        if let Some(text) = candidates.into_iter().flatten().find_map(Value::as_str) {
            return Some(text);
        }
    }

    if let Some(text) = obj
        .get("result")
        .and_then(|r| r.get("content"))
        .and_then(Value::as_str)
    {
        return Some(text);
    }

    obj.get("content").and_then(Value::as_str).or(direct)
}

fn tool_notice(obj: &Map<String, Value>) -> ToolExecutionNotice {
    let result = obj.get("result").and_then(Value::as_object);
    let from_result = |key: &str| result.and_then(|r| r.get(key)).and_then(Value::as_str);

    let tool = match obj.get("toolExecution") {
        Some(Value::String(name)) => name.clone(),
        _ => string_field(obj, "tool")
            .or_else(|| string_field(obj, "name"))
            .unwrap_or_else(|| "unknown".to_string()),
    };

    ToolExecutionNotice {
        tool,
        status: obj
            .get("status")
            .and_then(Value::as_str)
            .map(ToolExecutionStatus::parse)
            .unwrap_or_default(),
        path: string_field(obj, "path").or_else(|| from_result("path").map(str::to_string)),
        original: from_result("original").map(str::to_string),
        content: from_result("content")
            .or_else(|| from_result("newContent"))
            .map(str::to_string),
        success: result
            .and_then(|r| r.get("success"))
            .and_then(Value::as_bool),
    }
}

fn activity_notice(activity: &str, obj: &Map<String, Value>) -> ActivityNotice {
    let step = string_field(obj, "type");
    let detail = match step.as_deref() {
        Some("search") => ActivityDetail::Search {
            query: string_field(obj, "query"),
        },
        Some("read") => ActivityDetail::Read {
            domain: string_field(obj, "domain"),
            url: string_field(obj, "url"),
        },
        _ => ActivityDetail::Other { step },
    };
    ActivityNotice {
        activity: activity.to_string(),
        detail,
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// JavaScript-style truthiness of an optional JSON value
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify(payload: &str) -> Option<StreamEvent> {
        EventClassifier::new().classify(payload)
    }

    #[test]
    fn test_direct_text() {
        assert_eq!(classify(r#"{"text":"hello"}"#), Some(StreamEvent::text("hello")));
    }

    #[test]
    fn test_choices_shapes() {
        assert_eq!(
            classify(r#"{"choices":[{"message":{"content":"a"}}]}"#),
            Some(StreamEvent::text("a"))
        );
        assert_eq!(
            classify(r#"{"choices":[{"delta":{"content":"b"}}]}"#),
            Some(StreamEvent::text("b"))
        );
        assert_eq!(
            classify(r#"{"choices":[{"text":"c"}]}"#),
            Some(StreamEvent::text("c"))
        );
    }

    #[test]
    fn test_result_content() {
        assert_eq!(
            classify(r#"{"result":{"content":"d"}}"#),
            Some(StreamEvent::text("d"))
        );
    }

    #[test]
    fn test_raw_text_and_sentinels() {
        assert_eq!(classify("plain words"), Some(StreamEvent::text("plain words")));
        assert_eq!(classify("[DONE]"), None);
        assert_eq!(classify("[end]"), None);
        assert_eq!(classify("   "), None);
        assert_eq!(classify(r#"{"text":"[DONE]"}"#), None);
        assert_eq!(classify(r#""[END]""#), None);
    }

    #[test]
    fn test_custom_sentinels() {
        let classifier = EventClassifier::with_sentinels(["<eos>"]);
        assert_eq!(classifier.classify("<EOS>"), None);
        assert_eq!(classifier.classify("[DONE]"), Some(StreamEvent::text("[DONE]")));
    }

    #[test]
    fn test_json_string_is_text() {
        assert_eq!(classify(r#""quoted""#), Some(StreamEvent::text("quoted")));
    }

    #[test]
    fn test_tool_execution_before_text() {
        let payload = r#"{"toolExecution":"write_file","status":"completed","text":"ignored",
            "result":{"path":"src/a.rs","original":"old","newContent":"new","success":true}}"#;
        let event = classify(payload);
        assert_eq!(
            event,
            Some(StreamEvent::ToolExecution(ToolExecutionNotice {
                tool: "write_file".into(),
                status: ToolExecutionStatus::Completed,
                path: Some("src/a.rs".into()),
                original: Some("old".into()),
                content: Some("new".into()),
                success: Some(true),
            }))
        );
    }

    #[test]
    fn test_tool_execution_defaults_to_executing() {
        let event = classify(r#"{"toolExecution":true,"tool":"replace_in_file","path":"x"}"#);
        match event {
            Some(StreamEvent::ToolExecution(notice)) => {
                assert_eq!(notice.tool, "replace_in_file");
                assert_eq!(notice.status, ToolExecutionStatus::Executing);
                assert_eq!(notice.path.as_deref(), Some("x"));
                assert_eq!(notice.content, None);
            }
            other => panic!("expected tool execution, got {other:?}"),
        }
    }

    #[test]
    fn test_error_before_text() {
        assert_eq!(
            classify(r#"{"error":"quota exceeded","text":"x"}"#),
            Some(StreamEvent::Error {
                message: "quota exceeded".into()
            })
        );
        assert_eq!(
            classify(r#"{"error":{"message":"bad key"}}"#),
            Some(StreamEvent::Error {
                message: "bad key".into()
            })
        );
    }

    #[test]
    fn test_null_error_is_ignored() {
        assert_eq!(classify(r#"{"error":null,"text":"ok"}"#), Some(StreamEvent::text("ok")));
    }

    #[test]
    fn test_activity() {
        assert_eq!(
            classify(r#"{"activity":"websearch","type":"search","query":"rust sse"}"#),
            Some(StreamEvent::Activity(ActivityNotice {
                activity: "websearch".into(),
                detail: ActivityDetail::Search {
                    query: Some("rust sse".into())
                },
            }))
        );
        assert_eq!(
            classify(r#"{"activity":"websearch","type":"read","domain":"a.io","url":"https://a.io"}"#),
            Some(StreamEvent::Activity(ActivityNotice {
                activity: "websearch".into(),
                detail: ActivityDetail::Read {
                    domain: Some("a.io".into()),
                    url: Some("https://a.io".into()),
                },
            }))
        );
    }

    #[test]
    fn test_final_takes_priority_over_text() {
        assert_eq!(
            classify(r#"{"final":true,"html":"<p>x</p>","text":"x","contentEmpty":false}"#),
            Some(StreamEvent::Final {
                html: Some("<p>x</p>".into()),
                reasoning_html: None,
                content_empty: false,
            })
        );
    }

    #[test]
    fn test_reasoning() {
        assert_eq!(
            classify(r#"{"reasoning":"thinking"}"#),
            Some(StreamEvent::ReasoningDelta {
                text: "thinking".into()
            })
        );
        assert_eq!(classify(r#"{"reasoning":""}"#), None);
    }

    #[test]
    fn test_empty_text_is_dropped() {
        assert_eq!(classify(r#"{"text":""}"#), None);
        assert_eq!(classify(r#"{"choices":[{"delta":{"content":""}}]}"#), None);
        assert_eq!(
            classify(r#"{"text":"","content":"fallback"}"#),
            Some(StreamEvent::text("fallback"))
        );
    }

    #[test]
    fn test_unknown_shapes() {
        assert_eq!(
            classify(r#"{"usage":{"tokens":4}}"#),
            Some(StreamEvent::Unknown {
                raw: r#"{"usage":{"tokens":4}}"#.into()
            })
        );
        assert_eq!(
            classify("[1,2]"),
            Some(StreamEvent::Unknown { raw: "[1,2]".into() })
        );
    }
}
