//! Tool-Call Extractor
//!
//! Finds the first tool invocation embedded in free-form generated text.
//!
//! # Accepted Encodings
//!
//! Tried in order, first hit wins:
//!
//! 1. **Whole object**: the trimmed text is one JSON object carrying the call
//!    under `tool_call`, `tool_calls[0]`, `function_call`, `tool`, or directly
//!    as `{"name": .., "arguments": ..}`.
//! 2. **Tagged**: `<function>name</function>{...}` or `<function>name{...}</function>`.
//! 3. **Embedded in prose**: a marker such as `"tool_call"` is located, the
//!    nearest unmatched `{` before it opens the candidate, and a forward scan
//!    tracking brace depth closes it.
//! 4. **Textual fallback**: a pattern match for a `"name"` string followed by
//!    an `"arguments"` object.
//!
//! Candidate JSON is parsed leniently (single quotes and trailing commas are
//! repaired). Malformed input never errors; it yields `None`, and callers act
//! as if no tool was requested.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::invocation::ToolInvocation;

/// Marker substrings that signal an embedded invocation object
pub const INVOCATION_MARKERS: &[&str] = &[
    "\"tool_call\"",
    "\"tool_calls\"",
    "\"function_call\"",
    "\"function-call\"",
    "\"tool\"",
];

static TAGGED_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<function>\s*([\w./-]+)\s*(?:</function>)?\s*[:\-]?\s*\{")
        .expect("valid tagged invocation pattern")
});

static NAME_ARGUMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\{[^}]*"name"\s*:\s*"([^"]+)"[^}]*"arguments"\s*:\s*(\{[\s\S]*\})"#)
        .expect("valid name/arguments pattern")
});

static PATH_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""path"\s*:\s*"([^"]+)""#).expect("valid path pattern"));

static CONTENT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"content"\s*:\s*"(.*?)(?:"\s*\}|"\s*,)"#).expect("valid content pattern")
});

static SINGLE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'(.*?)'").expect("valid quote pattern"));

static TRAILING_COMMA_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\}").expect("valid trailing comma pattern"));

static TRAILING_COMMA_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\]").expect("valid trailing comma pattern"));

// ============================================================================
// Argument Rules
// ============================================================================

/// Expected type of a required argument
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgumentKind {
    /// Any string, including empty
    String,
    /// A string with at least one character
    NonEmptyString,
    /// A JSON array or object
    Collection,
}

impl ArgumentKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::NonEmptyString => value.as_str().is_some_and(|s| !s.is_empty()),
            Self::Collection => value.is_array() || value.is_object(),
        }
    }
}

/// Arguments a named tool must carry to be accepted
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentRule {
    /// Tool the rule applies to
    pub tool: String,
    /// Required argument names and kinds
    pub required: Vec<(String, ArgumentKind)>,
}

impl ArgumentRule {
    /// Start a rule for a tool
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            required: Vec::new(),
        }
    }

    /// Require an argument
    pub fn require(mut self, name: impl Into<String>, kind: ArgumentKind) -> Self {
        self.required.push((name.into(), kind));
        self
    }

    fn admits(&self, invocation: &ToolInvocation) -> bool {
        self.required.iter().all(|(name, kind)| {
            invocation
                .arguments
                .get(name)
                .is_some_and(|value| kind.accepts(value))
        })
    }
}

/// Rules applied by [`ToolCallExtractor::default`]
pub fn default_argument_rules() -> Vec<ArgumentRule> {
    vec![
        ArgumentRule::new("repo/create_or_update_file")
            .require("file_path", ArgumentKind::NonEmptyString)
            .require("content", ArgumentKind::String),
        ArgumentRule::new("compose_project").require("files", ArgumentKind::Collection),
    ]
}

// ============================================================================
// Extractor
// ============================================================================

/// Locates tool invocations in accumulated text
#[derive(Clone, Debug)]
pub struct ToolCallExtractor {
    rules: Vec<ArgumentRule>,
}

impl Default for ToolCallExtractor {
    fn default() -> Self {
        Self {
            rules: default_argument_rules(),
        }
    }
}

impl ToolCallExtractor {
    /// Create an extractor with the default argument rules
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with custom argument rules
    #[must_use]
    pub fn with_rules(rules: Vec<ArgumentRule>) -> Self {
        Self { rules }
    }

    /// Find the first tool invocation in `text`
    pub fn extract(&self, text: &str) -> Option<ToolInvocation> {
        let invocation = locate(text)?;

        let rejected = self
            .rules
            .iter()
            .filter(|rule| rule.tool == invocation.name)
            .any(|rule| !rule.admits(&invocation));
        if rejected {
            tracing::debug!(tool = %invocation.name, "invocation missing required arguments");
            return None;
        }

        Some(invocation)
    }
}

fn locate(text: &str) -> Option<ToolInvocation> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Some(invocation) = parse_lenient(trimmed).and_then(|v| from_envelope(&v)) {
            return Some(invocation);
        }
    }

    from_tagged(text)
        .or_else(|| from_markers(text))
        .or_else(|| from_name_arguments(text))
}

/// Normalize the known envelope shapes of a parsed object
fn from_envelope(value: &Value) -> Option<ToolInvocation> {
    let obj = value.as_object()?;

    if let Some(call) = obj.get("tool_call").filter(|v| !v.is_null()) {
        return from_call(call);
    }

    if let Some(first) = obj
        .get("tool_calls")
        .and_then(Value::as_array)
        .and_then(|calls| calls.first())
    {
        return from_call(first);
    }

    if let Some(call) = obj.get("function_call").and_then(Value::as_object) {
        return from_call_parts(call.get("name"), call.get("arguments"));
    }

    match obj.get("tool") {
        Some(Value::Object(tool)) if tool.contains_key("name") || tool.contains_key("arguments") => {
            return from_call_parts(tool.get("name"), tool.get("arguments"));
        }
        Some(Value::String(_)) if obj.contains_key("arguments") => {
            return from_call_parts(obj.get("tool"), obj.get("arguments"));
        }
        _ => {}
    }

    if obj.get("name").is_some_and(Value::is_string) {
        if let Some(arguments) = obj.get("arguments").or_else(|| obj.get("args")) {
            return from_call_parts(obj.get("name"), Some(arguments));
        }
    }

    None
}

/// One call object: `{name, arguments}` or `{function: {name, arguments}}`
fn from_call(call: &Value) -> Option<ToolInvocation> {
    let obj = call.as_object()?;
    let target = obj
        .get("function")
        .and_then(Value::as_object)
        .unwrap_or(obj);
    from_call_parts(
        target.get("name"),
        target.get("arguments").or_else(|| target.get("args")),
    )
}

fn from_call_parts(name: Option<&Value>, arguments: Option<&Value>) -> Option<ToolInvocation> {
    let name = name.and_then(Value::as_str)?.trim();
    if name.is_empty() {
        return None;
    }

    let arguments = match arguments {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(raw)) if raw.trim().is_empty() => Map::new(),
        Some(Value::String(raw)) => match parse_lenient(raw)? {
            Value::Object(map) => map,
            _ => return None,
        },
        Some(_) => return None,
    };

    Some(ToolInvocation {
        name: name.to_string(),
        arguments,
    })
}

fn from_tagged(text: &str) -> Option<ToolInvocation> {
    let caps = TAGGED_OPEN.captures(text)?;
    let name = caps.get(1)?.as_str();
    let open = caps.get(0)?.end() - 1;

    let balanced = balanced_object_end(text, open).map(|end| &text[open..=end]);
    let greedy = text.rfind('}').filter(|&end| end > open).map(|end| &text[open..=end]);

    for candidate in balanced.into_iter().chain(greedy) {
        if let Some(Value::Object(arguments)) = parse_lenient(candidate) {
            return Some(ToolInvocation {
                name: name.to_string(),
                arguments,
            });
        }
    }

    // Unparseable argument block: salvage path and content by pattern
    let block = greedy.unwrap_or(&text[open..]);
    let path = PATH_FIELD.captures(block)?.get(1)?.as_str();
    let content = CONTENT_FIELD
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| unescape_json_fragment(m.as_str()))
        .unwrap_or_default();

    Some(
        ToolInvocation::new(name)
            .with_argument("path", path)
            .with_argument("content", content),
    )
}

fn from_markers(text: &str) -> Option<ToolInvocation> {
    let mut positions: Vec<usize> = INVOCATION_MARKERS
        .iter()
        .flat_map(|marker| text.match_indices(marker).map(|(idx, _)| idx))
        .collect();
    positions.sort_unstable();
    positions.dedup();

    for marker_at in positions {
        let Some(start) = unmatched_open_before(text, marker_at)
            .or_else(|| text[marker_at..].find('{').map(|i| marker_at + i))
        else {
            continue;
        };
        let Some(end) = balanced_object_end(text, start) else {
            continue;
        };

        if let Some(invocation) = parse_lenient(&text[start..=end]).and_then(|v| from_envelope(&v)) {
            return Some(invocation);
        }
    }

    None
}

fn from_name_arguments(text: &str) -> Option<ToolInvocation> {
    let caps = NAME_ARGUMENTS.captures(text)?;
    let name = caps.get(1)?.as_str();
    let greedy = caps.get(2)?;

    let balanced = balanced_object_end(text, greedy.start()).map(|end| &text[greedy.start()..=end]);
    for candidate in balanced.into_iter().chain(Some(greedy.as_str())) {
        if let Some(Value::Object(arguments)) = parse_lenient(candidate) {
            return Some(ToolInvocation {
                name: name.to_string(),
                arguments,
            });
        }
    }
    None
}

// ============================================================================
// Scanning Helpers
// ============================================================================

/// Nearest `{` before `pos` that is not closed before `pos`
fn unmatched_open_before(text: &str, pos: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text[..pos].char_indices().rev() {
        match ch {
            '}' => depth += 1,
            '{' if depth == 0 => return Some(idx),
            '{' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Index of the `}` closing the object opened at `start`
///
/// Braces inside JSON string literals do not count.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse JSON, retrying once with common model mistakes repaired
pub fn parse_lenient(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }

    let fixed = strip_trailing_commas(raw);
    if let Ok(value) = serde_json::from_str(&fixed) {
        return Some(value);
    }

    // Apostrophes inside double-quoted strings would be mangled
    if raw.contains('"') {
        return None;
    }
    let quoted = SINGLE_QUOTED.replace_all(raw, "\"${1}\"");
    serde_json::from_str(&strip_trailing_commas(&quoted)).ok()
}

fn strip_trailing_commas(raw: &str) -> String {
    let fixed = TRAILING_COMMA_OBJECT.replace_all(raw, "}");
    TRAILING_COMMA_ARRAY.replace_all(&fixed, "]").into_owned()
}

fn unescape_json_fragment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
