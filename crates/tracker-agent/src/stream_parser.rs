//! Line-oriented parsing of the agent's `--output-format stream-json` output
//! (spec §4.5).
//!
//! Grounded on `csa-session::output_parser::return_packet`'s "parse
//! canonical, fall back, never panic" shape: a malformed line is logged and
//! skipped rather than aborting the run, since a single corrupted frame
//! should not sink an otherwise-successful agent invocation.

use serde_json::Value;

/// What a single stdout line contributed to the running transcript.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineEffect {
    /// Text to append to the human-readable transcript, if any.
    pub transcript_text: Option<String>,
    /// Set once a terminal `{"type":"result",...}` frame is seen.
    pub is_result: bool,
}

/// Parse one raw stdout line from the stream-json protocol.
///
/// Unparseable or unrecognized lines return a default `LineEffect` (no
/// transcript contribution) rather than an error; the raw line is still
/// written verbatim to the JSONL log by the caller regardless of whether it
/// parses.
pub fn parse_line(line: &str) -> LineEffect {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineEffect::default();
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed stream-json line");
            return LineEffect::default();
        }
    };

    match value.get("type").and_then(Value::as_str) {
        Some("assistant") => LineEffect {
            transcript_text: extract_assistant_text(&value),
            is_result: false,
        },
        Some("result") => LineEffect {
            transcript_text: value
                .get("result")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_result: true,
        },
        _ => LineEffect::default(),
    }
}

/// Pull the concatenated `text` blocks out of an `assistant` frame's
/// `message.content` array, ignoring tool_use/tool_result blocks (those are
/// logged raw but don't belong in the worker/reviewer transcript).
fn extract_assistant_text(frame: &Value) -> Option<String> {
    let content = frame.get("message")?.get("content")?.as_array()?;
    let mut text = String::new();
    for block in content {
        if block.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(s) = block.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(s);
            }
        }
    }
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assistant_text_block() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hello"}]}}"#;
        let effect = parse_line(line);
        assert_eq!(effect.transcript_text.as_deref(), Some("hello"));
        assert!(!effect.is_result);
    }

    #[test]
    fn concatenates_multiple_text_blocks() {
        let line = r#"{"type":"assistant","message":{"content":[
            {"type":"text","text":"a"},
            {"type":"tool_use","name":"bash"},
            {"type":"text","text":"b"}
        ]}}"#;
        let effect = parse_line(line);
        assert_eq!(effect.transcript_text.as_deref(), Some("a\nb"));
    }

    #[test]
    fn ignores_tool_use_only_frame() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"bash"}]}}"#;
        assert_eq!(parse_line(line).transcript_text, None);
    }

    #[test]
    fn recognizes_terminal_result_frame() {
        let line = r#"{"type":"result","result":"done"}"#;
        let effect = parse_line(line);
        assert!(effect.is_result);
        assert_eq!(effect.transcript_text.as_deref(), Some("done"));
    }

    #[test]
    fn malformed_json_is_ignored_not_fatal() {
        let effect = parse_line("{not json");
        assert_eq!(effect, LineEffect::default());
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse_line("   "), LineEffect::default());
    }

    #[test]
    fn unrecognized_type_contributes_nothing() {
        let line = r#"{"type":"system","subtype":"init"}"#;
        assert_eq!(parse_line(line), LineEffect::default());
    }
}
