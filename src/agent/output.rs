//! Parsing of the tutor CLI's JSON output

use serde::Deserialize;

use crate::speech::sanitize_for_speech;
use crate::{Error, Result};

/// Result of one successful agent turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutput {
    /// Reply text, ready to be spoken
    pub text: String,
    /// Session to resume on the next turn, when the CLI reported one
    pub session_id: Option<String>,
}

/// Shape of `--output-format json`; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct CliResult {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    is_error: bool,
}

/// Interpret the CLI's stdout
///
/// JSON output yields the sanitized `result` and the `session_id`. Anything
/// that is not a JSON result object is passed through as plain text with no
/// session.
///
/// # Errors
///
/// Returns error if the CLI flagged the result as an error
pub fn parse_output(stdout: &str) -> Result<AgentOutput> {
    let stdout = stdout.trim();

    let Ok(parsed) = serde_json::from_str::<CliResult>(stdout) else {
        tracing::debug!("agent output is not JSON, using raw text");
        return Ok(AgentOutput {
            text: stdout.to_string(),
            session_id: None,
        });
    };

    if parsed.is_error {
        let message = parsed
            .result
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "agent reported an error".to_string());
        return Err(Error::Agent(message));
    }

    Ok(AgentOutput {
        text: sanitize_for_speech(parsed.result.as_deref().unwrap_or_default()),
        session_id: parsed.session_id.filter(|s| !s.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_result() {
        let out = parse_output(
            r#"{"type":"result","subtype":"success","is_error":false,"result":"**Nice!** Tell me more.","session_id":"abc-123","total_cost_usd":0.001}"#,
        )
        .unwrap();

        assert_eq!(out.text, "Nice! Tell me more.");
        assert_eq!(out.session_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_parse_missing_fields() {
        let out = parse_output(r#"{"type":"result"}"#).unwrap();
        assert_eq!(out.text, "");
        assert!(out.session_id.is_none());
    }

    #[test]
    fn test_parse_empty_session_id() {
        let out = parse_output(r#"{"result":"Hi","session_id":""}"#).unwrap();
        assert!(out.session_id.is_none());
    }

    #[test]
    fn test_parse_plain_text_fallback() {
        let out = parse_output("  Hello, how are you?\n").unwrap();
        assert_eq!(out.text, "Hello, how are you?");
        assert!(out.session_id.is_none());
    }

    #[test]
    fn test_parse_non_object_json_is_plain_text() {
        let out = parse_output("42").unwrap();
        assert_eq!(out.text, "42");
    }

    #[test]
    fn test_parse_error_result() {
        let err = parse_output(r#"{"is_error":true,"result":"Credit balance is too low"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Credit balance is too low");

        let err = parse_output(r#"{"is_error":true}"#).unwrap_err();
        assert_eq!(err.to_string(), "agent reported an error");
    }
}
