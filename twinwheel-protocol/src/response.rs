//! Command acknowledgments
//!
//! Structured: `{"type":"response","status":"success","message":"..."}`
//! Legacy: `OK:<message>` or `ERROR:<message>`

use core::fmt::Write;

use heapless::String;
use serde::Serialize;

use crate::command::Syntax;

/// Maximum encoded acknowledgment length (including the trailing newline)
pub const MAX_RESPONSE_LEN: usize = 128;

/// An encoded acknowledgment line
pub type ResponseLine = String<MAX_RESPONSE_LEN>;

/// Outcome of handling one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Command applied
    Success(&'static str),
    /// Command rejected, state unchanged
    Error(&'static str),
}

impl Response {
    /// Check if this is a success acknowledgment
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    /// The message carried by the acknowledgment
    pub fn message(&self) -> &'static str {
        match self {
            Response::Success(msg) | Response::Error(msg) => msg,
        }
    }
}

#[derive(Serialize)]
struct ResponseRecord<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    status: &'a str,
    message: &'a str,
}

/// Encode an acknowledgment in the given syntax, newline-terminated
pub fn encode_response(response: &Response, syntax: Syntax) -> ResponseLine {
    let mut line = ResponseLine::new();
    match syntax {
        Syntax::Structured => {
            let record = ResponseRecord {
                kind: "response",
                status: if response.is_success() { "success" } else { "error" },
                message: response.message(),
            };
            match serde_json_core::to_string::<_, MAX_RESPONSE_LEN>(&record) {
                Ok(json) => {
                    let _ = line.push_str(&json);
                }
                Err(_) => {
                    let _ = line.push_str(r#"{"type":"response","status":"error"}"#);
                }
            }
        }
        Syntax::Legacy => {
            let prefix = if response.is_success() { "OK" } else { "ERROR" };
            let _ = write!(line, "{}:{}", prefix, response.message());
        }
    }
    if line.push('\n').is_err() {
        line.pop();
        let _ = line.push('\n');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_success() {
        let line = encode_response(&Response::Success("PID updated"), Syntax::Structured);
        assert_eq!(
            line.as_str(),
            "{\"type\":\"response\",\"status\":\"success\",\"message\":\"PID updated\"}\n"
        );
    }

    #[test]
    fn test_structured_error() {
        let line = encode_response(&Response::Error("invalid JSON"), Syntax::Structured);
        assert!(line.contains("\"status\":\"error\""));
        assert!(line.contains("invalid JSON"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_legacy_lines() {
        assert_eq!(
            encode_response(&Response::Success("RPM set"), Syntax::Legacy).as_str(),
            "OK:RPM set\n"
        );
        assert_eq!(
            encode_response(&Response::Error("invalid number"), Syntax::Legacy).as_str(),
            "ERROR:invalid number\n"
        );
    }
}
