//! Inbound command parsing
//!
//! Commands arrive as single lines in one of two syntaxes:
//! - Structured: a JSON object with a `command` field of `"set_pid"`
//!   (fields `kp`, `ki`, `kd`) or `"set_rpm"` (field `value`)
//! - Legacy: `PID:<kp>,<ki>,<kd>` or `RPM:<value>`
//!
//! A line starting with `{` is always treated as structured, so the error
//! acknowledgment for a broken record goes out in the structured syntax.

use serde::{Deserialize, Serialize};

/// PID gain set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gains {
    /// Proportional gain (Kp)
    pub kp: f32,
    /// Integral gain (Ki)
    pub ki: f32,
    /// Derivative gain (Kd)
    pub kd: f32,
}

impl Gains {
    /// Create a gain set
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// Check that every gain is a finite, non-negative number
    pub fn is_valid(&self) -> bool {
        [self.kp, self.ki, self.kd]
            .iter()
            .all(|g| g.is_finite() && *g >= 0.0)
    }
}

/// A parsed command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Replace the PID gains
    SetGains(Gains),
    /// Set the target velocity in RPM (0 = stop)
    SetTarget(f32),
}

/// Syntax a command arrived in (and its acknowledgment must use)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Syntax {
    /// JSON record
    Structured,
    /// `PID:` / `RPM:` plain text
    Legacy,
}

/// A command together with the syntax it arrived in
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Request {
    pub syntax: Syntax,
    pub command: Command,
}

/// Reason a line could not be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseErrorKind {
    /// Line held nothing but whitespace
    Empty,
    /// Structured record was not valid JSON
    InvalidRecord,
    /// `command` field or legacy prefix not recognised
    UnknownCommand,
    /// A required field was absent
    MissingField(&'static str),
    /// A number could not be parsed
    InvalidNumber,
    /// A number was NaN or infinite
    NotFinite,
}

impl ParseErrorKind {
    /// Short human-readable description used in acknowledgments
    pub fn message(&self) -> &'static str {
        match self {
            ParseErrorKind::Empty => "empty command",
            ParseErrorKind::InvalidRecord => "invalid JSON",
            ParseErrorKind::UnknownCommand => "unknown command",
            ParseErrorKind::MissingField("kp") => "missing field kp",
            ParseErrorKind::MissingField("ki") => "missing field ki",
            ParseErrorKind::MissingField("kd") => "missing field kd",
            ParseErrorKind::MissingField("value") => "missing field value",
            ParseErrorKind::MissingField(_) => "missing field",
            ParseErrorKind::InvalidNumber => "invalid number",
            ParseErrorKind::NotFinite => "number out of range",
        }
    }
}

/// A parse failure together with the syntax to answer in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParseError {
    pub syntax: Syntax,
    pub kind: ParseErrorKind,
}

/// Wire shape of a structured command
#[derive(Deserialize)]
struct StructuredCommand<'a> {
    command: &'a str,
    kp: Option<f32>,
    ki: Option<f32>,
    kd: Option<f32>,
    value: Option<f32>,
}

/// Parse one received line into a command
pub fn parse_command(line: &str) -> Result<Request, ParseError> {
    let line = line.trim();
    if line.starts_with('{') {
        parse_structured(line)
            .map(|command| Request {
                syntax: Syntax::Structured,
                command,
            })
            .map_err(|kind| ParseError {
                syntax: Syntax::Structured,
                kind,
            })
    } else {
        parse_legacy(line)
            .map(|command| Request {
                syntax: Syntax::Legacy,
                command,
            })
            .map_err(|kind| ParseError {
                syntax: Syntax::Legacy,
                kind,
            })
    }
}

fn parse_structured(line: &str) -> Result<Command, ParseErrorKind> {
    let (record, _) = serde_json_core::from_str::<StructuredCommand<'_>>(line)
        .map_err(|_| ParseErrorKind::InvalidRecord)?;

    match record.command {
        "set_pid" => {
            let kp = record.kp.ok_or(ParseErrorKind::MissingField("kp"))?;
            let ki = record.ki.ok_or(ParseErrorKind::MissingField("ki"))?;
            let kd = record.kd.ok_or(ParseErrorKind::MissingField("kd"))?;
            Ok(Command::SetGains(Gains::new(
                finite(kp)?,
                finite(ki)?,
                finite(kd)?,
            )))
        }
        "set_rpm" => {
            let value = record.value.ok_or(ParseErrorKind::MissingField("value"))?;
            Ok(Command::SetTarget(finite(value)?))
        }
        _ => Err(ParseErrorKind::UnknownCommand),
    }
}

fn parse_legacy(line: &str) -> Result<Command, ParseErrorKind> {
    if line.is_empty() {
        return Err(ParseErrorKind::Empty);
    }

    if let Some(rest) = line.strip_prefix("PID:") {
        let mut fields = rest.split(',');
        let kp = parse_number(fields.next(), "kp")?;
        let ki = parse_number(fields.next(), "ki")?;
        let kd = parse_number(fields.next(), "kd")?;
        if fields.next().is_some() {
            return Err(ParseErrorKind::InvalidNumber);
        }
        Ok(Command::SetGains(Gains::new(kp, ki, kd)))
    } else if let Some(rest) = line.strip_prefix("RPM:") {
        Ok(Command::SetTarget(parse_number(Some(rest), "value")?))
    } else {
        Err(ParseErrorKind::UnknownCommand)
    }
}

fn parse_number(field: Option<&str>, name: &'static str) -> Result<f32, ParseErrorKind> {
    let field = field.map(str::trim).unwrap_or("");
    if field.is_empty() {
        return Err(ParseErrorKind::MissingField(name));
    }
    let value = field
        .parse::<f32>()
        .map_err(|_| ParseErrorKind::InvalidNumber)?;
    finite(value)
}

fn finite(value: f32) -> Result<f32, ParseErrorKind> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseErrorKind::NotFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_structured_set_pid() {
        let req = parse_command(r#"{"command":"set_pid","kp":0.5,"ki":0.2,"kd":0.1}"#).unwrap();
        assert_eq!(req.syntax, Syntax::Structured);
        assert_eq!(req.command, Command::SetGains(Gains::new(0.5, 0.2, 0.1)));
    }

    #[test]
    fn test_structured_set_rpm_integer_value() {
        let req = parse_command(r#"{"command": "set_rpm", "value": 120}"#).unwrap();
        assert_eq!(req.command, Command::SetTarget(120.0));
    }

    #[test]
    fn test_structured_missing_field() {
        let err = parse_command(r#"{"command":"set_pid","kp":0.5,"kd":0.1}"#).unwrap_err();
        assert_eq!(err.syntax, Syntax::Structured);
        assert_eq!(err.kind, ParseErrorKind::MissingField("ki"));
        assert_eq!(err.kind.message(), "missing field ki");
    }

    #[test]
    fn test_structured_unknown_command() {
        let err = parse_command(r#"{"command":"reboot"}"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownCommand);
    }

    #[test]
    fn test_structured_garbage() {
        let err = parse_command("{not json").unwrap_err();
        assert_eq!(err.syntax, Syntax::Structured);
        assert_eq!(err.kind, ParseErrorKind::InvalidRecord);
    }

    #[test]
    fn test_legacy_pid() {
        let req = parse_command("PID:1.5, 0.25 ,0").unwrap();
        assert_eq!(req.syntax, Syntax::Legacy);
        assert_eq!(req.command, Command::SetGains(Gains::new(1.5, 0.25, 0.0)));
    }

    #[test]
    fn test_legacy_rpm() {
        let req = parse_command("RPM:-80").unwrap();
        assert_eq!(req.command, Command::SetTarget(-80.0));
    }

    #[test]
    fn test_legacy_rpm_not_a_number() {
        let err = parse_command("RPM:abc").unwrap_err();
        assert_eq!(err.syntax, Syntax::Legacy);
        assert_eq!(err.kind, ParseErrorKind::InvalidNumber);
    }

    #[test]
    fn test_legacy_pid_wrong_arity() {
        assert_eq!(
            parse_command("PID:1,2").unwrap_err().kind,
            ParseErrorKind::MissingField("kd")
        );
        assert_eq!(
            parse_command("PID:1,2,3,4").unwrap_err().kind,
            ParseErrorKind::InvalidNumber
        );
    }

    #[test]
    fn test_legacy_rejects_non_finite() {
        assert_eq!(
            parse_command("RPM:inf").unwrap_err().kind,
            ParseErrorKind::NotFinite
        );
        assert_eq!(
            parse_command("RPM:NaN").unwrap_err().kind,
            ParseErrorKind::NotFinite
        );
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(
            parse_command("HELLO").unwrap_err().kind,
            ParseErrorKind::UnknownCommand
        );
        assert_eq!(parse_command("   ").unwrap_err().kind, ParseErrorKind::Empty);
    }

    #[test]
    fn test_gains_validity() {
        assert!(Gains::new(0.5, 0.2, 0.1).is_valid());
        assert!(!Gains::new(-0.5, 0.2, 0.1).is_valid());
        assert!(!Gains::new(f32::NAN, 0.2, 0.1).is_valid());
    }

    proptest! {
        #[test]
        fn parse_never_panics(line in "\\PC{0,64}") {
            let _ = parse_command(&line);
        }

        #[test]
        fn legacy_rpm_accepts_any_finite(value in -1.0e6f32..1.0e6f32) {
            let mut text = heapless::String::<48>::new();
            core::fmt::Write::write_fmt(&mut text, format_args!("RPM:{}", value)).unwrap();
            let req = parse_command(&text).unwrap();
            prop_assert_eq!(req.command, Command::SetTarget(value));
        }
    }
}
