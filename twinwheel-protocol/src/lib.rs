//! Twinwheel serial protocol
//!
//! This crate defines the line-oriented UART protocol between the robot and a
//! host-side tuning tool. Every message is a single line terminated by `\n`.
//!
//! # Inbound commands
//!
//! Two syntaxes are accepted:
//! ```text
//! {"command":"set_pid","kp":0.5,"ki":0.2,"kd":0.1}     structured
//! {"command":"set_rpm","value":120}
//! PID:0.5,0.2,0.1                                       legacy
//! RPM:120
//! ```
//!
//! Every command is answered in the syntax it arrived in, either as a
//! structured `{"type":"response",...}` record or a plain `OK:`/`ERROR:` line.
//!
//! # Outbound telemetry
//!
//! Periodic `{"type":"data",...}` records, and `>name:value` lines for
//! serial plotters.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod line;
pub mod response;
pub mod telemetry;

pub use command::{parse_command, Command, Gains, ParseError, ParseErrorKind, Request, Syntax};
pub use line::{Line, LineAssembler, LineError, MAX_LINE_LEN};
pub use response::{encode_response, Response, ResponseLine, MAX_RESPONSE_LEN};
pub use telemetry::{
    encode_record, write_plot_int, write_plot_line, TelemetryRecord, RecordLine, MAX_RECORD_LEN,
};
