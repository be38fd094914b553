//! Typed per-line faults.
//!
//! Every line of a stats file either parses cleanly or produces one
//! [`LineFault`]. Faults are collected per file so callers can count and
//! inspect them; only [`LineFault::Read`] stops a file early.

use std::fmt;

use crate::schema::SchemaFault;

/// A problem with one line (or, for header and read faults, one file).
#[derive(Debug, Clone, PartialEq)]
pub enum LineFault {
    /// The header declared no usable schema; the body is skipped.
    HeaderError,
    /// A schema declaration was rejected.
    Schema { type_name: String, fault: SchemaFault },
    /// A data line for a type whose schema mismatched earlier in this file.
    MismatchedType { type_name: String },
    /// A data line for a type with no schema in this file.
    UnknownType { type_name: String, first: bool },
    /// A data line with the wrong number of values.
    FieldCountMismatch {
        type_name: String,
        expected: usize,
        got: usize,
    },
    /// A data line value that is not an unsigned integer.
    InvalidValue { type_name: String, token: String },
    /// A data line with no device id.
    DataSyntax,
    /// A CPU record whose schema lacks a field needed for the checks.
    MissingField { type_name: String, field: String },
    /// A CPU record seen before any timestamp line.
    MissingTimestamp { type_name: String },
    /// A timestamp line whose leading token is not a number.
    TimestampSyntax { token: String },
    /// A mark line with no action, or a begin/end without a job id.
    MarkSyntax { mark: String },
    /// A line starting with an unknown sigil.
    UnrecognizedLine { sigil: char },
    /// Reading the file failed; the rest of the file is abandoned.
    Read { message: String },
}

impl LineFault {
    /// True if the fault stops processing of the current file.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, LineFault::Read { .. })
    }

    /// True for faults that should be reported loudly.
    ///
    /// Repeat unknown-type lines and lines of a mismatched type would flood the
    /// log, so they are kept quiet after the first report.
    #[must_use]
    pub fn is_loud(&self) -> bool {
        !matches!(
            self,
            LineFault::UnknownType { first: false, .. } | LineFault::MismatchedType { .. }
        )
    }
}

impl fmt::Display for LineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineFault::HeaderError => write!(f, "bad header, no schemas declared"),
            LineFault::Schema { type_name, fault } => {
                write!(f, "type '{type_name}': {fault}")
            }
            LineFault::MismatchedType { type_name } => {
                write!(f, "type '{type_name}': schema mismatch, discarding line")
            }
            LineFault::UnknownType { type_name, .. } => {
                write!(f, "unknown type '{type_name}', discarding line")
            }
            LineFault::FieldCountMismatch {
                type_name,
                expected,
                got,
            } => {
                write!(
                    f,
                    "type '{type_name}': expected {expected} values, read {got}, discarding line"
                )
            }
            LineFault::InvalidValue { type_name, token } => {
                write!(f, "type '{type_name}': invalid value '{token}', discarding line")
            }
            LineFault::DataSyntax => write!(f, "syntax error in data line"),
            LineFault::MissingField { type_name, field } => {
                write!(f, "type '{type_name}': schema has no '{field}' field")
            }
            LineFault::MissingTimestamp { type_name } => {
                write!(f, "type '{type_name}': record before any timestamp")
            }
            LineFault::TimestampSyntax { token } => {
                write!(f, "syntax error in timestamp '{token}'")
            }
            LineFault::MarkSyntax { mark } => write!(f, "syntax error in mark '{mark}'"),
            LineFault::UnrecognizedLine { sigil } => {
                write!(f, "unrecognised character '{sigil}'")
            }
            LineFault::Read { message } => write!(f, "read error: {message}"),
        }
    }
}

/// A fault together with the line it occurred on (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct LineIssue {
    pub line: usize,
    pub fault: LineFault,
}

impl fmt::Display for LineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.fault)
    }
}
