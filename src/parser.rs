//! Per-file tacc_stats parser.
//!
//! A stats file is a header of schema, property and comment lines followed by
//! a body of timestamp, data, mark and (occasionally) further schema lines:
//!
//! ```text
//! $tacc_stats 2.0.1
//! $hostname c401-101.stampede.tacc.utexas.edu
//! !cpu user,E,U=cs nice,E,U=cs system,E,U=cs idle,E,U=cs iowait,E,U=cs irq,E,U=cs softirq,E,U=cs
//! 1400000000 1234567
//! %begin 1234567
//! cpu 0 100 0 50 900 3 0 1
//! ```
//!
//! The first character of each trimmed line selects how it is handled. Decoded
//! data records and timestamps are handed to a [`RecordConsumer`]; faults are
//! collected as [`LineIssue`]s instead of being thrown.

use std::io::{BufRead, Lines};

use serde::Serialize;
use tracing::{debug, error, trace, warn};

use crate::fault::{LineFault, LineIssue};
use crate::record::{DecodedRecord, RecordDecoder};
use crate::schema::{SchemaCatalog, SchemaFault};

pub const SF_SCHEMA_CHAR: char = '!';
pub const SF_DEVICES_CHAR: char = '@';
pub const SF_COMMENT_CHAR: char = '#';
pub const SF_PROPERTY_CHAR: char = '$';
pub const SF_MARK_CHAR: char = '%';

/// Lifecycle of one file's parse.
///
/// Only `Active` and `Done` are entered today. The other states describe job
/// boundaries driven by begin/end marks and are accepted by the dispatch rules
/// so that mark handling can grow into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParserState {
    PendingFirstRecord,
    Active,
    ActiveIgnore,
    LastRecord,
    Done,
}

impl ParserState {
    pub fn name(self) -> &'static str {
        match self {
            ParserState::PendingFirstRecord => "PENDING_FIRST_RECORD",
            ParserState::Active => "ACTIVE",
            ParserState::ActiveIgnore => "ACTIVE_IGNORE",
            ParserState::LastRecord => "LAST_RECORD",
            ParserState::Done => "DONE",
        }
    }

    /// Data lines are decoded in these states.
    pub fn accepts_data(self) -> bool {
        matches!(self, ParserState::Active | ParserState::LastRecord)
    }

    /// rotate and procdump marks are honoured in these states.
    pub fn accepts_marks(self) -> bool {
        matches!(self, ParserState::Active | ParserState::ActiveIgnore)
    }
}

/// Receives what the parser decodes from a file body.
pub trait RecordConsumer {
    fn on_timestamp(&mut self, _timestamp: f64) {}

    /// Handle a decoded data record seen at the current timestamp.
    fn on_record(
        &mut self,
        timestamp: Option<f64>,
        record: &DecodedRecord,
    ) -> Result<(), LineFault>;
}

/// Collaborator for `%procdump` marks.
pub trait ProcdumpSink {
    fn parse(&mut self, line: &str);
}

/// What a successfully handled line was.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Skipped,
    Timestamp(f64),
    Record,
    Schema,
    Property,
    Mark,
}

/// Everything the parser learned about one file.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub hostname: Option<String>,
    pub tool_version: Option<String>,
    pub state: ParserState,
    pub lines: usize,
    pub timestamps: usize,
    pub records: usize,
    pub rotations: Vec<f64>,
    pub issues: Vec<LineIssue>,
    pub header_error: bool,
    pub aborted: bool,
}

enum HeaderEnd {
    Body(String),
    Eof,
    Aborted,
}

/// Parser for a single file, borrowing the host run's schema catalog.
pub struct FileParser<'a> {
    name: String,
    catalog: &'a mut SchemaCatalog,
    procdump: Option<&'a mut dyn ProcdumpSink>,
    decoder: RecordDecoder,
    state: ParserState,
    line_no: usize,
    timestamp: Option<f64>,
    hostname: Option<String>,
    tool_version: Option<String>,
    rotations: Vec<f64>,
    issues: Vec<LineIssue>,
    timestamps: usize,
    records: usize,
}

impl<'a> FileParser<'a> {
    pub fn new(name: &str, catalog: &'a mut SchemaCatalog) -> Self {
        Self {
            name: name.to_string(),
            catalog,
            procdump: None,
            decoder: RecordDecoder::new(),
            state: ParserState::Active,
            line_no: 0,
            timestamp: None,
            hostname: None,
            tool_version: None,
            rotations: Vec::new(),
            issues: Vec::new(),
            timestamps: 0,
            records: 0,
        }
    }

    pub fn with_procdump(mut self, sink: &'a mut dyn ProcdumpSink) -> Self {
        self.procdump = Some(sink);
        self
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Parse the whole file, feeding the body to `consumer`.
    pub fn parse<R: BufRead>(
        mut self,
        reader: R,
        consumer: &mut dyn RecordConsumer,
    ) -> ParseOutcome {
        let mut lines = reader.lines();
        let mut header_error = false;
        let mut aborted = false;

        match self.read_header(&mut lines) {
            HeaderEnd::Aborted => aborted = true,
            _ if !self.decoder.has_schemas() => {
                header_error = true;
                self.record_fault(LineFault::HeaderError);
            }
            HeaderEnd::Body(line) => {
                self.dispatch(&line, consumer);
                aborted = self.read_body(&mut lines, consumer);
            }
            HeaderEnd::Eof => {}
        }

        self.set_state(ParserState::Done, "end of file");
        ParseOutcome {
            hostname: self.hostname,
            tool_version: self.tool_version,
            state: self.state,
            lines: self.line_no,
            timestamps: self.timestamps,
            records: self.records,
            rotations: self.rotations,
            issues: self.issues,
            header_error,
            aborted,
        }
    }

    fn read_header<R: BufRead>(&mut self, lines: &mut Lines<R>) -> HeaderEnd {
        for line in lines {
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.record_fault(LineFault::Read {
                        message: e.to_string(),
                    });
                    return HeaderEnd::Aborted;
                }
            };
            let trimmed = line.trim();
            let Some(sigil) = trimmed.chars().next() else {
                continue;
            };
            let handled = match sigil {
                SF_SCHEMA_CHAR => self.handle_schema(trimmed),
                SF_PROPERTY_CHAR => Ok(self.handle_property(trimmed)),
                SF_COMMENT_CHAR => Ok(LineOutcome::Skipped),
                // The device list is the first line of the body.
                _ => return HeaderEnd::Body(line),
            };
            if let Err(fault) = handled {
                self.record_fault(fault);
            }
        }
        HeaderEnd::Eof
    }

    /// Returns true if a read error cut the body short.
    fn read_body<R: BufRead>(
        &mut self,
        lines: &mut Lines<R>,
        consumer: &mut dyn RecordConsumer,
    ) -> bool {
        for line in lines {
            if self.state == ParserState::Done {
                break;
            }
            self.line_no += 1;
            match line {
                Ok(line) => self.dispatch(&line, consumer),
                Err(e) => {
                    self.record_fault(LineFault::Read {
                        message: e.to_string(),
                    });
                    return true;
                }
            }
        }
        false
    }

    fn dispatch(&mut self, line: &str, consumer: &mut dyn RecordConsumer) {
        if let Err(fault) = self.parse_line(line, consumer) {
            self.record_fault(fault);
        }
    }

    /// Handle one body line.
    pub fn parse_line(
        &mut self,
        line: &str,
        consumer: &mut dyn RecordConsumer,
    ) -> Result<LineOutcome, LineFault> {
        if self.state == ParserState::Done {
            return Ok(LineOutcome::Skipped);
        }
        let line = line.trim();
        let Some(sigil) = line.chars().next() else {
            return Ok(LineOutcome::Skipped);
        };

        if sigil.is_ascii_digit() {
            self.handle_timestamp(line, consumer)
        } else if sigil.is_alphabetic() {
            self.handle_data(line, consumer)
        } else {
            match sigil {
                SF_SCHEMA_CHAR => self.handle_schema(line),
                SF_PROPERTY_CHAR => Ok(self.handle_property(line)),
                SF_MARK_CHAR => self.handle_mark(line),
                SF_COMMENT_CHAR | SF_DEVICES_CHAR => Ok(LineOutcome::Skipped),
                _ => Err(LineFault::UnrecognizedLine { sigil }),
            }
        }
    }

    fn handle_timestamp(
        &mut self,
        line: &str,
        consumer: &mut dyn RecordConsumer,
    ) -> Result<LineOutcome, LineFault> {
        let token = line.split_whitespace().next().unwrap_or_default();
        let timestamp: f64 = token.parse().map_err(|_| LineFault::TimestampSyntax {
            token: token.to_string(),
        })?;
        self.timestamp = Some(timestamp);
        self.timestamps += 1;
        consumer.on_timestamp(timestamp);
        Ok(LineOutcome::Timestamp(timestamp))
    }

    fn handle_data(
        &mut self,
        line: &str,
        consumer: &mut dyn RecordConsumer,
    ) -> Result<LineOutcome, LineFault> {
        if !self.state.accepts_data() {
            return Ok(LineOutcome::Skipped);
        }
        let record = self.decoder.decode(line)?;
        consumer.on_record(self.timestamp, &record)?;
        self.records += 1;
        Ok(LineOutcome::Record)
    }

    fn handle_schema(&mut self, line: &str) -> Result<LineOutcome, LineFault> {
        let decl = &line[SF_SCHEMA_CHAR.len_utf8()..];
        let mut parts = decl.trim_start().splitn(2, char::is_whitespace);
        let type_name = parts.next().unwrap_or_default();
        let desc = parts.next().unwrap_or_default();

        match self.catalog.register_or_validate(type_name, desc) {
            Ok(schema) => {
                self.decoder.insert_schema(type_name, schema);
                Ok(LineOutcome::Schema)
            }
            Err(SchemaFault::Mismatch { .. }) if !self.decoder.mark_mismatched(type_name) => {
                Err(LineFault::MismatchedType {
                    type_name: type_name.to_string(),
                })
            }
            Err(fault) => Err(LineFault::Schema {
                type_name: type_name.to_string(),
                fault,
            }),
        }
    }

    fn handle_property(&mut self, line: &str) -> LineOutcome {
        let mut parts = line[SF_PROPERTY_CHAR.len_utf8()..].split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("tacc_stats"), Some(version)) => self.tool_version = Some(version.to_string()),
            (Some("hostname"), Some(hostname)) => self.hostname = Some(hostname.to_string()),
            _ => debug!("file `{}' ignoring property `{}'", self.name, line),
        }
        LineOutcome::Property
    }

    fn handle_mark(&mut self, line: &str) -> Result<LineOutcome, LineFault> {
        let mark = line[SF_MARK_CHAR.len_utf8()..].trim();
        let mut actions = mark.split_whitespace();
        let syntax = || LineFault::MarkSyntax {
            mark: mark.to_string(),
        };

        match actions.next().ok_or_else(syntax)? {
            "begin" => {
                let job = actions.next().ok_or_else(syntax)?;
                debug!("Seen begin at {:?} for \"{}\"", self.timestamp, job);
            }
            "end" => {
                let job = actions.next().ok_or_else(syntax)?;
                debug!("Seen end at {:?} for \"{}\"", self.timestamp, job);
            }
            "rotate" => {
                if self.state.accepts_marks() {
                    if let Some(ts) = self.timestamp {
                        self.rotations.push(ts);
                    }
                }
            }
            "procdump" => {
                if self.state.accepts_marks() {
                    if let Some(sink) = self.procdump.as_deref_mut() {
                        sink.parse(line);
                    }
                }
            }
            other => debug!("file `{}' ignoring mark `{}'", self.name, other),
        }
        Ok(LineOutcome::Mark)
    }

    fn set_state(&mut self, state: ParserState, reason: &str) {
        trace!(
            "TRANS {} -> {} ({})",
            self.state.name(),
            state.name(),
            reason
        );
        self.state = state;
    }

    fn record_fault(&mut self, fault: LineFault) {
        match &fault {
            _ if !fault.is_loud() => {
                debug!("file `{}' line {}: {}", self.name, self.line_no, fault)
            }
            LineFault::UnrecognizedLine { .. } | LineFault::MarkSyntax { .. } => {
                warn!("file `{}' line {}: {}", self.name, self.line_no, fault)
            }
            _ => error!("file `{}' line {}: {}", self.name, self.line_no, fault),
        }
        self.issues.push(LineIssue {
            line: self.line_no,
            fault,
        });
    }
}
