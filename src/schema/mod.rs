//! Self-describing tacc_stats schemas.
//!
//! Each device type is declared in a file header with a line such as
//!
//! ```text
//! !cpu user,E,U=cs nice,E,U=cs system,E,U=cs idle,E,U=cs iowait,E,U=cs
//! ```
//!
//! The descriptor is a space separated list of fields, each a key followed by
//! comma separated options:
//!
//! - `C` - control register rather than a counter
//! - `E` - event counter
//! - `W=<bits>` - counter width
//! - `U=<mult><unit>` - scale multiplier and unit (`KB` becomes `1024` x `B`)
//!
//! Descriptors are corrected by [`schema_fixup`] before being parsed, and the
//! corrected text is what two declarations are compared on.

mod catalog;
mod fixup;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

pub use catalog::SchemaCatalog;
pub use fixup::schema_fixup;

/// One field of a device-type schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub key: String,
    /// Position of the field's value in a data line.
    pub index: usize,
    pub is_control: bool,
    pub is_event: bool,
    pub width: Option<u32>,
    pub mult: Option<u64>,
    pub unit: Option<String>,
}

impl SchemaField {
    /// Parse a single descriptor token (`key[,opt...]`).
    pub fn parse(index: usize, spec: &str) -> Result<Self, SchemaFault> {
        let mut opts = spec.split(',');
        let key = opts.next().unwrap_or_default().to_string();
        if key.is_empty() {
            return Err(SchemaFault::EmptyKey {
                token: spec.to_string(),
            });
        }

        let mut field = SchemaField {
            key,
            index,
            is_control: false,
            is_event: false,
            width: None,
            mult: None,
            unit: None,
        };

        for opt in opts {
            if opt.is_empty() {
                continue;
            } else if opt == "C" {
                field.is_control = true;
            } else if opt == "E" {
                field.is_event = true;
            } else if let Some(width) = opt.strip_prefix("W=") {
                field.width = Some(width.parse().map_err(|_| SchemaFault::InvalidWidth {
                    field: field.key.clone(),
                    value: width.to_string(),
                })?);
            } else if let Some(unit) = opt.strip_prefix("U=") {
                field.parse_unit(unit)?;
            } else {
                return Err(SchemaFault::UnknownOption {
                    field: field.key.clone(),
                    option: opt.to_string(),
                });
            }
        }

        Ok(field)
    }

    fn parse_unit(&mut self, spec: &str) -> Result<(), SchemaFault> {
        let digits = spec.bytes().take_while(u8::is_ascii_digit).count();
        let (mult, unit) = spec.split_at(digits);
        if !mult.is_empty() {
            self.mult = Some(mult.parse().map_err(|_| SchemaFault::InvalidMultiplier {
                field: self.key.clone(),
                value: mult.to_string(),
            })?);
        }
        if !unit.is_empty() {
            self.unit = Some(unit.to_string());
        }
        if unit == "KB" {
            self.mult = Some(1024);
            self.unit = Some("B".to_string());
        }
        Ok(())
    }
}

/// An ordered device-type schema built from a fixed-up descriptor.
#[derive(Debug, Clone)]
pub struct Schema {
    desc: String,
    fields: Vec<SchemaField>,
    by_key: HashMap<String, usize>,
}

impl Schema {
    /// Parse an already fixed-up descriptor.
    pub fn new(desc: &str) -> Result<Self, SchemaFault> {
        let mut fields = Vec::new();
        let mut by_key = HashMap::new();
        for (index, token) in desc.split_whitespace().enumerate() {
            let field = SchemaField::parse(index, token)?;
            if by_key.insert(field.key.clone(), index).is_some() {
                return Err(SchemaFault::DuplicateKey { key: field.key });
            }
            fields.push(field);
        }
        if fields.is_empty() {
            return Err(SchemaFault::Empty);
        }
        Ok(Self {
            desc: desc.to_string(),
            fields,
            by_key,
        })
    }

    /// The descriptor text this schema was built from.
    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, key: &str) -> Option<&SchemaField> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    /// Ordinal of `key` in a data line, if the schema has that field.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc
    }
}

impl Eq for Schema {}

/// Reasons a schema declaration is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaFault {
    /// The type was already declared with a different descriptor.
    Mismatch { type_name: String },
    /// The declaration has no fields.
    Empty,
    /// A descriptor token has no key.
    EmptyKey { token: String },
    /// Two fields share a key.
    DuplicateKey { key: String },
    /// A field option is not one of `C`, `E`, `W=`, `U=`.
    UnknownOption { field: String, option: String },
    /// `W=` is not an integer.
    InvalidWidth { field: String, value: String },
    /// `U=` carries a multiplier that does not fit in 64 bits.
    InvalidMultiplier { field: String, value: String },
}

impl fmt::Display for SchemaFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaFault::Mismatch { type_name } => {
                write!(f, "schema mismatch for type '{type_name}'")
            }
            SchemaFault::Empty => write!(f, "schema declares no fields"),
            SchemaFault::EmptyKey { token } => {
                write!(f, "schema entry '{token}' has no key")
            }
            SchemaFault::DuplicateKey { key } => {
                write!(f, "schema declares '{key}' more than once")
            }
            SchemaFault::UnknownOption { field, option } => {
                write!(f, "unrecognized option '{option}' in schema entry '{field}'")
            }
            SchemaFault::InvalidWidth { field, value } => {
                write!(f, "{field}: invalid width '{value}'")
            }
            SchemaFault::InvalidMultiplier { field, value } => {
                write!(f, "{field}: invalid unit multiplier '{value}'")
            }
        }
    }
}

impl std::error::Error for SchemaFault {}
