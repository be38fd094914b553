//! Decoding of data lines into typed counter values.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::fault::LineFault;
use crate::schema::Schema;

/// One decoded data line: `<type> <device> <value>...`.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub type_name: String,
    pub device: String,
    schema: Arc<Schema>,
    values: Vec<u64>,
}

impl DecodedRecord {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Value of the field named `key`.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.schema.index_of(key).map(|i| self.values[i])
    }

    /// Sum of the named fields, or the first field the schema lacks.
    pub fn sum_of<S: AsRef<str>>(&self, keys: &[S]) -> Result<u64, String> {
        keys.iter().try_fold(0u64, |acc, key| {
            let key = key.as_ref();
            self.get(key)
                .map(|v| acc.saturating_add(v))
                .ok_or_else(|| key.to_string())
        })
    }
}

/// File-local schema table plus the bookkeeping for rate-limited warnings.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    schemas: HashMap<String, Arc<Schema>>,
    mismatched: HashSet<String>,
    unknown_seen: HashSet<String>,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `schema` the active schema for `type_name` in this file.
    ///
    /// A type that mismatched earlier stays dropped for the rest of the file.
    pub fn insert_schema(&mut self, type_name: &str, schema: Arc<Schema>) {
        if self.mismatched.contains(type_name) {
            return;
        }
        self.schemas.insert(type_name.to_string(), schema);
    }

    /// Drop `type_name` for the rest of the file.
    ///
    /// Returns true the first time, so the caller reports the mismatch once.
    pub fn mark_mismatched(&mut self, type_name: &str) -> bool {
        self.schemas.remove(type_name);
        self.mismatched.insert(type_name.to_string())
    }

    pub fn schema(&self, type_name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(type_name)
    }

    pub fn has_schemas(&self) -> bool {
        !self.schemas.is_empty()
    }

    /// Decode a trimmed data line.
    pub fn decode(&mut self, line: &str) -> Result<DecodedRecord, LineFault> {
        let mut tokens = line.split_whitespace();
        let (Some(type_name), Some(device)) = (tokens.next(), tokens.next()) else {
            return Err(LineFault::DataSyntax);
        };

        let Some(schema) = self.schemas.get(type_name) else {
            if self.mismatched.contains(type_name) {
                return Err(LineFault::MismatchedType {
                    type_name: type_name.to_string(),
                });
            }
            let first = self.unknown_seen.insert(type_name.to_string());
            return Err(LineFault::UnknownType {
                type_name: type_name.to_string(),
                first,
            });
        };

        let raw: Vec<&str> = tokens.collect();
        if raw.len() != schema.len() {
            return Err(LineFault::FieldCountMismatch {
                type_name: type_name.to_string(),
                expected: schema.len(),
                got: raw.len(),
            });
        }

        let values = raw
            .iter()
            .map(|token| {
                token.parse::<u64>().map_err(|_| LineFault::InvalidValue {
                    type_name: type_name.to_string(),
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<u64>, LineFault>>()?;

        Ok(DecodedRecord {
            type_name: type_name.to_string(),
            device: device.to_string(),
            schema: Arc::clone(schema),
            values,
        })
    }
}
