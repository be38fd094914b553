//! Run-scoped cache of device-type schemas.

use std::collections::HashMap;
use std::sync::Arc;

use super::{schema_fixup, Schema, SchemaFault};

/// Schemas seen so far in one host run, keyed by device type.
///
/// The first declaration of a type wins. Later files must declare the same
/// (fixed-up) descriptor, otherwise the declaration is reported as a mismatch
/// and the cached schema is left untouched.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the first sighting of `type_name`, or validate a later one.
    ///
    /// A matching redeclaration returns the cached schema without reparsing.
    /// A declaration that fails to parse is not cached.
    pub fn register_or_validate(
        &mut self,
        type_name: &str,
        desc: &str,
    ) -> Result<Arc<Schema>, SchemaFault> {
        let fixed = schema_fixup(type_name, desc);
        if let Some(schema) = self.schemas.get(type_name) {
            if schema.desc() == fixed {
                return Ok(Arc::clone(schema));
            }
            return Err(SchemaFault::Mismatch {
                type_name: type_name.to_string(),
            });
        }

        let schema = Arc::new(Schema::new(&fixed)?);
        self.schemas
            .insert(type_name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(type_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
