//! One document under construction

use crate::index::FieldValue;

use super::errors::{BuildError, BuildResult};
use super::{IndexOption, LengthHint};

/// A field value with its index settings
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldEntry {
    pub name: String,
    pub value: Vec<u8>,
    pub option: IndexOption,
    pub hint: LengthHint,
}

/// Collects the indexed fields and the payload of one document.
///
/// Filterable fields may carry several values; sortable and full fields
/// carry at most one.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    pub(crate) fields: Vec<FieldEntry>,
    pub(crate) payload: Option<Vec<u8>>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an indexed field value
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
        option: IndexOption,
        hint: LengthHint,
    ) -> BuildResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::empty_field_name());
        }
        if let Some(existing) = self.fields.iter().find(|f| f.name == name) {
            if existing.option != option || existing.hint != hint {
                return Err(BuildError::field(name, "conflicting index options"));
            }
            if option.is_sortable() {
                return Err(BuildError::field(name, "sortable field set twice"));
            }
        }
        self.fields.push(FieldEntry {
            name,
            value: value.into().encode(),
            option,
            hint,
        });
        Ok(self)
    }

    /// Sets the opaque payload; allowed once
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> BuildResult<Self> {
        if self.payload.is_some() {
            return Err(BuildError::payload_set_twice());
        }
        self.payload = Some(payload.into());
        Ok(self)
    }

    /// Number of field values
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}
