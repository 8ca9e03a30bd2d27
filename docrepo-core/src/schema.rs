//! Field schemas bound to a collection.
//!
//! A [`Schema`] describes the create payload of an entity. Backends receive it once
//! through `bind_model` and use [`Schema::conform`] to validate every payload, the
//! way a document store enforces its collection schema.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{
    error::{RepositoryError, RepositoryResult},
    storable::RESERVED_FIELDS,
};

/// The accepted BSON kind of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    /// Any of int32, int64 or double.
    Number,
    Boolean,
    Date,
    ObjectId,
    Array,
    Document,
    /// Accepts every value.
    Any,
}

impl FieldKind {
    fn accepts(&self, value: &Bson) -> bool {
        match self {
            FieldKind::String => matches!(value, Bson::String(_)),
            FieldKind::Number => matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)),
            FieldKind::Boolean => matches!(value, Bson::Boolean(_)),
            FieldKind::Date => matches!(value, Bson::DateTime(_)),
            FieldKind::ObjectId => matches!(value, Bson::ObjectId(_)),
            FieldKind::Array => matches!(value, Bson::Array(_)),
            FieldKind::Document => matches!(value, Bson::Document(_)),
            FieldKind::Any => true,
        }
    }
}

/// A single declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

/// Ordered list of the fields a collection accepts.
///
/// # Example
///
/// ```ignore
/// use docrepo::schema::{Schema, FieldKind};
///
/// let schema = Schema::new()
///     .required("name", FieldKind::String)
///     .optional("age", FieldKind::Number);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declares a field that must be present and non-null on create.
    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSchema { name: name.into(), kind, required: true });
        self
    }

    /// Declares a field that may be absent or null on create.
    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSchema { name: name.into(), kind, required: false });
        self
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|field| field.name == name)
    }

    /// Checks that the schema itself is well formed.
    ///
    /// Field names must be non-empty, unique, free of `.` and of a leading `$`, and
    /// must not collide with store-managed attributes.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidSchema`] describing the first offending field.
    pub fn check(&self) -> RepositoryResult<()> {
        let mut seen = HashSet::new();

        for field in &self.fields {
            let name = field.name.as_str();

            if name.is_empty() {
                return Err(RepositoryError::InvalidSchema("field names cannot be empty".into()));
            }
            if name.contains('.') || name.starts_with('$') {
                return Err(RepositoryError::InvalidSchema(format!(
                    "field `{}` cannot contain `.` or start with `$`",
                    name
                )));
            }
            if RESERVED_FIELDS.contains(&name) {
                return Err(RepositoryError::InvalidSchema(format!(
                    "field `{}` is managed by the store",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(RepositoryError::InvalidSchema(format!(
                    "field `{}` is declared twice",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Validates a create payload and keeps only the declared fields.
    ///
    /// Undeclared fields are dropped. Absent optional fields stay absent.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Validation`] if a required field is missing or null,
    /// or if a field holds a value of the wrong kind.
    pub fn conform(&self, payload: &Document) -> RepositoryResult<Document> {
        let mut conformed = Document::new();

        for field in &self.fields {
            match payload.get(&field.name) {
                None | Some(Bson::Null) if field.required => {
                    return Err(RepositoryError::Validation(format!(
                        "field `{}` is required",
                        field.name
                    )));
                }
                None | Some(Bson::Null) => {}
                Some(value) if !field.kind.accepts(value) => {
                    return Err(RepositoryError::Validation(format!(
                        "field `{}` expected {:?}, found {:?}",
                        field.name,
                        field.kind,
                        value.element_type()
                    )));
                }
                Some(value) => {
                    conformed.insert(field.name.clone(), value.clone());
                }
            }
        }

        Ok(conformed)
    }
}
