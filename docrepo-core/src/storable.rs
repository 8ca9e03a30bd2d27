//! Core traits for persisted entities and their conversion to and from store records.
//!
//! Every entity carries three store-managed attributes: `id`, `createdAt` and
//! `updatedAt`. They are assigned by the store on create and are never part of the
//! payload a caller hands to the repository.

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

use crate::{
    error::{RepositoryError, RepositoryResult},
    key::EntityKey,
};

/// Public name of the identifier attribute.
pub const ID_FIELD: &str = "id";
/// Native name of the identifier attribute in store records.
pub const NATIVE_ID_FIELD: &str = "_id";
/// Creation timestamp attribute, stamped by the store.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Last-update timestamp attribute, stamped by the store.
pub const UPDATED_AT_FIELD: &str = "updatedAt";
/// Store-internal version counter.
pub const VERSION_FIELD: &str = "__v";

/// Field names that callers can never supply or declare in a schema.
pub const RESERVED_FIELDS: [&str; 5] = [
    ID_FIELD,
    NATIVE_ID_FIELD,
    CREATED_AT_FIELD,
    UPDATED_AT_FIELD,
    VERSION_FIELD,
];

/// Trait that all entities persisted through a repository must implement.
///
/// The entity type serializes with the public attribute names (`id`, `createdAt`,
/// `updatedAt`) next to its own fields. Its [`Properties`](Storable::Properties)
/// type is the same shape without the store-managed attributes.
///
/// # Example
///
/// ```ignore
/// use bson::DateTime;
/// use docrepo::storable::Storable;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// pub struct User {
///     pub id: String,
///     pub created_at: DateTime,
///     pub updated_at: DateTime,
///     pub name: String,
/// }
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct UserProperties {
///     pub name: String,
/// }
///
/// impl Storable for User {
///     type Key = String;
///     type Properties = UserProperties;
///
///     fn id(&self) -> &String { &self.id }
/// }
/// ```
pub trait Storable: Serialize + DeserializeOwned + Debug + Clone + Send + Sync + 'static {
    /// The public identifier type of this entity.
    type Key: EntityKey;

    /// The payload shape accepted on create.
    type Properties: Serialize + Send + Sync + 'static;

    /// Returns this entity's identifier.
    fn id(&self) -> &Self::Key;
}

/// Serializes a create payload into a document, rejecting store-managed attributes.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidDocument`] if the properties do not serialize to
/// a document, or [`RepositoryError::Validation`] if they carry a reserved attribute.
pub fn properties_to_payload<P: Serialize>(properties: &P) -> RepositoryResult<Document> {
    let payload = match serialize_to_bson(properties)? {
        Bson::Document(document) => document,
        other => {
            return Err(RepositoryError::InvalidDocument(format!(
                "properties must serialize to a document, found {:?}",
                other.element_type()
            )));
        }
    };

    if let Some(field) = RESERVED_FIELDS
        .iter()
        .find(|field| payload.contains_key(**field))
    {
        return Err(RepositoryError::Validation(format!(
            "field `{}` is managed by the store and cannot be supplied on create",
            field
        )));
    }

    Ok(payload)
}

/// Rebuilds a typed entity from a raw store record.
///
/// Store bookkeeping is dropped and the native identifier is mapped to the public
/// `id` attribute through [`EntityKey::from_native`].
///
/// # Errors
///
/// Returns an error if the record has no identifier or does not deserialize into `S`.
pub fn record_to_entity<S: Storable>(mut record: Document) -> RepositoryResult<S> {
    let native = record
        .remove(NATIVE_ID_FIELD)
        .ok_or_else(|| RepositoryError::InvalidDocument("record has no `_id`".into()))?;
    record.remove(VERSION_FIELD);

    let key = S::Key::from_native(&native)?;
    record.insert(ID_FIELD, serialize_to_bson(&key)?);

    Ok(deserialize_from_bson(Bson::Document(record))?)
}

/// Rebuilds typed entities from raw store records, failing on the first bad record.
pub fn records_to_entities<S: Storable>(records: Vec<Document>) -> RepositoryResult<Vec<S>> {
    records
        .into_iter()
        .map(record_to_entity)
        .collect()
}
