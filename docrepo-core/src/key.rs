//! Entity identifiers and their mapping to the store's native identifier.

use bson::{Bson, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

use crate::error::{RepositoryError, RepositoryResult};

/// The public identifier type of an entity.
///
/// Stores assign identifiers natively (an [`ObjectId`] for both shipped backends).
/// An `EntityKey` converts between that native encoding and the key type exposed on
/// the entity's `id` attribute.
pub trait EntityKey: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Converts this key to the store's native identifier.
    ///
    /// Returns `None` when the key is not a valid store key. Lookups treat such keys
    /// as "not found" without querying the store.
    fn to_native(&self) -> Option<Bson>;

    /// Converts a native identifier (or a dynamic input value) back into a key.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidDocument`] if the value cannot represent a key.
    fn from_native(native: &Bson) -> RepositoryResult<Self>;
}

impl EntityKey for ObjectId {
    fn to_native(&self) -> Option<Bson> {
        Some(Bson::ObjectId(*self))
    }

    fn from_native(native: &Bson) -> RepositoryResult<Self> {
        match native {
            Bson::ObjectId(oid) => Ok(*oid),
            Bson::String(hex) => ObjectId::parse_str(hex)
                .map_err(|e| RepositoryError::InvalidDocument(e.to_string())),
            other => Err(RepositoryError::InvalidDocument(format!(
                "expected an object id, found {:?}",
                other.element_type()
            ))),
        }
    }
}

/// Hex-encoded object ids. Any string is accepted as a key, but only valid hex
/// object ids reach the store.
impl EntityKey for String {
    fn to_native(&self) -> Option<Bson> {
        ObjectId::parse_str(self)
            .ok()
            .map(Bson::ObjectId)
    }

    fn from_native(native: &Bson) -> RepositoryResult<Self> {
        match native {
            Bson::ObjectId(oid) => Ok(oid.to_hex()),
            Bson::String(value) => Ok(value.clone()),
            other => Err(RepositoryError::InvalidDocument(format!(
                "expected a string or object id, found {:?}",
                other.element_type()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_keys_only_reach_the_store_when_well_formed() {
        let oid = ObjectId::new();

        assert_eq!(oid.to_hex().to_native(), Some(Bson::ObjectId(oid)));
        assert_eq!("invalidId".to_string().to_native(), None);
        assert_eq!(String::new().to_native(), None);
    }

    #[test]
    fn native_object_ids_map_back_to_hex_strings() {
        let oid = ObjectId::new();

        assert_eq!(String::from_native(&Bson::ObjectId(oid)).unwrap(), oid.to_hex());
        assert!(String::from_native(&Bson::Int32(3)).is_err());
    }

    #[test]
    fn object_id_keys_accept_hex_input() {
        let oid = ObjectId::new();

        assert_eq!(ObjectId::from_native(&Bson::String(oid.to_hex())).unwrap(), oid);
        assert!(ObjectId::from_native(&Bson::String("nope".into())).is_err());
    }
}
