//! Common types for the environment abstraction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a discovered object instance.
///
/// Resolved by the session layer; the verifier only uses it as a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub String);

impl ObjectId {
    /// Creates an ObjectId from an object instance name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the object name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One reflected spatial attribute update.
///
/// `payload` is the encoded spatial variant record; `tag` is the
/// user-supplied tag that travels alongside it (the time tag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    /// The object the update belongs to
    pub object: ObjectId,

    /// Raw spatial attribute bytes
    pub payload: Vec<u8>,

    /// User-supplied tag bytes
    pub tag: Vec<u8>,
}

impl AttributeUpdate {
    /// Creates a new update.
    pub fn new(object: impl Into<ObjectId>, payload: Vec<u8>, tag: Vec<u8>) -> Self {
        Self {
            object: object.into(),
            payload,
            tag,
        }
    }
}
