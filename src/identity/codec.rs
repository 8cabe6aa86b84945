//! List identifier encoding.
//!
//! Numeric record keys are published as short salted hashids. The encoding is
//! reversible and one-to-one; it hides the sequential key order from casual
//! inspection but is not a security boundary.

use std::fmt;

use harsh::{Harsh, HarshBuilder};
use serde::{Deserialize, Serialize};

use crate::config::{LIST_ID_ALPHABET, LIST_ID_MIN_LENGTH, LIST_ID_SALT};
use crate::error_handling::InitializationError;

/// Public handle of a combined list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(String);

impl ListId {
    /// Wraps an identifier received from outside (CLI argument, URL segment).
    ///
    /// The value is not checked here; [`IdCodec::decode`] decides whether it is known.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encodes record keys into [`ListId`]s and back.
#[derive(Debug, Clone)]
pub struct IdCodec {
    harsh: Harsh,
}

impl IdCodec {
    /// Codec with the service's published salt, alphabet and minimum length.
    pub fn new() -> Result<Self, InitializationError> {
        Self::with_salt(LIST_ID_SALT)
    }

    /// Codec with a custom salt (same alphabet and minimum length).
    pub fn with_salt(salt: &str) -> Result<Self, InitializationError> {
        let harsh = HarshBuilder::new()
            .salt(salt)
            .length(LIST_ID_MIN_LENGTH)
            .alphabet(LIST_ID_ALPHABET)
            .build()
            .map_err(|e| InitializationError::IdCodecError(e.to_string()))?;
        Ok(Self { harsh })
    }

    /// Encodes a record key.
    pub fn encode(&self, key: i64) -> ListId {
        ListId(self.harsh.encode(&[key.unsigned_abs()]))
    }

    /// Decodes an identifier; `None` if it is not a valid single-key encoding.
    pub fn decode(&self, id: &ListId) -> Option<i64> {
        match self.harsh.decode(id.as_str()) {
            Ok(values) if values.len() == 1 => i64::try_from(values[0]).ok().filter(|k| *k > 0),
            _ => None,
        }
    }
}
