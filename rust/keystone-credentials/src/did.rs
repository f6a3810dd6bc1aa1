//! DID (Decentralized Identifier) types.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A [Decentralized Identifier][spec] string.
///
/// Wraps a raw DID string like `did:pkh:eip155:1:0xab...` or
/// `did:key:z6Mk...`. Use [`method()`][Did::method] to inspect the DID
/// method at runtime.
///
/// [spec]: https://www.w3.org/TR/did-core/
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Did(String);

impl Did {
    /// Builds the `did:pkh` identifier of an EVM account on `chain_id`.
    ///
    /// See <https://github.com/w3c-ccg/did-pkh/blob/main/did-pkh-method-draft.md>.
    pub fn pkh(chain_id: u64, address: &str) -> Result<Self, DidParseError> {
        format!("did:pkh:eip155:{chain_id}:{address}").parse()
    }

    /// Get the raw DID string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the DID method name (e.g. `"pkh"` for `did:pkh:...`).
    #[must_use]
    pub fn method(&self) -> &str {
        let after_did = &self.0["did:".len()..];
        after_did.split(':').next().unwrap_or_default()
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error when parsing a DID string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid DID: {0}")]
pub struct DidParseError(pub String);

impl FromStr for Did {
    type Err = DidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix("did:") else {
            return Err(DidParseError(format!("expected did: prefix, got: {s}")));
        };
        match rest.split_once(':') {
            Some((method, identifier)) if !method.is_empty() && !identifier.is_empty() => {
                Ok(Did(s.to_string()))
            }
            _ => Err(DidParseError(format!(
                "expected did:method:identifier, got: {s}"
            ))),
        }
    }
}

impl TryFrom<String> for Did {
    type Error = DidParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for Did {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
