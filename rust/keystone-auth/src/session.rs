//! Sign-in message drafts and the sessions they turn into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A partial sign-in message draft.
///
/// Every field is optional so that a draft can be assembled from several
/// sources (defaults, the server nonce, extensions, the caller) with
/// [`SessionConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Address the session is issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Chain the address lives on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Domain requesting the sign-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// URI the session is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Message version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Human readable statement shown to the signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    /// Replay protection nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// When the message was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    /// When the session expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<DateTime<Utc>>,
    /// When the session becomes valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    /// System specific request identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Resources the signer asks to be granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

impl SessionConfig {
    /// Returns a draft where every field set in `overrides` replaces the
    /// corresponding field of `self`.
    #[must_use]
    pub fn merge(self, overrides: SessionConfig) -> Self {
        Self {
            address: overrides.address.or(self.address),
            chain_id: overrides.chain_id.or(self.chain_id),
            domain: overrides.domain.or(self.domain),
            uri: overrides.uri.or(self.uri),
            version: overrides.version.or(self.version),
            statement: overrides.statement.or(self.statement),
            nonce: overrides.nonce.or(self.nonce),
            issued_at: overrides.issued_at.or(self.issued_at),
            expiration_time: overrides.expiration_time.or(self.expiration_time),
            not_before: overrides.not_before.or(self.not_before),
            request_id: overrides.request_id.or(self.request_id),
            resources: overrides.resources.or(self.resources),
        }
    }

    /// Returns `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// ENS records resolved for an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsData {
    /// Primary ENS name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl EnsData {
    /// Returns `true` if nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.domain.is_none() && self.avatar_url.is_none()
    }
}

/// Which ENS records to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsResolveOptions {
    /// Resolve the primary name.
    pub domain: bool,
    /// Resolve the avatar.
    pub avatar: bool,
}

impl Default for EnsResolveOptions {
    fn default() -> Self {
        Self {
            domain: true,
            avatar: true,
        }
    }
}

/// A page of Lens profiles owned by an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LensProfilesPage {
    /// Profiles on this page, as returned by the Lens API.
    pub items: Vec<Value>,
    /// Cursors to the neighbouring pages.
    #[serde(default)]
    pub page_info: LensPageInfo,
}

/// Pagination cursors of a [`LensProfilesPage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct LensPageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

/// Result of a Lens lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LensProfiles {
    /// A page of profiles.
    Page(LensProfilesPage),
    /// A status message, e.g. when Lens is not deployed on the chain.
    Message(String),
}

impl LensProfiles {
    /// Returns `true` when the lookup produced nothing worth keeping.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Message(message) if message.is_empty())
    }
}

/// An established session.
///
/// Sessions are only created once the server (if any) has confirmed the
/// signed message. Fields returned by the server that have no dedicated
/// field here are preserved in [`ClientSession::extra`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSession {
    /// Address the session speaks for. Differs from `wallet_address` when
    /// signing on behalf of a delegator.
    pub address: String,
    /// Address of the wallet that signed.
    pub wallet_address: String,
    /// Chain the session was issued on.
    pub chain_id: u64,
    /// Key identifying the session, produced by the session builder.
    pub session_key: String,
    /// The signed message.
    pub siwe: String,
    /// Signature over `siwe`.
    pub signature: String,
    /// ENS records, when resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ens: Option<EnsData>,
    /// Lens profiles, when resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens: Option<LensProfiles>,
    /// Any other field returned by the server.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClientSession {
    /// Returns a session with `fields` laid over this one. On overlap the
    /// given fields win.
    pub fn merge_server_fields(self, fields: Map<String, Value>) -> Result<Self, serde_json::Error> {
        if fields.is_empty() {
            return Ok(self);
        }
        let mut merged = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merged.extend(fields);
        serde_json::from_value(Value::Object(merged))
    }
}
