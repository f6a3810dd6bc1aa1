//! Option dictionaries passed to the credential manager.
//!
//! These mirror the `PublicKeyCredentialCreationOptions` and
//! `PublicKeyCredentialRequestOptions` dictionaries of the
//! [Web Authentication API](https://w3c.github.io/webauthn/), and serialize
//! to their JSON forms (camelCase keys, base64url binary fields).

use super::encoding;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// COSE algorithm identifiers, see
/// <https://www.iana.org/assignments/cose/cose.xhtml#algorithms>.
pub mod cose {
    /// ECDSA w/ SHA-256
    pub const ES256: i64 = -7;
    /// EdDSA
    pub const EDDSA: i64 = -8;
    /// ECDSA w/ SHA-384
    pub const ES384: i64 = -35;
    /// ECDSA w/ SHA-512
    pub const ES512: i64 = -36;
    /// RSASSA-PKCS1-v1_5 using SHA-256
    pub const RS256: i64 = -257;
}

/// The only credential type WebAuthn defines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialType {
    /// `"public-key"`
    #[default]
    #[serde(rename = "public-key")]
    PublicKey,
}

/// One acceptable key type for a new credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialParameters {
    /// Credential type.
    #[serde(rename = "type")]
    pub kind: CredentialType,
    /// COSE algorithm identifier.
    pub alg: i64,
}

impl PublicKeyCredentialParameters {
    /// A public-key parameter for `alg`.
    pub const fn public_key(alg: i64) -> Self {
        Self {
            kind: CredentialType::PublicKey,
            alg,
        }
    }

    /// The algorithm preference used when none is configured, most preferred
    /// first.
    pub fn defaults() -> Vec<Self> {
        [cose::ES256, cose::EDDSA, cose::ES384, cose::ES512, cose::RS256]
            .into_iter()
            .map(Self::public_key)
            .collect()
    }
}

/// The relying party a credential is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    /// Domain the credential is bound to. The platform uses the current
    /// origin when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human readable name.
    pub name: String,
}

/// The account a new credential is created for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// Opaque user handle.
    #[serde(with = "encoding")]
    pub id: Vec<u8>,
    /// Account name, e.g. an email address.
    pub name: String,
    /// Name shown to the user.
    pub display_name: String,
}

/// How the client may reach an authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum AuthenticatorTransport {
    Usb,
    Nfc,
    Ble,
    SmartCard,
    Hybrid,
    Internal,
}

/// Refers to an existing credential, in allow and exclude lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    /// Credential type.
    #[serde(rename = "type", default)]
    pub kind: CredentialType,
    /// Raw credential id.
    #[serde(with = "encoding")]
    pub id: Vec<u8>,
    /// Transport hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

impl CredentialDescriptor {
    /// A public-key descriptor for the credential `id`.
    pub fn new(id: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: CredentialType::PublicKey,
            id: id.into(),
            transports: None,
        }
    }
}

/// Where an authenticator is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    /// Built into the device.
    Platform,
    /// Roaming, e.g. a security key.
    CrossPlatform,
}

/// Whether the credential must be discoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ResidentKeyRequirement {
    Discouraged,
    Preferred,
    Required,
}

/// Whether the authenticator must verify the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum UserVerification {
    Required,
    Preferred,
    Discouraged,
}

/// Which attestation statement the relying party wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum AttestationConveyance {
    None,
    Indirect,
    Direct,
    Enterprise,
}

/// Constraints on the authenticator used to create a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub resident_key: Option<ResidentKeyRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub require_resident_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub user_verification: Option<UserVerification>,
}

/// Client extension inputs, passed through untouched.
pub type ExtensionInputs = Map<String, Value>;

/// Options for `navigator.credentials.create()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCreationOptions {
    /// Relying party.
    pub rp: RelyingParty,
    /// Account the credential belongs to.
    pub user: UserEntity,
    /// Random challenge.
    #[serde(with = "encoding")]
    pub challenge: Vec<u8>,
    /// Acceptable key types, most preferred first.
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,
    /// Ceremony timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    /// Credentials the user already holds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<CredentialDescriptor>,
    /// Authenticator constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelection>,
    /// Attestation preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationConveyance>,
    /// Client extension inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ExtensionInputs>,
}

/// Options for `navigator.credentials.get()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequestOptions {
    /// Random challenge.
    #[serde(with = "encoding")]
    pub challenge: Vec<u8>,
    /// Ceremony timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    /// Relying party id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    /// Credentials that may answer. Empty means any discoverable credential.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<CredentialDescriptor>,
    /// User verification policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerification>,
    /// Client extension inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ExtensionInputs>,
}
