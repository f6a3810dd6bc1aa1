use super::{AuthenticatorAttachment, AuthenticatorTransport, CredentialType, encoding};
use serde::{Deserialize, Serialize};

/// A public-key credential returned by a registration or assertion ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// base64url form of `raw_id`.
    pub id: String,
    /// Raw credential id.
    #[serde(with = "encoding")]
    pub raw_id: Vec<u8>,
    /// Credential type.
    #[serde(rename = "type", default)]
    pub kind: CredentialType,
    /// The attachment of the authenticator that answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    /// The authenticator's response.
    pub response: AuthenticatorResponse,
}

impl Credential {
    /// Returns `true` for credentials produced by a registration ceremony.
    pub fn is_attestation(&self) -> bool {
        matches!(self.response, AuthenticatorResponse::Attestation(_))
    }
}

/// Either half of the ceremony pair.
///
/// The two shapes are told apart by their fields: only attestations carry
/// `attestationObject`, only assertions carry `signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthenticatorResponse {
    /// Answer to `create()`.
    Attestation(AttestationResponse),
    /// Answer to `get()`.
    Assertion(AssertionResponse),
}

/// `AuthenticatorAttestationResponse`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON", with = "encoding")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "encoding")]
    pub attestation_object: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<AuthenticatorTransport>,
}

/// `AuthenticatorAssertionResponse`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON", with = "encoding")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "encoding")]
    pub authenticator_data: Vec<u8>,
    #[serde(with = "encoding")]
    pub signature: Vec<u8>,
    #[serde(
        default,
        with = "encoding::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_handle: Option<Vec<u8>>,
}
