//! Sign-in with a platform credential.
//!
//! Unlike wallet sign-in this is a bare credential ceremony: nothing is
//! exchanged with the server and no [`ClientSession`] is produced.

use super::SessionLifecycle;
use crate::{AuthError, ClientConfig, ClientSession, Extension};
use keystone_common::generate_nonce;
use keystone_credentials::webauthn::{
    CeremonyOptions, Credential, CredentialCreationOptions, CredentialDescriptor,
    CredentialManager, CredentialRequestOptions, PublicKeyCredentialParameters, UserEntity,
    with_abort,
};
use std::sync::Arc;

/// Registers and asserts platform credentials.
pub struct WebAuthnStrategy {
    lifecycle: SessionLifecycle,
    manager: Arc<dyn CredentialManager>,
    credential: Option<Credential>,
}

impl std::fmt::Debug for WebAuthnStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebAuthnStrategy")
            .field("lifecycle", &self.lifecycle)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl WebAuthnStrategy {
    /// Creates a strategy running ceremonies through `manager`.
    pub fn new(config: ClientConfig, manager: Arc<dyn CredentialManager>) -> Self {
        Self {
            lifecycle: SessionLifecycle::new(config),
            manager,
            credential: None,
        }
    }

    /// Registers `extension`.
    pub fn extend(&mut self, extension: Arc<dyn Extension>) {
        self.lifecycle.extend(extension);
    }

    /// Creates a new credential for the given user and keeps it.
    #[tracing::instrument(level = "debug", skip(self, user_id, ceremony))]
    pub async fn register(
        &mut self,
        user_id: &[u8],
        name: &str,
        display_name: &str,
        ceremony: CeremonyOptions,
    ) -> Result<Credential, AuthError> {
        let options = self.creation_options(user_id, name, display_name)?;

        let credential = with_abort(
            ceremony.signal.as_ref(),
            self.manager.create(&options, &ceremony),
        )
        .await
        .inspect_err(|error| tracing::error!(%error, "registration ceremony failed"))?;

        tracing::debug!(id = %credential.id, "credential registered");
        self.credential = Some(credential.clone());
        Ok(credential)
    }

    /// Same as [`WebAuthnStrategy::register`].
    pub async fn sign_up(
        &mut self,
        user_id: &[u8],
        name: &str,
        display_name: &str,
        ceremony: CeremonyOptions,
    ) -> Result<Credential, AuthError> {
        self.register(user_id, name, display_name, ceremony).await
    }

    /// Asserts a credential and keeps it. Without `allow_credentials` the
    /// configured allow list is used.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn sign_in(
        &mut self,
        allow_credentials: Option<Vec<CredentialDescriptor>>,
        ceremony: CeremonyOptions,
    ) -> Result<Credential, AuthError> {
        let options = self.request_options(allow_credentials);

        let credential = with_abort(
            ceremony.signal.as_ref(),
            self.manager.get(&options, &ceremony),
        )
        .await
        .inspect_err(|error| tracing::error!(%error, "assertion ceremony failed"))?;

        tracing::debug!(id = %credential.id, "credential asserted");
        self.credential = Some(credential.clone());
        Ok(credential)
    }

    fn creation_options(
        &self,
        user_id: &[u8],
        name: &str,
        display_name: &str,
    ) -> Result<CredentialCreationOptions, AuthError> {
        let creation = &self.lifecycle.config().web_authn.creation;

        let pub_key_cred_params = match &creation.pub_key_cred_params {
            Some(params) if params.is_empty() => {
                tracing::error!("empty public key algorithm list");
                return Err(AuthError::InvalidAlgorithmList);
            }
            Some(params) => params.clone(),
            None => PublicKeyCredentialParameters::defaults(),
        };

        Ok(CredentialCreationOptions {
            rp: creation.rp.clone(),
            user: UserEntity {
                id: user_id.to_vec(),
                name: name.to_string(),
                display_name: display_name.to_string(),
            },
            challenge: creation
                .generate_challenge
                .as_ref()
                .map(|generator| generator.generate())
                .unwrap_or_else(|| generate_nonce().into_bytes()),
            pub_key_cred_params,
            timeout: creation.timeout,
            exclude_credentials: creation.exclude_credentials.clone(),
            authenticator_selection: creation.authenticator_selection.clone(),
            attestation: creation.attestation,
            extensions: creation.extensions.clone(),
        })
    }

    fn request_options(
        &self,
        allow_credentials: Option<Vec<CredentialDescriptor>>,
    ) -> CredentialRequestOptions {
        let request = &self.lifecycle.config().web_authn.request;

        CredentialRequestOptions {
            challenge: request
                .generate_challenge
                .as_ref()
                .map(|generator| generator.generate())
                .unwrap_or_else(|| generate_nonce().into_bytes()),
            timeout: request.timeout,
            rp_id: request.rp_id.clone(),
            allow_credentials: allow_credentials
                .unwrap_or_else(|| request.allow_credentials.clone()),
            user_verification: request.user_verification,
            extensions: request.extensions.clone(),
        }
    }

    /// Returns `true` while a credential is held.
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// The credential from the last ceremony.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// The configuration.
    pub fn config(&self) -> &ClientConfig {
        self.lifecycle.config()
    }

    /// Returns `true` when exactly one extension uses `namespace`.
    pub fn is_extension_enabled(&self, namespace: &str) -> bool {
        self.lifecycle.is_extension_enabled(namespace)
    }

    /// Not supported by WebAuthn sign-in.
    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        Err(AuthError::NotImplemented("WebAuthn sign-out"))
    }

    /// Not supported by WebAuthn sign-in.
    pub fn signer(&self) -> Result<(), AuthError> {
        Err(AuthError::NotImplemented("WebAuthn signer"))
    }

    /// Not supported by WebAuthn sign-in.
    pub fn session(&self) -> Result<(), AuthError> {
        Err(AuthError::NotImplemented("WebAuthn session"))
    }

    /// Not supported by WebAuthn sign-in.
    pub fn client_session(&self) -> Result<&ClientSession, AuthError> {
        Err(AuthError::NotImplemented("WebAuthn client session"))
    }

    pub(crate) fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }
}
