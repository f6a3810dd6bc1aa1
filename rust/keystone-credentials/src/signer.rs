//! Uniform signing surface over wallet and platform keys.
//!
//! Every signing backend exposes the same [`Signer`] operations: a [`Did`],
//! the verification method id it signs with, `sign`, and the reserved
//! `delegate` / `invoke` operations for capability-based authorization.
//! Account-backed signers additionally implement [`AccountSigner`].

use crate::{Did, DidParseError, WalletError, WalletProvider};
use async_trait::async_trait;
use keystone_common::{ConditionalSend, ConditionalSync};
use std::sync::Arc;

/// Errors from signing operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignerError {
    /// The operation is reserved and has no implementation yet.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// The backing wallet failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// The signer could not derive a valid DID.
    #[error(transparent)]
    InvalidDid(#[from] DidParseError),
}

/// Produces signatures on behalf of a DID.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Signer: ConditionalSend + ConditionalSync {
    /// The identity this signer speaks for.
    fn did(&self) -> &Did;

    /// The verification method used for signatures, as a DID URL.
    fn key_id(&self) -> &str;

    /// Signs `message` and returns the encoded signature.
    async fn sign(&self, message: &str) -> Result<String, SignerError>;

    /// Issues a capability delegation.
    async fn delegate(&self) -> Result<String, SignerError> {
        Err(SignerError::NotImplemented("delegate"))
    }

    /// Issues a capability invocation.
    async fn invoke(&self) -> Result<String, SignerError> {
        Err(SignerError::NotImplemented("invoke"))
    }
}

/// A [`Signer`] bound to a blockchain account.
pub trait AccountSigner: Signer {
    /// The account address.
    fn address(&self) -> &str;

    /// The chain the account was connected on.
    fn chain_id(&self) -> u64;
}

/// [`Signer`] backed by the active account of a [`WalletProvider`].
///
/// The account and chain are captured when the signer is created. A wallet
/// that switches accounts afterwards needs a new signer.
#[derive(Clone)]
pub struct WalletSigner {
    provider: Arc<dyn WalletProvider>,
    address: String,
    chain_id: u64,
    did: Did,
    key_id: String,
}

impl std::fmt::Debug for WalletSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSigner")
            .field("did", &self.did)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl WalletSigner {
    /// Binds a signer to the wallet's current account and chain.
    pub async fn connect(provider: Arc<dyn WalletProvider>) -> Result<Self, SignerError> {
        let address = provider.address().await?;
        let chain_id = provider.chain_id().await?;
        let did = Did::pkh(chain_id, &address)?;
        let key_id = format!("{did}#blockchainAccountId");

        tracing::debug!(%did, "bound wallet signer");

        Ok(Self {
            provider,
            address,
            chain_id,
            did,
            key_id,
        })
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Signer for WalletSigner {
    fn did(&self) -> &Did {
        &self.did
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn sign(&self, message: &str) -> Result<String, SignerError> {
        Ok(self.provider.sign_message(message).await?)
    }
}

impl AccountSigner for WalletSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }
}
