//! Wallet capability used by the wallet sign-in strategy.
//!
//! A [`WalletProvider`] is the host's account holder: it lists the accounts
//! the user has authorized, asks for permission when there are none, reports
//! the active chain and signs messages. Hosts that only expose a raw
//! EIP-1193 `request` function can wrap it with [`Web3Provider`].

mod eip1193;
pub use eip1193::*;

use async_trait::async_trait;
use keystone_common::{ConditionalSend, ConditionalSync};

/// Errors surfaced by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// The user declined the request.
    #[error("request rejected by user: {0}")]
    Rejected(String),

    /// The wallet answered with a JSON-RPC error.
    #[error("wallet RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Human readable description.
        message: String,
    },

    /// The wallet exposes no authorized account.
    #[error("no authorized account")]
    NoAccount,

    /// The wallet answered with something that could not be interpreted.
    #[error("invalid wallet response: {0}")]
    InvalidResponse(String),

    /// The wallet could not be reached.
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// A connected wallet.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait WalletProvider: ConditionalSend + ConditionalSync {
    /// Accounts the user has already authorized, possibly none.
    async fn accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Prompts the user to authorize accounts and returns them.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Returns `true` when the wallet negotiates account permissions on its
    /// own (bridged wallets such as WalletConnect) and must not be prompted.
    fn manages_permissions(&self) -> bool {
        false
    }

    /// The active account.
    async fn address(&self) -> Result<String, WalletError> {
        self.accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(WalletError::NoAccount)
    }

    /// The active chain.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Signs `message` with the active account (EIP-191 personal message).
    async fn sign_message(&self, message: &str) -> Result<String, WalletError>;
}
