//! Sign-in strategies.

mod lifecycle;
pub mod wallet;
pub mod webauthn;

pub use lifecycle::SessionLifecycle;
pub use wallet::{Connection, WalletSource, WalletState, WalletStrategy};
pub use webauthn::WebAuthnStrategy;

use crate::{AuthError, ClientConfig, ClientSession};

/// One of the supported ways to sign in.
#[derive(Debug)]
pub enum AuthStrategy {
    /// Wallet signature.
    Wallet(WalletStrategy),
    /// Platform credential.
    WebAuthn(WebAuthnStrategy),
}

impl AuthStrategy {
    fn lifecycle(&self) -> &SessionLifecycle {
        match self {
            Self::Wallet(strategy) => strategy.lifecycle(),
            Self::WebAuthn(strategy) => strategy.lifecycle(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &ClientConfig {
        self.lifecycle().config()
    }

    /// Returns `true` when exactly one extension uses `namespace`.
    pub fn is_extension_enabled(&self, namespace: &str) -> bool {
        self.lifecycle().is_extension_enabled(namespace)
    }

    /// The established session, for strategies that produce one.
    pub fn client_session(&self) -> Result<Option<&ClientSession>, AuthError> {
        match self {
            Self::Wallet(strategy) => Ok(strategy.client_session()),
            Self::WebAuthn(strategy) => strategy.client_session().map(Some),
        }
    }

    /// Ends the session.
    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        match self {
            Self::Wallet(strategy) => strategy.sign_out().await,
            Self::WebAuthn(strategy) => strategy.sign_out().await,
        }
    }
}

impl From<WalletStrategy> for AuthStrategy {
    fn from(strategy: WalletStrategy) -> Self {
        Self::Wallet(strategy)
    }
}

impl From<WebAuthnStrategy> for AuthStrategy {
    fn from(strategy: WebAuthnStrategy) -> Self {
        Self::WebAuthn(strategy)
    }
}
