use crate::{ExtensionError, ResolveError, RouteError, SessionBuilderError};
use keystone_credentials::{SignerError, WalletError, webauthn::CredentialError};
use thiserror::Error;

/// Errors surfaced by the sign-in strategies.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The wallet handshake or permission request failed.
    #[error("failed to connect to the wallet provider: {0}")]
    ProviderConnection(#[source] WalletError),

    /// The session builder did not produce a session key.
    #[error("unable to retrieve session key")]
    SessionKeyUnavailable,

    /// Requesting a nonce from the server failed.
    #[error("unable to retrieve nonce from server: {0}")]
    ServerNonce(#[source] RouteError),

    /// Submitting the signed message to the server failed.
    #[error("server login failed: {0}")]
    ServerLogin(#[source] RouteError),

    /// Ending the server session failed.
    #[error("server logout failed: {0}")]
    ServerLogout(#[source] RouteError),

    /// The configured public key algorithm list is empty.
    #[error("`pubKeyCredParams` must have at least one algorithm")]
    InvalidAlgorithmList,

    /// The operation is deliberately unimplemented.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// The session builder failed.
    #[error(transparent)]
    SessionBuilder(#[from] SessionBuilderError),

    /// Signing failed.
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// The platform credential ceremony failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// An extension hook failed.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// An identity resolver failed.
    #[error(transparent)]
    Resolver(#[from] ResolveError),

    /// A client-side lookup was requested but no resolver is installed.
    #[error("{0} resolution requested on the client but no resolver is installed")]
    ResolverUnavailable(&'static str),

    /// `sign_in` was called on a signed-in strategy.
    #[error("already signed in")]
    AlreadySignedIn,

    /// `sign_out` was called without a session.
    #[error("not signed in")]
    NotSignedIn,
}
