//! WebAuthn ceremony types and the credential manager capability.
//!
//! [`CredentialManager`] is the seam between a sign-in strategy and the
//! platform authenticator. The option dictionaries handed to it and the
//! [`Credential`] it returns follow the JSON forms of the
//! [Web Authentication API](https://w3c.github.io/webauthn/).
//!
//! # Platforms
//!
//! - The types and the [`with_abort`] helper are available everywhere.
//! - [`NavigatorCredentials`] requires a browser (`wasm32-unknown-unknown`).

mod credential;
pub mod encoding;
mod manager;
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod navigator;
mod options;

pub use credential::{AssertionResponse, AttestationResponse, AuthenticatorResponse, Credential};
pub use manager::{CeremonyOptions, CredentialError, CredentialManager, Mediation, with_abort};
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use navigator::NavigatorCredentials;
pub use options::*;
