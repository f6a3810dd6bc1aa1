//! Concrete identity, signing and credential types for keystone.
//!
//! This crate wraps the capabilities a sign-in flow borrows from its host:
//!
//! - a **wallet** ([`WalletProvider`]), either implemented directly or
//!   wrapped from a raw EIP-1193 driver with [`Web3Provider`];
//! - a **signer** ([`Signer`]) giving every signing backend the same
//!   surface: a [`Did`], a key id, `sign`, and the reserved `delegate` /
//!   `invoke` operations;
//! - the **WebAuthn** credential manager (enabled by the `webauthn`
//!   feature, on by default) along with the option and credential types
//!   exchanged with it.

mod did;
pub use did::*;

pub mod signer;
pub use signer::{AccountSigner, Signer, SignerError, WalletSigner};

pub mod wallet;
pub use wallet::{Eip1193, WalletError, WalletProvider, Web3Provider};

#[cfg(feature = "webauthn")]
pub mod webauthn;
