#![warn(missing_docs)]

//! Sign-in orchestration for keystone.
//!
//! Two strategies establish who the user is:
//!
//! - [`WalletStrategy`] has a wallet sign a session message, exchanges it
//!   with an optional server and returns a [`ClientSession`];
//! - [`WebAuthnStrategy`] runs a platform credential ceremony.
//!
//! Wallet sign-in is shaped by [`Extension`]s, which can rewrite the session
//! message and contribute namespaced capabilities to it, and by the server
//! routes in [`ServerConfig`]. Every capability the flow depends on (the
//! wallet, the session message builder, HTTP, ENS and Lens lookups, the
//! credential manager) is a trait, so hosts plug in their own.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use keystone_auth::*;
//! # async fn example(
//! #     wallet: Arc<dyn keystone_credentials::WalletProvider>,
//! #     sessions: Arc<dyn SessionManager>,
//! # ) -> Result<(), AuthError> {
//! let config = ClientConfig::default()
//!     .with_server(ServerConfig::new("https://api.example.com".parse().unwrap()));
//!
//! let mut strategy = WalletStrategy::new(config, WalletSource::Provider(wallet), sessions);
//! let session = strategy.sign_in().await?;
//! println!("signed in as {}", session.address);
//!
//! strategy.sign_out().await?;
//! # Ok(())
//! # }
//! ```

mod builder;
pub use builder::*;

mod config;
pub use config::*;

mod enrichment;
pub use enrichment::*;

mod error;
pub use error::*;

pub mod extension;
pub use extension::{
    ConfigOverrides, ConnectContext, DELEGATION_REGISTRY, DelegationLookup, DelegationRegistry,
    Extension, ExtensionError, Extensions,
};

pub mod routes;
pub use routes::{
    CustomOperation, HttpMethod, HttpRequest, HttpResponse, LoginRequest, Operation, RouteConfig,
    RouteDescriptor, RouteError, RouteResolver, ServerEnsRequest, Transport, TransportError,
    custom_operation,
};
#[cfg(feature = "reqwest")]
pub use routes::ReqwestTransport;

mod session;
pub use session::*;

pub mod strategy;
pub use strategy::{
    AuthStrategy, SessionLifecycle, WalletSource, WalletState, WalletStrategy, WebAuthnStrategy,
};
