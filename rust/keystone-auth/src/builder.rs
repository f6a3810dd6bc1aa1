//! The session message builder capability.
//!
//! Building the canonical sign-in message (and the capability statement
//! embedded in it) is delegated to a [`SessionManager`] supplied by the host.
//! Every sign-in gets its own [`SessionBuilder`], which accumulates the
//! capabilities contributed by extensions before rendering the message.

use crate::SessionConfig;
use async_trait::async_trait;
use keystone_capability::CapabilitySink;
use keystone_common::{ConditionalSend, ConditionalSync};

/// Errors from the session builder.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionBuilderError {
    /// The builder could not be initialized.
    #[error("failed to initialize session builder: {0}")]
    Initialization(String),

    /// The message could not be built.
    #[error("failed to build session message: {0}")]
    Build(String),
}

/// Creates session builders.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait SessionManager: ConditionalSend + ConditionalSync {
    /// Prepares the manager. Must complete before [`SessionManager::create`]
    /// is called; calling it again is harmless.
    async fn initialize(&self) -> Result<(), SessionBuilderError>;

    /// Starts a new session with a fresh session key.
    fn create(&self) -> Box<dyn SessionBuilder>;
}

/// Builds the sign-in message of one session.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait SessionBuilder: CapabilitySink + ConditionalSend + ConditionalSync {
    /// The session key, serialized. `None` means the key could not be
    /// produced and the session must not be used.
    fn session_key(&self) -> Option<String>;

    /// Renders the canonical message for `config` together with the
    /// capabilities received so far.
    async fn build(&self, config: &SessionConfig) -> Result<String, SessionBuilderError>;
}
