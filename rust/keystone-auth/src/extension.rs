//! Sign-in extensions and the pipeline that runs them.
//!
//! An [`Extension`] can rewrite the sign-in message before it is signed and
//! contribute namespaced capabilities to it. [`Extensions`] runs the hooks
//! in phases, each phase completing for every extension before the next
//! begins:
//!
//! 1. [`Extensions::after_connect`] folds the message overrides of every
//!    extension, in registration order, into a new [`SessionConfig`];
//! 2. [`Extensions::capabilities`] collects default actions, targeted
//!    actions and extra fields into [`Capabilities`];
//! 3. [`Extensions::after_sign_in`] notifies every extension of the new
//!    session.
//!
//! The first failing hook aborts its phase. Effects of hooks that already
//! ran are not undone.

mod delegation;
pub use delegation::*;

use crate::{ClientConfig, ClientSession, SessionConfig};
use async_trait::async_trait;
use keystone_capability::{Capabilities, CapabilitySink, ExtraFields, Namespace, TargetedActions};
use keystone_common::{ConditionalSend, ConditionalSync};
use keystone_credentials::WalletProvider;
use std::sync::Arc;

/// Errors raised by extension hooks.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtensionError {
    /// A hook failed.
    #[error("extension hook failed: {0}")]
    Failed(String),

    /// The delegation registry could not be queried.
    #[error("delegation lookup failed: {0}")]
    Delegation(String),
}

/// What an extension gets to see once the wallet is connected.
#[derive(Clone, Copy)]
pub struct ConnectContext<'a> {
    /// Connected wallet address.
    pub address: &'a str,
    /// Connected chain.
    pub chain_id: u64,
    /// Client configuration.
    pub config: &'a ClientConfig,
    /// The connected wallet.
    pub wallet: &'a dyn WalletProvider,
}

/// Message overrides returned from [`Extension::after_connect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Fields to set on the sign-in message.
    pub siwe: Option<SessionConfig>,
}

impl ConfigOverrides {
    /// Overrides setting the given message fields.
    pub fn siwe(siwe: SessionConfig) -> Self {
        Self { siwe: Some(siwe) }
    }
}

/// A pluggable sign-in module. Every hook defaults to doing nothing.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Extension: ConditionalSend + ConditionalSync {
    /// Namespace the contributed capabilities are scoped to. Extensions
    /// without one contribute no capabilities.
    fn namespace(&self) -> Option<Namespace> {
        None
    }

    /// Abilities over the whole namespace.
    async fn default_actions(&self) -> Result<Vec<String>, ExtensionError> {
        Ok(Vec::new())
    }

    /// Abilities keyed by target.
    async fn targeted_actions(&self) -> Result<TargetedActions, ExtensionError> {
        Ok(TargetedActions::new())
    }

    /// Metadata attached to the namespace.
    async fn extra_fields(&self) -> Result<ExtraFields, ExtensionError> {
        Ok(ExtraFields::new())
    }

    /// Runs once the wallet is connected. `siwe` holds the overrides of the
    /// extensions registered before this one.
    async fn after_connect(
        &self,
        _context: &ConnectContext<'_>,
        _siwe: &SessionConfig,
    ) -> Result<Option<ConfigOverrides>, ExtensionError> {
        Ok(None)
    }

    /// Runs once the server confirmed the session.
    async fn after_sign_in(&self, _session: &ClientSession) -> Result<(), ExtensionError> {
        Ok(())
    }
}

/// Registered extensions, in registration order.
#[derive(Clone, Default)]
pub struct Extensions(Vec<Arc<dyn Extension>>);

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|extension| extension.namespace()))
            .finish()
    }
}

impl Extensions {
    /// Appends `extension`. It runs after every extension already registered.
    pub fn push(&mut self, extension: Arc<dyn Extension>) {
        self.0.push(extension);
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` when exactly one registered extension uses `namespace`.
    pub fn is_enabled(&self, namespace: &str) -> bool {
        self.0
            .iter()
            .filter(|extension| {
                extension
                    .namespace()
                    .is_some_and(|candidate| candidate == *namespace)
            })
            .count()
            == 1
    }

    /// Runs every `after_connect` hook and folds the returned overrides onto
    /// `base`. Later registrations win on conflicting fields.
    pub async fn after_connect(
        &self,
        context: &ConnectContext<'_>,
        base: SessionConfig,
    ) -> Result<SessionConfig, ExtensionError> {
        let mut siwe = base;
        for extension in &self.0 {
            let overrides = extension
                .after_connect(context, &siwe)
                .await
                .inspect_err(|error| {
                    tracing::error!(namespace = ?extension.namespace(), %error, "after_connect hook failed");
                })?;
            if let Some(partial) = overrides.and_then(|overrides| overrides.siwe) {
                siwe = siwe.merge(partial);
            }
        }
        Ok(siwe)
    }

    /// Collects the capabilities of every namespaced extension.
    pub async fn capabilities(&self) -> Result<Capabilities, ExtensionError> {
        let mut capabilities = Capabilities::default();
        for extension in &self.0 {
            let Some(namespace) = extension.namespace() else {
                continue;
            };

            let defaults = extension.default_actions().await?;
            if !defaults.is_empty() {
                capabilities.add_default_actions(&namespace, &defaults);
            }

            for (target, actions) in extension.targeted_actions().await? {
                capabilities.add_targeted_actions(&namespace, &target, &actions);
            }

            let fields = extension.extra_fields().await?;
            if !fields.is_empty() {
                capabilities.add_extra_fields(&namespace, &fields);
            }
        }
        Ok(capabilities)
    }

    /// Runs every `after_sign_in` hook.
    pub async fn after_sign_in(&self, session: &ClientSession) -> Result<(), ExtensionError> {
        for extension in &self.0 {
            extension
                .after_sign_in(session)
                .await
                .inspect_err(|error| {
                    tracing::error!(namespace = ?extension.namespace(), %error, "after_sign_in hook failed");
                })?;
        }
        Ok(())
    }
}
