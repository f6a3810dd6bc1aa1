use super::{ConfigOverrides, ConnectContext, Extension, ExtensionError};
use crate::SessionConfig;
use async_trait::async_trait;
use keystone_capability::Namespace;
use keystone_common::{ConditionalSend, ConditionalSync};
use std::sync::Arc;

/// Namespace of the [`DelegationRegistry`] extension.
pub const DELEGATION_REGISTRY: &str = "delegationRegistry";

/// Finds the account a wallet signs on behalf of.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait DelegationLookup: ConditionalSend + ConditionalSync {
    /// The delegator `wallet_address` acts for on `chain_id`, if any.
    async fn delegator(
        &self,
        wallet_address: &str,
        chain_id: u64,
    ) -> Result<Option<String>, ExtensionError>;
}

/// Signs in as a delegator while the connected wallet keeps signing.
///
/// While registered, logins are flagged as DAO logins.
#[derive(Clone)]
pub struct DelegationRegistry {
    lookup: Arc<dyn DelegationLookup>,
}

impl DelegationRegistry {
    /// Creates the extension over `lookup`.
    pub fn new(lookup: Arc<dyn DelegationLookup>) -> Self {
        Self { lookup }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Extension for DelegationRegistry {
    fn namespace(&self) -> Option<Namespace> {
        DELEGATION_REGISTRY.parse().ok()
    }

    async fn after_connect(
        &self,
        context: &ConnectContext<'_>,
        _siwe: &SessionConfig,
    ) -> Result<Option<ConfigOverrides>, ExtensionError> {
        let delegator = self
            .lookup
            .delegator(context.address, context.chain_id)
            .await?;

        Ok(delegator.map(|address| {
            tracing::debug!(wallet = context.address, delegator = %address, "signing in as delegator");
            ConfigOverrides::siwe(SessionConfig {
                address: Some(address),
                ..Default::default()
            })
        }))
    }
}
