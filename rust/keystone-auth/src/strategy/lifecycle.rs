use crate::{ClientConfig, Extension, Extensions};
use std::sync::Arc;

/// State shared by every sign-in strategy: the configuration, fixed at
/// construction, and the extensions registered so far.
#[derive(Debug, Clone, Default)]
pub struct SessionLifecycle {
    config: ClientConfig,
    extensions: Extensions,
}

impl SessionLifecycle {
    /// Starts a lifecycle over `config` with no extensions.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            extensions: Extensions::default(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Registered extensions.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Registers `extension` after the ones already present.
    pub fn extend(&mut self, extension: Arc<dyn Extension>) {
        self.extensions.push(extension);
    }

    /// Returns `true` when exactly one extension uses `namespace`.
    pub fn is_extension_enabled(&self, namespace: &str) -> bool {
        self.extensions.is_enabled(namespace)
    }
}
