use super::{Credential, CredentialCreationOptions, CredentialRequestOptions};
use async_trait::async_trait;
use futures_util::future::{self, Either};
use keystone_common::{ConditionalSend, ConditionalSync};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Errors from a credential ceremony.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The platform has no credential manager.
    #[error("WebAuthn API not available: {0}")]
    NotAvailable(String),

    /// The ceremony was aborted through its signal.
    #[error("ceremony aborted")]
    Aborted,

    /// The user dismissed the prompt or the platform refused the request.
    #[error("ceremony not allowed: {0}")]
    NotAllowed(String),

    /// The platform returned a credential that could not be read.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// Any other platform failure.
    #[error("platform error: {0}")]
    Platform(String),
}

/// How eagerly the platform should involve the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Mediation {
    Silent,
    Optional,
    Conditional,
    Required,
}

/// Per-ceremony options that are not part of the public-key dictionaries.
#[derive(Debug, Clone, Default)]
pub struct CeremonyOptions {
    /// Cancelling this token aborts the ceremony.
    pub signal: Option<CancellationToken>,
    /// Mediation requirement, honoured by `get()` only.
    pub mediation: Option<Mediation>,
}

impl CeremonyOptions {
    /// Options aborted by `signal`.
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Options with the given mediation requirement.
    pub fn with_mediation(mut self, mediation: Mediation) -> Self {
        self.mediation = Some(mediation);
        self
    }
}

/// The platform credential manager (`navigator.credentials` in browsers).
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait CredentialManager: ConditionalSend + ConditionalSync {
    /// Runs a registration ceremony.
    async fn create(
        &self,
        options: &CredentialCreationOptions,
        ceremony: &CeremonyOptions,
    ) -> Result<Credential, CredentialError>;

    /// Runs an assertion ceremony.
    async fn get(
        &self,
        options: &CredentialRequestOptions,
        ceremony: &CeremonyOptions,
    ) -> Result<Credential, CredentialError>;
}

/// Drives `ceremony` until it settles or `signal` is cancelled, whichever
/// happens first. An already cancelled signal never polls the ceremony.
pub async fn with_abort<F, T>(
    signal: Option<&CancellationToken>,
    ceremony: F,
) -> Result<T, CredentialError>
where
    F: Future<Output = Result<T, CredentialError>>,
{
    let Some(signal) = signal else {
        return ceremony.await;
    };
    if signal.is_cancelled() {
        return Err(CredentialError::Aborted);
    }

    let cancelled = signal.cancelled();
    futures_util::pin_mut!(ceremony);
    futures_util::pin_mut!(cancelled);

    match future::select(ceremony, cancelled).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(CredentialError::Aborted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, time::Duration};

    #[tokio::test]
    async fn it_passes_through_without_a_signal() {
        let result = with_abort(None, async { Ok::<_, CredentialError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn it_refuses_to_start_when_already_aborted() {
        let signal = CancellationToken::new();
        signal.cancel();

        let polled = Cell::new(false);
        let result = with_abort(Some(&signal), async {
            polled.set(true);
            Ok::<(), CredentialError>(())
        })
        .await;

        assert_eq!(result, Err(CredentialError::Aborted));
        assert!(!polled.get());
    }

    #[tokio::test]
    async fn it_aborts_a_pending_ceremony() {
        let signal = CancellationToken::new();
        let trigger = signal.clone();

        let ceremony = async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<(), CredentialError>(())
        };
        let abort = async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        };

        let (result, ()) = tokio::join!(with_abort(Some(&signal), ceremony), abort);
        assert_eq!(result, Err(CredentialError::Aborted));
    }
}
