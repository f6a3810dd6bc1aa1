//! Client-side ENS and Lens lookups attached to a fresh session.

use crate::{ClientSession, EnsData, EnsResolveOptions, LensProfiles};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use keystone_common::{ConditionalSend, ConditionalSync};
use std::sync::Arc;

/// Cursor of the first page of Lens profiles.
pub const LENS_FIRST_PAGE: &str = "{}";

/// Errors raised by identity resolvers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// The lookup itself failed.
    #[error("{service} lookup failed: {message}")]
    Lookup {
        /// Which service was queried.
        service: &'static str,
        /// What went wrong.
        message: String,
    },
}

/// Resolves ENS records.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait EnsResolver: ConditionalSend + ConditionalSync {
    /// Resolves the records of `address` selected by `options`.
    async fn resolve_ens(
        &self,
        address: &str,
        options: EnsResolveOptions,
    ) -> Result<EnsData, ResolveError>;
}

/// Resolves Lens profiles.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait LensResolver: ConditionalSend + ConditionalSync {
    /// Fetches the page of profiles owned by `address` at `cursor`.
    async fn resolve_lens(&self, address: &str, cursor: &str)
    -> Result<LensProfiles, ResolveError>;
}

/// A finished lookup, tagged by source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    /// ENS records.
    Ens(EnsData),
    /// Lens profiles.
    Lens(LensProfiles),
}

/// Lookups to run on the client, with the resolvers to run them.
#[derive(Clone, Default)]
pub struct EnrichmentRequest {
    /// ENS lookup, when requested.
    pub ens: Option<(Arc<dyn EnsResolver>, EnsResolveOptions)>,
    /// Lens lookup, when requested.
    pub lens: Option<Arc<dyn LensResolver>>,
}

impl EnrichmentRequest {
    /// Returns `true` when no lookup is requested.
    pub fn is_empty(&self) -> bool {
        self.ens.is_none() && self.lens.is_none()
    }
}

#[cfg(not(target_arch = "wasm32"))]
type Lookup<'a> = futures_util::future::BoxFuture<'a, Result<Enrichment, ResolveError>>;
#[cfg(target_arch = "wasm32")]
type Lookup<'a> = futures_util::future::LocalBoxFuture<'a, Result<Enrichment, ResolveError>>;

/// Runs the requested lookups for `session.address` concurrently and
/// attaches every non-empty result.
pub async fn enrich(
    session: ClientSession,
    request: &EnrichmentRequest,
) -> Result<ClientSession, ResolveError> {
    if request.is_empty() {
        return Ok(session);
    }

    let address = session.address.as_str();
    let mut lookups: Vec<Lookup<'_>> = Vec::new();
    if let Some((resolver, options)) = &request.ens {
        lookups.push(boxed(async move {
            resolver
                .resolve_ens(address, *options)
                .await
                .map(Enrichment::Ens)
        }));
    }
    if let Some(resolver) = &request.lens {
        lookups.push(boxed(async move {
            resolver
                .resolve_lens(address, LENS_FIRST_PAGE)
                .await
                .map(Enrichment::Lens)
        }));
    }

    let results = try_join_all(lookups).await.inspect_err(|error| {
        tracing::error!(%error, "session enrichment failed");
    })?;

    let mut session = session;
    for result in results {
        match result {
            Enrichment::Ens(ens) if !ens.is_empty() => session.ens = Some(ens),
            Enrichment::Lens(lens) if !lens.is_empty() => session.lens = Some(lens),
            Enrichment::Ens(_) | Enrichment::Lens(_) => {}
        }
    }
    Ok(session)
}

#[cfg(not(target_arch = "wasm32"))]
fn boxed<'a, F>(future: F) -> Lookup<'a>
where
    F: Future<Output = Result<Enrichment, ResolveError>> + Send + 'a,
{
    Box::pin(future)
}

#[cfg(target_arch = "wasm32")]
fn boxed<'a, F>(future: F) -> Lookup<'a>
where
    F: Future<Output = Result<Enrichment, ResolveError>> + 'a,
{
    Box::pin(future)
}
