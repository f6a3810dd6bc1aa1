//! Sign-in with a wallet signature.
//!
//! A [`WalletStrategy`] walks through three states:
//!
//! ```text
//!              connect()              sign_in()
//! Disconnected ---------> Connected ---------> SignedIn
//!      ^                                           |
//!      +------------------ sign_out() -------------+
//! ```
//!
//! [`WalletStrategy::sign_in`] connects on its own when needed, so calling
//! [`WalletStrategy::connect`] first is optional.

use super::SessionLifecycle;
use crate::{
    AuthError, ClientConfig, ClientSession, DELEGATION_REGISTRY, DelegationLookup,
    DelegationRegistry, EnrichmentRequest, EnsData, EnsResolution, EnsResolveOptions,
    EnsResolver, Extension, LENS_FIRST_PAGE, LensProfiles, LensResolution, LensResolver,
    LoginRequest, RouteResolver, ServerEnsRequest, SessionBuilder, SessionConfig,
    SessionManager, Transport, enrich, extension::ConnectContext,
};
use chrono::{DateTime, Utc};
use keystone_capability::Capabilities;
use keystone_common::generate_nonce;
use keystone_credentials::{AccountSigner, Eip1193, Signer, WalletProvider, WalletSigner, Web3Provider};
use serde::Serialize;
use std::sync::Arc;

/// Where the wallet comes from.
#[derive(Clone)]
pub enum WalletSource {
    /// A ready provider.
    Provider(Arc<dyn WalletProvider>),
    /// A raw EIP-1193 driver, wrapped in a [`Web3Provider`] on connect.
    Eip1193(Arc<dyn Eip1193>),
}

impl WalletSource {
    fn provider(&self) -> Arc<dyn WalletProvider> {
        match self {
            Self::Provider(provider) => provider.clone(),
            Self::Eip1193(driver) => Arc::new(Web3Provider::new(driver.clone())),
        }
    }
}

/// An open wallet connection, ready to sign in.
pub struct Connection {
    provider: Arc<dyn WalletProvider>,
    builder: Box<dyn SessionBuilder>,
    address: String,
    chain_id: u64,
    overrides: SessionConfig,
    capabilities: Capabilities,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("overrides", &self.overrides)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Address of the connected wallet.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Chain the wallet is connected to.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Message fields set by extensions.
    pub fn overrides(&self) -> &SessionConfig {
        &self.overrides
    }

    /// Capabilities contributed by extensions.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

/// Where a [`WalletStrategy`] stands.
#[derive(Debug, Default)]
pub enum WalletState {
    /// No wallet connection.
    #[default]
    Disconnected,
    /// Connected, not signed in.
    Connected(Connection),
    /// Signed in.
    SignedIn(Connection, ClientSession),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NonceParams<'a> {
    #[serde(flatten)]
    defaults: &'a SessionConfig,
    wallet_address: &'a str,
}

/// Signs in by having the wallet sign a session message.
pub struct WalletStrategy {
    lifecycle: SessionLifecycle,
    source: WalletSource,
    sessions: Arc<dyn SessionManager>,
    routes: RouteResolver,
    ens: Option<Arc<dyn EnsResolver>>,
    lens: Option<Arc<dyn LensResolver>>,
    state: WalletState,
}

impl std::fmt::Debug for WalletStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletStrategy")
            .field("lifecycle", &self.lifecycle)
            .field("routes", &self.routes)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl WalletStrategy {
    /// Creates a strategy talking to the configured server over HTTP.
    #[cfg(feature = "reqwest")]
    pub fn new(
        config: ClientConfig,
        source: WalletSource,
        sessions: Arc<dyn SessionManager>,
    ) -> Self {
        let routes = RouteResolver::over_http(config.server.as_ref());
        Self::with_routes(config, source, sessions, routes)
    }

    /// Creates a strategy sending server requests through `transport`.
    pub fn with_transport(
        config: ClientConfig,
        source: WalletSource,
        sessions: Arc<dyn SessionManager>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let routes = RouteResolver::new(config.server.as_ref(), transport);
        Self::with_routes(config, source, sessions, routes)
    }

    fn with_routes(
        config: ClientConfig,
        source: WalletSource,
        sessions: Arc<dyn SessionManager>,
        routes: RouteResolver,
    ) -> Self {
        Self {
            lifecycle: SessionLifecycle::new(config),
            source,
            sessions,
            routes,
            ens: None,
            lens: None,
            state: WalletState::Disconnected,
        }
    }

    /// Installs the resolver used for client-side ENS lookups.
    pub fn with_ens_resolver(mut self, resolver: Arc<dyn EnsResolver>) -> Self {
        self.ens = Some(resolver);
        self
    }

    /// Installs the resolver used for client-side Lens lookups.
    pub fn with_lens_resolver(mut self, resolver: Arc<dyn LensResolver>) -> Self {
        self.lens = Some(resolver);
        self
    }

    /// Registers a [`DelegationRegistry`] over `lookup`.
    pub fn with_delegation_lookup(mut self, lookup: Arc<dyn DelegationLookup>) -> Self {
        self.extend(Arc::new(DelegationRegistry::new(lookup)));
        self
    }

    /// Registers `extension`. It runs after the ones already registered,
    /// starting with the next connection.
    pub fn extend(&mut self, extension: Arc<dyn Extension>) {
        self.lifecycle.extend(extension);
    }

    /// Opens the wallet connection and runs the extension pipeline.
    /// Does nothing when already connected.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn connect(&mut self) -> Result<(), AuthError> {
        if matches!(self.state, WalletState::Disconnected) {
            self.state = WalletState::Connected(self.open().await?);
        }
        Ok(())
    }

    async fn open(&self) -> Result<Connection, AuthError> {
        self.check_resolvers()?;

        let provider = self.source.provider();
        if !provider.manages_permissions() {
            let accounts = provider
                .accounts()
                .await
                .map_err(AuthError::ProviderConnection)?;
            if accounts.is_empty() {
                provider
                    .request_accounts()
                    .await
                    .map_err(AuthError::ProviderConnection)?;
            }
        }
        let address = provider
            .address()
            .await
            .map_err(AuthError::ProviderConnection)
            .inspect_err(|error| tracing::error!(%error, "wallet has no usable account"))?;
        let chain_id = provider
            .chain_id()
            .await
            .map_err(AuthError::ProviderConnection)?;

        self.sessions.initialize().await?;
        let mut builder = self.sessions.create();

        let extensions = self.lifecycle.extensions();
        let context = ConnectContext {
            address: &address,
            chain_id,
            config: self.lifecycle.config(),
            wallet: provider.as_ref(),
        };
        let overrides = extensions
            .after_connect(&context, SessionConfig::default())
            .await?;
        let capabilities = extensions.capabilities().await?;
        capabilities.apply(builder.as_mut());
        tracing::debug!(%address, "wallet connected");

        Ok(Connection {
            provider,
            builder,
            address,
            chain_id,
            overrides,
            capabilities,
        })
    }

    fn check_resolvers(&self) -> Result<(), AuthError> {
        let wallet = &self.lifecycle.config().wallet;
        let missing = if matches!(wallet.resolve_ens, EnsResolution::Client(_)) && self.ens.is_none()
        {
            Some("ENS")
        } else if wallet.resolve_lens == LensResolution::Client && self.lens.is_none() {
            Some("Lens")
        } else if wallet.enable_dao_login && !self.is_extension_enabled(DELEGATION_REGISTRY) {
            Some("delegation")
        } else {
            None
        };

        match missing {
            Some(service) => {
                tracing::error!(service, "resolver missing");
                Err(AuthError::ResolverUnavailable(service))
            }
            None => Ok(()),
        }
    }

    /// Signs in and returns the new session.
    ///
    /// ENS and Lens enrichment is best-effort: once the server has accepted
    /// the login the strategy is signed in, and a failed lookup only leaves
    /// the session unenriched.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn sign_in(&mut self) -> Result<ClientSession, AuthError> {
        let connection = match std::mem::take(&mut self.state) {
            WalletState::Disconnected => self.open().await?,
            WalletState::Connected(connection) => connection,
            signed_in @ WalletState::SignedIn(..) => {
                self.state = signed_in;
                return Err(AuthError::AlreadySignedIn);
            }
        };

        let session = match self.establish(&connection).await {
            Ok(session) => session,
            Err(error) => {
                self.state = WalletState::Connected(connection);
                return Err(error);
            }
        };
        tracing::debug!(address = %session.address, "signed in");
        self.state = WalletState::SignedIn(connection, session.clone());

        match enrich(session.clone(), &self.enrichment()).await {
            Ok(enriched) => {
                if let WalletState::SignedIn(_, current) = &mut self.state {
                    *current = enriched.clone();
                }
                Ok(enriched)
            }
            Err(error) => {
                tracing::warn!(%error, "keeping the session unenriched");
                Ok(session)
            }
        }
    }

    async fn establish(&self, connection: &Connection) -> Result<ClientSession, AuthError> {
        let session_key = connection.builder.session_key().ok_or_else(|| {
            tracing::error!("session builder produced no session key");
            AuthError::SessionKeyUnavailable
        })?;

        let signer = WalletSigner::connect(connection.provider.clone()).await?;
        let wallet_address = signer.address().to_string();
        let config = self.lifecycle.config();

        let mut defaults = SessionConfig {
            address: Some(wallet_address.clone()),
            chain_id: Some(signer.chain_id()),
            domain: Some(config.wallet.domain.clone()),
            issued_at: Some(DateTime::<Utc>::from(keystone_common::time::now())),
            nonce: Some(generate_nonce()),
            ..Default::default()
        };

        let params = NonceParams {
            defaults: &defaults,
            wallet_address: &wallet_address,
        };
        let server_nonce = self.routes.nonce(&params).await.map_err(|error| {
            tracing::error!(%error, "nonce request failed");
            AuthError::ServerNonce(error)
        })?;
        if let Some(nonce) = server_nonce {
            defaults.nonce = Some(nonce);
        }

        let siwe_config = defaults
            .merge(connection.overrides.clone())
            .merge(config.wallet.siwe_config.clone());
        let siwe = connection.builder.build(&siwe_config).await?;
        let signature = signer.sign(&siwe).await?;

        let address = siwe_config.address.unwrap_or(wallet_address.clone());
        let chain_id = siwe_config.chain_id.unwrap_or(signer.chain_id());

        let request = LoginRequest {
            signature: signature.clone(),
            siwe: siwe.clone(),
            address: address.clone(),
            wallet_address: wallet_address.clone(),
            chain_id,
            dao_login: self.is_extension_enabled(DELEGATION_REGISTRY),
            resolve_ens: match config.wallet.resolve_ens {
                EnsResolution::Server(options) => ServerEnsRequest::Resolve(options),
                EnsResolution::Disabled | EnsResolution::Client(_) => ServerEnsRequest::default(),
            },
            resolve_lens: config.wallet.resolve_lens == LensResolution::Server,
        };
        let fields = self.routes.login(&request).await.map_err(|error| {
            tracing::error!(%error, "login request failed");
            AuthError::ServerLogin(error)
        })?;

        let session = ClientSession {
            address,
            wallet_address,
            chain_id,
            session_key,
            siwe,
            signature,
            ens: None,
            lens: None,
            extra: Default::default(),
        };
        let session = match fields {
            Some(fields) => session.merge_server_fields(fields).map_err(|error| {
                tracing::error!(%error, "server returned a malformed session");
                AuthError::ServerLogin(crate::RouteError::Payload(error.to_string()))
            })?,
            None => {
                if self.routes.has_host() {
                    tracing::warn!("server accepted the login without a response");
                }
                session
            }
        };

        self.lifecycle.extensions().after_sign_in(&session).await?;

        Ok(session)
    }

    fn enrichment(&self) -> EnrichmentRequest {
        let wallet = &self.lifecycle.config().wallet;
        EnrichmentRequest {
            ens: match (wallet.resolve_ens, &self.ens) {
                (EnsResolution::Client(options), Some(resolver)) => {
                    Some((resolver.clone(), options))
                }
                _ => None,
            },
            lens: match (wallet.resolve_lens, &self.lens) {
                (LensResolution::Client, Some(resolver)) => Some(resolver.clone()),
                _ => None,
            },
        }
    }

    /// Ends the session.
    ///
    /// The strategy is disconnected afterwards even when the server logout
    /// fails; the failure is still returned.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        let WalletState::SignedIn(connection, session) = std::mem::take(&mut self.state) else {
            return Err(AuthError::NotSignedIn);
        };
        drop(connection);

        let result = self.routes.logout(&session).await.map_err(|error| {
            tracing::error!(%error, "logout request failed");
            AuthError::ServerLogout(error)
        });
        tracing::debug!(address = %session.address, "signed out");
        result
    }

    /// Not supported by wallet sign-in.
    pub async fn sign_up(&mut self) -> Result<ClientSession, AuthError> {
        Err(AuthError::NotImplemented("wallet sign-up"))
    }

    /// Resolves ENS records for `address`. `None` resolves every record.
    pub async fn resolve_ens(
        &self,
        address: &str,
        options: Option<EnsResolveOptions>,
    ) -> Result<EnsData, AuthError> {
        let resolver = self
            .ens
            .as_ref()
            .ok_or(AuthError::ResolverUnavailable("ENS"))?;
        Ok(resolver
            .resolve_ens(address, options.unwrap_or_default())
            .await?)
    }

    /// Resolves a page of Lens profiles for `address`. `None` fetches the
    /// first page.
    pub async fn resolve_lens(
        &self,
        address: &str,
        cursor: Option<&str>,
    ) -> Result<LensProfiles, AuthError> {
        let resolver = self
            .lens
            .as_ref()
            .ok_or(AuthError::ResolverUnavailable("Lens"))?;
        Ok(resolver
            .resolve_lens(address, cursor.unwrap_or(LENS_FIRST_PAGE))
            .await?)
    }

    /// Current state.
    pub fn state(&self) -> &WalletState {
        &self.state
    }

    /// Returns `true` unless disconnected.
    pub fn is_connected(&self) -> bool {
        !matches!(self.state, WalletState::Disconnected)
    }

    /// Returns `true` when exactly one extension uses `namespace`.
    pub fn is_extension_enabled(&self, namespace: &str) -> bool {
        self.lifecycle.is_extension_enabled(namespace)
    }

    /// Address of the signed-in session.
    pub fn address(&self) -> Option<&str> {
        self.client_session().map(|session| session.address.as_str())
    }

    /// Chain of the signed-in session.
    pub fn chain_id(&self) -> Option<u64> {
        self.client_session().map(|session| session.chain_id)
    }

    /// The signed-in session.
    pub fn client_session(&self) -> Option<&ClientSession> {
        match &self.state {
            WalletState::SignedIn(_, session) => Some(session),
            _ => None,
        }
    }

    /// A signer over the connected wallet.
    pub async fn signer(&self) -> Result<WalletSigner, AuthError> {
        match &self.state {
            WalletState::Connected(connection) | WalletState::SignedIn(connection, _) => {
                Ok(WalletSigner::connect(connection.provider.clone()).await?)
            }
            WalletState::Disconnected => Err(AuthError::NotSignedIn),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &ClientConfig {
        self.lifecycle.config()
    }

    /// Not supported by wallet sign-in.
    pub fn session(&self) -> Result<(), AuthError> {
        Err(AuthError::NotImplemented("wallet session"))
    }

    pub(crate) fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }
}
