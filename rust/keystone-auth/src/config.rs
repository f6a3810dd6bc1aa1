//! Client configuration.
//!
//! A [`ClientConfig`] can be built in code with the `with_*` methods or
//! loaded from the JSON shape used by browser hosts:
//!
//! ```json
//! {
//!   "web3": {
//!     "siweConfig": { "statement": "Sign in to Example" },
//!     "resolveEns": { "resolveOnServer": true, "resolve": { "avatar": false } },
//!     "resolveLens": "onServer"
//!   },
//!   "server": { "host": "https://api.example.com", "routes": { "nonce": "/auth/nonce" } }
//! }
//! ```

use crate::{EnsResolveOptions, RouteConfig, SessionConfig};
use keystone_credentials::webauthn::{
    AttestationConveyance, AuthenticatorSelection, CredentialDescriptor, ExtensionInputs,
    PublicKeyCredentialParameters, RelyingParty, UserVerification,
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use url::Url;

/// Domain placed in sign-in messages when none is configured.
pub const DEFAULT_DOMAIN: &str = "localhost";

/// Top level configuration shared by both sign-in strategies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Wallet sign-in settings.
    #[serde(default, rename = "web3")]
    pub wallet: WalletConfig,
    /// Server to exchange sign-in messages with. Without one, sign-in
    /// happens entirely on the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
    /// WebAuthn ceremony settings.
    #[serde(default)]
    pub web_authn: WebAuthnConfig,
}

impl ClientConfig {
    /// Sets the server.
    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Sets the wallet settings.
    pub fn with_wallet(mut self, wallet: WalletConfig) -> Self {
        self.wallet = wallet;
        self
    }

    /// Sets the WebAuthn settings.
    pub fn with_web_authn(mut self, web_authn: WebAuthnConfig) -> Self {
        self.web_authn = web_authn;
        self
    }
}

/// Settings of the wallet strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    /// Domain placed in the sign-in message.
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Sign in on behalf of a delegator found in the delegation registry.
    #[serde(default)]
    pub enable_dao_login: bool,
    /// Caller overrides applied last to the sign-in message.
    #[serde(default)]
    pub siwe_config: SessionConfig,
    /// ENS lookup policy.
    #[serde(default)]
    pub resolve_ens: EnsResolution,
    /// Lens lookup policy.
    #[serde(default)]
    pub resolve_lens: LensResolution,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            enable_dao_login: false,
            siwe_config: SessionConfig::default(),
            resolve_ens: EnsResolution::default(),
            resolve_lens: LensResolution::default(),
        }
    }
}

impl WalletConfig {
    /// Sets the message domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Sets the caller overrides.
    pub fn with_siwe_config(mut self, siwe_config: SessionConfig) -> Self {
        self.siwe_config = siwe_config;
        self
    }

    /// Enables delegated sign-in.
    pub fn with_dao_login(mut self) -> Self {
        self.enable_dao_login = true;
        self
    }

    /// Sets the ENS lookup policy.
    pub fn with_ens(mut self, resolution: EnsResolution) -> Self {
        self.resolve_ens = resolution;
        self
    }

    /// Sets the Lens lookup policy.
    pub fn with_lens(mut self, resolution: LensResolution) -> Self {
        self.resolve_lens = resolution;
        self
    }
}

/// Where ENS records are resolved after sign-in.
///
/// Deserializes from `true`/`false` (resolve everything on the client, or
/// nothing) or from `{ "resolveOnServer": bool, "resolve": {...} }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EnsResolutionRepr", into = "EnsResolutionRepr")]
pub enum EnsResolution {
    /// No lookup.
    #[default]
    Disabled,
    /// Looked up by the client after the server confirms the session.
    Client(EnsResolveOptions),
    /// Looked up by the server during login.
    Server(EnsResolveOptions),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum EnsResolutionRepr {
    Flag(bool),
    #[serde(rename_all = "camelCase")]
    Settings {
        #[serde(default)]
        resolve_on_server: bool,
        #[serde(default)]
        resolve: EnsResolveOptions,
    },
}

impl From<EnsResolutionRepr> for EnsResolution {
    fn from(repr: EnsResolutionRepr) -> Self {
        match repr {
            EnsResolutionRepr::Flag(false) => Self::Disabled,
            EnsResolutionRepr::Flag(true) => Self::Client(EnsResolveOptions::default()),
            EnsResolutionRepr::Settings {
                resolve_on_server: true,
                resolve,
            } => Self::Server(resolve),
            EnsResolutionRepr::Settings { resolve, .. } => Self::Client(resolve),
        }
    }
}

impl From<EnsResolution> for EnsResolutionRepr {
    fn from(resolution: EnsResolution) -> Self {
        match resolution {
            EnsResolution::Disabled => Self::Flag(false),
            EnsResolution::Client(resolve) => Self::Settings {
                resolve_on_server: false,
                resolve,
            },
            EnsResolution::Server(resolve) => Self::Settings {
                resolve_on_server: true,
                resolve,
            },
        }
    }
}

/// Where Lens profiles are resolved after sign-in.
///
/// Deserializes from `true`/`false` or the string `"onServer"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LensResolutionRepr", into = "LensResolutionRepr")]
pub enum LensResolution {
    /// No lookup.
    #[default]
    Disabled,
    /// Looked up by the client.
    Client,
    /// Looked up by the server during login.
    Server,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum LensResolutionRepr {
    Flag(bool),
    Mode(LensMode),
}

#[derive(Clone, Serialize, Deserialize)]
enum LensMode {
    #[serde(rename = "onServer")]
    OnServer,
}

impl From<LensResolutionRepr> for LensResolution {
    fn from(repr: LensResolutionRepr) -> Self {
        match repr {
            LensResolutionRepr::Flag(false) => Self::Disabled,
            LensResolutionRepr::Flag(true) => Self::Client,
            LensResolutionRepr::Mode(LensMode::OnServer) => Self::Server,
        }
    }
}

impl From<LensResolution> for LensResolutionRepr {
    fn from(resolution: LensResolution) -> Self {
        match resolution {
            LensResolution::Disabled => Self::Flag(false),
            LensResolution::Client => Self::Flag(true),
            LensResolution::Server => Self::Mode(LensMode::OnServer),
        }
    }
}

/// The server sign-in messages are exchanged with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Base URL routes are resolved against.
    pub host: Url,
    /// Per-operation route overrides.
    #[serde(default)]
    pub routes: ServerRoutes,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl ServerConfig {
    /// A server at `host` with the default routes.
    pub fn new(host: Url) -> Self {
        Self {
            host,
            routes: ServerRoutes::default(),
            timeout_seconds: Some(30),
        }
    }

    /// Sets the route overrides.
    pub fn with_routes(mut self, routes: ServerRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

/// Route overrides. Unset operations use their default path and method.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerRoutes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub nonce: Option<RouteConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub login: Option<RouteConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub logout: Option<RouteConfig>,
}

impl ServerRoutes {
    /// Overrides the nonce route.
    pub fn with_nonce(mut self, route: impl Into<RouteConfig>) -> Self {
        self.nonce = Some(route.into());
        self
    }

    /// Overrides the login route.
    pub fn with_login(mut self, route: impl Into<RouteConfig>) -> Self {
        self.login = Some(route.into());
        self
    }

    /// Overrides the logout route.
    pub fn with_logout(mut self, route: impl Into<RouteConfig>) -> Self {
        self.logout = Some(route.into());
        self
    }
}

/// Produces WebAuthn challenges in place of the default random nonce.
#[derive(Clone)]
pub struct ChallengeGenerator(Arc<dyn Fn() -> Vec<u8> + Send + Sync>);

impl ChallengeGenerator {
    /// Wraps `generate`.
    pub fn new(generate: impl Fn() -> Vec<u8> + Send + Sync + 'static) -> Self {
        Self(Arc::new(generate))
    }

    /// Produces a challenge.
    pub fn generate(&self) -> Vec<u8> {
        (self.0)()
    }
}

impl fmt::Debug for ChallengeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChallengeGenerator")
    }
}

/// Settings of the WebAuthn strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebAuthnConfig {
    /// Registration settings.
    #[serde(default)]
    pub creation: CreationConfig,
    /// Assertion settings.
    #[serde(default)]
    pub request: RequestConfig,
}

/// Registration ceremony settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationConfig {
    /// Relying party the credential is bound to.
    #[serde(default)]
    pub rp: RelyingParty,
    /// Custom challenge source.
    #[serde(skip)]
    pub generate_challenge: Option<ChallengeGenerator>,
    /// Acceptable algorithms. Unset means the default preference list, an
    /// empty list is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_key_cred_params: Option<Vec<PublicKeyCredentialParameters>>,
    /// Ceremony timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    /// Credentials the user already holds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<CredentialDescriptor>,
    /// Authenticator constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelection>,
    /// Attestation preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationConveyance>,
    /// Client extension inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ExtensionInputs>,
}

/// Assertion ceremony settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    /// Custom challenge source.
    #[serde(skip)]
    pub generate_challenge: Option<ChallengeGenerator>,
    /// Ceremony timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    /// Relying party id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    /// Allow list used when the caller passes none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<CredentialDescriptor>,
    /// User verification policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerification>,
    /// Client extension inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ExtensionInputs>,
}
