//! Test doubles for the capabilities a sign-in flow depends on.

#![allow(dead_code)]

use async_trait::async_trait;
use keystone_auth::{
    ConfigOverrides, ConnectContext, DelegationLookup, EnsData, EnsResolveOptions, EnsResolver,
    Extension, ExtensionError, HttpRequest, HttpResponse, LensProfiles, LensResolver,
    ResolveError, SessionBuilder, SessionBuilderError, SessionConfig, SessionManager, Transport,
    TransportError,
};
use keystone_capability::{
    Capabilities, CapabilitySink, ExtraFields, Namespace, TargetedActions,
};
use keystone_credentials::webauthn::{
    AssertionResponse, AttestationResponse, AuthenticatorResponse, CeremonyOptions, Credential,
    CredentialCreationOptions, CredentialError, CredentialManager, CredentialRequestOptions,
    CredentialType,
};
use keystone_credentials::{WalletError, WalletProvider};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

pub const WALLET: &str = "0x1111111111111111111111111111111111111111";

/// A wallet that signs by prefixing the message.
#[derive(Default)]
pub struct Wallet {
    pub accounts: Mutex<Vec<String>>,
    pub permission_requests: AtomicUsize,
    pub signed: Mutex<Vec<String>>,
}

impl Wallet {
    pub fn connected() -> Arc<Self> {
        Arc::new(Self {
            accounts: Mutex::new(vec![WALLET.to_string()]),
            ..Default::default()
        })
    }

    pub fn locked() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl WalletProvider for Wallet {
    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.is_empty() {
            accounts.push(WALLET.to_string());
        }
        Ok(accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(1)
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        self.signed.lock().unwrap().push(message.to_string());
        Ok(format!("signed:{message}"))
    }
}

/// Everything the session builders saw.
#[derive(Default)]
pub struct BuilderLog {
    pub initialized: AtomicUsize,
    pub created: AtomicUsize,
    pub built: Mutex<Vec<SessionConfig>>,
    pub capabilities: Mutex<Vec<Capabilities>>,
}

/// Renders session messages as the JSON of their config.
pub struct Sessions {
    pub log: Arc<BuilderLog>,
    pub session_key: Option<String>,
}

impl Sessions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Arc::default(),
            session_key: Some("session-key".to_string()),
        })
    }

    pub fn without_key() -> Arc<Self> {
        Arc::new(Self {
            log: Arc::default(),
            session_key: None,
        })
    }

    pub fn last_built(&self) -> SessionConfig {
        self.log
            .built
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no message built")
    }
}

#[async_trait]
impl SessionManager for Sessions {
    async fn initialize(&self) -> Result<(), SessionBuilderError> {
        self.log.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn create(&self) -> Box<dyn SessionBuilder> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Box::new(Builder {
            log: self.log.clone(),
            session_key: self.session_key.clone(),
            capabilities: Capabilities::default(),
        })
    }
}

pub struct Builder {
    log: Arc<BuilderLog>,
    session_key: Option<String>,
    capabilities: Capabilities,
}

impl CapabilitySink for Builder {
    fn add_default_actions(&mut self, namespace: &Namespace, actions: &[String]) {
        self.capabilities.add_default_actions(namespace, actions);
    }

    fn add_targeted_actions(&mut self, namespace: &Namespace, target: &str, actions: &[String]) {
        self.capabilities
            .add_targeted_actions(namespace, target, actions);
    }

    fn add_extra_fields(&mut self, namespace: &Namespace, fields: &ExtraFields) {
        self.capabilities.add_extra_fields(namespace, fields);
    }
}

#[async_trait]
impl SessionBuilder for Builder {
    fn session_key(&self) -> Option<String> {
        self.session_key.clone()
    }

    async fn build(&self, config: &SessionConfig) -> Result<String, SessionBuilderError> {
        self.log.built.lock().unwrap().push(config.clone());
        self.log
            .capabilities
            .lock()
            .unwrap()
            .push(self.capabilities.clone());
        serde_json::to_string(config).map_err(|e| SessionBuilderError::Build(e.to_string()))
    }
}

/// Answers requests by path and records them.
#[derive(Default)]
pub struct Server {
    pub responses: Mutex<HashMap<String, (u16, String)>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl Server {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(self: &Arc<Self>, path: &str, status: u16, body: &str) -> Arc<Self> {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
        self.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.path() == path)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for Server {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request.url.path().to_string();
        self.requests.lock().unwrap().push(request);
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .unwrap_or((404, String::new()));
        Ok(HttpResponse { status, body })
    }
}

#[derive(Default)]
pub struct Ens {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EnsResolver for Ens {
    async fn resolve_ens(
        &self,
        _address: &str,
        options: EnsResolveOptions,
    ) -> Result<EnsData, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EnsData {
            domain: options.domain.then(|| "alice.eth".to_string()),
            avatar_url: options
                .avatar
                .then(|| "https://example.com/alice.png".to_string()),
        })
    }
}

#[derive(Default)]
pub struct Lens {
    pub calls: AtomicUsize,
    pub offline: bool,
}

#[async_trait]
impl LensResolver for Lens {
    async fn resolve_lens(
        &self,
        _address: &str,
        _cursor: &str,
    ) -> Result<LensProfiles, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(ResolveError::Lookup {
                service: "lens",
                message: "offline".to_string(),
            });
        }
        Ok(LensProfiles::Message("Lens is not available on this chain".to_string()))
    }
}

/// An extension with fixed contributions.
#[derive(Default)]
pub struct Fixed {
    pub namespace: Option<&'static str>,
    pub overrides: Option<SessionConfig>,
    pub default_actions: Vec<&'static str>,
    pub targeted_actions: Vec<(&'static str, &'static str)>,
    pub fail_after_connect: bool,
    pub fail_after_sign_in: bool,
    pub signed_in: AtomicUsize,
}

#[async_trait]
impl Extension for Fixed {
    fn namespace(&self) -> Option<Namespace> {
        self.namespace.and_then(|namespace| namespace.parse().ok())
    }

    async fn default_actions(&self) -> Result<Vec<String>, ExtensionError> {
        Ok(self
            .default_actions
            .iter()
            .map(|action| action.to_string())
            .collect())
    }

    async fn targeted_actions(&self) -> Result<TargetedActions, ExtensionError> {
        let mut targeted = TargetedActions::new();
        for (target, action) in &self.targeted_actions {
            targeted
                .entry(target.to_string())
                .or_default()
                .push(action.to_string());
        }
        Ok(targeted)
    }

    async fn after_connect(
        &self,
        _context: &ConnectContext<'_>,
        _siwe: &SessionConfig,
    ) -> Result<Option<ConfigOverrides>, ExtensionError> {
        if self.fail_after_connect {
            return Err(ExtensionError::Failed("after connect".to_string()));
        }
        Ok(self.overrides.clone().map(ConfigOverrides::siwe))
    }

    async fn after_sign_in(
        &self,
        _session: &keystone_auth::ClientSession,
    ) -> Result<(), ExtensionError> {
        self.signed_in.fetch_add(1, Ordering::SeqCst);
        if self.fail_after_sign_in {
            return Err(ExtensionError::Failed("after sign-in".to_string()));
        }
        Ok(())
    }
}

/// Delegation registry answering with a fixed delegator.
pub struct Delegations(pub Option<&'static str>);

#[async_trait]
impl DelegationLookup for Delegations {
    async fn delegator(
        &self,
        _wallet_address: &str,
        _chain_id: u64,
    ) -> Result<Option<String>, ExtensionError> {
        Ok(self.0.map(str::to_string))
    }
}

/// Platform authenticator double.
#[derive(Default)]
pub struct Authenticator {
    pub created: Mutex<Vec<CredentialCreationOptions>>,
    pub requested: Mutex<Vec<CredentialRequestOptions>>,
    pub calls: AtomicUsize,
}

impl Authenticator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl CredentialManager for Authenticator {
    async fn create(
        &self,
        options: &CredentialCreationOptions,
        _ceremony: &CeremonyOptions,
    ) -> Result<Credential, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(options.clone());
        Ok(Credential {
            id: "AQID".to_string(),
            raw_id: vec![1, 2, 3],
            kind: CredentialType::PublicKey,
            authenticator_attachment: None,
            response: AuthenticatorResponse::Attestation(AttestationResponse {
                client_data_json: b"{}".to_vec(),
                attestation_object: vec![0xa0],
                transports: Vec::new(),
            }),
        })
    }

    async fn get(
        &self,
        options: &CredentialRequestOptions,
        _ceremony: &CeremonyOptions,
    ) -> Result<Credential, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(options.clone());
        Ok(Credential {
            id: "AQID".to_string(),
            raw_id: vec![1, 2, 3],
            kind: CredentialType::PublicKey,
            authenticator_attachment: None,
            response: AuthenticatorResponse::Assertion(AssertionResponse {
                client_data_json: b"{}".to_vec(),
                authenticator_data: vec![0; 37],
                signature: vec![0x30],
                user_handle: None,
            }),
        })
    }
}
