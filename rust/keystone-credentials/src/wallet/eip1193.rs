use super::{WalletError, WalletProvider};
use async_trait::async_trait;
use keystone_common::{ConditionalSend, ConditionalSync};
use serde_json::{Value, json};
use std::sync::Arc;

/// EIP-1193 error code for a request the user rejected.
const USER_REJECTED: i64 = 4001;

/// A raw [EIP-1193] provider: a single JSON-RPC `request` entry point.
///
/// [EIP-1193]: https://eips.ethereum.org/EIPS/eip-1193
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Eip1193: ConditionalSend + ConditionalSync {
    /// Performs the JSON-RPC `method` with `params`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;

    /// Identifies the bridge the provider talks through, if any
    /// (e.g. `"https://bridge.walletconnect.org"`).
    fn bridge(&self) -> Option<&str> {
        None
    }
}

/// [`WalletProvider`] over a raw [`Eip1193`] driver.
#[derive(Clone)]
pub struct Web3Provider {
    driver: Arc<dyn Eip1193>,
}

impl std::fmt::Debug for Web3Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Web3Provider")
            .field("bridge", &self.driver.bridge())
            .finish()
    }
}

impl Web3Provider {
    /// Wraps `driver`.
    pub fn new(driver: Arc<dyn Eip1193>) -> Self {
        Self { driver }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        self.driver
            .request(method, params)
            .await
            .map_err(|error| match error {
                WalletError::Rpc { code, message } if code == USER_REJECTED => {
                    WalletError::Rejected(message)
                }
                other => other,
            })
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl WalletProvider for Web3Provider {
    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        let accounts = self.call("eth_accounts", json!([])).await?;
        serde_json::from_value(accounts)
            .map_err(|error| WalletError::InvalidResponse(format!("eth_accounts: {error}")))
    }

    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.call(
            "wallet_requestPermissions",
            json!([{ "eth_accounts": {} }]),
        )
        .await?;
        self.accounts().await
    }

    fn manages_permissions(&self) -> bool {
        self.driver
            .bridge()
            .is_some_and(|bridge| bridge.contains("walletconnect"))
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let chain_id = self.call("eth_chainId", json!([])).await?;
        parse_quantity(&chain_id)
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        let address = self.address().await?;
        let payload = format!("0x{}", hex::encode(message.as_bytes()));
        let signature = self
            .call("personal_sign", json!([payload, address]))
            .await?;
        signature
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::InvalidResponse("personal_sign: expected a string".into()))
    }
}

/// Parses an Ethereum JSON-RPC quantity, which is a `0x` prefixed hex string.
/// Plain numbers are tolerated as well.
fn parse_quantity(value: &Value) -> Result<u64, WalletError> {
    match value {
        Value::String(text) => {
            let digits = text.strip_prefix("0x").unwrap_or(text);
            u64::from_str_radix(digits, 16)
                .map_err(|error| WalletError::InvalidResponse(format!("{text}: {error}")))
        }
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| WalletError::InvalidResponse(format!("{number} is not a chain id"))),
        other => Err(WalletError::InvalidResponse(format!(
            "expected a quantity, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use testresult::TestResult;

    #[derive(Default)]
    struct Driver {
        authorized: Mutex<bool>,
        calls: Mutex<Vec<(String, Value)>>,
        bridge: Option<String>,
    }

    #[async_trait]
    impl Eip1193 for Driver {
        async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params.clone()));
            match method {
                "eth_accounts" if *self.authorized.lock().unwrap() => {
                    Ok(json!(["0xb9c5714089478a327f09197987f16f9e5d936e8a"]))
                }
                "eth_accounts" => Ok(json!([])),
                "wallet_requestPermissions" => {
                    *self.authorized.lock().unwrap() = true;
                    Ok(json!([{ "parentCapability": "eth_accounts" }]))
                }
                "eth_chainId" => Ok(json!("0x89")),
                "personal_sign" => Ok(json!("0xsignature")),
                _ => Err(WalletError::Rpc {
                    code: USER_REJECTED,
                    message: "User denied".into(),
                }),
            }
        }

        fn bridge(&self) -> Option<&str> {
            self.bridge.as_deref()
        }
    }

    #[tokio::test]
    async fn it_requests_permissions_then_lists_accounts() -> TestResult {
        let driver = Arc::new(Driver::default());
        let provider = Web3Provider::new(driver.clone());

        assert!(provider.accounts().await?.is_empty());
        let accounts = provider.request_accounts().await?;

        assert_eq!(accounts, vec!["0xb9c5714089478a327f09197987f16f9e5d936e8a"]);
        Ok(())
    }

    #[tokio::test]
    async fn it_parses_hex_chain_ids() -> TestResult {
        let provider = Web3Provider::new(Arc::new(Driver::default()));
        assert_eq!(provider.chain_id().await?, 137);
        Ok(())
    }

    #[tokio::test]
    async fn it_hex_encodes_personal_messages() -> TestResult {
        let driver = Arc::new(Driver::default());
        *driver.authorized.lock().unwrap() = true;
        let provider = Web3Provider::new(driver.clone());

        let signature = provider.sign_message("hi").await?;
        assert_eq!(signature, "0xsignature");

        let calls = driver.calls.lock().unwrap();
        let (method, params) = calls.last().expect("no call recorded");
        assert_eq!(method, "personal_sign");
        assert_eq!(
            params,
            &json!(["0x6869", "0xb9c5714089478a327f09197987f16f9e5d936e8a"])
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_maps_user_rejection() {
        let provider = Web3Provider::new(Arc::new(Driver::default()));
        let error = provider.call("eth_sendTransaction", json!([])).await;
        assert_eq!(error, Err(WalletError::Rejected("User denied".into())));
    }

    #[test]
    fn it_detects_bridged_wallets() {
        let bridged = Web3Provider::new(Arc::new(Driver {
            bridge: Some("https://bridge.walletconnect.org".into()),
            ..Default::default()
        }));
        let injected = Web3Provider::new(Arc::new(Driver::default()));

        assert!(bridged.manages_permissions());
        assert!(!injected.manages_permissions());
    }

    #[test]
    fn it_rejects_malformed_quantities() {
        assert_eq!(parse_quantity(&json!(5)), Ok(5));
        assert!(parse_quantity(&json!("0xzz")).is_err());
        assert!(parse_quantity(&json!(null)).is_err());
    }
}
