//! [`CredentialManager`] over the browser's `navigator.credentials`.
//!
//! Options cross the boundary in their JSON form and are turned into
//! `ArrayBuffer`-backed dictionaries by `PublicKeyCredential.parse*FromJSON`.
//! Returned credentials come back through `PublicKeyCredential.toJSON()`.

use super::{
    CeremonyOptions, Credential, CredentialCreationOptions, CredentialError, CredentialManager,
    CredentialRequestOptions, with_abort,
};
use async_trait::async_trait;
use js_sys::{Function, JSON, Object, Promise, Reflect};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// `navigator.credentials` of the current global scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct NavigatorCredentials;

impl NavigatorCredentials {
    async fn ceremony(
        method: &str,
        parser: &str,
        options: &impl Serialize,
        ceremony: &CeremonyOptions,
    ) -> Result<Credential, CredentialError> {
        let public_key = parse_options(parser, options)?;
        let request = Object::new();
        js_set(&request, "publicKey", &public_key)?;
        if method == "get" {
            if let Some(mediation) = ceremony.mediation {
                let mediation = serde_json::to_value(mediation)
                    .map_err(|e| CredentialError::Platform(e.to_string()))?;
                if let Some(mediation) = mediation.as_str() {
                    js_set(&request, "mediation", &JsValue::from_str(mediation))?;
                }
            }
        }

        let container = credentials_container()?;
        let call: Function = js_get(&container, method)?.unchecked_into();
        let promise: Promise = call
            .call1(&container, &request)
            .map_err(reject)?
            .unchecked_into();

        let credential = with_abort(ceremony.signal.as_ref(), async {
            JsFuture::from(promise).await.map_err(reject)
        })
        .await?;

        if credential.is_null() {
            return Err(CredentialError::NotAllowed("no credential returned".into()));
        }
        read_credential(&credential)
    }
}

#[async_trait(?Send)]
impl CredentialManager for NavigatorCredentials {
    async fn create(
        &self,
        options: &CredentialCreationOptions,
        ceremony: &CeremonyOptions,
    ) -> Result<Credential, CredentialError> {
        Self::ceremony("create", "parseCreationOptionsFromJSON", options, ceremony).await
    }

    async fn get(
        &self,
        options: &CredentialRequestOptions,
        ceremony: &CeremonyOptions,
    ) -> Result<Credential, CredentialError> {
        Self::ceremony("get", "parseRequestOptionsFromJSON", options, ceremony).await
    }
}

fn parse_options(parser: &str, options: &impl Serialize) -> Result<JsValue, CredentialError> {
    let json = serde_json::to_string(options)
        .map_err(|e| CredentialError::Platform(format!("failed to encode options: {e}")))?;
    let value = JSON::parse(&json).map_err(reject)?;

    let class = js_get(&js_sys::global(), "PublicKeyCredential")?;
    if class.is_undefined() {
        return Err(CredentialError::NotAvailable(
            "PublicKeyCredential is undefined".into(),
        ));
    }
    let parse: Function = js_get(&class, parser)?
        .dyn_into()
        .map_err(|_| CredentialError::NotAvailable(format!("{parser} not supported")))?;
    parse.call1(&class, &value).map_err(reject)
}

fn read_credential(credential: &JsValue) -> Result<Credential, CredentialError> {
    let to_json: Function = js_get(credential, "toJSON")?
        .dyn_into()
        .map_err(|_| CredentialError::InvalidCredential("toJSON not supported".into()))?;
    let json = to_json.call0(credential).map_err(reject)?;
    let text: String = JSON::stringify(&json)
        .map_err(reject)?
        .into();
    serde_json::from_str(&text).map_err(|e| CredentialError::InvalidCredential(e.to_string()))
}

fn credentials_container() -> Result<JsValue, CredentialError> {
    let navigator = js_get(&js_sys::global(), "navigator")?;
    if navigator.is_undefined() {
        return Err(CredentialError::NotAvailable("navigator is undefined".into()));
    }
    let credentials = js_get(&navigator, "credentials")?;
    if credentials.is_undefined() {
        return Err(CredentialError::NotAvailable(
            "navigator.credentials is undefined".into(),
        ));
    }
    Ok(credentials)
}

/// Maps a rejected DOM promise onto [`CredentialError`] by exception name.
fn reject(error: JsValue) -> CredentialError {
    let name = Reflect::get(&error, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string())
        .unwrap_or_default();
    let message = Reflect::get(&error, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{error:?}"));
    match name.as_str() {
        "AbortError" => CredentialError::Aborted,
        "NotAllowedError" => CredentialError::NotAllowed(message),
        "NotSupportedError" => CredentialError::NotAvailable(message),
        _ => CredentialError::Platform(message),
    }
}

fn js_get(target: &JsValue, key: &str) -> Result<JsValue, CredentialError> {
    Reflect::get(target, &JsValue::from_str(key))
        .map_err(|e| CredentialError::Platform(format!("failed to get '{key}': {e:?}")))
}

fn js_set(target: &Object, key: &str, value: &JsValue) -> Result<(), CredentialError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map_err(|e| CredentialError::Platform(format!("failed to set '{key}': {e:?}")))?;
    Ok(())
}
