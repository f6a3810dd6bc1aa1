use crate::Namespace;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Opaque metadata attached to a namespace in the session message.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// Abilities keyed by the target they apply to.
pub type TargetedActions = BTreeMap<String, Vec<String>>;

/// Receiver of namespaced capability declarations.
///
/// The session message builder implements this so the declarations end up
/// in the signed message. [`Capabilities`] implements it too, as an
/// accumulator.
pub trait CapabilitySink {
    /// Grant `actions` over the whole `namespace`.
    fn add_default_actions(&mut self, namespace: &Namespace, actions: &[String]);

    /// Grant `actions` over `target` within `namespace`.
    fn add_targeted_actions(&mut self, namespace: &Namespace, target: &str, actions: &[String]);

    /// Attach `fields` to `namespace`.
    fn add_extra_fields(&mut self, namespace: &Namespace, fields: &ExtraFields);
}

/// Everything contributed to a single namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceCapabilities {
    /// Abilities over the namespace as a whole.
    pub default_actions: BTreeSet<String>,
    /// Abilities over individual targets.
    pub targeted_actions: BTreeMap<String, BTreeSet<String>>,
    /// Metadata merged from every contributor, later keys win.
    pub extra_fields: ExtraFields,
}

impl NamespaceCapabilities {
    /// Returns `true` if nothing was contributed.
    pub fn is_empty(&self) -> bool {
        self.default_actions.is_empty()
            && self.targeted_actions.is_empty()
            && self.extra_fields.is_empty()
    }
}

/// Accumulated capability declarations, keyed by namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeMap<Namespace, NamespaceCapabilities>);

impl Capabilities {
    /// Returns `true` if no namespace received any contribution.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(NamespaceCapabilities::is_empty)
    }

    /// Namespaces that received contributions, in lexical order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.0.keys()
    }

    /// Everything contributed to `namespace`.
    pub fn get(&self, namespace: &Namespace) -> Option<&NamespaceCapabilities> {
        self.0.get(namespace)
    }

    /// Default actions granted over `namespace`.
    pub fn default_actions(&self, namespace: &Namespace) -> impl Iterator<Item = &str> {
        self.0
            .get(namespace)
            .into_iter()
            .flat_map(|entry| entry.default_actions.iter().map(String::as_str))
    }

    /// Actions granted over `target` within `namespace`.
    pub fn targeted_actions(
        &self,
        namespace: &Namespace,
        target: &str,
    ) -> impl Iterator<Item = &str> {
        self.0
            .get(namespace)
            .and_then(|entry| entry.targeted_actions.get(target))
            .into_iter()
            .flat_map(|actions| actions.iter().map(String::as_str))
    }

    /// Replays every declaration into `sink`.
    ///
    /// Namespaces are visited in lexical order. Within a namespace, default
    /// actions come first, then targeted actions, then extra fields.
    pub fn apply<S>(&self, sink: &mut S)
    where
        S: CapabilitySink + ?Sized,
    {
        for (namespace, entry) in &self.0 {
            if !entry.default_actions.is_empty() {
                let actions: Vec<String> = entry.default_actions.iter().cloned().collect();
                sink.add_default_actions(namespace, &actions);
            }
            for (target, actions) in &entry.targeted_actions {
                let actions: Vec<String> = actions.iter().cloned().collect();
                sink.add_targeted_actions(namespace, target, &actions);
            }
            if !entry.extra_fields.is_empty() {
                sink.add_extra_fields(namespace, &entry.extra_fields);
            }
        }
    }

    fn entry(&mut self, namespace: &Namespace) -> &mut NamespaceCapabilities {
        self.0.entry(namespace.clone()).or_default()
    }
}

impl CapabilitySink for Capabilities {
    fn add_default_actions(&mut self, namespace: &Namespace, actions: &[String]) {
        self.entry(namespace)
            .default_actions
            .extend(actions.iter().cloned());
    }

    fn add_targeted_actions(&mut self, namespace: &Namespace, target: &str, actions: &[String]) {
        self.entry(namespace)
            .targeted_actions
            .entry(target.to_string())
            .or_default()
            .extend(actions.iter().cloned());
    }

    fn add_extra_fields(&mut self, namespace: &Namespace, fields: &ExtraFields) {
        let entry = self.entry(namespace);
        for (key, value) in fields {
            entry.extra_fields.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    fn actions(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl CapabilitySink for Recorder {
        fn add_default_actions(&mut self, namespace: &Namespace, actions: &[String]) {
            self.0.push(format!("default {namespace} {}", actions.join(",")));
        }

        fn add_targeted_actions(
            &mut self,
            namespace: &Namespace,
            target: &str,
            actions: &[String],
        ) {
            self.0
                .push(format!("targeted {namespace} {target} {}", actions.join(",")));
        }

        fn add_extra_fields(&mut self, namespace: &Namespace, fields: &ExtraFields) {
            let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
            self.0.push(format!("extra {namespace} {}", keys.join(",")));
        }
    }

    #[test]
    fn it_accumulates_actions_within_a_namespace() -> TestResult {
        let kepler: Namespace = "kepler".parse()?;
        let mut capabilities = Capabilities::default();

        capabilities.add_default_actions(&kepler, &actions(&["get", "list"]));
        capabilities.add_default_actions(&kepler, &actions(&["put", "get"]));

        assert_eq!(
            capabilities.default_actions(&kepler).collect::<Vec<_>>(),
            vec!["get", "list", "put"]
        );
        Ok(())
    }

    #[test]
    fn it_keeps_namespaces_apart() -> TestResult {
        let kepler: Namespace = "kepler".parse()?;
        let credentials: Namespace = "credentials".parse()?;
        let mut capabilities = Capabilities::default();

        capabilities.add_default_actions(&kepler, &actions(&["get"]));
        capabilities.add_targeted_actions(&credentials, "urn:vc", &actions(&["read"]));

        assert_eq!(capabilities.default_actions(&credentials).count(), 0);
        assert_eq!(capabilities.targeted_actions(&kepler, "urn:vc").count(), 0);
        assert_eq!(
            capabilities
                .targeted_actions(&credentials, "urn:vc")
                .collect::<Vec<_>>(),
            vec!["read"]
        );
        Ok(())
    }

    #[test]
    fn it_is_idempotent_under_repeated_contributions() -> TestResult {
        let kepler: Namespace = "kepler".parse()?;
        let contribute = |capabilities: &mut Capabilities| {
            capabilities.add_default_actions(&kepler, &actions(&["get"]));
            capabilities.add_targeted_actions(&kepler, "kepler:pkh:1", &actions(&["put"]));
            let mut fields = ExtraFields::new();
            fields.insert("version".into(), json!(1));
            capabilities.add_extra_fields(&kepler, &fields);
        };

        let mut once = Capabilities::default();
        contribute(&mut once);

        let mut twice = Capabilities::default();
        contribute(&mut twice);
        contribute(&mut twice);

        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn it_lets_later_extra_fields_win() -> TestResult {
        let kepler: Namespace = "kepler".parse()?;
        let mut capabilities = Capabilities::default();

        let mut first = ExtraFields::new();
        first.insert("host".into(), json!("a"));
        first.insert("region".into(), json!("eu"));
        let mut second = ExtraFields::new();
        second.insert("host".into(), json!("b"));

        capabilities.add_extra_fields(&kepler, &first);
        capabilities.add_extra_fields(&kepler, &second);

        let fields = &capabilities.get(&kepler).ok_or("missing namespace")?.extra_fields;
        assert_eq!(fields.get("host"), Some(&json!("b")));
        assert_eq!(fields.get("region"), Some(&json!("eu")));
        Ok(())
    }

    #[test]
    fn it_replays_into_a_sink() -> TestResult {
        let kepler: Namespace = "kepler".parse()?;
        let mut capabilities = Capabilities::default();
        capabilities.add_default_actions(&kepler, &actions(&["put", "get"]));
        capabilities.add_targeted_actions(&kepler, "orbit", &actions(&["list"]));
        let mut fields = ExtraFields::new();
        fields.insert("version".into(), json!(2));
        capabilities.add_extra_fields(&kepler, &fields);

        let mut recorder = Recorder::default();
        capabilities.apply(&mut recorder);

        assert_eq!(
            recorder.0,
            vec![
                "default kepler get,put".to_string(),
                "targeted kepler orbit list".to_string(),
                "extra kepler version".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn it_reports_emptiness() -> TestResult {
        let kepler: Namespace = "kepler".parse()?;
        let mut capabilities = Capabilities::default();
        assert!(capabilities.is_empty());

        capabilities.add_default_actions(&kepler, &[]);
        assert!(capabilities.is_empty());

        capabilities.add_default_actions(&kepler, &actions(&["get"]));
        assert!(!capabilities.is_empty());
        Ok(())
    }
}
