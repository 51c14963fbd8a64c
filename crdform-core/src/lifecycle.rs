//! Lifecycle - Generic Create/Read/Update/Delete for manifest kinds
//!
//! Every kind shares the same lifecycle: render the configuration as a
//! manifest, stamp the kind's constants and a fresh id, and hand the result
//! back as state. Read and Delete do not touch anything.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::manifest::{self, ManifestKind};
use crate::provider::{ProviderError, ProviderResult};
use crate::resource::{Resource, State, Value};
use crate::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Attributes the handler writes into every state
pub const COMPUTED_ATTRIBUTES: [&str; 4] = ["id", "yaml", "api_version", "kind"];

/// Schema fragment for [`COMPUTED_ATTRIBUTES`]
pub fn computed_attributes() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("id", AttributeType::Int)
            .computed()
            .with_description("Time-based identifier, in nanoseconds"),
        AttributeSchema::new("yaml", AttributeType::String)
            .computed()
            .with_description("The rendered manifest"),
        AttributeSchema::new("api_version", AttributeType::String)
            .computed()
            .with_description("The manifest apiVersion"),
        AttributeSchema::new("kind", AttributeType::String)
            .computed()
            .with_description("The manifest kind"),
    ]
}

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Current time in nanoseconds, bumped so that no two calls return the same id
pub fn next_id() -> i64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_ID.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Lifecycle handler for one manifest kind
#[derive(Debug, Clone)]
pub struct ManifestHandler {
    kind: ManifestKind,
    schema: ResourceSchema,
}

impl ManifestHandler {
    pub fn new(kind: ManifestKind, schema: ResourceSchema) -> Self {
        Self { kind, schema }
    }

    pub fn kind(&self) -> &ManifestKind {
        &self.kind
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// Render the manifest for a resource without producing state
    pub fn render(&self, resource: &Resource) -> ProviderResult<String> {
        manifest::to_yaml(&self.kind, &self.schema, &resource.user_attributes()).map_err(|e| {
            ProviderError::new(format!("Could not generate YAML: {}", e))
                .for_resource(resource.id.clone())
                .with_cause(e)
        })
    }

    pub fn create(&self, resource: &Resource) -> ProviderResult<State> {
        let yaml = self.render(resource)?;
        let id = next_id();
        log::debug!("Rendered {} as {} (id {})", resource.id, self.kind, id);

        let mut attributes = resource.user_attributes();
        attributes.insert("id".to_string(), Value::Int(id));
        attributes.insert(
            "api_version".to_string(),
            Value::String(self.kind.api_version.to_string()),
        );
        attributes.insert("kind".to_string(), Value::String(self.kind.kind.to_string()));
        attributes.insert("yaml".to_string(), Value::String(yaml));

        Ok(State::existing(resource.id.clone(), attributes).with_identifier(id.to_string()))
    }

    /// Stored state is authoritative
    pub fn read(&self, current: &State) -> ProviderResult<State> {
        Ok(current.clone())
    }

    /// Full replace, same as create
    pub fn update(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        log::debug!(
            "Replacing {} (previous id {})",
            to.id,
            from.identifier.as_deref().unwrap_or("-")
        );
        self.create(to)
    }

    pub fn delete(&self, current: &State) -> ProviderResult<()> {
        log::debug!("Forgetting {}", current.id);
        Ok(())
    }
}

/// Strip the computed attributes from a state, leaving the echoed configuration
pub fn configured_attributes(state: &State) -> HashMap<String, Value> {
    state
        .attributes
        .iter()
        .filter(|(k, _)| !COMPUTED_ATTRIBUTES.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIND: ManifestKind = ManifestKind::new("cilium.io/v2", "CiliumNetworkPolicy");

    fn handler() -> ManifestHandler {
        let mut schema = ResourceSchema::new("k8s.policy");
        for attr in computed_attributes() {
            schema = schema.attribute(attr);
        }
        schema = schema
            .attribute(
                AttributeSchema::new(
                    "metadata",
                    AttributeType::Object(vec![
                        AttributeSchema::new("name", AttributeType::String).required(),
                    ]),
                )
                .required(),
            )
            .attribute(AttributeSchema::new(
                "spec",
                AttributeType::Object(vec![AttributeSchema::new(
                    "description",
                    AttributeType::String,
                )]),
            ));
        ManifestHandler::new(KIND, schema)
    }

    fn resource(name: &str) -> Resource {
        let mut metadata = HashMap::new();
        metadata.insert("name".to_string(), Value::String(name.to_string()));
        Resource::new("policy", name)
            .with_attribute("_provider", Value::String("k8s".to_string()))
            .with_attribute("metadata", Value::Map(metadata))
    }

    #[test]
    fn create_stamps_constants_and_yaml() {
        let state = handler().create(&resource("demo")).unwrap();

        assert!(state.exists);
        assert_eq!(
            state.attributes.get("api_version"),
            Some(&Value::String("cilium.io/v2".to_string()))
        );
        assert_eq!(
            state.attributes.get("kind"),
            Some(&Value::String("CiliumNetworkPolicy".to_string()))
        );
        assert!(!state.attributes.contains_key("_provider"));

        let yaml = state.yaml().unwrap();
        assert!(yaml.contains("metadata:\n  name: demo"));
        assert!(!yaml.contains("spec:"));

        let Some(Value::Int(id)) = state.attributes.get("id") else {
            panic!("id should be an Int");
        };
        assert_eq!(state.identifier, Some(id.to_string()));
    }

    #[test]
    fn constants_ignore_user_input() {
        let r = resource("demo").with_attribute("kind", Value::String("Pod".to_string()));
        let state = handler().create(&r).unwrap();
        assert_eq!(
            state.attributes.get("kind"),
            Some(&Value::String("CiliumNetworkPolicy".to_string()))
        );
        assert!(state.yaml().unwrap().contains("kind: CiliumNetworkPolicy"));
    }

    #[test]
    fn ids_strictly_increase() {
        let h = handler();
        let first = h.create(&resource("a")).unwrap();
        let second = h.update(&first, &resource("a")).unwrap();
        let third = h.create(&resource("b")).unwrap();

        let id = |s: &State| match s.attributes.get("id") {
            Some(Value::Int(n)) => *n,
            _ => panic!("missing id"),
        };
        assert!(id(&first) < id(&second));
        assert!(id(&second) < id(&third));
    }

    #[test]
    fn next_id_is_monotonic_under_contention() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..100).map(|_| next_id()).collect::<Vec<_>>()))
            .collect();
        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let count = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), count);
    }

    #[test]
    fn render_failure_reports_yaml_error() {
        let mut metadata = HashMap::new();
        metadata.insert(
            "name".to_string(),
            Value::ResourceRef("other".to_string(), "id".to_string()),
        );
        let r = Resource::new("policy", "demo").with_attribute("metadata", Value::Map(metadata));

        let err = handler().create(&r).unwrap_err();
        assert!(err.message.starts_with("Could not generate YAML"));
        assert_eq!(err.resource_id, Some(r.id.clone()));
    }

    #[test]
    fn read_and_delete_are_no_ops() {
        let h = handler();
        let state = h.create(&resource("demo")).unwrap();
        assert_eq!(h.read(&state).unwrap(), state);
        assert!(h.delete(&state).is_ok());
    }

    #[test]
    fn configured_attributes_drop_computed() {
        let state = handler().create(&resource("demo")).unwrap();
        let attrs = configured_attributes(&state);
        assert_eq!(attrs.len(), 1);
        assert!(attrs.contains_key("metadata"));
    }
}
