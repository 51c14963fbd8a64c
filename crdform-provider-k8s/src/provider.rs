//! Kubernetes manifest provider implementation
//!
//! Every resource type is backed by a ManifestHandler built from its
//! generated schema config. Nothing is sent to a cluster: the provider's
//! output is the rendered manifest kept in state.

use std::collections::BTreeMap;

use crdform_core::lifecycle::ManifestHandler;
use crdform_core::manifest::ManifestKind;
use crdform_core::provider::{ProviderError, ProviderResult, ResourceType};
use crdform_core::resource::{Resource, ResourceId, State, Value};
use crdform_core::schema::{ResourceSchema, TypeError};

use crate::schemas::generated::{ManifestSchemaConfig, configs};

/// Provider name used in configuration (`k8s.<resource_type>`)
pub const PROVIDER_NAME: &str = "k8s";

/// Flat `k8s_<group>_<kind>_<version>` name of a resource type
pub fn terraform_type_name(resource_type_name: &str) -> String {
    format!("{}_{}", PROVIDER_NAME, resource_type_name)
}

/// Error returned when a resource does not fit its kind
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("{id}: {}", describe(.errors))]
    Invalid {
        id: ResourceId,
        errors: Vec<TypeError>,
    },
}

fn describe(errors: &[TypeError]) -> String {
    match errors {
        [single] => single.to_string(),
        _ => format!("{} validation errors", errors.len()),
    }
}

impl From<ValidationError> for ProviderError {
    fn from(e: ValidationError) -> Self {
        let id = match &e {
            ValidationError::Invalid { id, .. } => Some(id.clone()),
            ValidationError::UnknownResourceType(_) => None,
        };
        let err = ProviderError::new(e.to_string()).with_cause(e);
        match id {
            Some(id) => err.for_resource(id),
            None => err,
        }
    }
}

/// One manifest kind served by the provider
#[derive(Debug, Clone)]
pub struct ManifestResourceType {
    name: &'static str,
    handler: ManifestHandler,
    namespaced: bool,
}

impl ResourceType for ManifestResourceType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schema(&self) -> ResourceSchema {
        self.handler.schema().clone()
    }

    fn manifest_kind(&self) -> ManifestKind {
        *self.handler.kind()
    }

    fn namespaced(&self) -> bool {
        self.namespaced
    }
}

/// Kubernetes manifest provider
pub struct K8sProvider {
    /// Keyed by resource type name, so listings come out sorted
    kinds: BTreeMap<String, ManifestResourceType>,
    default_namespace: Option<String>,
}

impl Default for K8sProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl K8sProvider {
    /// Create a provider serving every generated kind
    pub fn new() -> Self {
        Self::with_configs(configs())
    }

    /// Create a provider serving the given kinds
    pub fn with_configs(configs: Vec<ManifestSchemaConfig>) -> Self {
        let kinds = configs
            .into_iter()
            .map(|config| {
                let kind = ManifestResourceType {
                    name: config.resource_type_name,
                    handler: ManifestHandler::new(config.manifest_kind(), config.schema),
                    namespaced: config.namespaced,
                };
                (config.resource_type_name.to_string(), kind)
            })
            .collect();

        Self {
            kinds,
            default_namespace: None,
        }
    }

    /// Namespace applied to namespaced kinds that do not set `metadata.namespace`
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = Some(namespace.into());
        self
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    pub fn schema(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.kinds.get(resource_type).map(|k| k.handler.schema())
    }

    /// Every served kind, ordered by resource type name
    pub fn kinds(&self) -> impl Iterator<Item = &ManifestResourceType> {
        self.kinds.values()
    }

    fn kind_for(&self, resource: &Resource) -> Result<&ManifestResourceType, ValidationError> {
        let unknown = || ValidationError::UnknownResourceType(resource.qualified_type());
        if resource.provider().is_some_and(|p| p != PROVIDER_NAME) {
            return Err(unknown());
        }
        self.kinds.get(&resource.id.resource_type).ok_or_else(unknown)
    }

    /// Normalize a resource against its kind's schema and check every constraint
    ///
    /// Returns the normalized resource (blocks reshaped, default namespace
    /// applied) ready to be rendered.
    pub fn validate_resource(&self, resource: &Resource) -> Result<Resource, ValidationError> {
        let kind = self.kind_for(resource)?;
        let schema = kind.handler.schema();

        let mut attributes = schema.normalize(resource.attributes.clone());
        let mut errors = Vec::new();

        if let Some(Value::Map(metadata)) = attributes.get_mut("metadata") {
            if kind.namespaced {
                if let Some(namespace) = &self.default_namespace {
                    metadata
                        .entry("namespace".to_string())
                        .or_insert_with(|| Value::String(namespace.clone()));
                }
            } else if metadata.contains_key("namespace") {
                errors.push(
                    TypeError::ValidationFailed {
                        message: format!(
                            "{} is cluster-scoped and cannot set a namespace",
                            kind.handler.kind().kind
                        ),
                    }
                    .within("namespace")
                    .within("metadata"),
                );
            }
        }

        let normalized = Resource {
            id: resource.id.clone(),
            attributes,
        };

        if let Err(schema_errors) = schema.validate(&normalized.user_attributes()) {
            errors.extend(schema_errors);
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(ValidationError::Invalid {
                id: resource.id.clone(),
                errors,
            })
        }
    }

    /// Render the manifest a create would produce, without stamping state
    pub fn preview_yaml(&self, resource: &Resource) -> ProviderResult<String> {
        let normalized = self.validate_resource(resource)?;
        let kind = self.kind_for(&normalized)?;
        kind.handler.render(&normalized)
    }

    pub fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let normalized = self.validate_resource(resource)?;
        let kind = self.kind_for(&normalized)?;
        kind.handler.create(&normalized)
    }

    pub fn update_resource(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        let normalized = self.validate_resource(to)?;
        let kind = self.kind_for(&normalized)?;
        kind.handler.update(from, &normalized)
    }

    pub fn read_resource(&self, current: &State) -> ProviderResult<State> {
        match self.kinds.get(&current.id.resource_type) {
            Some(kind) => kind.handler.read(current),
            None => Err(ProviderError::new(format!(
                "Unknown resource type: {}",
                current.id.resource_type
            ))
            .for_resource(current.id.clone())),
        }
    }

    pub fn delete_resource(&self, current: &State) -> ProviderResult<()> {
        match self.kinds.get(&current.id.resource_type) {
            Some(kind) => kind.handler.delete(current),
            // A kind dropped from the provider can still be forgotten
            None => {
                log::warn!("Deleting {} of unknown resource type", current.id);
                Ok(())
            }
        }
    }
}
