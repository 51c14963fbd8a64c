//! Crdform Kubernetes Provider
//!
//! Exposes Kubernetes custom resource kinds as resources. Each kind validates
//! its configuration against the generated schema and renders a manifest; no
//! cluster is contacted.
//!
//! ## Module Structure
//!
//! - `provider` - K8sProvider and the resource type of each served kind
//! - `schemas` - Shared metadata schema and auto-generated kind schemas

pub mod provider;
pub mod schemas;

// Re-export main types
pub use provider::{
    K8sProvider, ManifestResourceType, PROVIDER_NAME, ValidationError, terraform_type_name,
};

use crdform_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use crdform_core::resource::{Resource, ResourceId, State};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for K8sProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.kinds()
            .map(|kind| Box::new(kind.clone()) as Box<dyn ResourceType>)
            .collect()
    }

    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>> {
        let current = current.clone();
        Box::pin(async move { self.read_resource(&current) })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource) })
    }

    fn update(
        &self,
        _id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&from, &to) })
    }

    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<()>> {
        let current = current.clone();
        Box::pin(async move { self.delete_resource(&current) })
    }
}
