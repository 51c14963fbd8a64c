//! Auto-generated Kubernetes manifest schemas
//!
//! DO NOT EDIT MANUALLY - regenerate with:
//!   cargo run -p crdform-codegen -- --file crdform-codegen/fixtures/<kind>.yaml \
//!     -o crdform-provider-k8s/src/schemas/generated/<kind>.rs

use crdform_core::manifest::ManifestKind;
use crdform_core::schema::{AttributeType, ResourceSchema};

/// Manifest schema configuration
///
/// Combines the generated ResourceSchema with the constants stamped on
/// every manifest of the kind.
pub struct ManifestSchemaConfig {
    /// Manifest apiVersion (e.g., "cilium.io/v2")
    pub api_version: &'static str,
    /// Manifest kind (e.g., "CiliumNetworkPolicy")
    pub kind: &'static str,
    /// Resource type name without provider prefix (e.g., "cilium_io_cilium_network_policy_v2")
    pub resource_type_name: &'static str,
    /// Whether objects of this kind live in a namespace
    pub namespaced: bool,
    /// The resource schema with attribute definitions
    pub schema: ResourceSchema,
}

impl ManifestSchemaConfig {
    pub fn manifest_kind(&self) -> ManifestKind {
        ManifestKind::new(self.api_version, self.kind)
    }
}

/// String restricted to the given values
pub(crate) fn enum_type(values: &[&str]) -> AttributeType {
    AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
}

pub mod certificate;
pub mod cilium_clusterwide_network_policy;
pub mod cilium_network_policy;
pub mod service_monitor;

/// Returns all generated schema configs
pub fn configs() -> Vec<ManifestSchemaConfig> {
    vec![
        cilium_network_policy::cilium_io_cilium_network_policy_v2_config(),
        cilium_clusterwide_network_policy::cilium_io_cilium_clusterwide_network_policy_v2_config(),
        certificate::cert_manager_io_certificate_v1_config(),
        service_monitor::monitoring_coreos_com_service_monitor_v1_config(),
    ]
}
