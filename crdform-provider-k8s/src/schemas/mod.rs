//! Kubernetes manifest schema definitions

pub mod generated;

use crdform_core::lifecycle::computed_attributes;
use crdform_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub use generated::ManifestSchemaConfig;

/// RFC 1123 DNS label, used for namespaces
const DNS_LABEL_PATTERN: &str = "^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";

/// Starting point for every kind: the computed attributes, then `metadata`
///
/// Generated schemas append their own attributes after these, so `metadata`
/// always renders right after `kind`.
pub fn base_schema(resource_type: &str) -> ResourceSchema {
    computed_attributes()
        .into_iter()
        .fold(ResourceSchema::new(resource_type), ResourceSchema::attribute)
        .attribute(
            AttributeSchema::new("metadata", metadata_type())
                .required()
                .with_description("Standard object metadata"),
        )
}

/// Object metadata shared by every kind
pub fn metadata_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("name", types::dns_subdomain())
            .required()
            .with_description("Name of the object, unique within its namespace"),
        AttributeSchema::new("namespace", AttributeType::String)
            .with_pattern(DNS_LABEL_PATTERN)
            .with_length(None, Some(63))
            .with_description("Namespace of the object; ignored for cluster-scoped kinds"),
        AttributeSchema::new("labels", AttributeType::Map(Box::new(AttributeType::String)))
            .with_description("Map of string keys and values used to organize and select objects"),
        AttributeSchema::new(
            "annotations",
            AttributeType::Map(Box::new(AttributeType::String)),
        )
        .with_description("Unstructured key value map stored with the object"),
    ])
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crdform_core::resource::Value;

    fn metadata(entries: &[(&str, &str)]) -> HashMap<String, Value> {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        let mut attrs = HashMap::new();
        attrs.insert("metadata".to_string(), Value::Map(map));
        attrs
    }

    #[test]
    fn base_schema_orders_metadata_after_computed() {
        let schema = base_schema("k8s.example");
        let names: Vec<&str> = schema.attributes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "yaml", "api_version", "kind", "metadata"]);
    }

    #[test]
    fn metadata_name_must_be_dns_subdomain() {
        let schema = base_schema("k8s.example");
        assert!(schema.validate(&metadata(&[("name", "web.example")])).is_ok());

        let errors = schema
            .validate(&metadata(&[("name", "Web_Server")]))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), Some("metadata.name"));
    }

    #[test]
    fn namespace_must_be_dns_label() {
        let schema = base_schema("k8s.example");
        let errors = schema
            .validate(&metadata(&[("name", "web"), ("namespace", "a.b")]))
            .unwrap_err();
        assert_eq!(errors[0].path(), Some("metadata.namespace"));
    }

    #[test]
    fn metadata_is_required() {
        let schema = base_schema("k8s.example");
        let errors = schema.validate(&HashMap::new()).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "Required attribute 'metadata' is missing"
        );
    }
}
