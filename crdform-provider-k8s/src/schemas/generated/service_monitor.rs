//! service_monitor schema definition
//!
//! Auto-generated from CustomResourceDefinition: servicemonitors.monitoring.coreos.com (v1)
//!
//! DO NOT EDIT MANUALLY - regenerate with crdform-codegen

use super::{ManifestSchemaConfig, enum_type};
use crate::schemas::base_schema;
use crdform_core::schema::{AttributeSchema, AttributeType};

/// Returns the schema config for monitoring_coreos_com_service_monitor_v1 (monitoring.coreos.com/v1 ServiceMonitor)
pub fn monitoring_coreos_com_service_monitor_v1_config() -> ManifestSchemaConfig {
    ManifestSchemaConfig {
        api_version: "monitoring.coreos.com/v1",
        kind: "ServiceMonitor",
        resource_type_name: "monitoring_coreos_com_service_monitor_v1",
        namespaced: true,
        schema: base_schema("k8s.monitoring_coreos_com_service_monitor_v1")
            .with_description("The `ServiceMonitor` custom resource definition (CRD) defines how `Prometheus` and `PrometheusAgent` can scrape metrics from a group of services.")
            .attribute(
                AttributeSchema::new("spec", spec_type())
                    .required()
                    .with_description("Specification of desired Service selection for target discovery by Prometheus."),
            ),
    }
}

fn metric_relabelings_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("action", enum_type(&["replace", "keep", "drop", "hashmod", "labelmap", "labeldrop", "labelkeep", "lowercase", "uppercase", "keepequal", "dropequal"]))
            .with_description("Action to perform based on the regex matching."),
        AttributeSchema::new("modulus", AttributeType::Int)
            .with_description("Modulus to take of the hash of the source label values."),
        AttributeSchema::new("regex", AttributeType::String)
            .with_description("Regular expression against which the extracted value is matched."),
        AttributeSchema::new("replacement", AttributeType::String)
            .with_description("Replacement value against which a Replace action is performed if the regular expression matches."),
        AttributeSchema::new("separator", AttributeType::String)
            .with_description("Separator is the string between concatenated SourceLabels."),
        AttributeSchema::new("source_labels", AttributeType::List(Box::new(AttributeType::String.with_pattern("^[a-zA-Z_][a-zA-Z0-9_]*$"))))
            .with_description("The source labels select values from existing labels.")
            .with_yaml_name("sourceLabels"),
        AttributeSchema::new("target_label", AttributeType::String)
            .with_description("Label to which the resulting string is written in a replacement.")
            .with_yaml_name("targetLabel"),
    ])
}

fn endpoints_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("honor_labels", AttributeType::Bool)
            .with_description("When true, honorLabels preserves the metric's labels when they collide with the target's labels.")
            .with_yaml_name("honorLabels"),
        AttributeSchema::new("interval", AttributeType::String.with_pattern("^(0|(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?)$"))
            .with_description("Interval at which Prometheus scrapes the metrics from the target."),
        AttributeSchema::new("metric_relabelings", AttributeType::List(Box::new(metric_relabelings_type())))
            .with_description("Configures the relabeling rules to apply to the samples before ingestion.")
            .with_yaml_name("metricRelabelings"),
        AttributeSchema::new("params", AttributeType::Map(Box::new(AttributeType::List(Box::new(AttributeType::String)))))
            .with_description("params define optional HTTP URL parameters."),
        AttributeSchema::new("path", AttributeType::String)
            .with_description("HTTP path from which to scrape for metrics."),
        AttributeSchema::new("port", AttributeType::String)
            .with_description("Name of the Service port which this endpoint refers to."),
        AttributeSchema::new("relabelings", AttributeType::List(Box::new(metric_relabelings_type())))
            .with_description("Configures the relabeling rules to apply the target's metadata labels."),
        AttributeSchema::new("scheme", enum_type(&["http", "https"]))
            .with_description("HTTP scheme to use for scraping."),
        AttributeSchema::new("scrape_timeout", AttributeType::String.with_pattern("^(0|(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?)$"))
            .with_description("Timeout after which Prometheus considers the scrape to be failed.")
            .with_yaml_name("scrapeTimeout"),
    ])
}

fn namespace_selector_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("any", AttributeType::Bool)
            .with_description("Boolean describing whether all namespaces are selected in contrast to a list restricting them."),
        AttributeSchema::new("match_names", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("List of namespace names to select from.")
            .with_yaml_name("matchNames"),
    ])
}

fn match_expressions_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("key", AttributeType::String)
            .required()
            .with_description("key is the label key that the selector applies to."),
        AttributeSchema::new("operator", enum_type(&["In", "NotIn", "Exists", "DoesNotExist"]))
            .required()
            .with_description("operator represents a key's relationship to a set of values."),
        AttributeSchema::new("values", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("values is an array of string values."),
    ])
}

fn selector_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("match_expressions", AttributeType::List(Box::new(match_expressions_type())))
            .with_description("matchExpressions is a list of label selector requirements. The requirements are ANDed.")
            .with_yaml_name("matchExpressions"),
        AttributeSchema::new("match_labels", AttributeType::Map(Box::new(AttributeType::String)))
            .with_description("matchLabels is a map of {key,value} pairs.")
            .with_yaml_name("matchLabels"),
    ])
}

fn spec_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("endpoints", AttributeType::List(Box::new(endpoints_type())))
            .with_description("List of endpoints part of this ServiceMonitor."),
        AttributeSchema::new("job_label", AttributeType::String)
            .with_description("The label to use to retrieve the job name from.")
            .with_yaml_name("jobLabel"),
        AttributeSchema::new("namespace_selector", namespace_selector_type())
            .with_description("Selector to select which namespaces the Kubernetes Endpoints objects are discovered from.")
            .with_yaml_name("namespaceSelector"),
        AttributeSchema::new("pod_target_labels", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("podTargetLabels defines the labels which are transferred from the associated Kubernetes Pod object onto the ingested metrics.")
            .with_yaml_name("podTargetLabels"),
        AttributeSchema::new("sample_limit", AttributeType::Int.with_range(Some(0), None))
            .with_description("SampleLimit defines a per-scrape limit on the number of scraped samples that will be accepted.")
            .with_yaml_name("sampleLimit"),
        AttributeSchema::new("selector", selector_type())
            .required()
            .with_description("Label selector to select the Kubernetes Endpoints objects to scrape metrics from."),
        AttributeSchema::new("target_labels", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("targetLabels defines the labels which are transferred from the associated Kubernetes Service object onto the ingested metrics.")
            .with_yaml_name("targetLabels"),
    ])
}
