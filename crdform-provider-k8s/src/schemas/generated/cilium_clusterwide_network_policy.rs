//! cilium_clusterwide_network_policy schema definition
//!
//! Auto-generated from CustomResourceDefinition: ciliumclusterwidenetworkpolicies.cilium.io (v2)
//!
//! DO NOT EDIT MANUALLY - regenerate with crdform-codegen

use super::{ManifestSchemaConfig, enum_type};
use crate::schemas::base_schema;
use crdform_core::schema::{AttributeSchema, AttributeType};

/// Returns the schema config for cilium_io_cilium_clusterwide_network_policy_v2 (cilium.io/v2 CiliumClusterwideNetworkPolicy)
pub fn cilium_io_cilium_clusterwide_network_policy_v2_config() -> ManifestSchemaConfig {
    ManifestSchemaConfig {
        api_version: "cilium.io/v2",
        kind: "CiliumClusterwideNetworkPolicy",
        resource_type_name: "cilium_io_cilium_clusterwide_network_policy_v2",
        namespaced: false,
        schema: base_schema("k8s.cilium_io_cilium_clusterwide_network_policy_v2")
            .with_description("CiliumClusterwideNetworkPolicy is a Kubernetes third-party resource with an modified version of CiliumNetworkPolicy which is cluster scoped rather tha...")
            .attribute(
                AttributeSchema::new("spec", spec_type())
                    .with_description("Spec is the desired Cilium specific rule specification."),
            )
            .attribute(
                AttributeSchema::new("specs", AttributeType::List(Box::new(spec_type())))
                    .with_description("Specs is a list of desired Cilium specific rule specification."),
            ),
    }
}

fn fields_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("family", enum_type(&["IPv4", "IPv6"]))
            .with_description("Family is a IP address version."),
        AttributeSchema::new("type", AttributeType::Int.with_range(Some(0), Some(255)))
            .required()
            .with_description("Type is a ICMP-type."),
    ])
}

fn icmps_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("fields", AttributeType::List(Box::new(fields_type())).with_length(None, Some(40)))
            .with_description("Fields is a list of ICMP fields."),
    ])
}

fn to_cidr_set_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("cidr", AttributeType::String.with_pattern("^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])/([0-9]|[1-2][0-9]|3[0-2])$|^([0-9A-Fa-f]{0,4}:){2,7}[0-9A-Fa-f]{0,4}/([0-9]|[1-9][0-9]|1[0-1][0-9]|12[0-8])$"))
            .with_description("CIDR is a CIDR prefix / IP Block."),
        AttributeSchema::new("cidr_group_ref", AttributeType::String.with_pattern("^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").with_length(None, Some(253)))
            .with_description("CIDRGroupRef is a reference to a CiliumCIDRGroup object.")
            .with_yaml_name("cidrGroupRef"),
        AttributeSchema::new("except", AttributeType::List(Box::new(AttributeType::String.with_pattern("^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])/([0-9]|[1-2][0-9]|3[0-2])$|^([0-9A-Fa-f]{0,4}:){2,7}[0-9A-Fa-f]{0,4}/([0-9]|[1-9][0-9]|1[0-1][0-9]|12[0-8])$"))))
            .with_description("ExceptCIDRs is a list of IP blocks which the endpoint subject to the rule is not allowed to initiate connections to."),
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
            .with_description("values is an array of string values. If the operator is In or NotIn, the values array must be non-empty."),
    ])
}

fn to_endpoints_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("match_expressions", AttributeType::List(Box::new(match_expressions_type())))
            .with_description("matchExpressions is a list of label selector requirements. The requirements are ANDed.")
            .with_yaml_name("matchExpressions"),
        AttributeSchema::new("match_labels", AttributeType::Map(Box::new(AttributeType::String.with_pattern("^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$").with_length(None, Some(63)))))
            .with_description("matchLabels is a map of {key,value} pairs.")
            .with_yaml_name("matchLabels"),
    ])
}

fn to_fqdns_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("match_name", AttributeType::String.with_pattern("^([-a-zA-Z0-9_]+[.]?)+$").with_length(None, Some(255)))
            .with_description("MatchName matches literal DNS names.")
            .with_yaml_name("matchName"),
        AttributeSchema::new("match_pattern", AttributeType::String.with_pattern("^([-a-zA-Z0-9_*]+[.]?)+$").with_length(None, Some(255)))
            .with_description("MatchPattern allows using wildcards to match DNS names.")
            .with_yaml_name("matchPattern"),
    ])
}

fn ports_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("end_port", AttributeType::Int.with_range(Some(0), Some(65535)))
            .with_description("EndPort can only be an L4 port number.")
            .with_yaml_name("endPort"),
        AttributeSchema::new("port", AttributeType::String.with_pattern("^(6553[0-5]|655[0-2][0-9]|65[0-4][0-9]{2}|6[0-4][0-9]{3}|[1-5][0-9]{4}|[0-9]{1,4})|([a-zA-Z0-9]-?)*[a-zA-Z](-?[a-zA-Z0-9])*$"))
            .required()
            .with_description("Port can be an L4 port number, or a name in the form of \"http\" or \"http-8080\"."),
        AttributeSchema::new("protocol", enum_type(&["TCP", "UDP", "SCTP", "ANY"]))
            .with_description("Protocol is the L4 protocol. If omitted or empty, any protocol matches."),
    ])
}

fn to_ports_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("ports", AttributeType::List(Box::new(ports_type())).with_length(None, Some(40)))
            .with_description("Ports is a list of L4 port/protocol"),
        AttributeSchema::new("server_names", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("ServerNames is a list of allowed TLS SNI values.")
            .with_yaml_name("serverNames"),
    ])
}

fn egress_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("icmps", AttributeType::List(Box::new(icmps_type())))
            .with_description("ICMPs is a list of ICMP rule identified by type number which the endpoint subject to the rule is allowed to communicate with."),
        AttributeSchema::new("to_cidr", AttributeType::List(Box::new(AttributeType::String.with_pattern("^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])/([0-9]|[1-2][0-9]|3[0-2])$|^([0-9A-Fa-f]{0,4}:){2,7}[0-9A-Fa-f]{0,4}/([0-9]|[1-9][0-9]|1[0-1][0-9]|12[0-8])$"))))
            .with_description("ToCIDR is a list of IP blocks which the endpoint subject to the rule is allowed to initiate connections.")
            .with_yaml_name("toCIDR"),
        AttributeSchema::new("to_cidr_set", AttributeType::List(Box::new(to_cidr_set_type())))
            .with_description("ToCIDRSet is a list of IP blocks which the endpoint subject to the rule is allowed to initiate connections to in addition to connections which are all...")
            .with_yaml_name("toCIDRSet"),
        AttributeSchema::new("to_endpoints", AttributeType::List(Box::new(to_endpoints_type())))
            .with_description("ToEndpoints is a list of endpoints identified by an EndpointSelector to which the endpoints subject to the rule are allowed to communicate.")
            .with_yaml_name("toEndpoints"),
        AttributeSchema::new("to_entities", AttributeType::List(Box::new(enum_type(&["all", "world", "cluster", "host", "init", "ingress", "unmanaged", "remote-node", "health", "none", "kube-apiserver"]))))
            .with_description("ToEntities is a list of special entities to which the endpoint subject to the rule is allowed to initiate connections.")
            .with_yaml_name("toEntities"),
        AttributeSchema::new("to_fqdns", AttributeType::List(Box::new(to_fqdns_type())))
            .with_description("ToFQDN allows whitelisting DNS names in place of IPs.")
            .with_yaml_name("toFQDNs"),
        AttributeSchema::new("to_ports", AttributeType::List(Box::new(to_ports_type())))
            .with_description("ToPorts is a list of destination ports identified by port number and protocol which the endpoint subject to the rule is allowed to connect to.")
            .with_yaml_name("toPorts"),
    ])
}

fn egress_deny_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("icmps", AttributeType::List(Box::new(icmps_type())))
            .with_description("ICMPs is a list of ICMP rule identified by type number which the endpoint subject to the rule is allowed to communicate with."),
        AttributeSchema::new("to_cidr", AttributeType::List(Box::new(AttributeType::String.with_pattern("^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])/([0-9]|[1-2][0-9]|3[0-2])$|^([0-9A-Fa-f]{0,4}:){2,7}[0-9A-Fa-f]{0,4}/([0-9]|[1-9][0-9]|1[0-1][0-9]|12[0-8])$"))))
            .with_description("ToCIDR is a list of IP blocks which the endpoint subject to the rule is allowed to initiate connections.")
            .with_yaml_name("toCIDR"),
        AttributeSchema::new("to_cidr_set", AttributeType::List(Box::new(to_cidr_set_type())))
            .with_description("ToCIDRSet is a list of IP blocks which the endpoint subject to the rule is allowed to initiate connections to in addition to connections which are all...")
            .with_yaml_name("toCIDRSet"),
        AttributeSchema::new("to_endpoints", AttributeType::List(Box::new(to_endpoints_type())))
            .with_description("ToEndpoints is a list of endpoints identified by an EndpointSelector to which the endpoints subject to the rule are allowed to communicate.")
            .with_yaml_name("toEndpoints"),
        AttributeSchema::new("to_entities", AttributeType::List(Box::new(enum_type(&["all", "world", "cluster", "host", "init", "ingress", "unmanaged", "remote-node", "health", "none", "kube-apiserver"]))))
            .with_description("ToEntities is a list of special entities to which the endpoint subject to the rule is allowed to initiate connections.")
            .with_yaml_name("toEntities"),
        AttributeSchema::new("to_ports", AttributeType::List(Box::new(to_ports_type())))
            .with_description("ToPorts is a list of destination ports identified by port number and protocol which the endpoint subject to the rule is allowed to connect to.")
            .with_yaml_name("toPorts"),
    ])
}

fn ingress_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("from_cidr", AttributeType::List(Box::new(AttributeType::String.with_pattern("^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])/([0-9]|[1-2][0-9]|3[0-2])$|^([0-9A-Fa-f]{0,4}:){2,7}[0-9A-Fa-f]{0,4}/([0-9]|[1-9][0-9]|1[0-1][0-9]|12[0-8])$"))))
            .with_description("FromCIDR is a list of IP blocks which the endpoint subject to the rule is allowed to receive connections from.")
            .with_yaml_name("fromCIDR"),
        AttributeSchema::new("from_cidr_set", AttributeType::List(Box::new(to_cidr_set_type())))
            .with_description("FromCIDRSet is a list of IP blocks which the endpoint subject to the rule is allowed to receive connections from in addition to FromEndpoints, along w...")
            .with_yaml_name("fromCIDRSet"),
        AttributeSchema::new("from_endpoints", AttributeType::List(Box::new(to_endpoints_type())))
            .with_description("FromEndpoints is a list of endpoints identified by an EndpointSelector which are allowed to communicate with the endpoint subject to the rule.")
            .with_yaml_name("fromEndpoints"),
        AttributeSchema::new("from_entities", AttributeType::List(Box::new(enum_type(&["all", "world", "cluster", "host", "init", "ingress", "unmanaged", "remote-node", "health", "none", "kube-apiserver"]))))
            .with_description("FromEntities is a list of special entities which the endpoint subject to the rule is allowed to receive connections from.")
            .with_yaml_name("fromEntities"),
        AttributeSchema::new("icmps", AttributeType::List(Box::new(icmps_type())))
            .with_description("ICMPs is a list of ICMP rule identified by type number which the endpoint subject to the rule is allowed to communicate with."),
        AttributeSchema::new("to_ports", AttributeType::List(Box::new(to_ports_type())))
            .with_description("ToPorts is a list of destination ports identified by port number and protocol which the endpoint subject to the rule is allowed to connect to.")
            .with_yaml_name("toPorts"),
    ])
}

fn labels_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("key", AttributeType::String)
            .required(),
        AttributeSchema::new("source", AttributeType::String)
            .with_description("Source can be one of the above values (e.g.: LabelSourceContainer)."),
        AttributeSchema::new("value", AttributeType::String),
    ])
}

fn spec_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("description", AttributeType::String)
            .with_description("Description is a free form string, it can be used by the creator of the rule to store human readable explanation of the purpose of this rule."),
        AttributeSchema::new("egress", AttributeType::List(Box::new(egress_type())))
            .with_description("Egress is a list of EgressRule which are enforced at egress."),
        AttributeSchema::new("egress_deny", AttributeType::List(Box::new(egress_deny_type())))
            .with_description("EgressDeny is a list of EgressDenyRule which are enforced at egress. Any rule inserted here will be denied regardless of the allowed egress rules.")
            .with_yaml_name("egressDeny"),
        AttributeSchema::new("endpoint_selector", to_endpoints_type())
            .with_description("EndpointSelector selects all endpoints which should be subject to this rule.")
            .with_yaml_name("endpointSelector"),
        AttributeSchema::new("ingress", AttributeType::List(Box::new(ingress_type())))
            .with_description("Ingress is a list of IngressRule which are enforced at ingress."),
        AttributeSchema::new("ingress_deny", AttributeType::List(Box::new(ingress_type())))
            .with_description("IngressDeny is a list of IngressDenyRule which are enforced at ingress. Any rule inserted here will be denied regardless of the allowed ingress rules.")
            .with_yaml_name("ingressDeny"),
        AttributeSchema::new("labels", AttributeType::List(Box::new(labels_type())))
            .with_description("Labels is a list of optional strings which can be used to re-identify the rule or to store metadata."),
        AttributeSchema::new("node_selector", to_endpoints_type())
            .with_description("NodeSelector selects all nodes which should be subject to this rule.")
            .with_yaml_name("nodeSelector"),
    ])
}
