//! Manifest - Render resource attributes as a Kubernetes manifest
//!
//! The renderer walks the resource schema in declaration order, so the
//! manifest's key order and key names come from the schema, and every field
//! that is absent from the configuration is left out of the document.

use std::collections::HashMap;

use serde_yaml::{Mapping, Number, Value as YamlValue};

use crate::resource::Value;
use crate::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Constant `apiVersion` / `kind` pair stamped on every manifest of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestKind {
    /// e.g. "cilium.io/v2"
    pub api_version: &'static str,
    /// e.g. "CiliumNetworkPolicy"
    pub kind: &'static str,
}

impl ManifestKind {
    pub const fn new(api_version: &'static str, kind: &'static str) -> Self {
        Self { api_version, kind }
    }

    /// API group, empty for the core group (e.g. "cilium.io")
    pub fn group(&self) -> &'static str {
        match self.api_version.split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    /// API version without the group (e.g. "v2")
    pub fn version(&self) -> &'static str {
        match self.api_version.split_once('/') {
            Some((_, version)) => version,
            None => self.api_version,
        }
    }
}

impl std::fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.api_version, self.kind)
    }
}

/// Errors produced while rendering or decoding a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("{path}: unresolved reference to {binding}.{attribute}")]
    UnresolvedReference {
        path: String,
        binding: String,
        attribute: String,
    },

    #[error("{path}: expected {expected}, got {got}")]
    TypeMismatch {
        path: String,
        expected: String,
        got: String,
    },

    #[error("Invalid manifest: {0}")]
    Invalid(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A manifest read back into schema attributes
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedManifest {
    pub api_version: String,
    pub kind: String,
    pub attributes: HashMap<String, Value>,
}

/// Render attributes into an ordered YAML mapping
pub fn render(
    kind: &ManifestKind,
    schema: &ResourceSchema,
    attributes: &HashMap<String, Value>,
) -> Result<Mapping, ManifestError> {
    let mut doc = Mapping::new();
    doc.insert(key("apiVersion"), YamlValue::String(kind.api_version.to_string()));
    doc.insert(key("kind"), YamlValue::String(kind.kind.to_string()));
    render_fields(schema.attributes.values(), attributes, "", &mut doc)?;
    Ok(doc)
}

/// Render attributes as YAML text
pub fn to_yaml(
    kind: &ManifestKind,
    schema: &ResourceSchema,
    attributes: &HashMap<String, Value>,
) -> Result<String, ManifestError> {
    let doc = render(kind, schema, attributes)?;
    Ok(serde_yaml::to_string(&YamlValue::Mapping(doc))?)
}

fn key(name: &str) -> YamlValue {
    YamlValue::String(name.to_string())
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn render_fields<'a>(
    fields: impl Iterator<Item = &'a AttributeSchema>,
    values: &HashMap<String, Value>,
    parent: &str,
    out: &mut Mapping,
) -> Result<(), ManifestError> {
    for field in fields {
        if field.computed {
            continue;
        }
        let Some(value) = values.get(&field.name) else {
            continue;
        };
        if is_empty_collection(&field.attr_type, value) {
            continue;
        }
        let path = join_path(parent, &field.name);
        let rendered = to_yaml_value(&field.attr_type, value, &path)?;
        out.insert(key(field.yaml_key()), rendered);
    }
    Ok(())
}

/// Empty lists and maps are omitted like absent fields; empty objects are kept
fn is_empty_collection(attr_type: &AttributeType, value: &Value) -> bool {
    match (attr_type.base(), value) {
        (_, Value::List(items)) => items.is_empty(),
        (AttributeType::Map(_), Value::Map(map)) => map.is_empty(),
        _ => false,
    }
}

fn to_yaml_value(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
) -> Result<YamlValue, ManifestError> {
    if let Value::ResourceRef(binding, attribute) = value {
        return Err(ManifestError::UnresolvedReference {
            path: path.to_string(),
            binding: binding.clone(),
            attribute: attribute.clone(),
        });
    }

    match (attr_type.base(), value) {
        (
            AttributeType::String | AttributeType::Enum(_),
            Value::String(s),
        ) => Ok(YamlValue::String(s.clone())),
        (AttributeType::Int | AttributeType::Float, Value::Int(n)) => {
            Ok(YamlValue::Number(Number::from(*n)))
        }
        (AttributeType::Float, Value::Float(f)) => Ok(YamlValue::Number(Number::from(*f))),
        (AttributeType::Bool, Value::Bool(b)) => Ok(YamlValue::Bool(*b)),
        (AttributeType::List(inner), Value::List(items)) => {
            let mut seq = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                seq.push(to_yaml_value(inner, item, &format!("{}[{}]", path, i))?);
            }
            Ok(YamlValue::Sequence(seq))
        }
        (AttributeType::Map(inner), Value::Map(map)) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Mapping::new();
            for k in keys {
                let v = to_yaml_value(inner, &map[k], &format!("{}[{}]", path, k))?;
                out.insert(key(k), v);
            }
            Ok(YamlValue::Mapping(out))
        }
        (AttributeType::Object(fields), Value::Map(map)) => {
            let mut out = Mapping::new();
            render_fields(fields.iter(), map, path, &mut out)?;
            Ok(YamlValue::Mapping(out))
        }
        (expected, got) => Err(ManifestError::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            got: got.type_name(),
        }),
    }
}

/// Decode manifest text back into schema attributes
///
/// Keys the schema does not declare are ignored.
pub fn decode(schema: &ResourceSchema, yaml: &str) -> Result<DecodedManifest, ManifestError> {
    let doc: YamlValue = serde_yaml::from_str(yaml)?;
    let YamlValue::Mapping(doc) = doc else {
        return Err(ManifestError::Invalid(
            "manifest must be a mapping".to_string(),
        ));
    };

    let header = |name: &str| -> Result<String, ManifestError> {
        match doc.get(name) {
            Some(YamlValue::String(s)) => Ok(s.clone()),
            _ => Err(ManifestError::Invalid(format!("missing '{}'", name))),
        }
    };
    let api_version = header("apiVersion")?;
    let kind = header("kind")?;

    let attributes = decode_fields(schema.attributes.values(), &doc, "")?;

    Ok(DecodedManifest {
        api_version,
        kind,
        attributes,
    })
}

fn decode_fields<'a>(
    fields: impl Iterator<Item = &'a AttributeSchema>,
    doc: &Mapping,
    parent: &str,
) -> Result<HashMap<String, Value>, ManifestError> {
    let mut attributes = HashMap::new();
    for field in fields {
        if field.computed {
            continue;
        }
        if let Some(yaml) = doc.get(field.yaml_key()) {
            let path = join_path(parent, &field.name);
            let value = from_yaml_value(&field.attr_type, yaml, &path)?;
            attributes.insert(field.name.clone(), value);
        }
    }
    Ok(attributes)
}

fn from_yaml_value(
    attr_type: &AttributeType,
    yaml: &YamlValue,
    path: &str,
) -> Result<Value, ManifestError> {
    match (attr_type.base(), yaml) {
        (AttributeType::String | AttributeType::Enum(_), YamlValue::String(s)) => {
            Ok(Value::String(s.clone()))
        }
        (AttributeType::Int | AttributeType::Float, YamlValue::Number(n)) => {
            match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Value::Int(i)),
                (None, Some(f)) => Ok(Value::Float(f)),
                (None, None) => Err(ManifestError::Invalid(format!(
                    "{}: number {} is out of range",
                    path, n
                ))),
            }
        }
        (AttributeType::Bool, YamlValue::Bool(b)) => Ok(Value::Bool(*b)),
        (AttributeType::List(inner), YamlValue::Sequence(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| from_yaml_value(inner, item, &format!("{}[{}]", path, i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (AttributeType::Map(inner), YamlValue::Mapping(map)) => {
            let mut out = HashMap::new();
            for (k, v) in map {
                let YamlValue::String(k) = k else {
                    return Err(ManifestError::Invalid(format!(
                        "{}: map keys must be strings",
                        path
                    )));
                };
                out.insert(
                    k.clone(),
                    from_yaml_value(inner, v, &format!("{}[{}]", path, k))?,
                );
            }
            Ok(Value::Map(out))
        }
        (AttributeType::Object(fields), YamlValue::Mapping(map)) => {
            decode_fields(fields.iter(), map, path).map(Value::Map)
        }
        (expected, got) => Err(ManifestError::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            got: yaml_type_name(got).to_string(),
        }),
    }
}

fn yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "Bool",
        YamlValue::Number(_) => "Number",
        YamlValue::String(_) => "String",
        YamlValue::Sequence(_) => "List",
        YamlValue::Mapping(_) => "Map",
        YamlValue::Tagged(_) => "Tagged",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIND: ManifestKind = ManifestKind::new("cilium.io/v2", "CiliumNetworkPolicy");

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    fn map(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn schema() -> ResourceSchema {
        ResourceSchema::new("k8s.policy")
            .attribute(AttributeSchema::new("yaml", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new(
                    "metadata",
                    AttributeType::Object(vec![
                        AttributeSchema::new("name", AttributeType::String).required(),
                        AttributeSchema::new("namespace", AttributeType::String),
                        AttributeSchema::new(
                            "labels",
                            AttributeType::Map(Box::new(AttributeType::String)),
                        ),
                    ]),
                )
                .required(),
            )
            .attribute(AttributeSchema::new(
                "spec",
                AttributeType::Object(vec![
                    AttributeSchema::new("description", AttributeType::String),
                    AttributeSchema::new(
                        "egress",
                        AttributeType::List(Box::new(AttributeType::Object(vec![
                            AttributeSchema::new(
                                "to_cidr_set",
                                AttributeType::List(Box::new(AttributeType::Object(vec![
                                    AttributeSchema::new("cidr", AttributeType::String),
                                    AttributeSchema::new(
                                        "except",
                                        AttributeType::List(Box::new(AttributeType::String)),
                                    ),
                                ]))),
                            )
                            .with_yaml_name("toCIDRSet"),
                            AttributeSchema::new("icmp_type", AttributeType::Int)
                                .with_yaml_name("icmpType"),
                            AttributeSchema::new("weight", AttributeType::Float),
                            AttributeSchema::new("enabled", AttributeType::Bool),
                        ]))),
                    ),
                ]),
            ))
    }

    fn demo_attributes() -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert("metadata".to_string(), map(&[("name", s("demo"))]));
        attrs
    }

    #[test]
    fn renders_header_and_metadata_only() {
        let yaml = to_yaml(&KIND, &schema(), &demo_attributes()).unwrap();
        assert_eq!(
            yaml,
            "apiVersion: cilium.io/v2\nkind: CiliumNetworkPolicy\nmetadata:\n  name: demo\n"
        );
        assert!(!yaml.contains("spec:"));
    }

    #[test]
    fn follows_schema_order_and_yaml_names() {
        let mut attrs = demo_attributes();
        attrs.insert(
            "spec".to_string(),
            map(&[
                (
                    "egress",
                    Value::List(vec![map(&[
                        ("enabled", Value::Bool(false)),
                        ("icmp_type", Value::Int(8)),
                        (
                            "to_cidr_set",
                            Value::List(vec![map(&[
                                ("except", Value::List(vec![])),
                                ("cidr", s("10.0.0.0/8")),
                            ])]),
                        ),
                    ])]),
                ),
                ("description", s("allow")),
            ]),
        );

        let yaml = to_yaml(&KIND, &schema(), &attrs).unwrap();
        let expected = "\
apiVersion: cilium.io/v2
kind: CiliumNetworkPolicy
metadata:
  name: demo
spec:
  description: allow
  egress:
  - toCIDRSet:
    - cidr: 10.0.0.0/8
    icmpType: 8
    enabled: false
";
        assert_eq!(yaml, expected);
    }

    #[test]
    fn free_form_maps_are_sorted() {
        let mut attrs = HashMap::new();
        attrs.insert(
            "metadata".to_string(),
            map(&[
                ("name", s("demo")),
                ("labels", map(&[("zone", s("a")), ("app", s("web"))])),
            ]),
        );
        let yaml = to_yaml(&KIND, &schema(), &attrs).unwrap();
        assert!(yaml.contains("  labels:\n    app: web\n    zone: a\n"));
    }

    #[test]
    fn empty_maps_are_omitted_but_empty_objects_kept() {
        let mut attrs = HashMap::new();
        attrs.insert(
            "metadata".to_string(),
            map(&[("name", s("demo")), ("labels", map(&[]))]),
        );
        attrs.insert("spec".to_string(), map(&[]));
        let yaml = to_yaml(&KIND, &schema(), &attrs).unwrap();
        assert!(!yaml.contains("labels"));
        assert!(yaml.ends_with("spec: {}\n"));
    }

    #[test]
    fn computed_attributes_are_not_rendered() {
        let mut attrs = demo_attributes();
        attrs.insert("yaml".to_string(), s("previous"));
        let doc = render(&KIND, &schema(), &attrs).unwrap();
        assert!(doc.get("yaml").is_none());
    }

    #[test]
    fn unresolved_reference_is_an_error() {
        let mut attrs = HashMap::new();
        attrs.insert(
            "metadata".to_string(),
            map(&[(
                "name",
                Value::ResourceRef("other".to_string(), "id".to_string()),
            )]),
        );
        let err = to_yaml(&KIND, &schema(), &attrs).unwrap_err();
        assert_eq!(
            err.to_string(),
            "metadata.name: unresolved reference to other.id"
        );
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let mut attrs = HashMap::new();
        attrs.insert("metadata".to_string(), s("demo"));
        let err = to_yaml(&KIND, &schema(), &attrs).unwrap_err();
        assert!(matches!(err, ManifestError::TypeMismatch { .. }));
    }

    #[test]
    fn decode_round_trips_rendered_manifest() {
        let mut attrs = demo_attributes();
        attrs.insert(
            "spec".to_string(),
            map(&[(
                "egress",
                Value::List(vec![map(&[
                    ("weight", Value::Float(0.25)),
                    (
                        "to_cidr_set",
                        Value::List(vec![map(&[
                            ("cidr", s("10.0.0.0/8")),
                            ("except", Value::List(vec![s("10.96.0.0/12")])),
                        ])]),
                    ),
                ])]),
            )]),
        );

        let yaml = to_yaml(&KIND, &schema(), &attrs).unwrap();
        let decoded = decode(&schema(), &yaml).unwrap();

        assert_eq!(decoded.api_version, "cilium.io/v2");
        assert_eq!(decoded.kind, "CiliumNetworkPolicy");
        assert_eq!(decoded.attributes, attrs);
    }

    #[test]
    fn decode_rejects_non_mapping() {
        assert!(matches!(
            decode(&schema(), "- a\n- b\n"),
            Err(ManifestError::Invalid(_))
        ));
    }

    #[test]
    fn kind_splits_group_and_version() {
        assert_eq!(KIND.group(), "cilium.io");
        assert_eq!(KIND.version(), "v2");
        let core = ManifestKind::new("v1", "ConfigMap");
        assert_eq!(core.group(), "");
        assert_eq!(core.version(), "v1");
    }
}
