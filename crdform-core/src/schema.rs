//! Schema - Define type schemas for resources
//!
//! Providers define a schema for each resource kind. The same schema drives
//! configuration validation, state and manifest rendering, so the three can
//! never drift apart.

use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use indexmap::IndexMap;
use regex::Regex;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Floating point number (integers are accepted)
    Float,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// Base type narrowed by declarative constraints
    Constrained {
        base: Box<AttributeType>,
        constraints: Vec<Constraint>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map with free-form keys
    Map(Box<AttributeType>),
    /// Nested object with a fixed, ordered set of attributes
    Object(Vec<AttributeSchema>),
}

/// Declarative constraint attached to a type
#[derive(Debug, Clone)]
pub enum Constraint {
    /// String must match the regular expression (unanchored, like OpenAPI `pattern`)
    Pattern(Regex),
    /// A pattern that failed to compile; always rejects values
    InvalidPattern { pattern: String, message: String },
    /// Inclusive integer bounds
    Range { min: Option<i64>, max: Option<i64> },
    /// Inclusive length bounds for strings (chars) and lists (items)
    Length { min: Option<usize>, max: Option<usize> },
}

impl Constraint {
    pub fn pattern(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => Constraint::Pattern(regex),
            Err(e) => Constraint::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            },
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (Constraint::Pattern(regex), Value::String(s)) => {
                if regex.is_match(s) {
                    Ok(())
                } else {
                    Err(format!("'{}' does not match pattern {}", s, regex.as_str()))
                }
            }
            (Constraint::InvalidPattern { pattern, message }, _) => Err(format!(
                "schema pattern '{}' cannot be compiled: {}",
                pattern, message
            )),
            (Constraint::Range { min, max }, Value::Int(n)) => {
                if min.is_some_and(|min| *n < min) || max.is_some_and(|max| *n > max) {
                    Err(format!("{} is out of range {}", n, describe_bounds(*min, *max)))
                } else {
                    Ok(())
                }
            }
            (Constraint::Length { min, max }, v) => {
                let len = match v {
                    Value::String(s) => s.chars().count(),
                    Value::List(items) => items.len(),
                    _ => return Ok(()),
                };
                if min.is_some_and(|min| len < min) || max.is_some_and(|max| len > max) {
                    Err(format!(
                        "length {} is out of range {}",
                        len,
                        describe_bounds(min.map(|m| m as i64), max.map(|m| m as i64))
                    ))
                } else {
                    Ok(())
                }
            }
            // Constraints only narrow the values they understand
            _ => Ok(()),
        }
    }
}

fn describe_bounds(min: Option<i64>, max: Option<i64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{}, {}]", min, max),
        (Some(min), None) => format!(">= {}", min),
        (None, Some(max)) => format!("<= {}", max),
        (None, None) => "(unbounded)".to_string(),
    }
}

impl AttributeType {
    /// Attach a constraint, flattening into an existing `Constrained` wrapper
    pub fn with_constraint(self, constraint: Constraint) -> Self {
        match self {
            AttributeType::Constrained {
                base,
                mut constraints,
            } => {
                constraints.push(constraint);
                AttributeType::Constrained { base, constraints }
            }
            other => AttributeType::Constrained {
                base: Box::new(other),
                constraints: vec![constraint],
            },
        }
    }

    pub fn with_pattern(self, pattern: &str) -> Self {
        self.with_constraint(Constraint::pattern(pattern))
    }

    pub fn with_range(self, min: Option<i64>, max: Option<i64>) -> Self {
        self.with_constraint(Constraint::Range { min, max })
    }

    pub fn with_length(self, min: Option<usize>, max: Option<usize>) -> Self {
        self.with_constraint(Constraint::Length { min, max })
    }

    /// The structural type with custom and constraint wrappers removed
    pub fn base(&self) -> &AttributeType {
        match self {
            AttributeType::Custom { base, .. } | AttributeType::Constrained { base, .. } => {
                base.base()
            }
            other => other,
        }
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        let mut errors = Vec::new();
        self.check(value, &mut errors);
        match errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Collect every violation of this type in `value`
    fn check(&self, value: &Value, errors: &mut Vec<TypeError>) {
        match (self, value) {
            // References are resolved later (possibly to computed values), so they
            // are accepted wherever a scalar is expected
            (
                AttributeType::String
                | AttributeType::Int
                | AttributeType::Float
                | AttributeType::Bool
                | AttributeType::Enum(_)
                | AttributeType::Custom { .. }
                | AttributeType::Constrained { .. },
                Value::ResourceRef(_, _),
            ) => {}

            (AttributeType::String, Value::String(_)) => {}
            (AttributeType::Int, Value::Int(_)) => {}
            (AttributeType::Float, Value::Float(_) | Value::Int(_)) => {}
            (AttributeType::Bool, Value::Bool(_)) => {}

            (AttributeType::Enum(variants), Value::String(s)) => {
                if !variants.iter().any(|v| v == s) {
                    errors.push(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    });
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                let before = errors.len();
                base.check(v, errors);
                if errors.len() == before
                    && let Err(message) = validate(v)
                {
                    errors.push(TypeError::ValidationFailed { message });
                }
            }

            (AttributeType::Constrained { base, constraints }, v) => {
                let before = errors.len();
                base.check(v, errors);
                if errors.len() == before {
                    for constraint in constraints {
                        if let Err(message) = constraint.check(v) {
                            errors.push(TypeError::ValidationFailed { message });
                        }
                    }
                }
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let mut item_errors = Vec::new();
                    inner.check(item, &mut item_errors);
                    let segment = format!("[{}]", i);
                    errors.extend(item_errors.into_iter().map(|e| e.within(&segment)));
                }
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    let mut value_errors = Vec::new();
                    inner.check(&map[key], &mut value_errors);
                    let segment = format!("[{}]", key);
                    errors.extend(value_errors.into_iter().map(|e| e.within(&segment)));
                }
            }

            (AttributeType::Object(fields), Value::Map(map)) => {
                check_fields(fields.iter(), map, errors);
            }

            _ => errors.push(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Float => "Float".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::Constrained { base, .. } => base.type_name(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Object(_) => "Object".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Check a map of values against an ordered set of attribute schemas
///
/// Errors are reported in schema order, followed by unknown attributes sorted by name.
fn check_fields<'a>(
    fields: impl Iterator<Item = &'a AttributeSchema> + Clone,
    values: &HashMap<String, Value>,
    errors: &mut Vec<TypeError>,
) {
    for field in fields.clone() {
        match values.get(&field.name) {
            Some(_) if field.computed => errors.push(TypeError::ComputedAttribute {
                name: field.name.clone(),
            }),
            Some(value) => {
                let mut field_errors = Vec::new();
                field.attr_type.check(value, &mut field_errors);
                errors.extend(field_errors.into_iter().map(|e| e.within(&field.name)));
            }
            None if field.required => errors.push(TypeError::MissingRequired {
                name: field.name.clone(),
            }),
            None => {}
        }
    }

    let mut unknown: Vec<&String> = values
        .keys()
        .filter(|k| !k.starts_with('_'))
        .filter(|k| !fields.clone().any(|f| &f.name == *k))
        .collect();
    unknown.sort();
    for name in unknown {
        errors.push(TypeError::UnknownAttribute { name: name.clone() });
    }
}

/// Type error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("{path}: {inner}")]
    AtPath { path: String, inner: Box<TypeError> },
}

impl TypeError {
    /// Prefix this error's location with a path segment (`spec`, `[0]`, ...)
    pub fn within(self, segment: &str) -> TypeError {
        match self {
            TypeError::AtPath { path, inner } => {
                let path = if path.starts_with('[') {
                    format!("{}{}", segment, path)
                } else {
                    format!("{}.{}", segment, path)
                };
                TypeError::AtPath { path, inner }
            }
            other => TypeError::AtPath {
                path: segment.to_string(),
                inner: Box::new(other),
            },
        }
    }

    /// Dotted location of the error, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            TypeError::AtPath { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl Value {
    pub(crate) fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::ResourceRef(binding, attr) => format!("ResourceRef({}.{})", binding, attr),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    /// Configuration name (snake_case)
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the lifecycle handler, never by configuration
    pub computed: bool,
    pub description: Option<String>,
    /// Key used in the rendered manifest (e.g., "toCIDRSet"); defaults to `name`
    pub yaml_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            description: None,
            yaml_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_yaml_name(mut self, name: impl Into<String>) -> Self {
        self.yaml_name = Some(name.into());
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.attr_type = self.attr_type.with_pattern(pattern);
        self
    }

    pub fn with_range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.attr_type = self.attr_type.with_range(min, max);
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.attr_type = self.attr_type.with_length(min, max);
        self
    }

    /// Key used for this attribute in the rendered manifest
    pub fn yaml_key(&self) -> &str {
        self.yaml_name.as_deref().unwrap_or(&self.name)
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    /// Attributes in declaration order (which is also manifest order)
    pub attributes: IndexMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: IndexMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource attributes, collecting every violation
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();
        check_fields(self.attributes.values(), attributes, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reshape configuration blocks to match the schema
    ///
    /// A configuration block always parses as a list of maps. For attributes
    /// declared as a single `Object`, one block is unwrapped into a map.
    pub fn normalize(&self, attributes: HashMap<String, Value>) -> HashMap<String, Value> {
        attributes
            .into_iter()
            .map(|(name, value)| match self.attributes.get(&name) {
                Some(schema) => {
                    let value = normalize_value(&schema.attr_type, value);
                    (name, value)
                }
                None => (name, value),
            })
            .collect()
    }
}

fn normalize_value(attr_type: &AttributeType, value: Value) -> Value {
    match (attr_type.base(), value) {
        (AttributeType::Object(_), Value::List(items))
            if items.len() == 1 && matches!(items[0], Value::Map(_)) =>
        {
            match items.into_iter().next() {
                Some(single) => normalize_value(attr_type, single),
                None => Value::List(Vec::new()),
            }
        }
        (AttributeType::Object(fields), Value::Map(map)) => Value::Map(
            map.into_iter()
                .map(|(k, v)| match fields.iter().find(|f| f.name == k) {
                    Some(field) => {
                        let v = normalize_value(&field.attr_type, v);
                        (k, v)
                    }
                    None => (k, v),
                })
                .collect(),
        ),
        (AttributeType::List(inner), Value::List(items)) => Value::List(
            items
                .into_iter()
                .map(|item| normalize_value(inner, item))
                .collect(),
        ),
        (AttributeType::Map(inner), Value::Map(map)) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, normalize_value(inner, v)))
                .collect(),
        ),
        (_, value) => value,
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// CIDR block type (e.g., "10.0.0.0/16" or "fd00::/8")
    pub fn cidr() -> AttributeType {
        AttributeType::Custom {
            name: "Cidr".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => validate_cidr(s),
                _ => Err("Expected string".to_string()),
            },
        }
    }

    /// Port type: a number in 0-65535 or an IANA service name
    pub fn port() -> AttributeType {
        AttributeType::Custom {
            name: "Port".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => validate_port(s),
                _ => Err("Expected string".to_string()),
            },
        }
    }

    /// Kubernetes object name (RFC 1123 DNS subdomain)
    pub fn dns_subdomain() -> AttributeType {
        AttributeType::Custom {
            name: "DnsSubdomain".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => validate_dns_subdomain(s),
                _ => Err("Expected string".to_string()),
            },
        }
    }
}

/// Validate CIDR block format (e.g., "10.0.0.0/16", "2001:db8::/32")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    let Some((ip, prefix)) = cidr.split_once('/') else {
        return Err(format!(
            "Invalid CIDR format '{}': expected IP/prefix",
            cidr
        ));
    };

    let max_prefix = if ip.contains(':') {
        ip.parse::<Ipv6Addr>()
            .map_err(|_| format!("Invalid IPv6 address '{}'", ip))?;
        128
    } else {
        ip.parse::<Ipv4Addr>()
            .map_err(|_| format!("Invalid IPv4 address '{}'", ip))?;
        32
    };

    match prefix.parse::<u8>() {
        Ok(p) if p <= max_prefix => Ok(()),
        Ok(p) => Err(format!(
            "Invalid prefix length '{}': must be 0-{}",
            p, max_prefix
        )),
        Err(_) => Err(format!(
            "Invalid prefix length '{}': must be a number",
            prefix
        )),
    }
}

/// Validate a port given as a number (0-65535) or IANA service name
pub fn validate_port(port: &str) -> Result<(), String> {
    if port.chars().all(|c| c.is_ascii_digit()) && !port.is_empty() {
        return match port.parse::<u16>() {
            Ok(_) => Ok(()),
            Err(_) => Err(format!("Invalid port '{}': must be 0-65535", port)),
        };
    }

    let valid_chars = port
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let has_letter = port.chars().any(|c| c.is_ascii_lowercase());
    if port.is_empty()
        || port.len() > 15
        || !valid_chars
        || !has_letter
        || port.starts_with('-')
        || port.ends_with('-')
        || port.contains("--")
    {
        return Err(format!(
            "Invalid port '{}': expected a number or an IANA service name",
            port
        ));
    }
    Ok(())
}

/// Validate an RFC 1123 DNS subdomain (Kubernetes object names)
pub fn validate_dns_subdomain(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > 253 {
        return Err(format!(
            "Invalid name '{}': must be 1-253 characters",
            name
        ));
    }
    for label in name.split('.') {
        let valid = !label.is_empty()
            && label.len() <= 63
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-');
        if !valid {
            return Err(format!(
                "Invalid name '{}': must consist of lowercase alphanumeric characters, '-' or '.', and start and end with an alphanumeric character",
                name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    fn cidr_set_schema() -> ResourceSchema {
        ResourceSchema::new("test.policy").attribute(AttributeSchema::new(
            "spec",
            AttributeType::Object(vec![AttributeSchema::new(
                "egress",
                AttributeType::List(Box::new(AttributeType::Object(vec![
                    AttributeSchema::new(
                        "to_cidr_set",
                        AttributeType::List(Box::new(AttributeType::Object(vec![
                            AttributeSchema::new("cidr", AttributeType::String)
                                .required()
                                .with_pattern(r"^[0-9.]+/[0-9]+$"),
                        ]))),
                    )
                    .with_yaml_name("toCIDRSet"),
                ]))),
            )]),
        ))
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&s("hello")).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::Enum(vec!["TCP".to_string(), "UDP".to_string()]);
        assert!(t.validate(&s("TCP")).is_ok());
        assert!(t.validate(&s("ICMP")).is_err());
    }

    #[test]
    fn float_accepts_integers() {
        assert!(AttributeType::Float.validate(&Value::Int(3)).is_ok());
        assert!(AttributeType::Float.validate(&Value::Float(0.5)).is_ok());
        assert!(AttributeType::Int.validate(&Value::Float(0.5)).is_err());
    }

    #[test]
    fn references_pass_scalar_checks() {
        let t = AttributeType::Int.with_range(Some(0), Some(10));
        assert!(
            t.validate(&Value::ResourceRef("a".to_string(), "id".to_string()))
                .is_ok()
        );
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
    }

    #[test]
    fn range_constraint() {
        let t = AttributeType::Int.with_range(Some(0), Some(255));
        assert!(t.validate(&Value::Int(0)).is_ok());
        assert!(t.validate(&Value::Int(255)).is_ok());
        let err = t.validate(&Value::Int(256)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: 256 is out of range [0, 255]"
        );
    }

    #[test]
    fn length_constraint() {
        let t = AttributeType::String.with_length(Some(1), Some(3));
        assert!(t.validate(&s("abc")).is_ok());
        assert!(t.validate(&s("")).is_err());
        assert!(t.validate(&s("abcd")).is_err());
    }

    #[test]
    fn invalid_pattern_always_fails() {
        let t = AttributeType::String.with_pattern("(unclosed");
        assert!(matches!(
            t,
            AttributeType::Constrained { ref constraints, .. }
                if matches!(constraints[0], Constraint::InvalidPattern { .. })
        ));
        assert!(t.validate(&s("anything")).is_err());
    }

    #[test]
    fn constraints_flatten() {
        let t = AttributeType::String
            .with_pattern("^a")
            .with_length(None, Some(2));
        match t {
            AttributeType::Constrained { base, constraints } => {
                assert!(matches!(*base, AttributeType::String));
                assert_eq!(constraints.len(), 2);
            }
            other => panic!("Expected Constrained, got {:?}", other),
        }
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("count", types::positive_int()))
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), s("my-resource"));
        attrs.insert("count".to_string(), Value::Int(5));
        attrs.insert("enabled".to_string(), Value::Bool(true));
        attrs.insert("_binding".to_string(), s("internal"));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("bucket")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let errors = schema.validate(&HashMap::new()).unwrap_err();
        assert_eq!(
            errors,
            vec![TypeError::MissingRequired {
                name: "name".to_string()
            }]
        );
    }

    #[test]
    fn computed_and_unknown_attributes_are_rejected() {
        let schema = ResourceSchema::new("kind")
            .attribute(AttributeSchema::new("yaml", AttributeType::String).computed());

        let mut attrs = HashMap::new();
        attrs.insert("yaml".to_string(), s("x"));
        attrs.insert("bogus".to_string(), s("y"));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0],
            TypeError::ComputedAttribute {
                name: "yaml".to_string()
            }
        );
        assert_eq!(
            errors[1],
            TypeError::UnknownAttribute {
                name: "bogus".to_string()
            }
        );
    }

    #[test]
    fn nested_errors_carry_paths() {
        let schema = cidr_set_schema();
        let spec = map(&[(
            "egress",
            Value::List(vec![map(&[(
                "to_cidr_set",
                Value::List(vec![
                    map(&[("cidr", s("10.0.0.0/8"))]),
                    map(&[("cidr", s("not-a-cidr"))]),
                ]),
            )])]),
        )]);

        let mut attrs = HashMap::new();
        attrs.insert("spec".to_string(), spec);

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), Some("spec.egress[0].to_cidr_set[1].cidr"));
        assert!(errors[0].to_string().starts_with(
            "spec.egress[0].to_cidr_set[1].cidr: Validation failed: 'not-a-cidr' does not match"
        ));
    }

    #[test]
    fn nested_missing_required_field() {
        let schema = cidr_set_schema();
        let spec = map(&[(
            "egress",
            Value::List(vec![map(&[(
                "to_cidr_set",
                Value::List(vec![map(&[])]),
            )])]),
        )]);
        let mut attrs = HashMap::new();
        attrs.insert("spec".to_string(), spec);

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "spec.egress[0].to_cidr_set[0]: Required attribute 'cidr' is missing"
        );
    }

    #[test]
    fn normalize_unwraps_single_blocks() {
        let schema = cidr_set_schema();
        let block = Value::List(vec![map(&[(
            "egress",
            Value::List(vec![map(&[(
                "to_cidr_set",
                Value::List(vec![map(&[("cidr", s("10.0.0.0/8"))])]),
            )])]),
        )])]);

        let mut attrs = HashMap::new();
        attrs.insert("spec".to_string(), block);
        let normalized = schema.normalize(attrs);

        // spec is an object: unwrapped. egress and to_cidr_set are lists: kept.
        let spec = normalized.get("spec").unwrap();
        assert!(matches!(spec, Value::Map(_)));
        assert!(matches!(spec.lookup_path("egress"), Some(Value::List(items)) if items.len() == 1));
        assert!(schema.validate(&normalized).is_ok());
    }

    #[test]
    fn validate_cidr_values() {
        let t = types::cidr();

        assert!(t.validate(&s("10.0.0.0/16")).is_ok());
        assert!(t.validate(&s("0.0.0.0/0")).is_ok());
        assert!(t.validate(&s("2001:db8::/32")).is_ok());

        assert!(t.validate(&s("10.0.0.0")).is_err()); // no prefix
        assert!(t.validate(&s("10.0.0.0/33")).is_err()); // prefix too large
        assert!(t.validate(&s("10.0.0.256/16")).is_err()); // octet > 255
        assert!(t.validate(&s("2001:db8::/129")).is_err());
        assert!(t.validate(&Value::Int(42)).is_err()); // wrong type
    }

    #[test]
    fn validate_port_values() {
        assert!(validate_port("80").is_ok());
        assert!(validate_port("65535").is_ok());
        assert!(validate_port("http-metrics").is_ok());
        assert!(validate_port("65536").is_err());
        assert!(validate_port("-web").is_err());
        assert!(validate_port("").is_err());
        assert!(validate_port("a-very-long-port-name").is_err());
    }

    #[test]
    fn validate_dns_subdomain_values() {
        assert!(validate_dns_subdomain("demo").is_ok());
        assert!(validate_dns_subdomain("api.example.com").is_ok());
        assert!(validate_dns_subdomain("Demo").is_err());
        assert!(validate_dns_subdomain("-demo").is_err());
        assert!(validate_dns_subdomain("a..b").is_err());
        assert!(validate_dns_subdomain("").is_err());
    }
}
