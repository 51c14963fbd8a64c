//! Resource - Representing resources and their state

use std::collections::HashMap;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type without the provider prefix (e.g., "cilium_io_cilium_network_policy_v2")
    pub resource_type: String,
    /// Resource name (binding name, or `metadata.name` for anonymous resources)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Reference to another resource's attribute (binding_name, attribute_path)
    ///
    /// The attribute path may be dotted (`metadata.name`) to reach into nested objects.
    ResourceRef(String, String),
}

impl Value {
    /// Follow a dotted path (`metadata.name`) through nested maps
    ///
    /// A single-element list of maps (how a nested block is parsed) is
    /// stepped through transparently.
    pub fn lookup_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |current, segment| match current {
            Value::Map(map) => map.get(segment),
            Value::List(items) if items.len() == 1 => match &items[0] {
                Value::Map(map) => map.get(segment),
                _ => None,
            },
            _ => None,
        })
    }

    /// Returns true if this value, or anything nested in it, is an unresolved reference
    pub fn has_unresolved_refs(&self) -> bool {
        match self {
            Value::ResourceRef(_, _) => true,
            Value::List(items) => items.iter().any(Value::has_unresolved_refs),
            Value::Map(map) => map.values().any(Value::has_unresolved_refs),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Look up a dotted attribute path in an attribute map
pub fn lookup_attribute<'a>(attributes: &'a HashMap<String, Value>, path: &str) -> Option<&'a Value> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let value = attributes.get(head)?;
    match rest {
        Some(rest) => value.lookup_path(rest),
        None => Some(value),
    }
}

/// Attributes exposed by each binding, keyed by binding name
pub type Bindings = HashMap<String, HashMap<String, Value>>;

const MAX_REF_DEPTH: usize = 32;

/// Replace references whose target is known with the referenced value
///
/// References to unknown bindings or missing attributes are left in place,
/// as are reference chains deeper than a fixed limit (cycles).
pub fn resolve_refs(value: &Value, bindings: &Bindings) -> Value {
    resolve_with_depth(value, bindings, 0)
}

fn resolve_with_depth(value: &Value, bindings: &Bindings, depth: usize) -> Value {
    match value {
        Value::ResourceRef(binding, path) if depth < MAX_REF_DEPTH => {
            match bindings
                .get(binding)
                .and_then(|attrs| lookup_attribute(attrs, path))
            {
                Some(target) => resolve_with_depth(target, bindings, depth + 1),
                None => value.clone(),
            }
        }
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| resolve_with_depth(item, bindings, depth))
                .collect(),
        ),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_with_depth(v, bindings, depth)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Desired state declared in configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Provider name recorded by the parser (e.g., "k8s")
    pub fn provider(&self) -> Option<&str> {
        self.attributes.get("_provider").and_then(Value::as_str)
    }

    /// Binding name this resource was declared with, if any
    pub fn binding(&self) -> Option<&str> {
        self.attributes.get("_binding").and_then(Value::as_str)
    }

    /// Fully qualified type (e.g., "k8s.cilium_io_cilium_network_policy_v2")
    pub fn qualified_type(&self) -> String {
        match self.attributes.get("_type").and_then(Value::as_str) {
            Some(t) => t.to_string(),
            None => match self.provider() {
                Some(p) => format!("{}.{}", p, self.id.resource_type),
                None => self.id.resource_type.clone(),
            },
        }
    }

    /// Attributes without the parser's internal `_` entries
    pub fn user_attributes(&self) -> HashMap<String, Value> {
        self.attributes
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Copy of this resource with references resolved against `bindings`
    pub fn resolved(&self, bindings: &Bindings) -> Resource {
        Resource {
            id: self.id.clone(),
            attributes: self
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), resolve_refs(v, bindings)))
                .collect(),
        }
    }
}

/// Stored state of a resource
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Generated identifier (stringified `id` attribute)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// The rendered manifest stored in this state
    pub fn yaml(&self) -> Option<&str> {
        self.attributes.get("yaml").and_then(Value::as_str)
    }
}
