//! Parser - Parse .crdf configuration files
//!
//! Convert the configuration language to resources using pest

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;
use std::collections::{HashMap, HashSet};
use std::env;

use crate::lifecycle::COMPUTED_ATTRIBUTES;
use crate::resource::{Bindings, Resource, ResourceId, Value, lookup_attribute, resolve_refs};

#[derive(Parser)]
#[grammar = "parser/crdform.pest"]
struct CrdformParser;

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("Invalid expression at line {line}: {message}")]
    InvalidExpression { line: usize, message: String },

    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Invalid resource type: {0}")]
    InvalidResourceType(String),

    #[error("Duplicate binding: {0}")]
    DuplicateBinding(String),

    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    #[error("Unknown attribute in reference: {0}")]
    UnknownReference(String),

    #[error("Reference cycle through {0}")]
    CyclicReference(String),

    #[error("Malformed {0}")]
    Malformed(&'static str),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        ParseError::Syntax(Box::new(e))
    }
}

/// Provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub attributes: HashMap<String, Value>,
}

impl ProviderConfig {
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Backend configuration for state storage
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend type (e.g., "local")
    pub backend_type: String,
    /// Backend-specific attributes
    pub attributes: HashMap<String, Value>,
}

/// Parse result
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub providers: Vec<ProviderConfig>,
    pub resources: Vec<Resource>,
    pub variables: HashMap<String, Value>,
    /// Backend configuration for state storage
    pub backend: Option<BackendConfig>,
}

impl ParsedFile {
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }
}

/// Parse context (variable scope)
#[derive(Default)]
struct ParseContext {
    variables: HashMap<String, Value>,
    resource_bindings: HashSet<String>,
}

impl ParseContext {
    fn is_bound(&self, name: &str) -> bool {
        self.variables.contains_key(name) || self.resource_bindings.contains(name)
    }
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &'static str) -> Result<Pair<'i, Rule>, ParseError> {
    pairs.next().ok_or(ParseError::Malformed(what))
}

fn line_of(pair: &Pair<Rule>) -> usize {
    pair.line_col().0
}

/// Parse a configuration file
pub fn parse(input: &str) -> Result<ParsedFile, ParseError> {
    let pairs = CrdformParser::parse(Rule::file, input)?;

    let mut ctx = ParseContext::default();
    let mut providers = Vec::new();
    let mut resources: Vec<Resource> = Vec::new();
    let mut backend = None;

    for pair in pairs {
        if pair.as_rule() != Rule::file {
            continue;
        }
        for inner in pair.into_inner() {
            if inner.as_rule() != Rule::statement {
                continue;
            }
            for stmt in inner.into_inner() {
                let resource = match stmt.as_rule() {
                    Rule::provider_block => {
                        providers.push(parse_provider_block(stmt, &ctx)?);
                        None
                    }
                    Rule::backend_block => {
                        backend = Some(parse_backend_block(stmt, &ctx)?);
                        None
                    }
                    Rule::let_binding => parse_let_binding(stmt, &mut ctx)?,
                    Rule::anonymous_resource => {
                        let expr = next_pair(&mut stmt.into_inner(), "anonymous resource")?;
                        Some(parse_resource_expr(expr, &ctx, None)?)
                    }
                    _ => None,
                };

                if let Some(resource) = resource {
                    if resources.iter().any(|r| r.id == resource.id) {
                        return Err(ParseError::DuplicateResource(resource.id.to_string()));
                    }
                    resources.push(resource);
                }
            }
        }
    }

    Ok(ParsedFile {
        providers,
        resources,
        variables: ctx.variables,
        backend,
    })
}

fn parse_let_binding(
    pair: Pair<Rule>,
    ctx: &mut ParseContext,
) -> Result<Option<Resource>, ParseError> {
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, "let binding")?.as_str().to_string();
    if ctx.is_bound(&name) {
        return Err(ParseError::DuplicateBinding(name));
    }

    let value_pair = next_pair(&mut inner, "let binding")?;
    if value_pair.as_rule() == Rule::resource_expr {
        let resource = parse_resource_expr(value_pair, ctx, Some(&name))?;
        ctx.resource_bindings.insert(name);
        Ok(Some(resource))
    } else {
        let value = parse_expression(value_pair, ctx)?;
        ctx.variables.insert(name, value);
        Ok(None)
    }
}

fn parse_attributes(pairs: Pairs<Rule>, ctx: &ParseContext) -> Result<HashMap<String, Value>, ParseError> {
    let mut attributes = HashMap::new();
    for attr_pair in pairs {
        if attr_pair.as_rule() == Rule::attribute {
            let (key, value) = parse_attribute(attr_pair, ctx)?;
            attributes.insert(key, value);
        }
    }
    Ok(attributes)
}

fn parse_attribute(pair: Pair<Rule>, ctx: &ParseContext) -> Result<(String, Value), ParseError> {
    let mut inner = pair.into_inner();
    let key = next_pair(&mut inner, "attribute")?.as_str().to_string();
    let value = parse_expression(next_pair(&mut inner, "attribute")?, ctx)?;
    Ok((key, value))
}

fn parse_provider_block(pair: Pair<Rule>, ctx: &ParseContext) -> Result<ProviderConfig, ParseError> {
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, "provider block")?.as_str().to_string();
    let attributes = parse_attributes(inner, ctx)?;
    Ok(ProviderConfig { name, attributes })
}

fn parse_backend_block(pair: Pair<Rule>, ctx: &ParseContext) -> Result<BackendConfig, ParseError> {
    let mut inner = pair.into_inner();
    let backend_type = next_pair(&mut inner, "backend block")?.as_str().to_string();
    let attributes = parse_attributes(inner, ctx)?;
    Ok(BackendConfig {
        backend_type,
        attributes,
    })
}

/// Parse block contents (attributes and nested blocks)
/// Nested blocks with the same name are collected into a list
fn parse_block_contents(
    pairs: Pairs<Rule>,
    ctx: &ParseContext,
) -> Result<HashMap<String, Value>, ParseError> {
    let mut attributes: HashMap<String, Value> = HashMap::new();
    let mut nested_blocks: HashMap<String, Vec<Value>> = HashMap::new();

    for content_pair in pairs {
        if content_pair.as_rule() != Rule::block_content {
            continue;
        }
        let inner = next_pair(&mut content_pair.into_inner(), "block content")?;
        match inner.as_rule() {
            Rule::attribute => {
                let (key, value) = parse_attribute(inner, ctx)?;
                attributes.insert(key, value);
            }
            Rule::nested_block => {
                let mut block_inner = inner.into_inner();
                let block_name = next_pair(&mut block_inner, "nested block")?
                    .as_str()
                    .to_string();
                let block_attrs = parse_block_contents(block_inner, ctx)?;
                nested_blocks
                    .entry(block_name)
                    .or_default()
                    .push(Value::Map(block_attrs));
            }
            _ => {}
        }
    }

    for (name, blocks) in nested_blocks {
        attributes.insert(name, Value::List(blocks));
    }

    Ok(attributes)
}

fn parse_resource_expr(
    pair: Pair<Rule>,
    ctx: &ParseContext,
    binding_name: Option<&str>,
) -> Result<Resource, ParseError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();

    let namespaced_type = next_pair(&mut inner, "resource expression")?
        .as_str()
        .to_string();

    // k8s.cilium_io_cilium_network_policy_v2 -> provider "k8s"
    let Some((provider, resource_type)) = namespaced_type.split_once('.') else {
        return Err(ParseError::InvalidResourceType(namespaced_type));
    };
    let provider = provider.to_string();
    let resource_type = resource_type.to_string();

    let mut attributes = parse_block_contents(inner, ctx)?;

    let resource_name = match binding_name {
        Some(binding) => binding.to_string(),
        None => match lookup_attribute(&attributes, "metadata.name") {
            Some(Value::String(s)) => s.clone(),
            _ => {
                return Err(ParseError::InvalidExpression {
                    line,
                    message: format!(
                        "Anonymous {} must set metadata.name",
                        namespaced_type
                    ),
                });
            }
        },
    };

    attributes.insert("_provider".to_string(), Value::String(provider));
    attributes.insert("_type".to_string(), Value::String(namespaced_type));
    if let Some(binding) = binding_name {
        attributes.insert("_binding".to_string(), Value::String(binding.to_string()));
    }

    Ok(Resource {
        id: ResourceId::new(resource_type, resource_name),
        attributes,
    })
}

fn parse_expression(pair: Pair<Rule>, ctx: &ParseContext) -> Result<Value, ParseError> {
    let inner = if pair.as_rule() == Rule::expression {
        next_pair(&mut pair.into_inner(), "expression")?
    } else {
        pair
    };
    let line = line_of(&inner);

    match inner.as_rule() {
        Rule::env_var => {
            let var_name = parse_string(next_pair(&mut inner.into_inner(), "env()")?);
            match env::var(&var_name) {
                Ok(val) => Ok(Value::String(val)),
                Err(_) => Err(ParseError::EnvVarNotSet(var_name)),
            }
        }
        Rule::list => {
            let items: Result<Vec<Value>, ParseError> = inner
                .into_inner()
                .map(|item| parse_expression(item, ctx))
                .collect();
            Ok(Value::List(items?))
        }
        Rule::map => {
            let mut map = HashMap::new();
            for entry in inner.into_inner() {
                if entry.as_rule() == Rule::map_entry {
                    let mut entry_inner = entry.into_inner();
                    let key_pair = next_pair(&mut next_pair(&mut entry_inner, "map entry")?.into_inner(), "map key")?;
                    let key = match key_pair.as_rule() {
                        Rule::string => parse_string(key_pair),
                        _ => key_pair.as_str().to_string(),
                    };
                    let value = parse_expression(next_pair(&mut entry_inner, "map entry")?, ctx)?;
                    map.insert(key, value);
                }
            }
            Ok(Value::Map(map))
        }
        Rule::boolean => Ok(Value::Bool(inner.as_str() == "true")),
        Rule::number => {
            let text = inner.as_str();
            let invalid = |e: &dyn std::fmt::Display| ParseError::InvalidExpression {
                line,
                message: format!("invalid number '{}': {}", text, e),
            };
            if text.contains('.') {
                text.parse::<f64>().map(Value::Float).map_err(|e| invalid(&e))
            } else {
                text.parse::<i64>().map(Value::Int).map_err(|e| invalid(&e))
            }
        }
        Rule::string => Ok(Value::String(parse_string(inner))),
        Rule::reference => parse_reference(inner.as_str(), line, ctx),
        _ => Err(ParseError::InvalidExpression {
            line,
            message: format!("unexpected '{}'", inner.as_str()),
        }),
    }
}

/// Resolve `name` or `name.path.to.attr`
///
/// Paths into a resource binding stay references until the resources are
/// resolved; paths into a plain variable are looked up immediately.
fn parse_reference(text: &str, line: usize, ctx: &ParseContext) -> Result<Value, ParseError> {
    let (head, rest) = match text.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (text, None),
    };

    match (ctx.variables.get(head), rest) {
        (Some(value), None) => Ok(value.clone()),
        (Some(value), Some(path)) => {
            value
                .lookup_path(path)
                .cloned()
                .ok_or_else(|| ParseError::InvalidExpression {
                    line,
                    message: format!("'{}' has no attribute '{}'", head, path),
                })
        }
        (None, Some(path)) => Ok(Value::ResourceRef(head.to_string(), path.to_string())),
        (None, None) if ctx.resource_bindings.contains(head) => {
            Err(ParseError::InvalidExpression {
                line,
                message: format!("'{}' is a resource; reference one of its attributes", head),
            })
        }
        (None, None) => Err(ParseError::UndefinedVariable(head.to_string())),
    }
}

fn parse_string(pair: Pair<Rule>) -> String {
    let s = pair.as_str();
    let inner = &s[1..s.len() - 1];

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Resolve resource references in a ParsedFile
///
/// References to another resource's declared attributes are replaced with
/// their values. References to attributes only known after apply (like `id`)
/// are kept for the interpreter. A reference to an unknown binding or to an
/// attribute the target does not declare is an error, as is a cycle.
pub fn resolve_resource_refs(parsed: &mut ParsedFile) -> Result<(), ParseError> {
    let bindings: Bindings = parsed
        .resources
        .iter()
        .filter_map(|r| r.binding().map(|b| (b.to_string(), r.user_attributes())))
        .collect();

    for resource in &mut parsed.resources {
        for value in resource.attributes.values() {
            check_references(value, &bindings)?;
        }
        resource.attributes = resource
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), resolve_refs(v, &bindings)))
            .collect();
        for value in resource.attributes.values() {
            check_resolved(value)?;
        }
    }

    Ok(())
}

/// Known only after apply: computed attributes and the defaulted namespace
fn is_deferred_path(path: &str) -> bool {
    let head = path.split('.').next().unwrap_or(path);
    COMPUTED_ATTRIBUTES.contains(&head) || path == "metadata.namespace"
}

fn check_references(value: &Value, bindings: &Bindings) -> Result<(), ParseError> {
    match value {
        Value::ResourceRef(binding, path) => match bindings.get(binding) {
            None => Err(ParseError::UndefinedVariable(format!("{}.{}", binding, path))),
            Some(attrs) if lookup_attribute(attrs, path).is_none() && !is_deferred_path(path) => {
                Err(ParseError::UnknownReference(format!("{}.{}", binding, path)))
            }
            Some(_) => Ok(()),
        },
        Value::List(items) => items.iter().try_for_each(|v| check_references(v, bindings)),
        Value::Map(map) => map.values().try_for_each(|v| check_references(v, bindings)),
        _ => Ok(()),
    }
}

/// After resolution only deferred references may remain; anything else looped
fn check_resolved(value: &Value) -> Result<(), ParseError> {
    match value {
        Value::ResourceRef(binding, path) if !is_deferred_path(path) => {
            Err(ParseError::CyclicReference(format!("{}.{}", binding, path)))
        }
        Value::List(items) => items.iter().try_for_each(check_resolved),
        Value::Map(map) => map.values().try_for_each(check_resolved),
        _ => Ok(()),
    }
}

/// Parse a configuration file and resolve resource references
pub fn parse_and_resolve(input: &str) -> Result<ParsedFile, ParseError> {
    let mut parsed = parse(input)?;
    resolve_resource_refs(&mut parsed)?;
    Ok(parsed)
}
