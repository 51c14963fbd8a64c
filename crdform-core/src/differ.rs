//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the resources declared in configuration with the states recorded
//! by the last apply, and generates the Effects needed to reconcile them.

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::lifecycle::COMPUTED_ATTRIBUTES;
use crate::plan::Plan;
use crate::resource::{Bindings, Resource, ResourceId, State, Value};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

fn is_compared(key: &str) -> bool {
    !key.starts_with('_') && !COMPUTED_ATTRIBUTES.contains(&key)
}

/// Find changed attributes between desired and current state, sorted by name
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        if !is_compared(key) {
            continue;
        }

        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    // Attributes dropped from configuration
    for key in current.keys() {
        if is_compared(key) && !desired.contains_key(key) {
            changed.push(key.clone());
        }
    }

    changed.sort();
    changed
}

/// Compute Diff for multiple resources and generate a Plan
///
/// States whose resource no longer appears in `desired` are deleted, after
/// every create and update, in resource id order.
pub fn create_plan(desired: &[Resource], current_states: &HashMap<ResourceId, State>) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        match diff(resource, &current) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    let desired_ids: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();
    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|s| s.exists && !desired_ids.contains(&s.id))
        .collect();
    orphans.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));
    for state in orphans {
        plan.add(Effect::Delete(state.clone()));
    }

    plan
}

/// Attributes visible through each binding at plan time
///
/// `resources` must already be in dependency order. Each binding exposes its
/// declared attributes. Stored attributes such as `id` are merged in only when
/// the resource itself will not change; a resource that is created or updated
/// gets new computed values, so references to them stay deferred until the
/// interpreter records the outcome.
pub fn binding_map(resources: &[Resource], current_states: &HashMap<ResourceId, State>) -> Bindings {
    let mut bindings = Bindings::new();

    for resource in resources {
        let Some(binding_name) = resource.binding() else {
            continue;
        };
        let resolved = resource.resolved(&bindings);
        let mut attrs = resolved.user_attributes();

        if let Some(state) = current_states.get(&resource.id)
            && !diff(&resolved, state).is_change()
        {
            for (k, v) in &state.attributes {
                attrs.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        bindings.insert(binding_name.to_string(), attrs);
    }

    bindings
}

/// Extract binding names that a resource depends on
pub fn resource_dependencies(resource: &Resource) -> HashSet<String> {
    let mut deps = HashSet::new();
    for value in resource.attributes.values() {
        collect_dependencies(value, &mut deps);
    }
    deps
}

fn collect_dependencies(value: &Value, deps: &mut HashSet<String>) {
    match value {
        Value::ResourceRef(binding_name, _) => {
            deps.insert(binding_name.clone());
        }
        Value::List(items) => {
            for item in items {
                collect_dependencies(item, deps);
            }
        }
        Value::Map(map) => {
            for v in map.values() {
                collect_dependencies(v, deps);
            }
        }
        _ => {}
    }
}

/// Sort resources topologically so that referenced bindings come first
///
/// Declaration order is kept where no dependency forces otherwise. Cycles
/// are broken at the first resource revisited.
pub fn sort_resources_by_dependencies(resources: &[Resource]) -> Vec<Resource> {
    let binding_to_resource: HashMap<&str, &Resource> = resources
        .iter()
        .filter_map(|r| r.binding().map(|b| (b, r)))
        .collect();

    let mut sorted = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut visiting: HashSet<String> = HashSet::new();

    fn visit<'a>(
        resource: &'a Resource,
        binding_to_resource: &HashMap<&str, &'a Resource>,
        visited: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
        sorted: &mut Vec<Resource>,
    ) {
        let key = resource
            .binding()
            .map(str::to_string)
            .unwrap_or_else(|| resource.id.to_string());

        if visited.contains(&key) || visiting.contains(&key) {
            return;
        }

        visiting.insert(key.clone());

        let mut deps: Vec<String> = resource_dependencies(resource).into_iter().collect();
        deps.sort();
        for dep in deps {
            if let Some(dep_resource) = binding_to_resource.get(dep.as_str()) {
                visit(dep_resource, binding_to_resource, visited, visiting, sorted);
            }
        }

        visiting.remove(&key);
        visited.insert(key);
        sorted.push(resource.clone());
    }

    for resource in resources {
        visit(
            resource,
            &binding_to_resource,
            &mut visited,
            &mut visiting,
            &mut sorted,
        );
    }

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("policy", "test");
        let current = State::not_found(ResourceId::new("policy", "test"));

        let result = diff(&desired, &current);
        assert!(matches!(result, Diff::Create(_)));
        assert!(result.is_change());
    }

    #[test]
    fn diff_ignores_computed_and_internal_attributes() {
        let desired = Resource::new("policy", "test")
            .with_attribute("_binding", s("test"))
            .with_attribute("spec", s("a"));

        let mut attrs = HashMap::new();
        attrs.insert("spec".to_string(), s("a"));
        attrs.insert("id".to_string(), Value::Int(42));
        attrs.insert("yaml".to_string(), s("kind: X\n"));
        let current = State::existing(ResourceId::new("policy", "test"), attrs);

        assert!(matches!(diff(&desired, &current), Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_lists_changed_and_removed() {
        let desired = Resource::new("policy", "test").with_attribute("metadata", s("new"));

        let mut attrs = HashMap::new();
        attrs.insert("metadata".to_string(), s("old"));
        attrs.insert("spec".to_string(), s("gone"));
        let current = State::existing(ResourceId::new("policy", "test"), attrs);

        match diff(&desired, &current) {
            Diff::Update {
                changed_attributes, ..
            } => {
                assert_eq!(changed_attributes, vec!["metadata", "spec"]);
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn create_plan_from_resources() {
        let resources = vec![
            Resource::new("policy", "new").with_attribute("spec", s("a")),
            Resource::new("policy", "existing").with_attribute("spec", s("b")),
        ];

        let mut current_states = HashMap::new();
        let mut attrs = HashMap::new();
        attrs.insert("spec".to_string(), s("old"));
        current_states.insert(
            ResourceId::new("policy", "existing"),
            State::existing(ResourceId::new("policy", "existing"), attrs),
        );
        current_states.insert(
            ResourceId::new("policy", "orphan"),
            State::existing(ResourceId::new("policy", "orphan"), HashMap::new()),
        );

        let plan = create_plan(&resources, &current_states);

        assert_eq!(plan.effects().len(), 3);
        assert!(matches!(plan.effects()[0], Effect::Create(_)));
        assert!(matches!(plan.effects()[1], Effect::Update { .. }));
        match &plan.effects()[2] {
            Effect::Delete(state) => assert_eq!(state.id.name, "orphan"),
            other => panic!("Expected Delete, got {:?}", other),
        }
    }

    #[test]
    fn sorts_referenced_bindings_first() {
        let app = Resource::new("monitor", "app")
            .with_attribute("_binding", s("app"))
            .with_attribute(
                "spec",
                Value::ResourceRef("cert".to_string(), "metadata.name".to_string()),
            );
        let cert = Resource::new("certificate", "cert").with_attribute("_binding", s("cert"));

        let sorted = sort_resources_by_dependencies(&[app, cert]);
        let names: Vec<&str> = sorted.iter().map(|r| r.id.name.as_str()).collect();
        assert_eq!(names, vec!["cert", "app"]);
    }

    #[test]
    fn binding_map_merges_state_attributes_of_unchanged_resources() {
        let resource = Resource::new("policy", "web")
            .with_attribute("_binding", s("web"))
            .with_attribute("spec", s("a"));

        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), Value::Int(7));
        attrs.insert("spec".to_string(), s("a"));
        let mut states = HashMap::new();
        states.insert(
            resource.id.clone(),
            State::existing(resource.id.clone(), attrs),
        );

        let bindings = binding_map(&[resource], &states);
        let web = &bindings["web"];
        assert_eq!(web.get("id"), Some(&Value::Int(7)));
        assert_eq!(web.get("spec"), Some(&s("a")));
        assert!(!web.contains_key("_binding"));
    }

    #[test]
    fn references_to_an_updated_resource_are_deferred() {
        let a = Resource::new("policy", "a")
            .with_attribute("_binding", s("a"))
            .with_attribute("spec", s("new"));
        let b = Resource::new("policy", "b")
            .with_attribute("_binding", s("b"))
            .with_attribute("spec", Value::ResourceRef("a".to_string(), "id".to_string()));

        let mut states = HashMap::new();
        let mut a_attrs = HashMap::new();
        a_attrs.insert("id".to_string(), Value::Int(1));
        a_attrs.insert("spec".to_string(), s("old"));
        states.insert(a.id.clone(), State::existing(a.id.clone(), a_attrs));
        let mut b_attrs = HashMap::new();
        b_attrs.insert("id".to_string(), Value::Int(2));
        b_attrs.insert("spec".to_string(), Value::Int(1));
        states.insert(b.id.clone(), State::existing(b.id.clone(), b_attrs));

        let sorted = sort_resources_by_dependencies(&[b, a]);
        let bindings = binding_map(&sorted, &states);
        assert!(!bindings["a"].contains_key("id"));

        let desired: Vec<Resource> = sorted.iter().map(|r| r.resolved(&bindings)).collect();
        let plan = create_plan(&desired, &states);
        assert_eq!(plan.effects().len(), 2);
        match &plan.effects()[1] {
            Effect::Update { id, to, .. } => {
                assert_eq!(id.name, "b");
                assert_eq!(
                    to.attributes.get("spec"),
                    Some(&Value::ResourceRef("a".to_string(), "id".to_string()))
                );
            }
            other => panic!("Expected Update of b, got {:?}", other),
        }
    }

    #[test]
    fn references_to_an_unchanged_resource_resolve_from_state() {
        let a = Resource::new("policy", "a")
            .with_attribute("_binding", s("a"))
            .with_attribute("spec", s("same"));
        let b = Resource::new("policy", "b")
            .with_attribute("spec", Value::ResourceRef("a".to_string(), "id".to_string()));

        let mut states = HashMap::new();
        let mut a_attrs = HashMap::new();
        a_attrs.insert("id".to_string(), Value::Int(1));
        a_attrs.insert("spec".to_string(), s("same"));
        states.insert(a.id.clone(), State::existing(a.id.clone(), a_attrs));
        let mut b_attrs = HashMap::new();
        b_attrs.insert("spec".to_string(), Value::Int(1));
        states.insert(b.id.clone(), State::existing(b.id.clone(), b_attrs));

        let sorted = sort_resources_by_dependencies(&[a, b]);
        let bindings = binding_map(&sorted, &states);
        let desired: Vec<Resource> = sorted.iter().map(|r| r.resolved(&bindings)).collect();
        assert!(create_plan(&desired, &states).is_empty());
    }
}
