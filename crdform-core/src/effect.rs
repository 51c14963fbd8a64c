//! Effect - A single state change to be carried out by a Provider
//!
//! Effects are plain data. Nothing happens until an Interpreter runs them.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Render a new resource
    Create(Resource),
    /// Re-render an existing resource, replacing its state
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Drop a resource from state
    Delete(State),
}

impl Effect {
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } => id,
            Effect::Delete(state) => &state.id,
        }
    }

    /// Verb used when reporting the effect
    pub fn verb(&self) -> &'static str {
        match self {
            Effect::Create(_) => "create",
            Effect::Update { .. } => "update",
            Effect::Delete(_) => "delete",
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.verb(), self.resource_id())
    }
}
