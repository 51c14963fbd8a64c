//! Conversions between core values and their JSON form in the state file

use std::collections::{BTreeMap, HashMap};

use crdform_core::lifecycle::COMPUTED_ATTRIBUTES;
use crdform_core::resource::{ResourceId, State, Value};
use serde_json::Number;

use crate::backend::{BackendError, BackendResult};
use crate::state::{ManifestRecord, StateFile};

/// Convert a core value to JSON
///
/// References must be resolved before a value reaches state.
pub fn value_to_json(value: &Value) -> BackendResult<serde_json::Value> {
    Ok(match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(n) => serde_json::Value::Number(n),
            None => {
                return Err(BackendError::Unstorable(format!("the float {}", f)));
            }
        },
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::List(items) => serde_json::Value::Array(
            items
                .iter()
                .map(value_to_json)
                .collect::<BackendResult<Vec<_>>>()?,
        ),
        Value::Map(map) => {
            let mut object = serde_json::Map::new();
            for (k, v) in map {
                object.insert(k.clone(), value_to_json(v)?);
            }
            serde_json::Value::Object(object)
        }
        Value::ResourceRef(binding, attribute) => {
            return Err(BackendError::Unstorable(format!(
                "the unresolved reference {}.{}",
                binding, attribute
            )));
        }
    })
}

/// Convert JSON back into a core value; `null` has no counterpart
pub fn json_to_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Int(i)),
            None => n.as_f64().map(Value::Float),
        },
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Array(items) => {
            Some(Value::List(items.iter().filter_map(json_to_value).collect()))
        }
        serde_json::Value::Object(object) => Some(Value::Map(
            object
                .iter()
                .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
    }
}

impl ManifestRecord {
    /// Record a provider-produced state; it must carry every computed attribute
    pub fn from_state(state: &State) -> BackendResult<Self> {
        let missing = |attribute: &str| {
            BackendError::Unstorable(format!("{} without its {} attribute", state.id, attribute))
        };
        let text = |attribute: &str| match state.attributes.get(attribute) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(missing(attribute)),
        };
        let id = match state.attributes.get("id") {
            Some(Value::Int(id)) => *id,
            _ => return Err(missing("id")),
        };

        let mut attributes = BTreeMap::new();
        for (k, v) in &state.attributes {
            if !COMPUTED_ATTRIBUTES.contains(&k.as_str()) {
                attributes.insert(k.clone(), value_to_json(v)?);
            }
        }

        Ok(Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            id,
            api_version: text("api_version")?,
            kind: text("kind")?,
            manifest: text("yaml")?,
            attributes,
        })
    }

    /// The stored state as the core model sees it
    pub fn to_state(&self) -> State {
        let mut attributes: HashMap<String, Value> = self
            .attributes
            .iter()
            .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
            .collect();
        attributes.insert("id".to_string(), Value::Int(self.id));
        attributes.insert("api_version".to_string(), Value::String(self.api_version.clone()));
        attributes.insert("kind".to_string(), Value::String(self.kind.clone()));
        attributes.insert("yaml".to_string(), Value::String(self.manifest.clone()));

        State::existing(self.resource_id(), attributes).with_identifier(self.id.to_string())
    }
}

impl StateFile {
    /// Every stored resource keyed by id, as the differ consumes them
    pub fn current_states(&self) -> HashMap<ResourceId, State> {
        self.records()
            .map(|r| (r.resource_id(), r.to_state()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_values_convert_to_json() {
        let mut map = HashMap::new();
        map.insert(
            "ports".to_string(),
            Value::List(vec![Value::Int(80), Value::Float(0.5)]),
        );
        map.insert("enabled".to_string(), Value::Bool(false));

        let json = value_to_json(&Value::Map(map)).unwrap();
        assert_eq!(json, json!({"ports": [80, 0.5], "enabled": false}));
    }

    #[test]
    fn references_are_not_storable() {
        let value = Value::ResourceRef("cert".to_string(), "id".to_string());
        assert!(value_to_json(&value).is_err());
    }

    #[test]
    fn non_finite_floats_are_not_storable() {
        assert!(value_to_json(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn json_numbers_prefer_integers() {
        assert_eq!(json_to_value(&json!(42)), Some(Value::Int(42)));
        assert_eq!(json_to_value(&json!(1.5)), Some(Value::Float(1.5)));
        assert_eq!(json_to_value(&json!(null)), None);
    }

    fn rendered_state() -> State {
        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), Value::Int(1_700_000_000_000_000_001));
        attrs.insert("yaml".to_string(), Value::String("kind: X\n".to_string()));
        attrs.insert("api_version".to_string(), Value::String("x.io/v1".to_string()));
        attrs.insert("kind".to_string(), Value::String("X".to_string()));
        attrs.insert("spec".to_string(), Value::Int(3));
        State::existing(ResourceId::new("x_io_x_v1", "web"), attrs)
            .with_identifier("1700000000000000001")
    }

    #[test]
    fn record_round_trips_core_state() {
        let state = rendered_state();
        let record = ManifestRecord::from_state(&state).unwrap();

        assert_eq!(record.id, 1_700_000_000_000_000_001);
        assert_eq!(record.manifest, "kind: X\n");
        assert_eq!(record.attributes.keys().collect::<Vec<_>>(), vec!["spec"]);
        assert_eq!(record.to_state(), state);
    }

    #[test]
    fn state_without_a_manifest_is_not_recorded() {
        let mut state = rendered_state();
        state.attributes.remove("yaml");
        assert!(matches!(
            ManifestRecord::from_state(&state),
            Err(BackendError::Unstorable(_))
        ));
    }

    #[test]
    fn current_states_are_keyed_by_id() {
        let mut file = StateFile::new();
        file.insert(ManifestRecord::from_state(&rendered_state()).unwrap());
        let states = file.current_states();
        let state = &states[&ResourceId::new("x_io_x_v1", "web")];
        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("1700000000000000001"));
    }
}
