//! Parsed entity type definitions.
//!
//! One JSON object per entity type:
//!
//! ```json
//! { "name": "elite_wolf", "inherits_from": ["wolf"], "component_y": { "value": 2 } }
//! ```
//!
//! Every object-valued field is a component declaration keyed by the
//! component's identifier. Bases are only checked for existence once all
//! files are loaded, so a type may refer to one defined later.

use serde_json::{Map, Value};

use super::registry::ComponentRegistry;
use crate::error::{EcsError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    name: String,
    is_template: bool,
    components: Vec<&'static str>,
    bases: Vec<String>,
}

impl EntityType {
    pub fn parse(node: &Value, registry: &ComponentRegistry) -> Result<Self> {
        let object = node.as_object().ok_or_else(|| {
            EcsError::InvalidArgument("entity type definition must be an object".to_string())
        })?;
        Self::from_object(object, registry)
    }

    pub(crate) fn from_object(
        object: &Map<String, Value>,
        registry: &ComponentRegistry,
    ) -> Result<Self> {
        let name = match object.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(_) => {
                return Err(EcsError::InvalidArgument(
                    "entity type \"name\" must be a string".to_string(),
                ));
            }
            None => {
                return Err(EcsError::InvalidArgument(
                    "entity type is missing \"name\"".to_string(),
                ));
            }
        };

        let is_template = match object.get("is_template") {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                return Err(EcsError::InvalidArgument(format!(
                    "\"is_template\" of entity type \"{name}\" must be a boolean"
                )));
            }
        };

        let bases = match object.get("inherits_from") {
            None => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|entry| {
                    entry.as_str().map(str::to_string).ok_or_else(|| {
                        EcsError::InvalidArgument(format!(
                            "\"inherits_from\" of entity type \"{name}\" must only contain strings"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(EcsError::InvalidArgument(format!(
                    "\"inherits_from\" of entity type \"{name}\" must be an array"
                )));
            }
        };

        let mut components = Vec::new();
        for (key, value) in object {
            if !value.is_object() {
                continue;
            }
            let Some(id) = registry.intern(key) else {
                log::error!("Entity type \"{name}\" declares unknown component \"{key}\"");
                return Err(EcsError::UnknownComponent(key.clone()));
            };
            components.push(id);
        }

        Ok(Self {
            name,
            is_template,
            components,
            bases,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Templates exist only to be inherited from.
    pub fn is_template(&self) -> bool {
        self.is_template
    }

    /// Identifiers declared directly on this type.
    pub fn components(&self) -> &[&'static str] {
        &self.components
    }

    /// Names of the types this one inherits from, in declaration order.
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn declares(&self, id: &str) -> bool {
        self.components.iter().any(|declared| *declared == id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ecs::testing::registry;

    #[test]
    fn parses_full_definition() {
        let registry = registry();
        let node = json!({
            "name": "elite_wolf",
            "is_template": false,
            "inherits_from": ["wolf", "pack_member"],
            "component_x": { "value": 1 },
            "wolfish": {},
        });

        let ty = EntityType::parse(&node, &registry).unwrap();
        assert_eq!(ty.name(), "elite_wolf");
        assert!(!ty.is_template());
        assert_eq!(ty.bases(), ["wolf", "pack_member"]);
        assert!(ty.declares("component_x"));
        assert!(ty.declares("wolfish"));
        assert_eq!(ty.components().len(), 2);
    }

    #[test]
    fn defaults_when_optional_fields_missing() {
        let ty = EntityType::parse(&json!({ "name": "rock" }), &registry()).unwrap();
        assert!(!ty.is_template());
        assert!(ty.bases().is_empty());
        assert!(ty.components().is_empty());
    }

    #[test]
    fn scalar_fields_are_not_components() {
        let node = json!({ "name": "note", "description": "just text", "weight": 3 });
        let ty = EntityType::parse(&node, &registry()).unwrap();
        assert!(ty.components().is_empty());
    }

    #[test]
    fn name_is_required() {
        let registry = registry();
        for node in [json!({}), json!({ "name": 3 }), json!(["name"])] {
            assert!(matches!(
                EntityType::parse(&node, &registry),
                Err(EcsError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn rejects_malformed_optional_fields() {
        let registry = registry();
        for node in [
            json!({ "name": "a", "is_template": "yes" }),
            json!({ "name": "a", "inherits_from": ["ok", 4] }),
        ] {
            assert!(matches!(
                EntityType::parse(&node, &registry),
                Err(EcsError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn inherits_from_must_be_an_array() {
        let registry = registry();
        for bases in [json!("wolf"), json!({ "wolf": true }), json!(null)] {
            let node = json!({ "name": "pup", "inherits_from": bases });
            assert!(matches!(
                EntityType::parse(&node, &registry),
                Err(EcsError::InvalidArgument(ref msg)) if msg.contains("must be an array")
            ));
        }
    }

    #[test]
    fn unknown_component_is_rejected() {
        let node = json!({ "name": "dragon", "fire_breath": { "range": 5 } });
        let err = EntityType::parse(&node, &registry()).unwrap_err();
        assert!(matches!(err, EcsError::UnknownComponent(id) if id == "fire_breath"));
    }

    #[test]
    fn bases_are_not_checked_at_parse_time() {
        let node = json!({ "name": "pup", "inherits_from": ["defined_later"] });
        let ty = EntityType::parse(&node, &registry()).unwrap();
        assert_eq!(ty.bases(), ["defined_later"]);
    }
}
