//! Entities that expire after a fixed number of ticks.
//!
//! ```json
//! { "name": "spark", "lifetime": { "maximum": 30 } }
//! ```

use serde::Deserialize;

use crate::ecs::{EntityManager, Filter, QueryResult, System, Ticks};
use crate::error::Result;

/// How long an entity has lived, and how long it may live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Lifetime {
    /// Ticks lived so far. Not read from data.
    #[serde(skip)]
    pub current: u64,
    pub maximum: u64,
}
crate::impl_component!(Lifetime, "lifetime");

impl Lifetime {
    pub fn new(maximum: u64) -> Self {
        Self {
            current: 0,
            maximum,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.current >= self.maximum
    }
}

/// Ages every entity with a [`Lifetime`] and destroys the ones that reached
/// their maximum.
///
/// An entity is destroyed on the first tick that finds it expired, so one
/// with `maximum: 2` ticked by 1 survives two ticks and is destroyed on the
/// third.
#[derive(Debug)]
pub struct LifetimeSystem {
    filters: [Filter; 1],
}

impl LifetimeSystem {
    pub fn new() -> Self {
        Self {
            filters: [Filter::by_component::<Lifetime>()],
        }
    }
}

impl Default for LifetimeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for LifetimeSystem {
    fn filters(&self) -> &[Filter] {
        &self.filters
    }

    fn update(
        &mut self,
        manager: &mut EntityManager,
        elapsed: Ticks,
        entities: &QueryResult,
    ) -> Result<()> {
        let mut expired = Vec::new();
        for handle in entities {
            let mut entity = handle.borrow_mut();
            let lifetime = entity.get_mut::<Lifetime>()?;
            if lifetime.is_expired() {
                expired.push((handle.id(), entity.type_name().to_string()));
            } else {
                lifetime.current = lifetime.current.saturating_add(elapsed);
            }
        }

        for (id, type_name) in expired {
            manager.destroy(id);
            log::debug!(
                "Destroyed entity of type \"{type_name}\" because maximum lifetime was reached"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ecs::{Component, ComponentRegistry, KindDescriptor};

    fn manager() -> EntityManager {
        let registry = ComponentRegistry::register_discovered_kinds([
            KindDescriptor::concrete::<Lifetime>(),
        ])
        .unwrap();
        EntityManager::builder(Arc::new(registry))
            .load_str(
                "test",
                r#"[
                    { "name": "spark", "lifetime": { "maximum": 2 } },
                    { "name": "ember", "lifetime": { "maximum": 5 } },
                    { "name": "rock" }
                ]"#,
            )
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn maximum_is_required() {
        let mut lifetime = Lifetime::default();
        assert!(lifetime.populate(&serde_json::json!({})).is_err());
        lifetime.populate(&serde_json::json!({ "maximum": 3, "current": 9 })).unwrap();
        assert_eq!(lifetime, Lifetime::new(3));
    }

    #[test]
    fn expires_after_maximum_ticks() {
        let mut manager = manager();
        let spark = manager.construct("spark").unwrap().id();
        let ember = manager.construct("ember").unwrap().id();
        let rock = manager.construct("rock").unwrap().id();

        let mut system = LifetimeSystem::new();
        system.tick(&mut manager, 1).unwrap();
        system.tick(&mut manager, 1).unwrap();
        assert!(manager.has_entity(spark));

        system.tick(&mut manager, 1).unwrap();
        assert!(!manager.has_entity(spark));
        assert!(manager.has_entity(ember));
        assert!(manager.has_entity(rock));

        let current = manager.get(ember).unwrap().borrow().get::<Lifetime>().unwrap().current;
        assert_eq!(current, 3);
    }

    #[test]
    fn elapsed_ticks_accumulate() {
        let mut manager = manager();
        let ember = manager.construct("ember").unwrap().id();

        let mut system = LifetimeSystem::new();
        system.tick(&mut manager, 5).unwrap();
        assert!(manager.has_entity(ember));
        system.tick(&mut manager, 5).unwrap();
        assert!(!manager.has_entity(ember));
    }
}
