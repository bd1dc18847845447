//! Component kinds and helpers shared by the unit tests.

use std::sync::Arc;

use serde::Deserialize;

use super::component::AbstractComponent;
use super::manager::EntityManager;
use super::registry::{ComponentRegistry, KindDescriptor};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ComponentX {
    #[serde(default)]
    pub value: i64,
}
crate::impl_component!(ComponentX, "component_x");

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ComponentY {
    #[serde(default)]
    pub value: i64,
}
crate::impl_component!(ComponentY, "component_y");

/// Abstract kind: anything alive.
pub struct Creature;

impl AbstractComponent for Creature {
    type Shared = Vitals;
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Vitals {
    #[serde(default)]
    pub health: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Wolfish {
    #[serde(flatten)]
    pub vitals: Vitals,
    #[serde(default)]
    pub howl: i64,
}
crate::impl_component!(Wolfish, "wolfish", extends Creature => vitals);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Birdlike {
    #[serde(flatten)]
    pub vitals: Vitals,
    #[serde(default)]
    pub wingspan: i64,
}
crate::impl_component!(Birdlike, "birdlike", extends Creature => vitals);

pub fn kinds() -> Vec<KindDescriptor> {
    vec![
        KindDescriptor::concrete::<ComponentX>(),
        KindDescriptor::concrete::<ComponentY>(),
        KindDescriptor::abstract_kind::<Creature>(),
        KindDescriptor::concrete::<Wolfish>(),
        KindDescriptor::concrete::<Birdlike>(),
    ]
}

pub fn registry() -> Arc<ComponentRegistry> {
    Arc::new(ComponentRegistry::register_discovered_kinds(kinds()).unwrap())
}

/// Build a manager from inline entity type documents.
pub fn manager(docs: &[&str]) -> EntityManager {
    try_manager(docs).unwrap()
}

pub fn try_manager(docs: &[&str]) -> crate::Result<EntityManager> {
    docs.iter()
        .enumerate()
        .try_fold(EntityManager::builder(registry()), |builder, (i, doc)| {
            builder.load_str(&format!("doc{i}"), doc)
        })?
        .build()
}
