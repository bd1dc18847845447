//! # Data-Driven Entity Component System
//!
//! Unlike an archetype ECS, entities here own their components directly: an
//! [`Entity`] is an identity plus a map from component identifier to a boxed
//! component. What makes the design data-driven is that the *shape* of an
//! entity comes from JSON files, not from code.
//!
//! ## Module Overview
//!
//! - [`component`]: `Component` / `ComponentKind` / `AbstractComponent` traits
//! - [`registry`]: maps identifiers to component kinds, validates kind bases
//! - [`entity`]: entity identity and its component map
//! - [`schema`]: parsed entity type definitions
//! - [`manager`]: loads types, resolves inheritance, owns the live population
//! - [`query`]: filters and materialized query snapshots
//! - [`system`]: per-tick systems, observer systems and the schedule
//!
//! ## Load-Time vs Run-Time
//!
//! ```text
//! load time:   kinds ──► ComponentRegistry
//!              *.json ──► EntityType + raw node ──► dependency check
//!
//! run time:    EntityManager::construct("wolf") ──► EntityRef (live)
//!              System::tick ──► all_entities().filter(..) ──► update
//! ```

pub mod component;
pub mod entity;
pub mod manager;
pub mod query;
pub mod registry;
pub mod schema;
pub mod system;

#[cfg(test)]
pub(crate) mod testing;

pub use component::{AbstractComponent, Component, ComponentKind, KindInfo};
pub use entity::{Entity, EntityId, EntityRef};
pub use manager::{EntityManager, EntityManagerBuilder};
pub use query::{Filter, QueryResult};
pub use registry::{ComponentRegistry, KindDescriptor};
pub use schema::EntityType;
pub use system::{Observer, ObserverSystem, Schedule, System, Ticks};
