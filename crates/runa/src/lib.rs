//! # Runa: Data-Driven Entity Registry
//!
//! Entities are bags of components, and entity *types* are described in JSON
//! files rather than in code. A type lists the components it carries and the
//! types it inherits from; the [`EntityManager`](ecs::EntityManager) resolves
//! that inheritance graph once at load time and builds live entities on demand.
//! Systems then pull filtered snapshots of the live population every tick.
//!
//! Start with `use runa::prelude::*`, register your component kinds and call
//! [`EntityManager::initialize`](ecs::EntityManager::initialize).

pub mod config;
pub mod ecs;
pub mod error;
pub mod lifetime;
pub mod prelude;

pub use config::ManagerConfig;
pub use error::{DataShapeError, DependencyFault, EcsError, Result};

#[doc(hidden)]
pub use serde_json;
