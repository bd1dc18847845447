//! Convenience re-exports for game code.
//!
//! ```ignore
//! use runa::prelude::*;
//! ```

pub use crate::config::ManagerConfig;
pub use crate::ecs::{
    AbstractComponent, Component, ComponentKind, ComponentRegistry, Entity, EntityId,
    EntityManager, EntityRef, EntityType, Filter, KindDescriptor, KindInfo, Observer,
    ObserverSystem, QueryResult, Schedule, System, Ticks,
};
pub use crate::error::{DataShapeError, DependencyFault, EcsError, Result};
pub use crate::impl_component;
pub use crate::lifetime::{Lifetime, LifetimeSystem};
