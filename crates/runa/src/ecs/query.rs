//! # Query: Filters and Snapshots
//!
//! A [`QueryResult`] is a materialized list of entity handles. Filtering one
//! produces another, so queries chain:
//!
//! ```ignore
//! let hungry_wolves = manager
//!     .all_entities()
//!     .filter(&[Filter::by_component::<Wolfish>()])?
//!     .filter(&[Filter::by_shared::<Creature>(|vitals| vitals.health < 10)])?;
//! ```
//!
//! Because the list is fixed when the snapshot is taken, entities may be
//! constructed or destroyed while iterating it. Destroyed entities stay
//! reachable through the snapshot until it is dropped.
//!
//! ## Comparison
//!
//! | | archetype ECS `query` | `QueryResult` |
//! |---|---|---|
//! | evaluation | on every call | once, when filtered |
//! | structural changes while iterating | deferred | allowed |
//! | abstract kinds | n/a | `Filter::by_component::<Creature>()` |

use std::cell::Ref;
use std::fmt;

use super::component::{AbstractComponent, Component, ComponentKind, KindInfo};
use super::entity::{Entity, EntityId, EntityRef};
use crate::error::{EcsError, Result};

type Predicate = Box<dyn Fn(&Entity) -> Result<bool>>;

/// Matches entities holding a component kind, optionally narrowed by a
/// predicate over that component.
pub struct Filter {
    kind: KindInfo,
    predicate: Option<Predicate>,
}

impl Filter {
    /// Entities holding `K`, which may be concrete or abstract.
    pub fn by_component<K: 'static>() -> Self {
        Self::by_kind(KindInfo::of::<K>())
    }

    pub fn by_kind(kind: KindInfo) -> Self {
        Self {
            kind,
            predicate: None,
        }
    }

    /// Entities holding a `T` for which `predicate` holds.
    pub fn by_predicate<T: ComponentKind>(predicate: impl Fn(&T) -> bool + 'static) -> Self {
        Self {
            kind: KindInfo::of::<T>(),
            predicate: Some(Box::new(move |entity: &Entity| -> Result<bool> {
                Ok(predicate(entity.get::<T>()?))
            })),
        }
    }

    /// Entities holding any specialization of `A` whose shared fragment
    /// satisfies `predicate`.
    pub fn by_shared<A: AbstractComponent>(
        predicate: impl Fn(&A::Shared) -> bool + 'static,
    ) -> Self {
        Self {
            kind: KindInfo::of::<A>(),
            predicate: Some(Box::new(move |entity: &Entity| -> Result<bool> {
                Ok(predicate(entity.shared::<A>()?))
            })),
        }
    }

    pub fn kind(&self) -> KindInfo {
        self.kind
    }

    /// Fails with `InvalidArgument` if the filter's kind is not a registered
    /// component kind.
    pub fn apply(&self, entity: &Entity) -> Result<bool> {
        if !entity.has_kind(self.kind)? {
            return Ok(false);
        }
        match &self.predicate {
            Some(predicate) => predicate(entity),
            None => Ok(true),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("kind", &self.kind.short_name())
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// A fixed, restartable sequence of entities.
#[derive(Clone, Default)]
pub struct QueryResult {
    entities: Vec<EntityRef>,
}

impl QueryResult {
    /// The entities of this snapshot satisfying every filter.
    pub fn filter(&self, filters: &[Filter]) -> Result<QueryResult> {
        let mut matched = Vec::new();
        'entities: for handle in &self.entities {
            let entity = handle.borrow();
            for filter in filters {
                if !filter.apply(&entity)? {
                    continue 'entities;
                }
            }
            matched.push(handle.clone());
        }
        Ok(QueryResult { entities: matched })
    }

    /// Borrow the `T` of every entity in the snapshot. Fails if any entity
    /// lacks one.
    pub fn extract<T: ComponentKind>(&self) -> Result<Vec<Ref<'_, T>>> {
        self.entities
            .iter()
            .map(|handle| {
                Ref::filter_map(handle.borrow(), |entity| entity.get::<T>().ok())
                    .map_err(|_| EcsError::ComponentNotPresent(T::IDENTIFIER.to_string()))
            })
            .collect()
    }

    /// Like [`extract`](Self::extract), for a kind known only at runtime.
    pub fn extract_kind(&self, kind: KindInfo) -> Result<Vec<Ref<'_, dyn Component + 'static>>> {
        self.entities
            .iter()
            .map(|handle| {
                Ref::filter_map(handle.borrow(), |entity| entity.get_kind(kind).ok())
                    .map_err(|_| EcsError::ComponentNotPresent(kind.short_name().to_string()))
            })
            .collect()
    }

    /// Call `f` with each entity's `T`.
    ///
    /// ```ignore
    /// result.for_each::<Lifetime>(|id, lifetime| println!("{id}: {}", lifetime.current));
    /// ```
    pub fn for_each<T: ComponentKind>(&self, mut f: impl FnMut(EntityId, &T)) -> Result<()> {
        for handle in &self.entities {
            let entity = handle.borrow();
            f(handle.id(), entity.get::<T>()?);
        }
        Ok(())
    }

    /// Call `f` with mutable access to each entity's `T`.
    pub fn for_each_mut<T: ComponentKind>(
        &self,
        mut f: impl FnMut(EntityId, &mut T),
    ) -> Result<()> {
        for handle in &self.entities {
            let mut entity = handle.borrow_mut();
            f(handle.id(), entity.get_mut::<T>()?);
        }
        Ok(())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.iter().any(|handle| handle.id() == id)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(EntityRef::id).collect()
    }

    pub fn entities(&self) -> &[EntityRef] {
        &self.entities
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityRef> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<EntityRef> for QueryResult {
    fn from_iter<I: IntoIterator<Item = EntityRef>>(iter: I) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a EntityRef;
    type IntoIter = std::slice::Iter<'a, EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

impl IntoIterator for QueryResult {
    type Item = EntityRef;
    type IntoIter = std::vec::IntoIter<EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
