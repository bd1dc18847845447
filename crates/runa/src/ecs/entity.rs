//! # Entity: Identity Plus Components
//!
//! An entity owns at most one component per identifier. Kind-based lookups go
//! through the shared [`ComponentRegistry`], which is how a query for an
//! abstract kind finds whichever specialization the entity carries.
//!
//! Entities in the live population are handed out as [`EntityRef`] handles.
//! A handle stays valid after the entity is destroyed; the manager only drops
//! its own reference.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

use uuid::Uuid;

use super::component::{
    AbstractComponent, Component, ComponentKind, KindInfo, downcast_mut, downcast_ref,
};
use super::registry::ComponentRegistry;
use crate::error::{EcsError, Result};

/// Unique identity of an entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Uuid);

impl EntityId {
    /// A fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identity, the name of the type it was built from, and its components.
pub struct Entity {
    id: EntityId,
    type_name: String,
    components: HashMap<&'static str, Box<dyn Component>>,
    registry: Arc<ComponentRegistry>,
}

impl Entity {
    /// An empty entity with a fresh identity.
    pub fn new(registry: Arc<ComponentRegistry>, type_name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            type_name: type_name.into(),
            components: HashMap::new(),
            registry,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Name of the entity type this entity was constructed from.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set_type_name(&mut self, type_name: impl Into<String>) {
        self.type_name = type_name.into();
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    // ── presence ────────────────────────────────────────────────────────

    /// Does this entity hold a component of kind `K`?
    ///
    /// `K` may be concrete or abstract. Fails with `InvalidArgument` if `K` is
    /// not a registered component kind.
    pub fn has<K: 'static>(&self) -> Result<bool> {
        self.has_kind(KindInfo::of::<K>())
    }

    pub fn has_kind(&self, kind: KindInfo) -> Result<bool> {
        Ok(self.resolve(kind)?.is_some())
    }

    /// Direct lookup by identifier. Fails with `UnknownComponent` if `id` is
    /// not registered.
    pub fn has_id(&self, id: &str) -> Result<bool> {
        if !self.registry.is_known(id) {
            return Err(EcsError::UnknownComponent(id.to_string()));
        }
        Ok(self.components.contains_key(id))
    }

    /// Identifier of the component on this entity that satisfies `kind`.
    fn resolve(&self, kind: KindInfo) -> Result<Option<&'static str>> {
        let descriptor = self.registry.descriptor(kind).ok_or_else(|| not_a_kind(kind))?;
        Ok(match descriptor.identifier() {
            Some(id) => self.components.contains_key(id).then_some(id),
            None => self
                .registry
                .derived_identifiers(kind)
                .into_iter()
                .find(|id| self.components.contains_key(id)),
        })
    }

    fn resolve_present(&self, kind: KindInfo) -> Result<&'static str> {
        self.resolve(kind)?
            .ok_or_else(|| EcsError::ComponentNotPresent(kind.short_name().to_string()))
    }

    // ── access ──────────────────────────────────────────────────────────

    pub fn get<T: ComponentKind>(&self) -> Result<&T> {
        let id = self.resolve_present(KindInfo::of::<T>())?;
        self.components
            .get(id)
            .and_then(|component| downcast_ref::<T>(component.as_ref()))
            .ok_or_else(|| EcsError::ComponentNotPresent(id.to_string()))
    }

    pub fn get_mut<T: ComponentKind>(&mut self) -> Result<&mut T> {
        let id = self.resolve_present(KindInfo::of::<T>())?;
        self.components
            .get_mut(id)
            .and_then(|component| downcast_mut::<T>(component.as_mut()))
            .ok_or_else(|| EcsError::ComponentNotPresent(id.to_string()))
    }

    /// The component satisfying `kind`, which may be abstract.
    pub fn get_kind(&self, kind: KindInfo) -> Result<&(dyn Component + 'static)> {
        let id = self.resolve_present(kind)?;
        self.get_by_id(id)
    }

    pub fn get_by_id(&self, id: &str) -> Result<&(dyn Component + 'static)> {
        if !self.has_id(id)? {
            return Err(EcsError::ComponentNotPresent(id.to_string()));
        }
        self.components
            .get(id)
            .map(|component| component.as_ref())
            .ok_or_else(|| EcsError::ComponentNotPresent(id.to_string()))
    }

    pub fn get_by_id_mut(&mut self, id: &str) -> Result<&mut (dyn Component + 'static)> {
        if !self.has_id(id)? {
            return Err(EcsError::ComponentNotPresent(id.to_string()));
        }
        self.components
            .get_mut(id)
            .map(|component| component.as_mut())
            .ok_or_else(|| EcsError::ComponentNotPresent(id.to_string()))
    }

    /// The data fragment of abstract kind `A`, read from whichever
    /// specialization this entity holds.
    pub fn shared<A: AbstractComponent>(&self) -> Result<&A::Shared> {
        let kind = KindInfo::of::<A>();
        self.get_kind(kind)?
            .shared()
            .and_then(|shared| shared.downcast_ref::<A::Shared>())
            .ok_or_else(|| not_a_kind(kind))
    }

    pub fn shared_mut<A: AbstractComponent>(&mut self) -> Result<&mut A::Shared> {
        let kind = KindInfo::of::<A>();
        let id = self.resolve_present(kind)?;
        self.get_by_id_mut(id)?
            .shared_mut()
            .and_then(|shared| shared.downcast_mut::<A::Shared>())
            .ok_or_else(|| not_a_kind(kind))
    }

    // ── mutation ────────────────────────────────────────────────────────

    /// Attach a component. Fails if this entity already holds one with the
    /// same identifier.
    pub fn add<T: ComponentKind>(&mut self, component: T) -> Result<()> {
        self.add_boxed(T::IDENTIFIER, Box::new(component))
    }

    /// Attach an erased component under `id`.
    ///
    /// Besides unknown and duplicate identifiers, this rejects a component
    /// whose own identifier differs from `id`, and a second specialization of
    /// an abstract kind already represented on this entity.
    pub fn add_boxed(&mut self, id: &str, component: Box<dyn Component>) -> Result<()> {
        let key = self.checked_key(id, component.as_ref())?;
        if self.components.contains_key(key) {
            return Err(EcsError::InvalidArgument(format!(
                "entity {} already has component \"{key}\"",
                self.id
            )));
        }
        self.components.insert(key, component);
        Ok(())
    }

    pub fn remove<T: ComponentKind>(&mut self) -> Result<T> {
        let removed = self.remove_by_id(T::IDENTIFIER)?;
        removed
            .into_any()
            .downcast::<T>()
            .map(|component| *component)
            .map_err(|_| {
                EcsError::InvalidArgument(format!(
                    "component \"{}\" is not a `{}`",
                    T::IDENTIFIER,
                    KindInfo::of::<T>().short_name()
                ))
            })
    }

    /// Detach and return the component stored under `id`.
    pub fn remove_by_id(&mut self, id: &str) -> Result<Box<dyn Component>> {
        if !self.has_id(id)? {
            return Err(EcsError::ComponentNotPresent(id.to_string()));
        }
        self.components
            .remove(id)
            .ok_or_else(|| EcsError::ComponentNotPresent(id.to_string()))
    }

    /// Attach `component`, dropping any previous one with the same identifier.
    pub fn replace<T: ComponentKind>(&mut self, component: T) -> Result<()> {
        self.replace_boxed(T::IDENTIFIER, Box::new(component))
            .map(|_| ())
    }

    /// Like [`add_boxed`](Self::add_boxed) but an existing component under
    /// `id` is swapped out and returned.
    pub fn replace_boxed(
        &mut self,
        id: &str,
        component: Box<dyn Component>,
    ) -> Result<Option<Box<dyn Component>>> {
        let key = self.checked_key(id, component.as_ref())?;
        Ok(self.components.insert(key, component))
    }

    fn checked_key(&self, id: &str, component: &dyn Component) -> Result<&'static str> {
        let key = self
            .registry
            .intern(id)
            .ok_or_else(|| EcsError::UnknownComponent(id.to_string()))?;
        if component.identifier() != key {
            return Err(EcsError::InvalidArgument(format!(
                "component \"{}\" cannot be stored as \"{key}\"",
                component.identifier()
            )));
        }
        if let Some(existing) = self.conflict_for(key) {
            return Err(EcsError::InvalidArgument(format!(
                "entity {} already has \"{existing}\", which specializes the same kind as \"{key}\"",
                self.id
            )));
        }
        Ok(key)
    }

    /// A different specialization of `id`'s abstract kind held by this entity.
    pub(crate) fn conflict_for(&self, id: &str) -> Option<&'static str> {
        let base = self.registry.kind_for(id).ok()?.base()?;
        self.registry
            .derived_identifiers(base)
            .into_iter()
            .find(|other| *other != id && self.components.contains_key(other))
    }

    // ── iteration ───────────────────────────────────────────────────────

    /// All components, in no particular order.
    pub fn components(&self) -> impl Iterator<Item = (&'static str, &dyn Component)> {
        self.components
            .iter()
            .map(|(id, component)| (*id, component.as_ref()))
    }

    /// Identifiers of all components, sorted.
    pub fn component_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.components.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("components", &self.component_ids())
            .finish()
    }
}

fn not_a_kind(kind: KindInfo) -> EcsError {
    EcsError::InvalidArgument(format!("`{}` is not a component kind", kind.name()))
}

/// Shared handle to an entity in the live population.
#[derive(Clone)]
pub struct EntityRef {
    id: EntityId,
    cell: Rc<RefCell<Entity>>,
}

impl EntityRef {
    pub(crate) fn new(entity: Entity) -> Self {
        Self {
            id: entity.id(),
            cell: Rc::new(RefCell::new(entity)),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Panics if the entity is currently borrowed mutably.
    pub fn borrow(&self) -> Ref<'_, Entity> {
        self.cell.borrow()
    }

    /// Panics if the entity is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Entity> {
        self.cell.borrow_mut()
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityRef {}

impl Hash for EntityRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(entity) => fmt::Debug::fmt(&*entity, f),
            Err(_) => write!(f, "{:?} <borrowed>", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::testing::{Birdlike, ComponentX, ComponentY, Creature, Vitals, Wolfish, registry};

    fn entity() -> Entity {
        Entity::new(registry(), "test")
    }

    #[test]
    fn new_entities_have_distinct_ids() {
        let a = entity();
        let b = entity();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.component_count(), 0);
        assert_eq!(a.type_name(), "test");
    }

    #[test]
    fn has_by_kind_matches_has_by_identifier() {
        let mut e = entity();
        e.add(ComponentX { value: 1 }).unwrap();

        assert!(e.has::<ComponentX>().unwrap());
        assert!(e.has_id("component_x").unwrap());
        assert!(!e.has::<ComponentY>().unwrap());
        assert!(!e.has_id("component_y").unwrap());
    }

    #[test]
    fn has_rejects_unregistered_kinds_and_ids() {
        let e = entity();
        assert!(matches!(e.has::<String>(), Err(EcsError::InvalidArgument(_))));
        assert!(matches!(e.has_id("dragon"), Err(EcsError::UnknownComponent(_))));
    }

    #[test]
    fn abstract_kind_matches_any_specialization() {
        let mut e = entity();
        assert!(!e.has::<Creature>().unwrap());

        e.add(Birdlike {
            vitals: Vitals { health: 4 },
            wingspan: 9,
        })
        .unwrap();
        assert!(e.has::<Creature>().unwrap());
        assert_eq!(e.get_kind(KindInfo::of::<Creature>()).unwrap().identifier(), "birdlike");
        assert_eq!(e.shared::<Creature>().unwrap().health, 4);

        e.shared_mut::<Creature>().unwrap().health -= 1;
        assert_eq!(e.get::<Birdlike>().unwrap().vitals.health, 3);
    }

    #[test]
    fn second_specialization_is_rejected() {
        let mut e = entity();
        e.add(Wolfish::default()).unwrap();
        let err = e.add(Birdlike::default()).unwrap_err();
        assert!(matches!(err, EcsError::InvalidArgument(_)));
        assert!(!e.has::<Birdlike>().unwrap());
    }

    #[test]
    fn get_returns_the_stored_component() {
        let mut e = entity();
        e.add(ComponentX { value: 5 }).unwrap();
        assert_eq!(e.get::<ComponentX>().unwrap().value, 5);
        assert_eq!(e.get_by_id("component_x").unwrap().identifier(), "component_x");

        e.get_mut::<ComponentX>().unwrap().value = 6;
        assert_eq!(e.get::<ComponentX>().unwrap(), &ComponentX { value: 6 });

        assert!(matches!(e.get::<ComponentY>(), Err(EcsError::ComponentNotPresent(_))));
        assert!(matches!(e.get_by_id("nope"), Err(EcsError::UnknownComponent(_))));
    }

    #[test]
    fn double_add_fails_without_touching_state() {
        let mut e = entity();
        e.add(ComponentX { value: 1 }).unwrap();
        let err = e.add(ComponentX { value: 2 }).unwrap_err();
        assert!(matches!(err, EcsError::InvalidArgument(_)));
        assert_eq!(e.get::<ComponentX>().unwrap().value, 1);
    }

    #[test]
    fn add_boxed_checks_identifier_against_key() {
        let mut e = entity();
        let err = e
            .add_boxed("component_y", Box::new(ComponentX::default()))
            .unwrap_err();
        assert!(matches!(err, EcsError::InvalidArgument(_)));

        let err = e.add_boxed("dragon", Box::new(ComponentX::default())).unwrap_err();
        assert!(matches!(err, EcsError::UnknownComponent(_)));
    }

    #[test]
    fn remove_returns_component() {
        let mut e = entity();
        e.add(ComponentX { value: 8 }).unwrap();
        let removed = e.remove::<ComponentX>().unwrap();
        assert_eq!(removed.value, 8);
        assert!(!e.has::<ComponentX>().unwrap());

        assert!(matches!(
            e.remove::<ComponentX>(),
            Err(EcsError::ComponentNotPresent(_))
        ));
        assert!(matches!(e.remove_by_id("dragon"), Err(EcsError::UnknownComponent(_))));
    }

    #[test]
    fn replace_is_idempotent_with_respect_to_presence() {
        let mut e = entity();
        e.replace(ComponentX { value: 1 }).unwrap();
        e.replace(ComponentX { value: 2 }).unwrap();
        assert_eq!(e.component_count(), 1);
        assert_eq!(e.get::<ComponentX>().unwrap().value, 2);

        let previous = e
            .replace_boxed("component_x", Box::new(ComponentX { value: 3 }))
            .unwrap()
            .unwrap();
        assert_eq!(downcast_ref::<ComponentX>(previous.as_ref()).unwrap().value, 2);
    }

    #[test]
    fn entity_ref_compares_by_id() {
        let handle = EntityRef::new(entity());
        let copy = handle.clone();
        assert_eq!(handle, copy);
        assert_ne!(handle, EntityRef::new(entity()));

        copy.borrow_mut().add(ComponentY { value: 1 }).unwrap();
        assert!(handle.borrow().has::<ComponentY>().unwrap());
    }
}
