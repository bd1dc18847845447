//! # Component Registry: Identifier ↔ Kind Mapping
//!
//! The registry is built once from an explicit list of kinds and is immutable
//! afterwards. Entities share it through an `Arc` so that they can answer
//! identifier and abstract-kind queries without reaching for global state.
//!
//! ```text
//! by_identifier: "wolfish"  ──► TypeId(Wolfish)
//!                "birdlike" ──► TypeId(Birdlike)
//! kinds:         TypeId(Wolfish)  ──► concrete, base = Creature
//!                TypeId(Birdlike) ──► concrete, base = Creature
//!                TypeId(Creature) ──► abstract
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use super::component::{AbstractComponent, Component, ComponentKind, KindInfo};
use crate::error::{EcsError, Result};

type Factory = fn() -> Box<dyn Component>;

/// Everything the registry knows about one component kind.
#[derive(Clone)]
pub struct KindDescriptor {
    info: KindInfo,
    identifier: Option<&'static str>,
    base: Option<KindInfo>,
    factory: Option<Factory>,
}

impl KindDescriptor {
    /// Describe a concrete kind.
    pub fn concrete<T: ComponentKind>() -> Self {
        Self {
            info: KindInfo::of::<T>(),
            identifier: Some(T::IDENTIFIER),
            base: T::base(),
            factory: Some(|| -> Box<dyn Component> { Box::new(T::default()) }),
        }
    }

    /// Describe an abstract kind.
    pub fn abstract_kind<A: AbstractComponent>() -> Self {
        Self {
            info: KindInfo::of::<A>(),
            identifier: None,
            base: None,
            factory: None,
        }
    }

    pub fn info(&self) -> KindInfo {
        self.info
    }

    /// Identifier of a concrete kind; `None` for abstract kinds.
    pub fn identifier(&self) -> Option<&'static str> {
        self.identifier
    }

    pub fn base(&self) -> Option<KindInfo> {
        self.base
    }

    pub fn is_abstract(&self) -> bool {
        self.identifier.is_none()
    }

    /// Allocate an empty instance. Abstract kinds cannot be instantiated.
    pub fn instantiate(&self) -> Option<Box<dyn Component>> {
        self.factory.map(|factory| factory())
    }

    /// Human-readable name: the identifier, or the short type name for
    /// abstract kinds.
    fn label(&self) -> &'static str {
        self.identifier.unwrap_or_else(|| self.info.short_name())
    }
}

impl fmt::Debug for KindDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindDescriptor")
            .field("kind", &self.info.name())
            .field("identifier", &self.identifier)
            .field("base", &self.base.map(KindInfo::name))
            .finish()
    }
}

/// All component kinds known to the program.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    kinds: HashMap<TypeId, KindDescriptor>,
    by_identifier: HashMap<&'static str, TypeId>,
}

impl ComponentRegistry {
    /// Build the registry from every kind the program declares.
    ///
    /// Fails if a kind or identifier is listed twice, or if a concrete kind
    /// names a base that is unregistered or itself concrete. Only abstract
    /// kinds may be extended.
    pub fn register_discovered_kinds<I>(kinds: I) -> Result<Self>
    where
        I: IntoIterator<Item = KindDescriptor>,
    {
        let mut registry = Self::default();

        for descriptor in kinds {
            let type_id = descriptor.info.type_id();
            if registry.kinds.contains_key(&type_id) {
                log::error!("Component kind `{}` was registered twice", descriptor.info.name());
                return Err(EcsError::DuplicateComponent(descriptor.label().to_string()));
            }
            if let Some(id) = descriptor.identifier {
                if registry.by_identifier.contains_key(id) {
                    log::error!(
                        "Component identifier \"{id}\" is used by more than one kind (`{}`)",
                        descriptor.info.name()
                    );
                    return Err(EcsError::DuplicateComponent(id.to_string()));
                }
                registry.by_identifier.insert(id, type_id);
                log::debug!("Found component \"{id}\"");
            }
            registry.kinds.insert(type_id, descriptor);
        }

        // Bases are checked once everything is in, so kinds may be listed in any order.
        for descriptor in registry.kinds.values() {
            let Some(base) = descriptor.base else {
                continue;
            };
            match registry.kinds.get(&base.type_id()) {
                None => {
                    log::error!(
                        "Component \"{}\" derives from unregistered kind `{}`",
                        descriptor.label(),
                        base.name()
                    );
                    return Err(EcsError::UnknownComponent(base.short_name().to_string()));
                }
                Some(base_descriptor) if !base_descriptor.is_abstract() => {
                    log::error!(
                        "Non-abstract component was used as base kind: \"{}\" derives from \"{}\"",
                        descriptor.label(),
                        base_descriptor.label()
                    );
                    log::info!("Using non-abstract components as base kinds is not supported");
                    return Err(EcsError::ConcreteBase {
                        kind: descriptor.label().to_string(),
                        base: base_descriptor.label().to_string(),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(registry)
    }

    /// Returns `true` if a concrete kind with this identifier exists.
    pub fn is_known(&self, id: &str) -> bool {
        self.by_identifier.contains_key(id)
    }

    /// Look up the concrete kind registered under `id`.
    pub fn kind_for(&self, id: &str) -> Result<&KindDescriptor> {
        self.by_identifier
            .get(id)
            .and_then(|type_id| self.kinds.get(type_id))
            .ok_or_else(|| EcsError::UnknownComponent(id.to_string()))
    }

    /// Returns `true` for registered kinds, concrete or abstract.
    pub fn is_component(&self, kind: KindInfo) -> bool {
        self.kinds.contains_key(&kind.type_id())
    }

    pub fn is_concrete_component(&self, kind: KindInfo) -> bool {
        self.descriptor(kind).is_some_and(|d| !d.is_abstract())
    }

    pub fn descriptor(&self, kind: KindInfo) -> Option<&KindDescriptor> {
        self.kinds.get(&kind.type_id())
    }

    /// The concrete kinds a query for `kind` matches: `kind` itself if it is
    /// concrete, plus every concrete kind specializing it. Sorted by identifier.
    pub fn derived_from(&self, kind: KindInfo) -> Vec<&KindDescriptor> {
        let mut derived: Vec<&KindDescriptor> = self
            .kinds
            .values()
            .filter(|d| !d.is_abstract())
            .filter(|d| d.info == kind || d.base == Some(kind))
            .collect();
        derived.sort_by_key(|d| d.identifier);
        derived
    }

    /// Identifiers of [`derived_from`](Self::derived_from).
    pub fn derived_identifiers(&self, kind: KindInfo) -> Vec<&'static str> {
        self.derived_from(kind)
            .into_iter()
            .filter_map(|d| d.identifier)
            .collect()
    }

    /// Identifier of a concrete kind.
    pub fn identifier_of(&self, kind: KindInfo) -> Result<&'static str> {
        self.descriptor(kind)
            .and_then(|d| d.identifier)
            .ok_or_else(|| {
                EcsError::InvalidArgument(format!(
                    "`{}` is not a non-abstract component kind",
                    kind.name()
                ))
            })
    }

    /// Allocate an empty component of the kind registered under `id`.
    pub fn instantiate(&self, id: &str) -> Result<Box<dyn Component>> {
        let descriptor = self.kind_for(id)?;
        descriptor.instantiate().ok_or_else(|| {
            log::error!("Could not create instance of component \"{id}\"");
            EcsError::UnknownComponent(id.to_string())
        })
    }

    /// The `'static` identifier equal to `id`, if registered.
    pub(crate) fn intern(&self, id: &str) -> Option<&'static str> {
        self.by_identifier
            .get_key_value(id)
            .map(|(interned, _)| *interned)
    }

    /// All registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.by_identifier.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered kinds, abstract ones included.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::ecs::testing::{Birdlike, ComponentX, ComponentY, Creature, Wolfish};

    #[test]
    fn discovers_concrete_and_abstract_kinds() {
        let registry = crate::ecs::testing::registry();
        assert!(registry.is_known("component_x"));
        assert!(registry.is_known("wolfish"));
        assert!(!registry.is_known("dragon"));

        assert!(registry.is_component(KindInfo::of::<Creature>()));
        assert!(!registry.is_concrete_component(KindInfo::of::<Creature>()));
        assert!(registry.is_concrete_component(KindInfo::of::<ComponentX>()));
        assert!(!registry.is_component(KindInfo::of::<String>()));
    }

    #[test]
    fn kind_for_unknown_identifier_fails() {
        let registry = crate::ecs::testing::registry();
        let descriptor = registry.kind_for("component_y").unwrap();
        assert_eq!(descriptor.info(), KindInfo::of::<ComponentY>());

        let err = registry.kind_for("dragon").unwrap_err();
        assert!(matches!(err, EcsError::UnknownComponent(id) if id == "dragon"));
    }

    #[test]
    fn derived_from_resolves_abstract_kinds() {
        let registry = crate::ecs::testing::registry();
        assert_eq!(
            registry.derived_identifiers(KindInfo::of::<Creature>()),
            vec!["birdlike", "wolfish"]
        );
        assert_eq!(
            registry.derived_identifiers(KindInfo::of::<Wolfish>()),
            vec!["wolfish"]
        );
        assert!(registry.derived_identifiers(KindInfo::of::<u8>()).is_empty());
    }

    #[test]
    fn identifier_of_requires_concrete_component() {
        let registry = crate::ecs::testing::registry();
        assert_eq!(
            registry.identifier_of(KindInfo::of::<Birdlike>()).unwrap(),
            "birdlike"
        );
        assert!(matches!(
            registry.identifier_of(KindInfo::of::<Creature>()),
            Err(EcsError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.identifier_of(KindInfo::of::<String>()),
            Err(EcsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn instantiate_returns_empty_component() {
        let registry = crate::ecs::testing::registry();
        let component = registry.instantiate("component_x").unwrap();
        assert_eq!(component.identifier(), "component_x");
        assert!(registry.instantiate("nope").is_err());
    }

    #[test]
    fn duplicate_identifier_is_rejected() {
        #[derive(Debug, Default, Deserialize)]
        struct Impostor;
        crate::impl_component!(Impostor, "component_x");

        let err = ComponentRegistry::register_discovered_kinds([
            KindDescriptor::concrete::<ComponentX>(),
            KindDescriptor::concrete::<Impostor>(),
        ])
        .unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent(id) if id == "component_x"));
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let err = ComponentRegistry::register_discovered_kinds([
            KindDescriptor::abstract_kind::<Creature>(),
            KindDescriptor::abstract_kind::<Creature>(),
        ])
        .unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent(_)));
    }

    #[test]
    fn concrete_base_is_rejected() {
        // Both instantiable and extendable, which the registry does not allow.
        #[derive(Debug, Default, Deserialize)]
        struct Hybrid;
        crate::impl_component!(Hybrid, "hybrid");
        impl AbstractComponent for Hybrid {
            type Shared = i64;
        }

        #[derive(Debug, Default, Deserialize)]
        struct Pup {
            #[serde(default)]
            inner: i64,
        }
        crate::impl_component!(Pup, "pup", extends Hybrid => inner);

        let err = ComponentRegistry::register_discovered_kinds([
            KindDescriptor::concrete::<Pup>(),
            KindDescriptor::concrete::<Hybrid>(),
        ])
        .unwrap_err();
        assert!(
            matches!(err, EcsError::ConcreteBase { ref kind, ref base } if kind == "pup" && base == "hybrid")
        );
    }

    #[test]
    fn unregistered_base_is_rejected() {
        let err =
            ComponentRegistry::register_discovered_kinds([KindDescriptor::concrete::<Wolfish>()])
                .unwrap_err();
        assert!(matches!(err, EcsError::UnknownComponent(name) if name == "Creature"));
    }

    #[test]
    fn registration_order_does_not_matter() {
        let registry = ComponentRegistry::register_discovered_kinds([
            KindDescriptor::concrete::<Wolfish>(),
            KindDescriptor::abstract_kind::<Creature>(),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.identifiers(), vec!["wolfish"]);
    }
}
