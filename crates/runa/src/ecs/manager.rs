//! # Entity Manager: Types In, Entities Out
//!
//! The manager owns three tables:
//!
//! ```text
//! types:    "elite_wolf" ──► EntityType { components, bases: ["wolf"] }
//! nodes:    "elite_wolf" ──► raw JSON object (component sub-nodes live here)
//! entities: EntityId     ──► EntityRef (the live population)
//! ```
//!
//! The first two are filled once, while loading, and never change afterwards.
//! Loading goes through [`EntityManagerBuilder`]; only
//! [`build`](EntityManagerBuilder::build) produces a manager, and it refuses
//! to do so while any `inherits_from` entry points at a type that does not
//! exist.
//!
//! ## Construction Order
//!
//! A type's own components are populated first, then each base in declaration
//! order, depth-first. Every component in the resolved chain must have a
//! distinct identifier:
//!
//! ```text
//! elite_wolf { component_y }      1. component_y  (from elite_wolf's node)
//!   └── wolf { component_x }      2. component_x  (from wolf's node)
//! ```
//!
//! A component declared twice along the chain is an error, even when both
//! declarations come from one shared grandparent reached by two paths.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::component::KindInfo;
use super::entity::{Entity, EntityId, EntityRef};
use super::query::QueryResult;
use super::registry::{ComponentRegistry, KindDescriptor};
use super::schema::EntityType;
use crate::config::ManagerConfig;
use crate::error::{DataShapeError, DependencyFault, EcsError, Result};

/// Loads entity types, constructs entities and owns the live population.
#[derive(Debug)]
pub struct EntityManager {
    registry: Arc<ComponentRegistry>,
    types: HashMap<String, EntityType>,
    nodes: HashMap<String, Map<String, Value>>,
    entities: HashMap<EntityId, EntityRef>,
}

impl EntityManager {
    /// Register `kinds`, load every entity type file the configuration points
    /// at and validate the inheritance graph.
    ///
    /// ```ignore
    /// let manager = EntityManager::initialize(
    ///     [KindDescriptor::concrete::<Lifetime>()],
    ///     &ManagerConfig::new("assets/entities"),
    /// )?;
    /// ```
    pub fn initialize<I>(kinds: I, config: &ManagerConfig) -> Result<Self>
    where
        I: IntoIterator<Item = KindDescriptor>,
    {
        let registry = Arc::new(ComponentRegistry::register_discovered_kinds(kinds)?);
        config
            .entity_dirs
            .iter()
            .try_fold(Self::builder(registry), |builder, dir| {
                builder.load_dir(dir, config)
            })?
            .build()
    }

    /// Start loading entity types by hand.
    pub fn builder(registry: Arc<ComponentRegistry>) -> EntityManagerBuilder {
        EntityManagerBuilder {
            registry,
            types: HashMap::new(),
            nodes: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    // ── entity types ────────────────────────────────────────────────────

    pub fn has_entity_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn entity_type(&self, name: &str) -> Option<&EntityType> {
        self.types.get(name)
    }

    /// All loaded entity types, templates included, sorted by name.
    pub fn entity_types(&self) -> Vec<&EntityType> {
        let mut types: Vec<_> = self.types.values().collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        types
    }

    /// Every non-template type that directly declares a component of kind `K`
    /// (or, for an abstract `K`, any of its specializations).
    pub fn types_with<K: 'static>(&self) -> Result<Vec<&EntityType>> {
        self.types_with_kind(KindInfo::of::<K>())
    }

    pub fn types_with_kind(&self, kind: KindInfo) -> Result<Vec<&EntityType>> {
        if !self.registry.is_component(kind) {
            return Err(EcsError::InvalidArgument(format!(
                "`{}` is not a component kind",
                kind.name()
            )));
        }
        let ids = self.registry.derived_identifiers(kind);
        let mut matching: Vec<_> = self
            .types
            .values()
            .filter(|ty| !ty.is_template())
            .filter(|ty| ids.iter().any(|id| ty.declares(id)))
            .collect();
        matching.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(matching)
    }

    // ── construction ────────────────────────────────────────────────────

    /// Build an entity of `type_name` and add it to the live population.
    pub fn construct(&mut self, type_name: &str) -> Result<EntityRef> {
        let entity = self.build_entity(type_name)?;
        let handle = EntityRef::new(entity);
        log::debug!(
            "Constructed entity {} of type \"{type_name}\"",
            handle.id()
        );
        self.entities.insert(handle.id(), handle.clone());
        Ok(handle)
    }

    /// Build an entity of `type_name` without adding it to the live
    /// population. Queries never see it and it cannot be destroyed by id.
    pub fn construct_temporary(&self, type_name: &str) -> Result<Entity> {
        self.build_entity(type_name)
    }

    /// A temporary entity of every type [`types_with`](Self::types_with)
    /// returns for `K`.
    pub fn construct_temporaries<K: 'static>(&self) -> Result<Vec<Entity>> {
        self.types_with::<K>()?
            .into_iter()
            .map(|ty| self.construct_temporary(ty.name()))
            .collect()
    }

    fn build_entity(&self, type_name: &str) -> Result<Entity> {
        let Some(ty) = self.types.get(type_name) else {
            log::error!("Tried to construct unknown entity type \"{type_name}\"");
            return Err(EcsError::UnknownEntityType {
                name: type_name.to_string(),
                reason: "no such entity type",
            });
        };
        if ty.is_template() {
            log::error!("Tried to construct template type \"{type_name}\"");
            return Err(EcsError::UnknownEntityType {
                name: type_name.to_string(),
                reason: "templates cannot be constructed",
            });
        }

        let mut entity = Entity::new(Arc::clone(&self.registry), type_name);
        let mut chain = Vec::new();
        self.populate(&mut entity, ty, &mut chain)?;
        Ok(entity)
    }

    /// Populate `ty`'s own components, then recurse into its bases.
    /// `chain` holds the types currently being populated.
    fn populate<'a>(
        &'a self,
        entity: &mut Entity,
        ty: &'a EntityType,
        chain: &mut Vec<&'a str>,
    ) -> Result<()> {
        if chain.contains(&ty.name()) {
            log::error!(
                "Entity type \"{}\" inherits from itself through \"{}\"",
                entity.type_name(),
                ty.name()
            );
            return Err(dependency_error(
                entity,
                DependencyFault::Cycle(ty.name().to_string()),
            ));
        }
        chain.push(ty.name());

        let node = self.nodes.get(ty.name());
        for &id in ty.components() {
            if entity.has_id(id)? {
                log::error!(
                    "Found duplicate component type \"{id}\" in entity type \"{}\" while constructing \"{}\"",
                    ty.name(),
                    entity.type_name()
                );
                log::info!("This could indicate a circular dependency");
                return Err(dependency_error(
                    entity,
                    DependencyFault::DuplicateComponent(id.to_string()),
                ));
            }
            if let Some(existing) = entity.conflict_for(id) {
                log::error!(
                    "Component \"{id}\" of entity type \"{}\" conflicts with \"{existing}\" while constructing \"{}\"",
                    ty.name(),
                    entity.type_name()
                );
                return Err(dependency_error(
                    entity,
                    DependencyFault::ConflictingSpecialization {
                        component: id.to_string(),
                        existing: existing.to_string(),
                    },
                ));
            }

            // Declarations are parsed from the cached node, so the data is always there.
            let Some(data) = node.and_then(|node| node.get(id)) else {
                log::error!(
                    "Cached definition of entity type \"{}\" has no data for declared component \"{id}\"",
                    ty.name()
                );
                return Err(EcsError::Inconsistent(format!(
                    "entity type \"{}\" declares \"{id}\" but its cached definition has no such field",
                    ty.name()
                )));
            };
            let mut component = self.registry.instantiate(id)?;
            component.populate(data).map_err(|source| {
                log::error!(
                    "Could not populate component \"{id}\" of entity type \"{}\": {source}",
                    ty.name()
                );
                EcsError::DataShape {
                    component: id.to_string(),
                    source,
                }
            })?;
            entity.add_boxed(id, component)?;
        }

        for base in ty.bases() {
            let Some(base_ty) = self.types.get(base) else {
                return Err(dependency_error(
                    entity,
                    DependencyFault::MissingBase(base.clone()),
                ));
            };
            self.populate(entity, base_ty, chain)?;
        }

        chain.pop();
        Ok(())
    }

    // ── live population ─────────────────────────────────────────────────

    /// Remove an entity from the live population. Handles held elsewhere
    /// stay valid.
    pub fn destroy(&mut self, id: EntityId) -> Option<EntityRef> {
        let removed = self.entities.remove(&id);
        if removed.is_none() {
            log::warn!("Tried to destroy non-existing entity with id \"{id}\"");
        }
        removed
    }

    /// Empty the live population, returning how many entities were removed.
    pub fn destroy_all(&mut self) -> usize {
        let count = self.entities.len();
        self.entities.clear();
        count
    }

    pub fn has_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<EntityRef> {
        self.entities.get(&id).cloned()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Snapshot of the whole live population, the root of every filter chain.
    pub fn all_entities(&self) -> QueryResult {
        self.entities.values().cloned().collect()
    }
}

fn dependency_error(entity: &Entity, fault: DependencyFault) -> EcsError {
    EcsError::EntityDependency {
        entity_type: entity.type_name().to_string(),
        fault,
    }
}

/// Accumulates entity type definitions until [`build`](Self::build)
/// validates them.
#[derive(Debug)]
pub struct EntityManagerBuilder {
    registry: Arc<ComponentRegistry>,
    types: HashMap<String, EntityType>,
    nodes: HashMap<String, Map<String, Value>>,
}

impl EntityManagerBuilder {
    /// Load a JSON document from text. `origin` names it in errors.
    pub fn load_str(self, origin: &str, text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text).map_err(|source| {
            log::error!("Could not parse entity definitions in \"{origin}\": {source}");
            EcsError::Document {
                origin: origin.to_string(),
                source: source.into(),
            }
        })?;
        self.load_value(origin, document)
    }

    /// Load a document: an array of entity type objects.
    pub fn load_value(mut self, origin: &str, document: Value) -> Result<Self> {
        let Value::Array(entries) = document else {
            log::error!("Entity definitions in \"{origin}\" are not an array");
            return Err(EcsError::Document {
                origin: origin.to_string(),
                source: DataShapeError::Mismatch {
                    key: "/".to_string(),
                    expected: "an array of entity types",
                },
            });
        };

        for (index, entry) in entries.into_iter().enumerate() {
            let Value::Object(node) = entry else {
                log::warn!("Skipping entry {index} in \"{origin}\": not an object");
                continue;
            };
            let ty = EntityType::from_object(&node, &self.registry)
                .inspect_err(|err| {
                    log::error!("Invalid entity type at entry {index} in \"{origin}\": {err}");
                })?;
            let name = ty.name().to_string();
            if self.types.contains_key(&name) {
                log::error!("Entity type \"{name}\" in \"{origin}\" is already defined");
                return Err(EcsError::DuplicateEntityType(name));
            }
            log::debug!("Found entity type \"{name}\"");
            self.nodes.insert(name.clone(), node);
            self.types.insert(name, ty);
        }
        Ok(self)
    }

    pub fn load_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| {
            log::error!("Could not read \"{}\": {source}", path.display());
            EcsError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.load_str(&path.display().to_string(), &text)
    }

    /// Load every file under `dir` carrying the configured extension, in
    /// sorted path order.
    pub fn load_dir(self, dir: impl AsRef<Path>, config: &ManagerConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        collect_files(dir, config, &mut files)?;
        files.sort();
        log::debug!(
            "Loading {} entity type file(s) from \"{}\"",
            files.len(),
            dir.display()
        );
        files.iter().try_fold(self, |builder, file| builder.load_file(file))
    }

    /// Validate that every base named in `inherits_from` exists and hand
    /// over the finished manager.
    pub fn build(self) -> Result<EntityManager> {
        let mut names: Vec<&String> = self.types.keys().collect();
        names.sort();
        for name in names {
            let ty = &self.types[name];
            if let Some(missing) = ty.bases().iter().find(|base| !self.types.contains_key(*base)) {
                log::error!(
                    "Entity type \"{name}\" depends on invalid entity/template type \"{missing}\""
                );
                return Err(EcsError::EntityDependency {
                    entity_type: name.clone(),
                    fault: DependencyFault::MissingBase(missing.clone()),
                });
            }
        }

        log::debug!("Loaded {} entity types", self.types.len());
        Ok(EntityManager {
            registry: self.registry,
            types: self.types,
            nodes: self.nodes,
            entities: HashMap::new(),
        })
    }
}

fn collect_files(dir: &Path, config: &ManagerConfig, files: &mut Vec<PathBuf>) -> Result<()> {
    let io_error = |source: std::io::Error| EcsError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            if config.recursive {
                collect_files(&path, config, files)?;
            }
        } else if config.matches(&path) {
            files.push(path);
        }
    }
    Ok(())
}
