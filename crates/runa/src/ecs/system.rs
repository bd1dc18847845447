//! # System: Per-Tick Consumers of Query Snapshots
//!
//! A system declares which entities it cares about through a fixed list of
//! [`Filter`]s. Every tick it receives a fresh snapshot of the matching live
//! entities and does its work in [`update`](System::update).
//!
//! ```text
//! tick(elapsed)
//!   └─► manager.all_entities().filter(filters) ──► update(manager, elapsed, snapshot)
//! ```
//!
//! ## Observers
//!
//! An [`ObserverSystem`] also remembers the previous tick's snapshot and
//! reports the difference before updating:
//!
//! ```text
//! tick 1: {A, B}   added A, added B, update
//! tick 2: {B, C}   removed A, added C, update
//! ```
//!
//! All removals are reported before any addition, so resources tied to a
//! removed entity can be released before new ones are claimed.
//!
//! ## Schedule
//!
//! A [`Schedule`] is a `Vec` of boxed systems ticked in the order they were
//! added. No parallelism and no dependency graph.

use std::collections::HashSet;

use super::component::short_type_name;
use super::entity::{EntityId, EntityRef};
use super::manager::EntityManager;
use super::query::{Filter, QueryResult};
use crate::error::Result;

/// Simulation time units passed to each tick.
pub type Ticks = u64;

pub trait System {
    /// Filters every entity handed to [`update`](Self::update) satisfies.
    fn filters(&self) -> &[Filter] {
        &[]
    }

    fn update(
        &mut self,
        manager: &mut EntityManager,
        elapsed: Ticks,
        entities: &QueryResult,
    ) -> Result<()>;

    /// Snapshot the matching live entities and call [`update`](Self::update).
    fn tick(&mut self, manager: &mut EntityManager, elapsed: Ticks) -> Result<()> {
        let entities = manager.all_entities().filter(self.filters())?;
        self.update(manager, elapsed, &entities)
    }
}

/// Any `FnMut(&mut EntityManager, Ticks, &QueryResult) -> Result<()>` is a
/// system without filters: it sees the whole live population.
impl<F> System for F
where
    F: FnMut(&mut EntityManager, Ticks, &QueryResult) -> Result<()>,
{
    fn update(
        &mut self,
        manager: &mut EntityManager,
        elapsed: Ticks,
        entities: &QueryResult,
    ) -> Result<()> {
        (self)(manager, elapsed, entities)
    }
}

/// Game logic that wants to know when entities start or stop matching its
/// filters. Wrap it in an [`ObserverSystem`] to run it.
pub trait Observer {
    fn filters(&self) -> &[Filter];

    /// An entity matched on the previous tick and no longer does, or was
    /// destroyed.
    fn on_entity_removed(&mut self, manager: &mut EntityManager, entity: &EntityRef)
    -> Result<()>;

    /// An entity matches that did not on the previous tick. On the first tick
    /// every match is reported.
    fn on_entity_added(&mut self, manager: &mut EntityManager, entity: &EntityRef) -> Result<()>;

    fn update(
        &mut self,
        _manager: &mut EntityManager,
        _elapsed: Ticks,
        _entities: &QueryResult,
    ) -> Result<()> {
        Ok(())
    }
}

/// Runs an [`Observer`], diffing each tick's snapshot against the last one.
pub struct ObserverSystem<O> {
    observer: O,
    last: Option<QueryResult>,
}

impl<O: Observer> ObserverSystem<O> {
    pub fn new(observer: O) -> Self {
        Self {
            observer,
            last: None,
        }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// The snapshot taken by the most recent tick.
    pub fn last_result(&self) -> Option<&QueryResult> {
        self.last.as_ref()
    }
}

impl<O: Observer> System for ObserverSystem<O> {
    fn filters(&self) -> &[Filter] {
        self.observer.filters()
    }

    fn update(
        &mut self,
        manager: &mut EntityManager,
        elapsed: Ticks,
        entities: &QueryResult,
    ) -> Result<()> {
        self.observer.update(manager, elapsed, entities)
    }

    fn tick(&mut self, manager: &mut EntityManager, elapsed: Ticks) -> Result<()> {
        let current = manager.all_entities().filter(self.observer.filters())?;
        let now: HashSet<EntityId> = current.ids().into_iter().collect();
        let before: HashSet<EntityId> = self
            .last
            .as_ref()
            .map(|last| last.ids().into_iter().collect())
            .unwrap_or_default();

        // The previous snapshot is kept until every hook succeeded, so a
        // failed tick is reported again on the next one.
        if let Some(previous) = &self.last {
            for entity in previous.iter().filter(|e| !now.contains(&e.id())) {
                self.observer.on_entity_removed(manager, entity)?;
            }
        }
        for entity in current.iter().filter(|e| !before.contains(&e.id())) {
            self.observer.on_entity_added(manager, entity)?;
        }

        let current = self.last.insert(current);
        self.observer.update(manager, elapsed, current)
    }
}

/// A boxed [`System`] with a short name for logs and diagnostics.
struct NamedSystem {
    name: String,
    system: Box<dyn System>,
}

/// Per-system timing recorded during a single tick.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub name: String,
    pub duration_us: f64,
}

/// An ordered list of systems to tick.
pub struct Schedule {
    systems: Vec<NamedSystem>,
    /// Per-system timings from the most recent `tick()` call.
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    /// Add a system to the end of the schedule.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(NamedSystem {
            name: short_system_name(std::any::type_name::<S>()),
            system: Box::new(system),
        });
    }

    /// Tick all systems in order. Stops at the first system that fails.
    pub fn tick(&mut self, manager: &mut EntityManager, elapsed: Ticks) -> Result<()> {
        #[cfg(feature = "diagnostics")]
        self.timings.clear();

        for ns in &mut self.systems {
            #[cfg(feature = "diagnostics")]
            let start = std::time::Instant::now();

            ns.system.tick(manager, elapsed).inspect_err(|err| {
                log::error!("System `{}` failed: {err}", ns.name);
            })?;

            #[cfg(feature = "diagnostics")]
            self.timings.push(SystemTiming {
                name: ns.name.clone(),
                duration_us: start.elapsed().as_secs_f64() * 1_000_000.0,
            });
        }
        Ok(())
    }

    /// Timings from the most recent [`tick`](Self::tick), in schedule order.
    #[cfg(feature = "diagnostics")]
    pub fn timings(&self) -> &[SystemTiming] {
        &self.timings
    }

    /// Names of the scheduled systems, in order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|ns| ns.name.as_str()).collect()
    }

    /// Returns the number of systems in this schedule.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the module path from a fully-qualified type name, keeping generic
/// arguments (`game::ObserverSystem<game::Spawner>` → `ObserverSystem<game::Spawner>`,
/// `{{closure}}` → `<closure>`).
fn short_system_name(full: &'static str) -> String {
    let name = short_type_name(full);
    if name.contains("{{closure}}") {
        "<closure>".to_string()
    } else {
        name.to_string()
    }
}
