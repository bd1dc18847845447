//! Lifetime: creatures loaded from JSON age and disappear.
//!
//! Loads the entity types under `assets/entities`, constructs a few of them
//! and ticks a schedule holding the stock `LifetimeSystem` next to an observer
//! that reports creatures as they appear and vanish.
//!
//! Run with `RUST_LOG=debug` to see construction and expiry logs.

use runa::prelude::*;
use serde::Deserialize;

/// Anything with health.
struct Creature;

impl AbstractComponent for Creature {
    type Shared = Vitals;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Vitals {
    health: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Wolfish {
    #[serde(flatten)]
    vitals: Vitals,
    #[serde(default)]
    pack_size: u32,
}
impl_component!(Wolfish, "wolfish", extends Creature => vitals);

#[derive(Debug, Default, Deserialize)]
struct Birdlike {
    #[serde(flatten)]
    vitals: Vitals,
    #[serde(default)]
    wingspan: u32,
}
impl_component!(Birdlike, "birdlike", extends Creature => vitals);

#[derive(Debug, Default, Deserialize)]
struct Glyph {
    symbol: char,
}
impl_component!(Glyph, "glyph");

/// Prints creatures entering and leaving the world.
struct Census {
    filters: Vec<Filter>,
}

impl Observer for Census {
    fn filters(&self) -> &[Filter] {
        &self.filters
    }

    fn on_entity_removed(&mut self, _: &mut EntityManager, entity: &EntityRef) -> Result<()> {
        println!("  - {} left", entity.borrow().type_name());
        Ok(())
    }

    fn on_entity_added(&mut self, _: &mut EntityManager, entity: &EntityRef) -> Result<()> {
        let entity = entity.borrow();
        let health = entity.shared::<Creature>()?.health;
        let symbol = entity.get::<Glyph>().map_or('?', |glyph| glyph.symbol);
        println!("  + {} '{symbol}' arrived with {health} health", entity.type_name());
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config = ManagerConfig::new(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/entities"));
    let mut manager = EntityManager::initialize(
        [
            KindDescriptor::concrete::<Lifetime>(),
            KindDescriptor::concrete::<Glyph>(),
            KindDescriptor::abstract_kind::<Creature>(),
            KindDescriptor::concrete::<Wolfish>(),
            KindDescriptor::concrete::<Birdlike>(),
        ],
        &config,
    )?;

    for ty in manager.types_with::<Creature>()? {
        println!("creature type: {}", ty.name());
    }

    manager.construct("wolf")?;
    manager.construct("crow")?;
    manager.construct("standing_stone")?;

    let wolves = manager
        .all_entities()
        .filter(&[Filter::by_component::<Wolfish>()])?;
    for wolf in wolves.extract::<Wolfish>()? {
        println!("a pack of {}", wolf.pack_size);
    }
    let wide = manager
        .all_entities()
        .filter(&[Filter::by_predicate::<Birdlike>(|bird| bird.wingspan > 50)])?;
    println!("{} wide-winged bird(s)", wide.len());

    let mut schedule = Schedule::new();
    schedule.add_system(ObserverSystem::new(Census {
        filters: vec![Filter::by_component::<Creature>()],
    }));
    schedule.add_system(LifetimeSystem::new());

    for tick in 0..6 {
        println!("tick {tick}: {} entities", manager.entity_count());
        schedule.tick(&mut manager, 1)?;
    }

    Ok(())
}
