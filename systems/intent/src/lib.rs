#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that decides what every human and zombie wants to do this tick.

use outbreak_core::{
    CellCoord, EntityKind, EntitySnapshot, EntityView, GridSize, HumanSnapshot, Intent,
    OccupancyView, Step, SENSE_RANGE,
};
use outbreak_system_pathfinding::PathFinder;
use rand::{
    seq::{IteratorRandom, SliceRandom},
    Rng,
};
use tracing::debug;

/// Probability that a wandering human abandons its current heading.
const CHANGE_HEADING_PROBABILITY: f64 = 0.2;

/// Configuration parameters required to construct the intent system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    sense_range: u32,
}

impl Config {
    /// Creates a configuration with the provided sensing radius.
    ///
    /// Armed humans notice zombies and allies whose toroidal Manhattan
    /// distance is strictly below `sense_range`.
    #[must_use]
    pub const fn new(sense_range: u32) -> Self {
        Self { sense_range }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(SENSE_RANGE)
    }
}

/// Intent system that produces one destination per acting entity.
#[derive(Debug)]
pub struct Intentions {
    sense_range: u32,
    pathfinder: PathFinder,
}

impl Default for Intentions {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Intentions {
    /// Creates a new intent system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            sense_range: config.sense_range,
            pathfinder: PathFinder::new(),
        }
    }

    /// Appends an [`Intent`] for every zombie and every human that has not
    /// attacked this tick, visiting entities in ascending identifier order.
    pub fn handle<R>(
        &mut self,
        entities: &EntityView,
        occupancy: &OccupancyView<'_>,
        rng: &mut R,
        out: &mut Vec<Intent>,
    ) where
        R: Rng + ?Sized,
    {
        for entity in entities.iter() {
            let intent = match (entity.kind, entity.human) {
                (EntityKind::Zombie, _) => Intent {
                    entity: entity.id,
                    target: zombie_target(entity, entities, occupancy, rng),
                    heading: None,
                },
                (EntityKind::Human, Some(state)) if !state.attacked_this_tick => {
                    self.human_intent(entity, state, entities, occupancy, rng)
                }
                _ => continue,
            };
            out.push(intent);
        }
    }

    fn human_intent<R>(
        &mut self,
        human: &EntitySnapshot,
        state: HumanSnapshot,
        entities: &EntityView,
        occupancy: &OccupancyView<'_>,
        rng: &mut R,
    ) -> Intent
    where
        R: Rng + ?Sized,
    {
        let size = occupancy.size();
        let settle = |target: CellCoord| Intent {
            entity: human.id,
            target,
            heading: None,
        };

        if state.armed {
            if state.weapon_cooldown == 0
                && size
                    .cardinal_neighbors(human.cell)
                    .iter()
                    .any(|cell| occupancy.kind_at(*cell) == Some(EntityKind::Zombie))
            {
                debug!(human = human.id.get(), "holding position to strike");
                return settle(human.cell);
            }

            let range = Some(self.sense_range);
            let zombie = nearest(entities, size, human.cell, range, |other| {
                other.kind == EntityKind::Zombie
            });
            if let Some(step) = zombie.and_then(|zombie| {
                self.pathfinder
                    .shortest_first_step(occupancy, human.cell, zombie.cell, rng)
            }) {
                return settle(step);
            }

            let ally = nearest(entities, size, human.cell, range, EntitySnapshot::is_armed_human);
            if let Some(step) = ally.and_then(|ally| {
                self.pathfinder
                    .shortest_first_step(occupancy, human.cell, ally.cell, rng)
            }) {
                return settle(step);
            }
        } else {
            let protector = nearest(entities, size, human.cell, None, EntitySnapshot::is_armed_human);
            if let Some(step) = protector.and_then(|protector| {
                self.pathfinder
                    .shortest_first_step(occupancy, human.cell, protector.cell, rng)
            }) {
                return settle(step);
            }
        }

        let heading = wander(state.heading, rng);
        Intent {
            entity: human.id,
            target: size.offset(human.cell, heading),
            heading: Some(heading),
        }
    }
}

/// Greedy pursuit of the nearest human, or a random king move when none remain.
fn zombie_target<R>(
    zombie: &EntitySnapshot,
    entities: &EntityView,
    occupancy: &OccupancyView<'_>,
    rng: &mut R,
) -> CellCoord
where
    R: Rng + ?Sized,
{
    let size = occupancy.size();
    let Some(prey) = nearest(entities, size, zombie.cell, None, |other| {
        other.kind == EntityKind::Human
    }) else {
        let step = Step::KING.choose(rng).copied().unwrap_or(Step::STAY);
        return size.offset(zombie.cell, step);
    };

    let (dx, dy) = size.displacement(zombie.cell, prey.cell);
    let greedy = Step::toward(dx, dy);
    for step in [greedy, greedy.horizontal(), greedy.vertical()] {
        if step.is_stay() {
            continue;
        }
        let target = size.offset(zombie.cell, step);
        if !occupancy.is_obstacle(target) {
            return target;
        }
    }

    debug!(zombie = zombie.id.get(), "every pursuit step is walled off");
    zombie.cell
}

/// Biased random walk over the cardinal directions.
fn wander<R>(heading: Option<Step>, rng: &mut R) -> Step
where
    R: Rng + ?Sized,
{
    if let Some(current) = heading {
        if !rng.gen_bool(CHANGE_HEADING_PROBABILITY) {
            return current;
        }
    }

    Step::CARDINAL
        .iter()
        .copied()
        .filter(|step| heading != Some(step.reversed()))
        .choose(rng)
        .or_else(|| Step::CARDINAL.choose(rng).copied())
        .unwrap_or(Step::STAY)
}

/// First entity matching `accept` with the smallest toroidal distance.
///
/// Entities standing on `origin` are ignored. With a `range`, only distances
/// strictly below it qualify. Ties keep the earliest entity in view order.
fn nearest<'a, F>(
    entities: &'a EntityView,
    size: GridSize,
    origin: CellCoord,
    range: Option<u32>,
    accept: F,
) -> Option<&'a EntitySnapshot>
where
    F: Fn(&EntitySnapshot) -> bool,
{
    let mut best: Option<(u32, &EntitySnapshot)> = None;
    for candidate in entities.iter() {
        if candidate.cell == origin || !accept(candidate) {
            continue;
        }

        let distance = size.distance(origin, candidate.cell);
        if range.is_some_and(|range| distance >= range) {
            continue;
        }
        if best.map_or(true, |(closest, _)| distance < closest) {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, snapshot)| snapshot)
}
