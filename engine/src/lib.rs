#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick orchestration for the Outbreak simulation.
//!
//! A tick runs five strictly ordered phases: reset, combat, intention
//! gathering, conflict resolution and state application. Systems only ever
//! see immutable views; every mutation goes through [`outbreak_world::apply`].

use std::fmt;

use outbreak_core::{Census, Command, Event, Intent, SENSE_RANGE, WEAPON_COOLDOWN_TICKS};
use outbreak_system_combat::{self as combat, Combat};
use outbreak_system_conflict::ConflictResolver;
use outbreak_system_intent::{self as intent, Intentions};
use outbreak_system_spawning::{self as spawning, GenerationError, GenerationSummary};
use outbreak_world::{self as world, query, World, WorldError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, error, info};

/// Seed used when callers do not provide one.
pub const DEFAULT_SEED: u64 = 0x0b5e_7a2e;

/// Tunables shared by every phase of the tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Seed of the random source driving every tie-break.
    pub rng_seed: u64,
    /// Ticks an armed human waits after a successful strike.
    pub weapon_cooldown: u32,
    /// Exclusive radius within which armed humans notice zombies and allies.
    pub sense_range: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rng_seed: DEFAULT_SEED,
            weapon_cooldown: WEAPON_COOLDOWN_TICKS,
            sense_range: SENSE_RANGE,
        }
    }
}

/// Phase of the tick in which a fault surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Per-tick flag and cooldown reset.
    Reset,
    /// Strike resolution.
    Combat,
    /// Recording of declared intents.
    Intents,
    /// Application of moves, pickups and infections.
    Commit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reset => "reset",
            Self::Combat => "combat",
            Self::Intents => "intents",
            Self::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Fault that abandoned a tick part-way through.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("tick {tick} aborted during {phase}")]
pub struct TickError {
    /// Index of the abandoned tick.
    pub tick: u64,
    /// Phase that was running.
    pub phase: Phase,
    /// Invariant the world refused to break.
    #[source]
    pub source: WorldError,
}

/// Outcome of a single tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Index of the tick, starting at one.
    pub tick: u64,
    /// Events broadcast by the world, in application order.
    pub events: Vec<Event>,
    /// Whether the tick was abandoned after a fault.
    pub aborted: bool,
}

impl TickReport {
    /// Counts the events matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}

/// Drives the world one tick at a time.
#[derive(Debug)]
pub struct TickEngine {
    world: World,
    rng: ChaCha8Rng,
    combat: Combat,
    intentions: Intentions,
    conflicts: ConflictResolver,
    commands: Vec<Command>,
    intents: Vec<Intent>,
}

impl TickEngine {
    /// Wraps an existing world.
    #[must_use]
    pub fn new(world: World, config: EngineConfig) -> Self {
        Self::with_rng(world, config, ChaCha8Rng::seed_from_u64(config.rng_seed))
    }

    /// Generates a world and wraps it, drawing from the same seeded source.
    pub fn generate(
        generation: &spawning::Config,
        config: EngineConfig,
    ) -> Result<(Self, GenerationSummary), GenerationError> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let (world, summary) = spawning::create_world(generation, &mut rng)?;
        Ok((Self::with_rng(world, config, rng), summary))
    }

    fn with_rng(world: World, config: EngineConfig, rng: ChaCha8Rng) -> Self {
        Self {
            world,
            rng,
            combat: Combat::new(combat::Config::new(config.weapon_cooldown)),
            intentions: Intentions::new(intent::Config::new(config.sense_range)),
            conflicts: ConflictResolver::new(),
            commands: Vec::new(),
            intents: Vec::new(),
        }
    }

    /// Read-only access to the simulated world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Head count of the current population.
    #[must_use]
    pub fn census(&self) -> Census {
        query::census(&self.world)
    }

    /// Advances one tick, logging and swallowing any fault.
    ///
    /// A faulted tick keeps whatever it applied before the fault and reports
    /// `aborted == true`.
    pub fn tick(&mut self) -> TickReport {
        let mut events = Vec::new();
        let aborted = match self.run(&mut events) {
            Ok(()) => false,
            Err(fault) => {
                error!(tick = fault.tick, phase = %fault.phase, error = %fault.source, "tick abandoned");
                true
            }
        };

        TickReport {
            tick: query::tick_index(&self.world),
            events,
            aborted,
        }
    }

    /// Advances one tick, surfacing the first fault to the caller.
    pub fn try_tick(&mut self) -> Result<TickReport, TickError> {
        let mut events = Vec::new();
        self.run(&mut events)?;
        Ok(TickReport {
            tick: query::tick_index(&self.world),
            events,
            aborted: false,
        })
    }

    fn run(&mut self, events: &mut Vec<Event>) -> Result<(), TickError> {
        execute(&mut self.world, Phase::Reset, Command::BeginTick, events)?;
        let tick = query::tick_index(&self.world);

        {
            let entities = query::entity_view(&self.world);
            let occupancy = query::occupancy_view(&self.world);
            self.commands.clear();
            self.combat
                .handle(&entities, &occupancy, &mut self.rng, &mut self.commands);
        }
        for command in self.commands.drain(..) {
            execute(&mut self.world, Phase::Combat, command, events)?;
        }

        let resolution = {
            let entities = query::entity_view(&self.world);
            let occupancy = query::occupancy_view(&self.world);
            self.intents.clear();
            self.intentions
                .handle(&entities, &occupancy, &mut self.rng, &mut self.intents);
            self.conflicts.resolve(&self.intents, &entities, &occupancy)
        };
        for intent in &self.intents {
            execute(
                &mut self.world,
                Phase::Intents,
                Command::DeclareIntent(*intent),
                events,
            )?;
        }

        let moves = resolution.moves.len();
        let infections = resolution.infections.len();
        execute(&mut self.world, Phase::Commit, resolution.into_command(), events)?;

        let census = query::census(&self.world);
        debug!(tick, moves, infections, "tick committed");
        info!(
            tick,
            humans = census.humans,
            armed = census.armed_humans,
            zombies = census.zombies,
            weapons = census.weapons,
            "tick complete"
        );
        Ok(())
    }
}

fn execute(
    world: &mut World,
    phase: Phase,
    command: Command,
    events: &mut Vec<Event>,
) -> Result<(), TickError> {
    world::apply(world, command, events).map_err(|source| TickError {
        tick: query::tick_index(world),
        phase,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_core::{CellCoord, Spawn};

    #[test]
    fn empty_world_ticks_quietly() {
        let world = World::with_dimensions(4, 4).expect("non-empty grid");
        let mut engine = TickEngine::new(world, EngineConfig::default());

        let report = engine.try_tick().expect("tick succeeds");

        assert_eq!(report.tick, 1);
        assert_eq!(report.events, vec![Event::TickStarted { tick: 1 }]);
        assert!(!report.aborted);
    }

    #[test]
    fn phases_render_lowercase() {
        assert_eq!(Phase::Commit.to_string(), "commit");
        let fault = TickError {
            tick: 3,
            phase: Phase::Combat,
            source: WorldError::IdentifiersExhausted,
        };
        assert_eq!(fault.to_string(), "tick 3 aborted during combat");
    }

    #[test]
    fn report_counts_matching_events() {
        let mut world = World::with_dimensions(6, 6).expect("non-empty grid");
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::SpawnEntity {
                spawn: Spawn::Zombie,
                cell: CellCoord::new(1, 1),
            },
            &mut events,
        )
        .expect("spawn applies");
        let mut engine = TickEngine::new(world, EngineConfig::default());

        let report = engine.tick();

        assert_eq!(
            report.count(|event| matches!(event, Event::EntityMoved { .. })),
            1
        );
    }
}
