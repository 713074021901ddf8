#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Initial world generation: walled houses, agents and weapon pickups.

use outbreak_core::{CellCoord, Command, EntityKind, Event, GridSize, Spawn};
use outbreak_world::{self as world, query, World, WorldError};
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

/// Parameters describing the world to generate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Number of grid columns.
    pub width: u32,
    /// Number of grid rows.
    pub height: u32,
    /// Houses to attempt to place.
    pub house_count: u32,
    /// Outer width of every house, walls included.
    pub house_width: u32,
    /// Outer height of every house, walls included.
    pub house_height: u32,
    /// Random corners tried per house before it is skipped.
    pub house_attempts: u32,
    /// Zombies to spawn.
    pub zombies: u32,
    /// Unarmed humans to spawn.
    pub humans: u32,
    /// Weapon pickups to drop.
    pub weapons: u32,
    /// Random cells tried per weapon before it is skipped.
    pub weapon_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            house_count: 8,
            house_width: 8,
            house_height: 6,
            house_attempts: 50,
            zombies: 1,
            humans: 100,
            weapons: 15,
            weapon_attempts: 100,
        }
    }
}

/// Counts of what generation actually placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Houses whose walls were raised.
    pub houses: u32,
    /// Zombies placed.
    pub zombies: u32,
    /// Humans placed.
    pub humans: u32,
    /// Weapons dropped.
    pub weapons: u32,
    /// Requested items that could not find a cell.
    pub skipped: u32,
}

/// Failures that prevent a world from being generated at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The grid has no cells.
    #[error("cannot generate a {width}x{height} world")]
    EmptyGrid {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },
    /// The world refused a placement it should have accepted.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Builds a populated world, skipping anything that cannot be placed.
///
/// Houses go first so agents spawn in the streets between them. Weapons may
/// share a cell with an agent or another weapon but never with a wall.
pub fn create_world<R>(
    config: &Config,
    rng: &mut R,
) -> Result<(World, GenerationSummary), GenerationError>
where
    R: Rng + ?Sized,
{
    let size = GridSize::new(config.width, config.height).ok_or(GenerationError::EmptyGrid {
        width: config.width,
        height: config.height,
    })?;
    let mut generator = Generator {
        world: World::new(size),
        size,
        summary: GenerationSummary::default(),
        events: Vec::new(),
    };

    generator.raise_houses(config, rng)?;
    generator.spawn_agents(Spawn::Zombie, config.zombies, rng)?;
    generator.spawn_agents(Spawn::Human { armed: false }, config.humans, rng)?;
    generator.drop_weapons(config.weapons, config.weapon_attempts, rng)?;

    let summary = generator.summary;
    info!(
        houses = summary.houses,
        zombies = summary.zombies,
        humans = summary.humans,
        weapons = summary.weapons,
        skipped = summary.skipped,
        "world generated"
    );
    Ok((generator.world, summary))
}

struct Generator {
    world: World,
    size: GridSize,
    summary: GenerationSummary,
    events: Vec<Event>,
}

impl Generator {
    fn raise_houses<R>(&mut self, config: &Config, rng: &mut R) -> Result<(), GenerationError>
    where
        R: Rng + ?Sized,
    {
        let (width, height) = (config.house_width, config.house_height);
        if width == 0 || height == 0 || width > self.size.width() || height > self.size.height() {
            if config.house_count > 0 {
                warn!(width, height, "house footprint does not fit the grid");
                self.summary.skipped += config.house_count;
            }
            return Ok(());
        }

        for house in 0..config.house_count {
            let corner = (0..config.house_attempts).find_map(|_| {
                let left = rng.gen_range(0..=self.size.width() - width);
                let top = rng.gen_range(0..=self.size.height() - height);
                self.footprint_is_clear(left, top, width, height)
                    .then_some(CellCoord::new(left, top))
            });

            let Some(corner) = corner else {
                warn!(house, attempts = config.house_attempts, "could not place house");
                self.summary.skipped += 1;
                continue;
            };

            self.raise_walls(corner, width, height)?;
            self.summary.houses += 1;
        }
        Ok(())
    }

    fn footprint_is_clear(&self, left: u32, top: u32, width: u32, height: u32) -> bool {
        (top..top + height).all(|row| {
            (left..left + width)
                .all(|column| query::occupant_at(&self.world, CellCoord::new(column, row)).is_none())
        })
    }

    fn raise_walls(&mut self, corner: CellCoord, width: u32, height: u32) -> Result<(), GenerationError> {
        let (left, top) = (corner.column(), corner.row());
        let (right, bottom) = (left + width - 1, top + height - 1);
        let door = CellCoord::new(left + width / 2, top);

        for row in top..=bottom {
            for column in left..=right {
                let cell = CellCoord::new(column, row);
                let perimeter = column == left || column == right || row == top || row == bottom;
                if perimeter && cell != door {
                    self.apply(Command::SpawnEntity {
                        spawn: Spawn::Obstacle,
                        cell,
                    })?;
                }
            }
        }
        Ok(())
    }

    fn spawn_agents<R>(&mut self, spawn: Spawn, count: u32, rng: &mut R) -> Result<(), GenerationError>
    where
        R: Rng + ?Sized,
    {
        let attempts = self.size.cell_count().saturating_mul(2);
        for _ in 0..count {
            let cell = (0..attempts)
                .map(|_| self.random_cell(rng))
                .find(|cell| query::occupant_at(&self.world, *cell).is_none());

            let Some(cell) = cell else {
                warn!(kind = ?spawn.kind(), attempts, "no empty cell left for agent");
                self.summary.skipped += 1;
                continue;
            };

            self.apply(Command::SpawnEntity { spawn, cell })?;
            match spawn.kind() {
                EntityKind::Zombie => self.summary.zombies += 1,
                EntityKind::Human => self.summary.humans += 1,
                EntityKind::Obstacle => {}
            }
        }
        Ok(())
    }

    fn drop_weapons<R>(&mut self, count: u32, attempts: u32, rng: &mut R) -> Result<(), GenerationError>
    where
        R: Rng + ?Sized,
    {
        for weapon in 0..count {
            let cell = (0..attempts).map(|_| self.random_cell(rng)).find(|cell| {
                query::occupant_at(&self.world, *cell).map(|occupant| occupant.kind)
                    != Some(EntityKind::Obstacle)
            });

            let Some(cell) = cell else {
                warn!(weapon, attempts, "no open cell left for weapon");
                self.summary.skipped += 1;
                continue;
            };

            self.apply(Command::PlaceWeapon { cell })?;
            self.summary.weapons += 1;
        }
        Ok(())
    }

    fn random_cell<R>(&self, rng: &mut R) -> CellCoord
    where
        R: Rng + ?Sized,
    {
        CellCoord::new(
            rng.gen_range(0..self.size.width()),
            rng.gen_range(0..self.size.height()),
        )
    }

    fn apply(&mut self, command: Command) -> Result<(), GenerationError> {
        self.events.clear();
        world::apply(&mut self.world, command, &mut self.events)?;
        if let Some(Event::SpawnRejected { cell, reason }) = self.events.first() {
            warn!(column = cell.column(), row = cell.row(), ?reason, "placement rejected");
        }
        Ok(())
    }
}
