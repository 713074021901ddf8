#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that lets armed humans strike adjacent zombies.

use std::collections::BTreeSet;

use outbreak_core::{
    CellCoord, Command, EntityId, EntityKind, EntityView, OccupancyView, Strike,
    WEAPON_COOLDOWN_TICKS,
};
use rand::{seq::SliceRandom, Rng};
use tracing::debug;

/// Configuration parameters required to construct the combat system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    weapon_cooldown: u32,
}

impl Config {
    /// Creates a configuration that assigns `weapon_cooldown` ticks after every strike.
    #[must_use]
    pub const fn new(weapon_cooldown: u32) -> Self {
        Self { weapon_cooldown }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(WEAPON_COOLDOWN_TICKS)
    }
}

/// Combat system that queues strikes for ready, armed humans.
#[derive(Debug)]
pub struct Combat {
    weapon_cooldown: u32,
    candidates: Vec<(EntityId, CellCoord)>,
    claimed: BTreeSet<EntityId>,
    scratch: Vec<Strike>,
}

impl Default for Combat {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Combat {
    /// Creates a new combat system with empty scratch buffers.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            weapon_cooldown: config.weapon_cooldown,
            candidates: Vec::new(),
            claimed: BTreeSet::new(),
            scratch: Vec::new(),
        }
    }

    /// Emits a single `Command::ResolveStrikes` when at least one strike lands.
    ///
    /// Candidates are armed humans with a cold weapon that have not attacked
    /// yet. They are visited in shuffled order; each scans its cardinal
    /// neighbours and claims the first zombie nobody else has claimed.
    pub fn handle<R>(
        &mut self,
        entities: &EntityView,
        occupancy: &OccupancyView<'_>,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) where
        R: Rng + ?Sized,
    {
        self.candidates.clear();
        self.candidates.extend(entities.iter().filter_map(|entity| {
            let state = entity.human?;
            (state.armed && state.weapon_cooldown == 0 && !state.attacked_this_tick)
                .then_some((entity.id, entity.cell))
        }));

        if self.candidates.is_empty() {
            return;
        }

        self.candidates.shuffle(rng);
        self.claimed.clear();
        self.scratch.clear();

        let size = occupancy.size();
        for &(attacker, cell) in &self.candidates {
            let target = size
                .cardinal_neighbors(cell)
                .into_iter()
                .filter_map(|neighbor| occupancy.occupant(neighbor))
                .find(|occupant| {
                    occupant.kind == EntityKind::Zombie && !self.claimed.contains(&occupant.id)
                });

            if let Some(zombie) = target {
                let _ = self.claimed.insert(zombie.id);
                debug!(
                    human = attacker.get(),
                    zombie = zombie.id.get(),
                    "armed human strikes"
                );
                self.scratch.push(Strike {
                    attacker,
                    zombie: zombie.id,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.push(Command::ResolveStrikes {
            strikes: std::mem::take(&mut self.scratch),
            cooldown: self.weapon_cooldown,
        });
    }
}
