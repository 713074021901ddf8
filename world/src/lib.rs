#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Outbreak.
//!
//! The world owns every entity, the weapon pickups lying on the ground and
//! the toroidal occupancy index. It only changes through [`apply`], which
//! executes a [`Command`] and reports what happened as [`Event`] values.

mod grid;

use std::collections::{BTreeMap, BTreeSet};

use outbreak_core::{
    CellCoord, Command, EntityId, EntityKind, Event, GridSize, Intent, Movement, PlacementError,
    Spawn, Step, Strike,
};
use thiserror::Error;
use tracing::debug;

use self::grid::SpatialIndex;

/// Faults raised when a command would break the world's invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// The requested grid has no cells.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    ZeroSized {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },
    /// A placement targeted a cell that already holds another occupant.
    #[error("cell {cell:?} is already occupied, cannot index entity {entity:?}")]
    CellOccupied {
        /// Cell that was targeted.
        cell: CellCoord,
        /// Entity that could not be placed.
        entity: EntityId,
    },
    /// The occupancy index disagrees with an entity's recorded position.
    #[error("occupancy index does not point at entity {entity:?} in cell {cell:?}")]
    IndexMismatch {
        /// Entity whose index entry is missing.
        entity: EntityId,
        /// Cell the entity claims to occupy.
        cell: CellCoord,
    },
    /// Every identifier has been handed out.
    #[error("entity identifiers exhausted")]
    IdentifiersExhausted,
}

/// Represents the authoritative Outbreak world state.
#[derive(Clone, Debug)]
pub struct World {
    size: GridSize,
    grid: SpatialIndex,
    entities: BTreeMap<EntityId, Entity>,
    weapons: BTreeMap<EntityId, CellCoord>,
    next_id: u32,
    tick_index: u64,
}

impl World {
    /// Creates an empty world covering the provided grid.
    #[must_use]
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            grid: SpatialIndex::new(size),
            entities: BTreeMap::new(),
            weapons: BTreeMap::new(),
            next_id: 0,
            tick_index: 0,
        }
    }

    /// Creates an empty world from raw dimensions, rejecting empty grids.
    pub fn with_dimensions(width: u32, height: u32) -> Result<Self, WorldError> {
        GridSize::new(width, height)
            .map(Self::new)
            .ok_or(WorldError::ZeroSized { width, height })
    }

    fn allocate_id(&mut self) -> Result<EntityId, WorldError> {
        let id = EntityId::new(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(WorldError::IdentifiersExhausted)?;
        Ok(id)
    }

    fn begin_tick(&mut self, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        for entity in self.entities.values_mut() {
            entity.pending_action = None;
            if let Body::Human(human) = &mut entity.body {
                human.attacked_this_tick = false;
                human.weapon_cooldown = human.weapon_cooldown.saturating_sub(1);
            }
        }
        out_events.push(Event::TickStarted {
            tick: self.tick_index,
        });
    }

    fn resolve_strikes(&mut self, strikes: Vec<Strike>, cooldown: u32, out_events: &mut Vec<Event>) {
        let mut defeated: Vec<(EntityId, EntityId, CellCoord)> = Vec::with_capacity(strikes.len());

        for strike in strikes {
            let Some(zombie_cell) = self
                .entities
                .get(&strike.zombie)
                .filter(|entity| entity.kind() == EntityKind::Zombie)
                .map(|entity| entity.cell)
            else {
                continue;
            };

            let Some(Entity {
                body: Body::Human(human),
                ..
            }) = self.entities.get_mut(&strike.attacker)
            else {
                continue;
            };

            if !human.armed {
                continue;
            }

            human.weapon_cooldown = cooldown;
            human.attacked_this_tick = true;
            defeated.push((strike.attacker, strike.zombie, zombie_cell));
        }

        for (attacker, zombie, cell) in defeated {
            if self.entities.remove(&zombie).is_none() {
                continue;
            }
            let _ = self.grid.clear(cell, zombie);
            out_events.push(Event::ZombieDefeated {
                attacker,
                zombie,
                cell,
            });
        }
    }

    fn declare_intent(&mut self, intent: Intent, out_events: &mut Vec<Event>) {
        let Some(entity) = self.entities.get_mut(&intent.entity) else {
            return;
        };

        let target = self.size.wrap_cell(intent.target);
        entity.pending_action = Some(target);
        if let (Body::Human(human), Some(heading)) = (&mut entity.body, intent.heading) {
            human.heading = Some(heading);
        }

        out_events.push(Event::IntentDeclared {
            entity: intent.entity,
            target,
        });
    }

    fn commit_moves(
        &mut self,
        moves: Vec<Movement>,
        infections: BTreeSet<EntityId>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let movers: BTreeSet<EntityId> = moves.iter().map(|movement| movement.entity).collect();

        // A bitten human that stays put keeps its cell; the biter stays home.
        let held_cells: BTreeSet<CellCoord> = infections
            .iter()
            .filter(|human| !movers.contains(human))
            .filter_map(|human| self.entities.get(human))
            .filter(|entity| entity.kind() == EntityKind::Human)
            .map(|entity| entity.cell)
            .collect();

        let mut staged: Vec<(EntityId, CellCoord, CellCoord)> = Vec::with_capacity(moves.len());
        for movement in moves {
            let Some(entity) = self.entities.get(&movement.entity) else {
                continue;
            };

            let to = self.size.wrap_cell(movement.to);
            if entity.cell == to {
                continue;
            }
            if held_cells.contains(&to) {
                debug!(
                    entity = movement.entity.get(),
                    column = to.column(),
                    row = to.row(),
                    "bite lands without displacing the victim"
                );
                continue;
            }

            staged.push((movement.entity, entity.cell, to));
        }

        for &(id, from, _) in &staged {
            let _ = self.grid.clear(from, id);
        }

        for &(id, from, to) in &staged {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            self.grid.place(to, id, entity.kind())?;
            entity.cell = to;
            out_events.push(Event::EntityMoved {
                entity: id,
                from,
                to,
            });
        }

        for &(id, _, to) in &staged {
            self.pick_up_weapon(id, to, out_events);
        }

        for human in infections {
            self.infect(human, out_events)?;
        }

        Ok(())
    }

    fn pick_up_weapon(&mut self, id: EntityId, cell: CellCoord, out_events: &mut Vec<Event>) {
        let Some(Entity {
            body: Body::Human(human),
            ..
        }) = self.entities.get_mut(&id)
        else {
            return;
        };

        if human.armed {
            return;
        }

        let Some(weapon) = self
            .weapons
            .iter()
            .find(|(_, weapon_cell)| **weapon_cell == cell)
            .map(|(weapon, _)| *weapon)
        else {
            return;
        };

        human.armed = true;
        let _ = self.weapons.remove(&weapon);
        out_events.push(Event::WeaponPickedUp {
            human: id,
            weapon,
            cell,
        });
    }

    fn infect(&mut self, id: EntityId, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        let Some(entity) = self
            .entities
            .get_mut(&id)
            .filter(|entity| entity.kind() == EntityKind::Human)
        else {
            debug!(entity = id.get(), "infection target is no longer a human");
            return Ok(());
        };

        let cell = entity.cell;
        if !self.grid.retag(cell, id, EntityKind::Zombie) {
            return Err(WorldError::IndexMismatch { entity: id, cell });
        }
        *entity = Entity::new(id, cell, Body::Zombie);

        out_events.push(Event::HumanInfected { entity: id, cell });
        Ok(())
    }

    fn spawn(
        &mut self,
        spawn: Spawn,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        if let Some(reason) = self.placement_error(cell, true) {
            out_events.push(Event::SpawnRejected { cell, reason });
            return Ok(());
        }

        let id = self.allocate_id()?;
        let body = match spawn {
            Spawn::Human { armed } => Body::Human(Human {
                armed,
                ..Human::default()
            }),
            Spawn::Zombie => Body::Zombie,
            Spawn::Obstacle => Body::Obstacle,
        };
        self.grid.place(cell, id, spawn.kind())?;
        let _ = self.entities.insert(id, Entity::new(id, cell, body));

        out_events.push(Event::EntitySpawned {
            entity: id,
            kind: spawn.kind(),
            cell,
        });
        Ok(())
    }

    fn place_weapon(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        if let Some(reason) = self.placement_error(cell, false) {
            out_events.push(Event::SpawnRejected { cell, reason });
            return Ok(());
        }

        let weapon = self.allocate_id()?;
        let _ = self.weapons.insert(weapon, cell);
        out_events.push(Event::WeaponPlaced { weapon, cell });
        Ok(())
    }

    fn placement_error(&self, cell: CellCoord, blocking: bool) -> Option<PlacementError> {
        if !self.size.contains(cell) {
            return Some(PlacementError::OutOfBounds);
        }

        match self.grid.occupant(cell).map(|occupant| occupant.kind) {
            Some(EntityKind::Obstacle) => Some(PlacementError::BlockedByObstacle),
            Some(_) if blocking => Some(PlacementError::Occupied),
            _ => None,
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// An error means an invariant would have been broken. The world keeps every
/// change made before the fault; callers decide whether to continue.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    match command {
        Command::BeginTick => {
            world.begin_tick(out_events);
            Ok(())
        }
        Command::ResolveStrikes { strikes, cooldown } => {
            world.resolve_strikes(strikes, cooldown, out_events);
            Ok(())
        }
        Command::DeclareIntent(intent) => {
            world.declare_intent(intent, out_events);
            Ok(())
        }
        Command::CommitMoves { moves, infections } => {
            world.commit_moves(moves, infections, out_events)
        }
        Command::SpawnEntity { spawn, cell } => world.spawn(spawn, cell, out_events),
        Command::PlaceWeapon { cell } => world.place_weapon(cell, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use outbreak_core::{
        CellCoord, Census, EntityId, EntityKind, EntitySnapshot, EntityView, GridSize, Occupant,
        OccupancyView, WeaponSnapshot, WeaponView,
    };

    use super::World;

    /// Dimensions of the world's grid.
    #[must_use]
    pub fn size(world: &World) -> GridSize {
        world.size
    }

    /// Number of ticks that have started so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Returns the blocking occupant of the (wrapped) cell, if any.
    #[must_use]
    pub fn occupant_at(world: &World, cell: CellCoord) -> Option<Occupant> {
        world.grid.occupant(cell)
    }

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        world.grid.view()
    }

    /// Captures the state of a single entity.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world.entities.get(&id).map(super::Entity::snapshot)
    }

    /// Captures a read-only view of every blocking entity.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        EntityView::from_snapshots(world.entities.values().map(super::Entity::snapshot).collect())
    }

    /// Captures a read-only view of the weapons lying on the ground.
    #[must_use]
    pub fn weapon_view(world: &World) -> WeaponView {
        WeaponView::from_snapshots(
            world
                .weapons
                .iter()
                .map(|(id, cell)| WeaponSnapshot {
                    id: *id,
                    cell: *cell,
                })
                .collect(),
        )
    }

    /// Identifiers of the weapons lying in the (wrapped) cell.
    #[must_use]
    pub fn weapons_at(world: &World, cell: CellCoord) -> Vec<EntityId> {
        let cell = world.size.wrap_cell(cell);
        world
            .weapons
            .iter()
            .filter(|(_, weapon_cell)| **weapon_cell == cell)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Counts the world's population by kind.
    #[must_use]
    pub fn census(world: &World) -> Census {
        let mut census = Census {
            weapons: world.weapons.len(),
            ..Census::default()
        };
        for entity in world.entities.values() {
            match entity.kind() {
                EntityKind::Human => {
                    census.humans += 1;
                    if entity.snapshot().is_armed_human() {
                        census.armed_humans += 1;
                    }
                }
                EntityKind::Zombie => census.zombies += 1,
                EntityKind::Obstacle => census.obstacles += 1,
            }
        }
        census
    }

    /// Everything found in a single cell, as shown by an inspector.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct CellInspection {
        /// Inspected cell after wrapping.
        pub cell: CellCoord,
        /// Blocking entity in the cell, if any.
        pub occupant: Option<EntitySnapshot>,
        /// Weapons lying in the cell.
        pub weapons: Vec<EntityId>,
    }

    /// Describes the contents of the (wrapped) cell.
    #[must_use]
    pub fn inspect(world: &World, cell: CellCoord) -> CellInspection {
        let cell = world.size.wrap_cell(cell);
        let occupant = occupant_at(world, cell).and_then(|occupant| entity(world, occupant.id));
        CellInspection {
            cell,
            occupant,
            weapons: weapons_at(world, cell),
        }
    }
}

#[derive(Clone, Debug)]
struct Entity {
    id: EntityId,
    cell: CellCoord,
    body: Body,
    pending_action: Option<CellCoord>,
}

impl Entity {
    fn new(id: EntityId, cell: CellCoord, body: Body) -> Self {
        Self {
            id,
            cell,
            body,
            pending_action: None,
        }
    }

    fn kind(&self) -> EntityKind {
        match self.body {
            Body::Human(_) => EntityKind::Human,
            Body::Zombie => EntityKind::Zombie,
            Body::Obstacle => EntityKind::Obstacle,
        }
    }

    fn snapshot(&self) -> outbreak_core::EntitySnapshot {
        let human = match self.body {
            Body::Human(human) => Some(outbreak_core::HumanSnapshot {
                armed: human.armed,
                weapon_cooldown: human.weapon_cooldown,
                attacked_this_tick: human.attacked_this_tick,
                heading: human.heading,
            }),
            Body::Zombie | Body::Obstacle => None,
        };

        outbreak_core::EntitySnapshot {
            id: self.id,
            kind: self.kind(),
            cell: self.cell,
            human,
            pending_action: self.pending_action,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Body {
    Human(Human),
    Zombie,
    Obstacle,
}

/// Per-human state. `attacked_this_tick` is scratch that lives for one tick.
#[derive(Clone, Copy, Debug, Default)]
struct Human {
    armed: bool,
    weapon_cooldown: u32,
    attacked_this_tick: bool,
    heading: Option<Step>,
}
