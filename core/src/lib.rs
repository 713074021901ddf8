#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Outbreak engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems read immutable views of the
//! world and respond with [`Command`] values; the world executes those
//! commands via its `apply` entry point and broadcasts [`Event`] values that
//! describe what actually changed. Every coordinate handled here lives on a
//! toroidal grid described by [`GridSize`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Number of ticks an armed human must wait after a successful attack.
pub const WEAPON_COOLDOWN_TICKS: u32 = 5;

/// Toroidal Manhattan radius within which armed humans notice zombies and allies.
pub const SENSE_RANGE: u32 = 10;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Opens a new tick: clears per-tick flags and pending actions and cools weapons down.
    BeginTick,
    /// Applies the melee strikes chosen by the combat system in a single pass.
    ResolveStrikes {
        /// Strikes to apply, in the order they were decided.
        strikes: Vec<Strike>,
        /// Cooldown assigned to every attacker that lands a strike.
        cooldown: u32,
    },
    /// Records the action an entity intends to perform this tick.
    DeclareIntent(Intent),
    /// Applies the outcome of conflict resolution.
    CommitMoves {
        /// Moves that won their destination cell.
        moves: Vec<Movement>,
        /// Humans bitten this tick.
        infections: BTreeSet<EntityId>,
    },
    /// Requests that a blocking entity be created at the provided cell.
    SpawnEntity {
        /// Kind of entity to create.
        spawn: Spawn,
        /// Cell the entity should occupy.
        cell: CellCoord,
    },
    /// Requests that a weapon pickup be dropped at the provided cell.
    PlaceWeapon {
        /// Cell that receives the weapon.
        cell: CellCoord,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces that a new tick began.
    TickStarted {
        /// Index of the tick, starting at one for the first tick.
        tick: u64,
    },
    /// Confirms that an armed human destroyed a zombie.
    ZombieDefeated {
        /// Human that landed the strike.
        attacker: EntityId,
        /// Zombie that was removed from the world.
        zombie: EntityId,
        /// Cell the zombie occupied.
        cell: CellCoord,
    },
    /// Confirms that an entity recorded its pending action.
    IntentDeclared {
        /// Entity that declared the intent.
        entity: EntityId,
        /// Cell the entity wants to occupy, or its own cell for an attack in place.
        target: CellCoord,
    },
    /// Confirms that an entity moved between two cells.
    EntityMoved {
        /// Entity that moved.
        entity: EntityId,
        /// Cell occupied before the move.
        from: CellCoord,
        /// Cell occupied after the move.
        to: CellCoord,
    },
    /// Confirms that an unarmed human picked up a weapon.
    WeaponPickedUp {
        /// Human that is now armed.
        human: EntityId,
        /// Weapon that was removed from the ground.
        weapon: EntityId,
        /// Cell where the pickup happened.
        cell: CellCoord,
    },
    /// Confirms that a human turned into a zombie, keeping its identifier.
    HumanInfected {
        /// Identifier shared by the former human and the new zombie.
        entity: EntityId,
        /// Cell the transformation happened in.
        cell: CellCoord,
    },
    /// Confirms that a blocking entity was created.
    EntitySpawned {
        /// Identifier allocated to the entity.
        entity: EntityId,
        /// Kind of the created entity.
        kind: EntityKind,
        /// Cell the entity occupies.
        cell: CellCoord,
    },
    /// Confirms that a weapon pickup was dropped.
    WeaponPlaced {
        /// Identifier allocated to the weapon.
        weapon: EntityId,
        /// Cell the weapon lies in.
        cell: CellCoord,
    },
    /// Reports that a spawn or weapon placement request was rejected.
    SpawnRejected {
        /// Cell named in the rejected request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
}

/// Reasons a placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The requested cell already holds a blocking occupant.
    Occupied,
    /// The requested cell holds an obstacle.
    BlockedByObstacle,
}

/// Blocking entity kinds that occupy grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Living human, armed or not.
    Human,
    /// Zombie hunting humans.
    Zombie,
    /// Immovable wall segment.
    Obstacle,
}

/// Blueprint for a blocking entity created through [`Command::SpawnEntity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Spawn {
    /// Human, optionally carrying a weapon from the start.
    Human {
        /// Whether the human starts armed.
        armed: bool,
    },
    /// Zombie.
    Zombie,
    /// Obstacle.
    Obstacle,
}

impl Spawn {
    /// Kind of entity produced by the blueprint.
    #[must_use]
    pub const fn kind(self) -> EntityKind {
        match self {
            Self::Human { .. } => EntityKind::Human,
            Self::Zombie => EntityKind::Zombie,
            Self::Obstacle => EntityKind::Obstacle,
        }
    }
}

/// Unique identifier assigned to every entity and weapon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Unit displacement between neighbouring cells.
///
/// Rows grow downwards, so `dy == -1` points north.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Step {
    dx: i8,
    dy: i8,
}

impl Step {
    /// Staying in place.
    pub const STAY: Self = Self::new(0, 0);
    /// Movement toward decreasing row indices.
    pub const NORTH: Self = Self::new(0, -1);
    /// Movement toward increasing row indices.
    pub const SOUTH: Self = Self::new(0, 1);
    /// Movement toward decreasing column indices.
    pub const WEST: Self = Self::new(-1, 0);
    /// Movement toward increasing column indices.
    pub const EAST: Self = Self::new(1, 0);

    /// The four cardinal steps in scan order.
    pub const CARDINAL: [Self; 4] = [Self::NORTH, Self::SOUTH, Self::WEST, Self::EAST];

    /// Cardinal steps followed by the four diagonals.
    pub const KING: [Self; 8] = [
        Self::NORTH,
        Self::SOUTH,
        Self::WEST,
        Self::EAST,
        Self::new(-1, -1),
        Self::new(-1, 1),
        Self::new(1, -1),
        Self::new(1, 1),
    ];

    /// Creates a step from raw components. Components are expected in `-1..=1`.
    #[must_use]
    pub const fn new(dx: i8, dy: i8) -> Self {
        Self { dx, dy }
    }

    /// Builds the step that follows the sign of each displacement axis.
    #[must_use]
    pub fn toward(dx: i32, dy: i32) -> Self {
        Self::new(dx.signum() as i8, dy.signum() as i8)
    }

    /// Horizontal component.
    #[must_use]
    pub const fn dx(&self) -> i8 {
        self.dx
    }

    /// Vertical component.
    #[must_use]
    pub const fn dy(&self) -> i8 {
        self.dy
    }

    /// Step pointing in the opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self::new(-self.dx, -self.dy)
    }

    /// Keeps only the horizontal component.
    #[must_use]
    pub const fn horizontal(self) -> Self {
        Self::new(self.dx, 0)
    }

    /// Keeps only the vertical component.
    #[must_use]
    pub const fn vertical(self) -> Self {
        Self::new(0, self.dy)
    }

    /// Reports whether the step leaves the entity in place.
    #[must_use]
    pub const fn is_stay(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Dimensions of the toroidal grid.
///
/// Both extents are strictly positive, which keeps every wrapping operation
/// total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    width: u32,
    height: u32,
}

impl GridSize {
    /// Creates a grid size, returning `None` when either extent is zero.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { width, height })
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let cells = u64::from(self.width) * u64::from(self.height);
        usize::try_from(cells).unwrap_or(usize::MAX)
    }

    /// Reports whether the coordinate lies inside the grid without wrapping.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Folds signed coordinates back onto the torus.
    #[must_use]
    pub fn wrap(&self, column: i64, row: i64) -> CellCoord {
        let column = column.rem_euclid(i64::from(self.width));
        let row = row.rem_euclid(i64::from(self.height));
        CellCoord::new(column as u32, row as u32)
    }

    /// Folds an arbitrary coordinate back onto the torus.
    #[must_use]
    pub fn wrap_cell(&self, cell: CellCoord) -> CellCoord {
        CellCoord::new(cell.column() % self.width, cell.row() % self.height)
    }

    /// Cell reached by taking `step` from `cell`, wrapping around the edges.
    #[must_use]
    pub fn offset(&self, cell: CellCoord, step: Step) -> CellCoord {
        self.wrap(
            i64::from(cell.column()) + i64::from(step.dx()),
            i64::from(cell.row()) + i64::from(step.dy()),
        )
    }

    /// Shortest signed displacement from `from` to `to` on each axis.
    ///
    /// An axis is wrapped only when the raw difference exceeds half of its
    /// extent, so an exact half-way difference keeps its raw sign.
    #[must_use]
    pub fn displacement(&self, from: CellCoord, to: CellCoord) -> (i32, i32) {
        (
            axis_delta(from.column(), to.column(), self.width),
            axis_delta(from.row(), to.row(), self.height),
        )
    }

    /// Toroidal Manhattan distance between two cells.
    #[must_use]
    pub fn distance(&self, from: CellCoord, to: CellCoord) -> u32 {
        let (dx, dy) = self.displacement(from, to);
        dx.unsigned_abs() + dy.unsigned_abs()
    }

    /// The four cardinal neighbours of `cell` in scan order.
    #[must_use]
    pub fn cardinal_neighbors(&self, cell: CellCoord) -> [CellCoord; 4] {
        Step::CARDINAL.map(|step| self.offset(cell, step))
    }

    /// Row-major index of the (wrapped) cell.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> usize {
        let cell = self.wrap_cell(cell);
        let row = usize::try_from(cell.row()).unwrap_or(0);
        let column = usize::try_from(cell.column()).unwrap_or(0);
        let width = usize::try_from(self.width).unwrap_or(0);
        row * width + column
    }
}

fn axis_delta(from: u32, to: u32, extent: u32) -> i32 {
    let extent = i64::from(extent);
    let mut delta = i64::from(to) - i64::from(from);
    if delta.abs() * 2 > extent {
        delta -= extent * delta.signum();
    }
    delta as i32
}

/// Entity recorded in a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Occupant {
    /// Identifier of the occupying entity.
    pub id: EntityId,
    /// Kind of the occupying entity.
    pub kind: EntityKind,
}

/// Melee strike chosen by the combat system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Strike {
    /// Armed human delivering the blow.
    pub attacker: EntityId,
    /// Adjacent zombie that will be destroyed.
    pub zombie: EntityId,
}

/// Action an entity wants to perform this tick.
///
/// A `target` equal to the entity's own cell means "attack in place" for an
/// armed human, or "stay" for anyone else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Intent {
    /// Entity that formed the intent.
    pub entity: EntityId,
    /// Destination cell, already wrapped onto the grid.
    pub target: CellCoord,
    /// Wander heading chosen while forming the intent, if any.
    pub heading: Option<Step>,
}

/// Move that won its destination during conflict resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Movement {
    /// Entity that moves.
    pub entity: EntityId,
    /// Destination cell.
    pub to: CellCoord,
}

/// Human-specific state exposed through snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HumanSnapshot {
    /// Whether the human carries a weapon.
    pub armed: bool,
    /// Ticks left before the weapon can strike again.
    pub weapon_cooldown: u32,
    /// Whether the human already attacked during the current tick.
    pub attacked_this_tick: bool,
    /// Last wander direction, used to bias the random walk.
    pub heading: Option<Step>,
}

/// Immutable representation of a single entity's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Kind of the entity.
    pub kind: EntityKind,
    /// Grid cell currently occupied by the entity.
    pub cell: CellCoord,
    /// Human state, present only for humans.
    pub human: Option<HumanSnapshot>,
    /// Action declared for the current tick, if any.
    pub pending_action: Option<CellCoord>,
}

impl EntitySnapshot {
    /// Reports whether the entity is a human carrying a weapon.
    #[must_use]
    pub fn is_armed_human(&self) -> bool {
        self.human.is_some_and(|human| human.armed)
    }
}

/// Read-only snapshot describing all blocking entities in the world.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot for the provided identifier.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntitySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a weapon lying on the ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeaponSnapshot {
    /// Identifier allocated to the weapon.
    pub id: EntityId,
    /// Cell the weapon lies in.
    pub cell: CellCoord,
}

/// Read-only snapshot describing all weapons on the ground.
#[derive(Clone, Debug, Default)]
pub struct WeaponView {
    snapshots: Vec<WeaponSnapshot>,
}

impl WeaponView {
    /// Creates a new weapon view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<WeaponSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &WeaponSnapshot> {
        self.snapshots.iter()
    }

    /// Number of weapons on the ground.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no weapons remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Read-only view into the dense occupancy grid.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    cells: &'a [Option<Occupant>],
    size: GridSize,
}

impl<'a> OccupancyView<'a> {
    /// Captures a new occupancy view backed by the provided row-major cell slice.
    #[must_use]
    pub fn new(cells: &'a [Option<Occupant>], size: GridSize) -> Self {
        Self { cells, size }
    }

    /// Returns the occupant of the provided cell, wrapping the coordinate first.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<Occupant> {
        self.cells.get(self.size.index(cell)).copied().flatten()
    }

    /// Kind of the entity occupying the cell, if any.
    #[must_use]
    pub fn kind_at(&self, cell: CellCoord) -> Option<EntityKind> {
        self.occupant(cell).map(|occupant| occupant.kind)
    }

    /// Reports whether the cell holds no blocking occupant.
    #[must_use]
    pub fn is_free(&self, cell: CellCoord) -> bool {
        self.occupant(cell).is_none()
    }

    /// Reports whether the cell holds an obstacle.
    #[must_use]
    pub fn is_obstacle(&self, cell: CellCoord) -> bool {
        self.kind_at(cell) == Some(EntityKind::Obstacle)
    }

    /// Returns an iterator over all cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Option<Occupant>> + 'a {
        self.cells.iter().copied()
    }

    /// Dimensions of the underlying grid.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }
}

/// Head count of the world's population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Census {
    /// Living humans, armed or not.
    pub humans: usize,
    /// Living humans carrying a weapon.
    pub armed_humans: usize,
    /// Zombies.
    pub zombies: usize,
    /// Obstacle cells.
    pub obstacles: usize,
    /// Weapons still on the ground.
    pub weapons: usize,
}

#[cfg(test)]
mod tests {
    use super::{CellCoord, EntityId, EntityKind, GridSize, PlacementError, Step};
    use serde::{de::DeserializeOwned, Serialize};

    fn grid(width: u32, height: u32) -> GridSize {
        GridSize::new(width, height).expect("non-empty grid")
    }

    #[test]
    fn zero_sized_grids_are_rejected() {
        assert!(GridSize::new(0, 4).is_none());
        assert!(GridSize::new(4, 0).is_none());
    }

    #[test]
    fn offset_wraps_horizontally() {
        let size = grid(10, 6);
        assert_eq!(
            size.offset(CellCoord::new(9, 3), Step::EAST),
            CellCoord::new(0, 3)
        );
        assert_eq!(
            size.offset(CellCoord::new(0, 3), Step::WEST),
            CellCoord::new(9, 3)
        );
    }

    #[test]
    fn offset_wraps_vertically() {
        let size = grid(10, 6);
        assert_eq!(
            size.offset(CellCoord::new(4, 5), Step::SOUTH),
            CellCoord::new(4, 0)
        );
        assert_eq!(
            size.offset(CellCoord::new(4, 0), Step::NORTH),
            CellCoord::new(4, 5)
        );
    }

    #[test]
    fn displacement_takes_the_short_way_around() {
        let size = grid(10, 10);
        assert_eq!(
            size.displacement(CellCoord::new(9, 5), CellCoord::new(1, 5)),
            (2, 0)
        );
        assert_eq!(
            size.displacement(CellCoord::new(1, 1), CellCoord::new(1, 8)),
            (0, -3)
        );
        assert_eq!(
            size.displacement(CellCoord::new(0, 0), CellCoord::new(5, 5)),
            (5, 5)
        );
    }

    #[test]
    fn distance_is_symmetric_and_wrapped() {
        let size = grid(10, 10);
        let a = CellCoord::new(0, 0);
        let b = CellCoord::new(9, 8);
        assert_eq!(size.distance(a, b), 3);
        assert_eq!(size.distance(b, a), 3);
    }

    #[test]
    fn step_toward_follows_axis_signs() {
        assert_eq!(Step::toward(4, -2), Step::new(1, -1));
        assert_eq!(Step::toward(0, 7), Step::SOUTH);
        assert!(Step::toward(0, 0).is_stay());
        assert_eq!(Step::EAST.reversed(), Step::WEST);
    }

    #[test]
    fn index_wraps_out_of_range_coordinates() {
        let size = grid(4, 3);
        assert_eq!(size.index(CellCoord::new(1, 2)), 9);
        assert_eq!(size.index(CellCoord::new(5, 3)), 1);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn identifiers_and_cells_round_trip_through_bincode() {
        assert_round_trip(&EntityId::new(42));
        assert_round_trip(&CellCoord::new(5, 7));
        assert_round_trip(&EntityKind::Zombie);
        assert_round_trip(&PlacementError::BlockedByObstacle);
    }
}
