#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that settles simultaneous moves competing for the same cells.

use std::collections::{BTreeMap, BTreeSet};

use outbreak_core::{
    CellCoord, Command, EntityId, EntityKind, EntityView, Intent, Movement, OccupancyView,
};
use tracing::debug;

/// Moves that won their destination and humans bitten along the way.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Successful moves in destination discovery order.
    pub moves: Vec<Movement>,
    /// Humans that turn into zombies at the end of the tick.
    pub infections: BTreeSet<EntityId>,
}

impl Resolution {
    /// Wraps the resolution into the command that commits it to the world.
    #[must_use]
    pub fn into_command(self) -> Command {
        Command::CommitMoves {
            moves: self.moves,
            infections: self.infections,
        }
    }
}

/// Resolves one tick worth of intents against the pre-move occupancy.
#[derive(Debug, Default)]
pub struct ConflictResolver {
    groups: Vec<(CellCoord, Vec<(EntityId, EntityKind)>)>,
    lookup: BTreeMap<CellCoord, usize>,
}

impl ConflictResolver {
    /// Creates a resolver with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups intents by destination and decides which of them succeed.
    ///
    /// Intents naming entities missing from `entities` are dropped. Groups are
    /// visited in the order their destination first appears in `intents`, and
    /// contenders inside a group keep their intent order.
    pub fn resolve(
        &mut self,
        intents: &[Intent],
        entities: &EntityView,
        occupancy: &OccupancyView<'_>,
    ) -> Resolution {
        self.group(intents, entities, occupancy);

        let mut resolution = Resolution::default();
        for (cell, contenders) in &self.groups {
            let occupant = occupancy.occupant(*cell);
            let occupant_kind = occupant.map(|occupant| occupant.kind);

            if occupant_kind == Some(EntityKind::Obstacle) {
                continue;
            }

            if let [(entity, kind)] = contenders.as_slice() {
                match (kind, occupant) {
                    (_, None) => resolution.moves.push(Movement {
                        entity: *entity,
                        to: *cell,
                    }),
                    (EntityKind::Zombie, Some(victim)) if victim.kind == EntityKind::Human => {
                        resolution.moves.push(Movement {
                            entity: *entity,
                            to: *cell,
                        });
                        let _ = resolution.infections.insert(victim.id);
                    }
                    _ => {}
                }
                continue;
            }

            let biter = contenders
                .iter()
                .find(|(_, kind)| *kind == EntityKind::Zombie)
                .map(|(entity, _)| *entity);
            match (occupant, biter) {
                (Some(victim), Some(zombie)) if victim.kind == EntityKind::Human => {
                    debug!(
                        zombie = zombie.get(),
                        human = victim.id.get(),
                        contenders = contenders.len(),
                        "zombie wins contested bite"
                    );
                    resolution.moves.push(Movement {
                        entity: zombie,
                        to: *cell,
                    });
                    let _ = resolution.infections.insert(victim.id);
                }
                _ => debug!(
                    column = cell.column(),
                    row = cell.row(),
                    contenders = contenders.len(),
                    "contested cell stays unclaimed"
                ),
            }
        }

        resolution
    }

    fn group(&mut self, intents: &[Intent], entities: &EntityView, occupancy: &OccupancyView<'_>) {
        self.groups.clear();
        self.lookup.clear();

        let size = occupancy.size();
        for intent in intents {
            let Some(kind) = entities.get(intent.entity).map(|entity| entity.kind) else {
                continue;
            };

            let cell = size.wrap_cell(intent.target);
            let next = self.groups.len();
            let slot = *self.lookup.entry(cell).or_insert(next);
            if slot == next {
                self.groups.push((cell, Vec::new()));
            }
            self.groups[slot].1.push((intent.entity, kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_core::{EntitySnapshot, GridSize, HumanSnapshot, Occupant};

    struct Board {
        size: GridSize,
        snapshots: Vec<EntitySnapshot>,
        cells: Vec<Option<Occupant>>,
    }

    impl Board {
        fn new() -> Self {
            let size = GridSize::new(10, 10).expect("non-empty grid");
            Self {
                size,
                snapshots: Vec::new(),
                cells: vec![None; size.cell_count()],
            }
        }

        fn put(&mut self, kind: EntityKind, column: u32, row: u32) -> EntityId {
            let id = EntityId::new(u32::try_from(self.snapshots.len()).expect("few entities"));
            let cell = CellCoord::new(column, row);
            self.cells[self.size.index(cell)] = Some(Occupant { id, kind });
            let human = (kind == EntityKind::Human).then_some(HumanSnapshot {
                armed: false,
                weapon_cooldown: 0,
                attacked_this_tick: false,
                heading: None,
            });
            self.snapshots.push(EntitySnapshot {
                id,
                kind,
                cell,
                human,
                pending_action: None,
            });
            id
        }

        fn resolve(&self, intents: &[Intent]) -> Resolution {
            let entities = EntityView::from_snapshots(self.snapshots.clone());
            let occupancy = OccupancyView::new(&self.cells, self.size);
            ConflictResolver::new().resolve(intents, &entities, &occupancy)
        }
    }

    fn intent(entity: EntityId, column: u32, row: u32) -> Intent {
        Intent {
            entity,
            target: CellCoord::new(column, row),
            heading: None,
        }
    }

    fn moved(entity: EntityId, column: u32, row: u32) -> Movement {
        Movement {
            entity,
            to: CellCoord::new(column, row),
        }
    }

    #[test]
    fn lone_movers_take_empty_cells() {
        let mut board = Board::new();
        let zombie = board.put(EntityKind::Zombie, 1, 1);
        let human = board.put(EntityKind::Human, 5, 5);

        let resolution = board.resolve(&[intent(zombie, 2, 2), intent(human, 5, 6)]);

        assert_eq!(resolution.moves, vec![moved(zombie, 2, 2), moved(human, 5, 6)]);
        assert!(resolution.infections.is_empty());
    }

    #[test]
    fn lone_zombie_bites_the_occupant() {
        let mut board = Board::new();
        let zombie = board.put(EntityKind::Zombie, 1, 1);
        let human = board.put(EntityKind::Human, 2, 1);

        let resolution = board.resolve(&[intent(zombie, 2, 1), intent(human, 2, 1)]);

        assert_eq!(resolution.moves, vec![moved(zombie, 2, 1)]);
        assert_eq!(resolution.infections, BTreeSet::from([human]));
    }

    #[test]
    fn occupied_cells_reject_single_movers() {
        let mut board = Board::new();
        let first = board.put(EntityKind::Zombie, 1, 1);
        let second = board.put(EntityKind::Zombie, 2, 1);
        let human = board.put(EntityKind::Human, 6, 6);
        let _ = board.put(EntityKind::Human, 6, 7);

        let resolution = board.resolve(&[intent(first, 2, 1), intent(human, 6, 7)]);

        assert!(resolution.moves.is_empty());
        assert!(resolution.infections.is_empty());
        assert_ne!(first, second);
    }

    #[test]
    fn humans_cannot_enter_zombie_cells() {
        let mut board = Board::new();
        let human = board.put(EntityKind::Human, 3, 3);
        let _ = board.put(EntityKind::Zombie, 3, 4);

        let resolution = board.resolve(&[intent(human, 3, 4)]);

        assert!(resolution.moves.is_empty());
    }

    #[test]
    fn obstacles_reject_every_contender() {
        let mut board = Board::new();
        let _ = board.put(EntityKind::Obstacle, 4, 4);
        let zombie = board.put(EntityKind::Zombie, 3, 4);
        let human = board.put(EntityKind::Human, 4, 5);

        let single = board.resolve(&[intent(zombie, 4, 4)]);
        let contested = board.resolve(&[intent(zombie, 4, 4), intent(human, 4, 4)]);

        assert!(single.moves.is_empty());
        assert!(contested.moves.is_empty());
    }

    #[test]
    fn contested_empty_cell_stays_empty() {
        let mut board = Board::new();
        let first = board.put(EntityKind::Zombie, 0, 0);
        let second = board.put(EntityKind::Zombie, 2, 0);

        let resolution = board.resolve(&[intent(first, 1, 1), intent(second, 1, 1)]);

        assert_eq!(resolution, Resolution::default());
    }

    #[test]
    fn first_zombie_wins_a_contested_bite() {
        let mut board = Board::new();
        let human = board.put(EntityKind::Human, 5, 5);
        let other = board.put(EntityKind::Human, 5, 4);
        let late = board.put(EntityKind::Zombie, 6, 5);
        let early = board.put(EntityKind::Zombie, 4, 5);

        let resolution = board.resolve(&[
            intent(other, 5, 5),
            intent(early, 5, 5),
            intent(late, 5, 5),
        ]);

        assert_eq!(resolution.moves, vec![moved(early, 5, 5)]);
        assert_eq!(resolution.infections, BTreeSet::from([human]));
    }

    #[test]
    fn attack_in_place_is_not_a_move() {
        let mut board = Board::new();
        let human = board.put(EntityKind::Human, 2, 2);

        let resolution = board.resolve(&[intent(human, 2, 2)]);

        assert!(resolution.moves.is_empty());
    }

    #[test]
    fn unknown_entities_are_ignored() {
        let mut board = Board::new();
        let zombie = board.put(EntityKind::Zombie, 0, 0);

        let resolution = board.resolve(&[
            intent(EntityId::new(77), 1, 0),
            intent(zombie, 1, 0),
        ]);

        assert_eq!(resolution.moves, vec![moved(zombie, 1, 0)]);
    }

    #[test]
    fn targets_wrap_before_grouping() {
        let mut board = Board::new();
        let first = board.put(EntityKind::Zombie, 9, 3);
        let second = board.put(EntityKind::Zombie, 1, 3);

        let resolution = board.resolve(&[intent(first, 10, 3), intent(second, 0, 3)]);

        assert!(resolution.moves.is_empty());
    }

    #[test]
    fn resolution_becomes_a_commit_command() {
        let mut board = Board::new();
        let zombie = board.put(EntityKind::Zombie, 0, 0);
        let resolution = board.resolve(&[intent(zombie, 0, 1)]);

        assert_eq!(
            resolution.into_command(),
            Command::CommitMoves {
                moves: vec![moved(zombie, 0, 1)],
                infections: BTreeSet::new(),
            }
        );
    }
}
