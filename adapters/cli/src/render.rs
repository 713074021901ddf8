//! ASCII frames of the grid for terminal output.

use std::collections::BTreeSet;

use outbreak_core::{CellCoord, EntityKind};
use outbreak_world::{query, World};

/// Renders one character per cell, one line per row.
///
/// Blocking occupants hide any weapon lying beneath them.
pub(crate) fn frame(world: &World) -> String {
    let size = query::size(world);
    let weapons: BTreeSet<CellCoord> = query::weapon_view(world)
        .iter()
        .map(|weapon| weapon.cell)
        .collect();
    let armed: BTreeSet<CellCoord> = query::entity_view(world)
        .iter()
        .filter(|entity| entity.is_armed_human())
        .map(|entity| entity.cell)
        .collect();
    let occupancy = query::occupancy_view(world);

    let width = usize::try_from(size.width()).unwrap_or(0);
    let height = usize::try_from(size.height()).unwrap_or(0);
    let mut frame = String::with_capacity((width + 1) * height);
    for row in 0..size.height() {
        for column in 0..size.width() {
            let cell = CellCoord::new(column, row);
            let glyph = match occupancy.kind_at(cell) {
                Some(EntityKind::Obstacle) => '#',
                Some(EntityKind::Zombie) => 'Z',
                Some(EntityKind::Human) if armed.contains(&cell) => 'A',
                Some(EntityKind::Human) => 'H',
                None if weapons.contains(&cell) => 'w',
                None => '.',
            };
            frame.push(glyph);
        }
        frame.push('\n');
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_core::{Command, Spawn};
    use outbreak_world as world;

    fn place(world: &mut World, command: Command) {
        let mut events = Vec::new();
        world::apply(world, command, &mut events).expect("placement applies");
    }

    #[test]
    fn frame_draws_every_glyph() {
        let mut world = World::with_dimensions(4, 2).expect("non-empty grid");
        let spawns = [
            (Spawn::Obstacle, CellCoord::new(0, 0)),
            (Spawn::Zombie, CellCoord::new(1, 0)),
            (Spawn::Human { armed: false }, CellCoord::new(2, 0)),
            (Spawn::Human { armed: true }, CellCoord::new(3, 0)),
        ];
        for (spawn, cell) in spawns {
            place(&mut world, Command::SpawnEntity { spawn, cell });
        }
        place(
            &mut world,
            Command::PlaceWeapon {
                cell: CellCoord::new(1, 1),
            },
        );
        place(
            &mut world,
            Command::PlaceWeapon {
                cell: CellCoord::new(2, 0),
            },
        );

        assert_eq!(frame(&world), "#ZHA\n.w..\n");
    }
}
