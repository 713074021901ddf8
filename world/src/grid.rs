//! Dense toroidal occupancy index used by the world crate.

use outbreak_core::{CellCoord, EntityId, EntityKind, GridSize, Occupant, OccupancyView};

use crate::WorldError;

/// Maps every cell to at most one blocking occupant.
///
/// Coordinates are wrapped onto the torus before every lookup, so callers may
/// pass cells produced by unchecked offset arithmetic.
#[derive(Clone, Debug)]
pub(crate) struct SpatialIndex {
    size: GridSize,
    cells: Vec<Option<Occupant>>,
}

impl SpatialIndex {
    pub(crate) fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![None; size.cell_count()],
        }
    }

    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<Occupant> {
        self.cells.get(self.size.index(cell)).copied().flatten()
    }

    /// Records `occupant` at `cell`, refusing to overwrite another occupant.
    pub(crate) fn place(
        &mut self,
        cell: CellCoord,
        id: EntityId,
        kind: EntityKind,
    ) -> Result<(), WorldError> {
        let index = self.size.index(cell);
        let Some(slot) = self.cells.get_mut(index) else {
            return Err(WorldError::CellOccupied { cell, entity: id });
        };

        match slot {
            Some(existing) if existing.id != id => Err(WorldError::CellOccupied { cell, entity: id }),
            _ => {
                *slot = Some(Occupant { id, kind });
                Ok(())
            }
        }
    }

    /// Empties `cell` only if it currently points at `expected`.
    pub(crate) fn clear(&mut self, cell: CellCoord, expected: EntityId) -> bool {
        let index = self.size.index(cell);
        match self.cells.get_mut(index) {
            Some(slot) if slot.is_some_and(|occupant| occupant.id == expected) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Changes the recorded kind of the occupant at `cell` without moving it.
    pub(crate) fn retag(&mut self, cell: CellCoord, id: EntityId, kind: EntityKind) -> bool {
        let index = self.size.index(cell);
        match self.cells.get_mut(index) {
            Some(Some(occupant)) if occupant.id == id => {
                occupant.kind = kind;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn view(&self) -> OccupancyView<'_> {
        OccupancyView::new(&self.cells, self.size)
    }
}
