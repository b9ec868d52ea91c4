use std::collections::BTreeSet;
use std::error::Error;

use codec::Level;
use coords::Coord;
use coords::Orientation;
use errors::GridConflict;
use grid::Cell;
use grid::Column;
use grid::Entity;
use grid::Grid;
use grid::Kind;
use hints;

pub const DEFAULT_UNDO_LENGTH: usize = 16;

/// Design-time state around a level: a selection and a bounded history of
/// grid snapshots. Every edit pushes one snapshot; undo and redo swap the
/// whole grid back in and recompute the hints.
pub struct Editor {
    pub level: Level,
    selection: BTreeSet<Coord>,
    undo_history: Vec<Grid>,
    undo_pos: usize,
    pub undo_history_length: usize,
}

impl Editor {
    pub fn new(level: Level) -> Editor {
        let snapshot = level.grid.clone();
        Editor {
            level,
            selection: BTreeSet::new(),
            undo_history: vec![snapshot],
            undo_pos: 0,
            undo_history_length: DEFAULT_UNDO_LENGTH,
        }
    }

    pub fn empty() -> Editor {
        Editor::new(Level {
            title: String::new(),
            author: String::new(),
            information: String::new(),
            grid: Grid::new(),
        })
    }

    fn undo_step(&mut self) {
        self.undo_history.truncate(self.undo_pos + 1);
        self.undo_history.push(self.level.grid.clone());
        self.undo_pos = self.undo_history.len() - 1;
        if self.undo_history_length > 0 && self.undo_history.len() > self.undo_history_length {
            self.undo_history.remove(0);
            self.undo_pos -= 1;
        }
    }

    pub fn undo(&mut self) -> bool {
        if self.undo_pos == 0 {
            return false;
        }
        self.undo_pos -= 1;
        self.level.grid = self.undo_history[self.undo_pos].clone();
        hints::full_update(&mut self.level.grid);
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.undo_pos + 1 >= self.undo_history.len() {
            return false;
        }
        self.undo_pos += 1;
        self.level.grid = self.undo_history[self.undo_pos].clone();
        hints::full_update(&mut self.level.grid);
        true
    }

    /// Refuse a placement that would geometrically collide with an entity on
    /// a half-step slot. The occupant of the exact coord is replaced instead.
    fn check_conflicts(&self, coord: &Coord) -> Result<(), Box<dyn Error>> {
        let colliding = self
            .level
            .grid
            .overlapping(coord)
            .into_iter()
            .any(|c| c != *coord);
        if colliding {
            Err(Box::new(GridConflict))
        } else {
            Ok(())
        }
    }

    pub fn place_cell(
        &mut self,
        coord: Coord,
        kind: Kind,
        revealed: bool,
        show_info: u8,
    ) -> Result<(), Box<dyn Error>> {
        self.check_conflicts(&coord)?;
        self.level
            .grid
            .place(coord, Entity::Cell(Cell::new(kind, revealed, show_info)));
        hints::full_update(&mut self.level.grid);
        self.undo_step();
        Ok(())
    }

    pub fn place_column(
        &mut self,
        coord: Coord,
        orientation: Orientation,
        show_info: bool,
    ) -> Result<(), Box<dyn Error>> {
        self.check_conflicts(&coord)?;
        self.level
            .grid
            .place(coord, Entity::Column(Column::new(orientation, show_info)));
        hints::full_update(&mut self.level.grid);
        self.undo_step();
        Ok(())
    }

    /// Columns attached to the cell at `coord`: markers whose ray meets it
    /// first. Derived from geometry, not stored.
    fn anchored_columns(&self, coord: &Coord) -> Vec<Coord> {
        self.level
            .grid
            .iter_columns()
            .filter(|(c, col)| {
                hints::column_members(&self.level.grid, c, col.orientation).first() == Some(coord)
            })
            .map(|(c, _)| *c)
            .collect()
    }

    /// Remove the entity at `coord`; removing a cell takes its anchored
    /// columns with it.
    pub fn remove(&mut self, coord: &Coord) {
        let anchored = match self.level.grid.at(coord) {
            Some(Entity::Cell(_)) => self.anchored_columns(coord),
            _ => vec![],
        };
        self.level.grid.remove(coord);
        for c in anchored {
            self.level.grid.remove(&c);
        }
        self.selection.remove(coord);
        hints::invalidate_all(&mut self.level.grid);
        hints::full_update(&mut self.level.grid);
        self.undo_step();
    }

    /// Swap the truth of a cell between blue and black.
    pub fn toggle_kind(&mut self, coord: &Coord) {
        if let Some(cell) = self.level.grid.cell_mut(coord) {
            cell.kind = match cell.kind {
                Kind::Full => Kind::Empty,
                Kind::Empty => Kind::Full,
            };
            hints::invalidate_kind_change(&mut self.level.grid, coord);
            hints::full_update(&mut self.level.grid);
            self.undo_step();
        }
    }

    /// Advance the hint level of a cell: none, number, number with flag.
    pub fn cycle_show_info(&mut self, coord: &Coord) {
        if let Some(cell) = self.level.grid.cell_mut(coord) {
            cell.show_info = (cell.show_info + 1) % 3;
            cell.memo = None;
            hints::full_update(&mut self.level.grid);
            self.undo_step();
        }
    }

    pub fn toggle_column_info(&mut self, coord: &Coord) {
        if let Some(&mut Entity::Column(ref mut col)) = self.level.grid.at_mut(coord) {
            col.show_info = !col.show_info;
            col.memo = None;
            hints::full_update(&mut self.level.grid);
            self.undo_step();
        }
    }

    pub fn selection(&self) -> &BTreeSet<Coord> {
        &self.selection
    }

    pub fn select(&mut self, coord: Coord, selected: bool) {
        if selected {
            if self.level.grid.at(&coord).is_some() {
                self.selection.insert(coord);
            }
        } else {
            self.selection.remove(&coord);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Translate the selected cells (and their anchored columns) as a group.
    /// Accepted only when every target coord is free or vacated by the group
    /// itself; otherwise nothing moves.
    pub fn move_selection(&mut self, dx: isize, dy: isize) -> Result<(), Box<dyn Error>> {
        if self.selection.is_empty() || (dx == 0 && dy == 0) {
            return Ok(());
        }
        let mut moved: BTreeSet<Coord> = self.selection.clone();
        for coord in &self.selection {
            for c in self.anchored_columns(coord) {
                moved.insert(c);
            }
        }
        for coord in &moved {
            let target = coord.translate(dx, dy);
            if self.level.grid.at(&target).is_some() && !moved.contains(&target) {
                return Err(Box::new(GridConflict));
            }
        }
        let mut carried: Vec<(Coord, Entity)> = vec![];
        for coord in &moved {
            let entity = self.level.grid.remove(coord).expect("moved entity placed");
            carried.push((coord.translate(dx, dy), entity));
        }
        for (coord, entity) in carried {
            self.level.grid.place(coord, entity);
        }
        self.selection = self.selection.iter().map(|c| c.translate(dx, dy)).collect();
        hints::invalidate_all(&mut self.level.grid);
        hints::full_update(&mut self.level.grid);
        self.undo_step();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grids_match(a: &Grid, b: &Grid) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b.iter()).all(|((ca, ea), (cb, eb))| {
            ca == cb
                && match (ea, eb) {
                    (Entity::Cell(x), Entity::Cell(y)) => {
                        x.kind == y.kind && x.show_info == y.show_info && x.revealed == y.revealed
                    }
                    (Entity::Column(x), Entity::Column(y)) => {
                        x.orientation == y.orientation && x.show_info == y.show_info
                    }
                    _ => false,
                }
        })
    }

    #[test]
    pub fn test_place_and_undo_restores_structure() {
        let mut editor = Editor::empty();
        editor
            .place_cell(Coord::new(16, 16), Kind::Full, false, 0)
            .unwrap();
        let before = editor.level.grid.clone();
        editor
            .place_cell(Coord::new(16, 14), Kind::Empty, false, 1)
            .unwrap();
        assert_eq!(editor.level.grid.len(), 2);
        assert!(editor.undo());
        assert!(grids_match(&editor.level.grid, &before));
        assert!(editor.redo());
        assert_eq!(editor.level.grid.len(), 2);
    }

    #[test]
    pub fn test_half_step_placement_conflicts() {
        let mut editor = Editor::empty();
        editor
            .place_cell(Coord::new(16, 16), Kind::Full, false, 0)
            .unwrap();
        let err = editor
            .place_cell(Coord::new(16, 17), Kind::Empty, false, 0)
            .err()
            .expect("overlaps");
        assert!(err.downcast::<GridConflict>().is_ok());
        assert_eq!(editor.level.grid.len(), 1);
        // The same slot is replaced, not refused
        editor
            .place_cell(Coord::new(16, 16), Kind::Empty, false, 0)
            .unwrap();
        assert_eq!(editor.level.grid.len(), 1);
        assert_eq!(
            editor.level.grid.cell(&Coord::new(16, 16)).unwrap().kind,
            Kind::Empty
        );
    }

    #[test]
    pub fn test_undo_history_is_bounded() {
        let mut editor = Editor::empty();
        editor.undo_history_length = 4;
        for i in 0..10 {
            editor
                .place_cell(Coord::new(i * 2, 16), Kind::Full, false, 0)
                .unwrap();
        }
        assert!(editor.undo_history.len() <= 4);
        // Only the retained steps can be undone
        let mut undos = 0;
        while editor.undo() {
            undos += 1;
        }
        assert_eq!(undos, 3);
    }

    #[test]
    pub fn test_remove_takes_anchored_column() {
        let mut editor = Editor::empty();
        editor
            .place_cell(Coord::new(16, 16), Kind::Full, false, 0)
            .unwrap();
        editor
            .place_column(Coord::new(16, 14), Orientation::Bottom, false)
            .unwrap();
        assert_eq!(editor.level.grid.len(), 2);
        editor.remove(&Coord::new(16, 16));
        assert!(editor.level.grid.is_empty());
    }

    #[test]
    pub fn test_group_move_rejects_collisions() {
        let mut editor = Editor::empty();
        editor
            .place_cell(Coord::new(10, 10), Kind::Full, false, 0)
            .unwrap();
        editor
            .place_cell(Coord::new(14, 10), Kind::Empty, false, 0)
            .unwrap();
        editor.select(Coord::new(10, 10), true);
        let err = editor.move_selection(4, 0).err().expect("target occupied");
        assert!(err.downcast::<GridConflict>().is_ok());
        assert!(editor.level.grid.cell(&Coord::new(10, 10)).is_some());

        // Moving both is fine: each target is vacated by the group
        editor.select(Coord::new(14, 10), true);
        editor.move_selection(4, 0).unwrap();
        assert!(editor.level.grid.cell(&Coord::new(14, 10)).is_some());
        assert!(editor.level.grid.cell(&Coord::new(18, 10)).is_some());
        assert!(editor.level.grid.cell(&Coord::new(10, 10)).is_none());
    }

    #[test]
    pub fn test_toggle_kind_refreshes_hints() {
        let mut editor = Editor::empty();
        editor
            .place_cell(Coord::new(16, 16), Kind::Empty, true, 1)
            .unwrap();
        editor
            .place_cell(Coord::new(16, 14), Kind::Empty, false, 0)
            .unwrap();
        assert_eq!(
            editor.level.grid.cell(&Coord::new(16, 16)).unwrap().value(),
            Some(0)
        );
        editor.toggle_kind(&Coord::new(16, 14));
        assert_eq!(
            editor.level.grid.cell(&Coord::new(16, 16)).unwrap().value(),
            Some(1)
        );
    }
}
