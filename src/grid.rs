use std::collections::BTreeMap;

use itertools::Itertools;
use itertools::MinMaxResult;

use coords::Coord;
use coords::Orientation;

/// The truth of a cell: what it really is, immutable after load.
/// Full is rendered blue in the game, Empty black.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    Full,
    Empty,
}

/// Derived hint data, recomputed by [hints::full_update] and cleared by the
/// mutation paths that invalidate it.
#[derive(Clone, Debug, PartialEq)]
pub struct Hint {
    pub members: Vec<Coord>,
    pub value: usize,
    pub together: Option<bool>,
}

/// A single hexagonal cell.
/// `display` is what the player currently sees; `None` is a covered cell.
/// A displayed state never contradicts `kind`: wrong reveals are counted as
/// mistakes by the scene and leave the cell covered.
#[derive(Clone, Debug)]
pub struct Cell {
    pub kind: Kind,
    pub revealed: bool,
    /// 0 no number, 1 a bare count, 2 a count plus a together flag.
    pub show_info: u8,
    display: Option<Kind>,
    pub memo: Option<Hint>,
}

impl Cell {
    pub fn new(kind: Kind, revealed: bool, show_info: u8) -> Cell {
        assert!(show_info <= 2);
        Cell {
            kind,
            revealed,
            show_info,
            display: if revealed { Some(kind) } else { None },
            memo: None,
        }
    }

    pub fn display(&self) -> Option<Kind> {
        self.display
    }

    /// Uncover the cell. The scene is responsible for only calling this with
    /// the true kind.
    pub fn set_display(&mut self, display: Option<Kind>) {
        if let Some(kind) = display {
            assert_eq!(kind, self.kind);
        }
        self.display = display;
    }

    /// The hint number, when the cell shows one.
    pub fn value(&self) -> Option<usize> {
        if self.show_info >= 1 {
            self.memo.as_ref().map(|m| m.value)
        } else {
            None
        }
    }

    /// The together flag, when the cell shows one.
    pub fn together(&self) -> Option<bool> {
        if self.show_info == 2 {
            self.memo.as_ref().and_then(|m| m.together)
        } else {
            None
        }
    }

    pub fn members(&self) -> &[Coord] {
        match self.memo {
            Some(ref m) => &m.members,
            None => &[],
        }
    }
}

/// A column marker: a number floating outside the grid that constrains the
/// ray of cells in its direction.
#[derive(Clone, Debug)]
pub struct Column {
    pub orientation: Orientation,
    /// Whether the number carries a together flag.
    pub show_info: bool,
    pub memo: Option<Hint>,
}

impl Column {
    pub fn new(orientation: Orientation, show_info: bool) -> Column {
        Column {
            orientation,
            show_info,
            memo: None,
        }
    }

    pub fn value(&self) -> Option<usize> {
        self.memo.as_ref().map(|m| m.value)
    }

    pub fn together(&self) -> Option<bool> {
        if self.show_info {
            self.memo.as_ref().and_then(|m| m.together)
        } else {
            None
        }
    }

    pub fn members(&self) -> &[Coord] {
        match self.memo {
            Some(ref m) => &m.members,
            None => &[],
        }
    }
}

#[derive(Clone, Debug)]
pub enum Entity {
    Cell(Cell),
    Column(Column),
}

impl Entity {
    pub fn as_cell(&self) -> Option<&Cell> {
        match self {
            Entity::Cell(cell) => Some(cell),
            Entity::Column(_) => None,
        }
    }

    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Entity::Cell(_) => None,
            Entity::Column(col) => Some(col),
        }
    }
}

/// Axis-aligned bounding box of the placed entities, inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: Coord,
    pub max: Coord,
}

impl Bounds {
    pub fn width(&self) -> isize {
        self.max.x() - self.min.x() + 1
    }
    pub fn height(&self) -> isize {
        self.max.y() - self.min.y() + 1
    }
    pub fn contains(&self, c: &Coord) -> bool {
        self.min.x() <= c.x() && c.x() <= self.max.x() && self.min.y() <= c.y() && c.y() <= self.max.y()
    }
}

/// Sparse mapping from coordinates to entities. Placement always succeeds and
/// replaces any occupant; geometric conflict policy belongs to the editor.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    map: BTreeMap<Coord, Entity>,
    bounds_memo: Option<Option<Bounds>>,
}

impl Grid {
    pub fn new() -> Grid {
        Grid {
            map: BTreeMap::new(),
            bounds_memo: None,
        }
    }

    pub fn place(&mut self, coord: Coord, entity: Entity) -> Option<Entity> {
        self.bounds_memo = None;
        self.map.insert(coord, entity)
    }

    pub fn remove(&mut self, coord: &Coord) -> Option<Entity> {
        self.bounds_memo = None;
        self.map.remove(coord)
    }

    pub fn at(&self, coord: &Coord) -> Option<&Entity> {
        self.map.get(coord)
    }

    pub fn at_mut(&mut self, coord: &Coord) -> Option<&mut Entity> {
        self.map.get_mut(coord)
    }

    pub fn cell(&self, coord: &Coord) -> Option<&Cell> {
        self.at(coord).and_then(Entity::as_cell)
    }

    pub fn cell_mut(&mut self, coord: &Coord) -> Option<&mut Cell> {
        match self.at_mut(coord) {
            Some(&mut Entity::Cell(ref mut cell)) => Some(cell),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Coord, &Entity)> {
        self.map.iter()
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = (&Coord, &Cell)> {
        self.map
            .iter()
            .filter_map(|(c, e)| e.as_cell().map(|cell| (c, cell)))
    }

    pub fn iter_columns(&self) -> impl Iterator<Item = (&Coord, &Column)> {
        self.map
            .iter()
            .filter_map(|(c, e)| e.as_column().map(|col| (c, col)))
    }

    pub fn coords(&self) -> Vec<Coord> {
        self.map.keys().cloned().collect()
    }

    /// Bounding box of all placed entities, `None` for an empty grid.
    /// Served from the memo when [recompute_bounds] ran since the last
    /// placement, computed fresh otherwise.
    pub fn bounds(&self) -> Option<Bounds> {
        match self.bounds_memo {
            Some(cached) => cached,
            None => self.compute_bounds(),
        }
    }

    pub fn recompute_bounds(&mut self) {
        self.bounds_memo = Some(self.compute_bounds());
    }

    fn compute_bounds(&self) -> Option<Bounds> {
        let span = |it: &mut dyn Iterator<Item = isize>| match it.minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(v) => Some((v, v)),
            MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
        };
        let (minx, maxx) = span(&mut self.map.keys().map(|c| c.x()))?;
        let (miny, maxy) = span(&mut self.map.keys().map(|c| c.y())).expect("non-empty");
        Some(Bounds {
            min: Coord::new(minx, miny),
            max: Coord::new(maxx, maxy),
        })
    }

    /// Entities at `coord` and at its four horizontal/vertical immediate
    /// neighbors. Cells on those slots overlap geometrically; the editor uses
    /// this to refuse conflicting placements.
    pub fn overlapping(&self, coord: &Coord) -> Vec<Coord> {
        let (x, y) = (coord.x(), coord.y());
        let slots = [
            Coord::new(x, y),
            Coord::new(x - 1, y),
            Coord::new(x + 1, y),
            Coord::new(x, y - 1),
            Coord::new(x, y + 1),
        ];
        slots
            .iter()
            .filter(|c| self.map.contains_key(*c))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_place_replaces() {
        let mut grid = Grid::new();
        let c = Coord::new(3, 3);
        assert!(grid.place(c, Entity::Cell(Cell::new(Kind::Full, false, 0))).is_none());
        let old = grid.place(c, Entity::Cell(Cell::new(Kind::Empty, true, 1)));
        assert!(old.is_some());
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.cell(&c).unwrap().kind, Kind::Empty);
    }

    #[test]
    pub fn test_bounds() {
        let mut grid = Grid::new();
        assert_eq!(grid.bounds(), None);
        grid.place(Coord::new(2, 5), Entity::Cell(Cell::new(Kind::Full, false, 0)));
        grid.place(Coord::new(7, 1), Entity::Cell(Cell::new(Kind::Empty, false, 0)));
        grid.recompute_bounds();
        let b = grid.bounds().unwrap();
        assert_eq!(b.min, Coord::new(2, 1));
        assert_eq!(b.max, Coord::new(7, 5));
        assert_eq!(b.width(), 6);
        assert_eq!(b.height(), 5);
        // Placement invalidates the memo
        grid.place(Coord::new(0, 0), Entity::Cell(Cell::new(Kind::Empty, false, 0)));
        assert_eq!(grid.bounds().unwrap().min, Coord::new(0, 0));
    }

    #[test]
    pub fn test_overlapping() {
        let mut grid = Grid::new();
        let c = Coord::new(4, 4);
        grid.place(c, Entity::Cell(Cell::new(Kind::Full, false, 0)));
        assert_eq!(grid.overlapping(&Coord::new(4, 4)), vec![c]);
        assert_eq!(grid.overlapping(&Coord::new(4, 5)), vec![c]);
        assert_eq!(grid.overlapping(&Coord::new(5, 4)), vec![c]);
        // Diagonal slots do not overlap
        assert!(grid.overlapping(&Coord::new(5, 5)).is_empty());
    }

    #[test]
    pub fn test_display_starts_from_revealed() {
        let covered = Cell::new(Kind::Full, false, 1);
        assert_eq!(covered.display(), None);
        let shown = Cell::new(Kind::Empty, true, 2);
        assert_eq!(shown.display(), Some(Kind::Empty));
    }
}
