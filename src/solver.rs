use std::collections::BTreeMap;

use coords::Coord;
use grid::Grid;
use grid::Kind;

/// Direct arithmetic elimination over the exposed hints.
///
/// Scans the revealed cells carrying a number (in grid order) and then the
/// columns, over and over until no constraint yields anything new. When a
/// number is already satisfied its covered members are Empty; when the
/// complement is satisfied they are Full. Conclusions are buffered, never
/// applied: the caller owns the scene mutation.
pub fn solve_simple(grid: &Grid) -> Vec<(Coord, Kind)> {
    let mut conclusions: Vec<(Coord, Kind)> = vec![];
    let mut concluded: BTreeMap<Coord, Kind> = BTreeMap::new();

    let mut sources: Vec<(Vec<Coord>, usize)> = vec![];
    for (_, cell) in grid.iter_cells() {
        if cell.display().is_none() {
            continue;
        }
        if let Some(value) = cell.value() {
            sources.push((cell.members().to_vec(), value));
        }
    }
    for (_, col) in grid.iter_columns() {
        sources.push((col.members().to_vec(), col.value().expect("hints recomputed")));
    }

    loop {
        let mut progress = false;
        for (members, value) in &sources {
            let mut full = 0;
            let mut empty = 0;
            let mut covered: Vec<Coord> = vec![];
            for member in members {
                let state = grid
                    .cell(member)
                    .expect("member is a cell")
                    .display()
                    .or_else(|| concluded.get(member).cloned());
                match state {
                    Some(Kind::Full) => full += 1,
                    Some(Kind::Empty) => empty += 1,
                    None => covered.push(*member),
                }
            }
            if covered.is_empty() {
                continue;
            }
            let forced = if *value == full {
                Some(Kind::Empty)
            } else if members.len() - value == empty {
                Some(Kind::Full)
            } else {
                None
            };
            if let Some(kind) = forced {
                for coord in covered {
                    concluded.insert(coord, kind);
                    conclusions.push((coord, kind));
                }
                progress = true;
            }
        }
        if !progress {
            break;
        }
    }
    conclusions
}

#[cfg(test)]
mod tests {
    use super::*;
    use coords::Orientation;
    use grid::Cell;
    use grid::Column;
    use grid::Entity;
    use hints;

    fn place_cell(grid: &mut Grid, x: isize, y: isize, kind: Kind, revealed: bool, show_info: u8) {
        grid.place(
            Coord::new(x, y),
            Entity::Cell(Cell::new(kind, revealed, show_info)),
        );
    }

    #[test]
    pub fn test_row_of_three_forces_the_middle() {
        // Two revealed blacks, each seeing only the covered blue between
        // them, each counting one Full.
        let mut grid = Grid::new();
        place_cell(&mut grid, 15, 15, Kind::Empty, true, 1);
        place_cell(&mut grid, 16, 16, Kind::Full, false, 0);
        place_cell(&mut grid, 17, 15, Kind::Empty, true, 1);
        hints::full_update(&mut grid);
        let conclusions = solve_simple(&grid);
        assert_eq!(conclusions, vec![(Coord::new(16, 16), Kind::Full)]);
    }

    #[test]
    pub fn test_zero_count_empties_the_neighborhood() {
        let mut grid = Grid::new();
        place_cell(&mut grid, 16, 16, Kind::Empty, true, 1);
        place_cell(&mut grid, 16, 14, Kind::Empty, false, 0);
        place_cell(&mut grid, 17, 17, Kind::Empty, false, 0);
        hints::full_update(&mut grid);
        let conclusions = solve_simple(&grid);
        assert_eq!(conclusions.len(), 2);
        assert!(conclusions.iter().all(|(_, kind)| *kind == Kind::Empty));
    }

    #[test]
    pub fn test_column_forces_when_ends_are_known() {
        // A column over three cells of which two are displayed Empty: the
        // covered middle carries the whole count.
        let mut grid = Grid::new();
        grid.place(
            Coord::new(10, 8),
            Entity::Column(Column::new(Orientation::Bottom, false)),
        );
        place_cell(&mut grid, 10, 10, Kind::Empty, true, 0);
        place_cell(&mut grid, 10, 12, Kind::Full, false, 0);
        place_cell(&mut grid, 10, 14, Kind::Empty, true, 0);
        hints::full_update(&mut grid);
        let conclusions = solve_simple(&grid);
        assert_eq!(conclusions, vec![(Coord::new(10, 12), Kind::Full)]);
    }

    #[test]
    pub fn test_conclusions_cascade_within_one_call() {
        // A zero column empties one neighbor of the revealed black, which
        // then pins its count on the other.
        let mut grid = Grid::new();
        place_cell(&mut grid, 17, 15, Kind::Empty, true, 1);
        place_cell(&mut grid, 16, 14, Kind::Empty, false, 0);
        place_cell(&mut grid, 18, 14, Kind::Full, false, 0);
        grid.place(
            Coord::new(16, 10),
            Entity::Column(Column::new(Orientation::Bottom, false)),
        );
        hints::full_update(&mut grid);
        let conclusions = solve_simple(&grid);
        assert_eq!(
            conclusions,
            vec![
                (Coord::new(16, 14), Kind::Empty),
                (Coord::new(18, 14), Kind::Full),
            ]
        );
    }

    #[test]
    pub fn test_ambiguous_hints_stall() {
        // One Full among two symmetric covered neighbors: nothing to deduce.
        let mut grid = Grid::new();
        place_cell(&mut grid, 16, 16, Kind::Empty, true, 1);
        place_cell(&mut grid, 16, 14, Kind::Full, false, 0);
        place_cell(&mut grid, 16, 18, Kind::Empty, false, 0);
        hints::full_update(&mut grid);
        assert!(solve_simple(&grid).is_empty());
    }
}
