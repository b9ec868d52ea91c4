use std::collections::BTreeSet;

use coords::Coord;
use coords::Orientation;
use grid::Entity;
use grid::Grid;
use grid::Hint;
use grid::Kind;

/// Are all the items in one group under direct hex adjacency?
pub fn all_grouped(items: &BTreeSet<Coord>) -> bool {
    let first = match items.iter().next() {
        None => return true,
        Some(c) => *c,
    };
    let mut grouped = BTreeSet::new();
    grouped.insert(first);
    let mut anything_to_add = true;
    while anything_to_add {
        anything_to_add = false;
        for c in items {
            if grouped.contains(c) {
                continue;
            }
            if grouped.iter().any(|g| g.is_neighbor(c)) {
                grouped.insert(*c);
                anything_to_add = true;
            }
        }
    }
    grouped.len() == items.len()
}

/// One contiguous run: the marked positions of the ordered member list have
/// no gap between the first and the last.
fn one_run(full: &[bool]) -> bool {
    let first = full.iter().position(|f| *f);
    let last = full.iter().rposition(|f| *f);
    match (first, last) {
        (Some(first), Some(last)) => full[first..=last].iter().all(|f| *f),
        _ => true,
    }
}

/// Member coords of a cell: the direct neighborhood for an Empty cell, the
/// two-ring flower for a Full cell, clockwise starting from north, restricted
/// to cells present in the grid.
pub fn cell_members(grid: &Grid, coord: &Coord, kind: Kind) -> Vec<Coord> {
    let ring: Vec<Coord> = match kind {
        Kind::Empty => coord.neighbors6().to_vec(),
        Kind::Full => coord.neighbors18().to_vec(),
    };
    ring.into_iter().filter(|c| grid.cell(c).is_some()).collect()
}

/// Member coords of a column: walk from the marker in its direction,
/// collecting the cells encountered, until the cursor leaves the grid bounds.
pub fn column_members(grid: &Grid, coord: &Coord, orientation: Orientation) -> Vec<Coord> {
    let bounds = match grid.bounds() {
        None => return vec![],
        Some(bounds) => bounds,
    };
    let (dx, dy) = orientation.step();
    let mut members = vec![];
    let mut cursor = coord.translate(dx, dy);
    while bounds.contains(&cursor) {
        if grid.cell(&cursor).is_some() {
            members.push(cursor);
        }
        cursor = cursor.translate(dx, dy);
    }
    members
}

fn hint_of_members(grid: &Grid, members: Vec<Coord>, ordered: bool) -> Hint {
    let full: Vec<bool> = members
        .iter()
        .map(|c| grid.cell(c).expect("member is a cell").kind == Kind::Full)
        .collect();
    let value = full.iter().filter(|f| **f).count();
    let together = if ordered {
        // Column semantics: one maximal run of Fulls in the ordered list.
        Some(one_run(&full))
    } else {
        // Cell semantics: the Full members form one component under adjacency.
        let fulls: BTreeSet<Coord> = members
            .iter()
            .zip(full.iter())
            .filter_map(|(c, f)| if *f { Some(*c) } else { None })
            .collect();
        Some(all_grouped(&fulls))
    };
    Hint {
        members,
        value,
        together,
    }
}

pub fn cell_hint(grid: &Grid, coord: &Coord, kind: Kind) -> Hint {
    let members = cell_members(grid, coord, kind);
    hint_of_members(grid, members, false)
}

pub fn column_hint(grid: &Grid, coord: &Coord, orientation: Orientation) -> Hint {
    let members = column_members(grid, coord, orientation);
    hint_of_members(grid, members, true)
}

/// Recompute the bounds memo and every entity's hint memo. Mutation paths
/// clear memos; callers run this before handing the grid to a solver.
pub fn full_update(grid: &mut Grid) {
    grid.recompute_bounds();
    let mut hints: Vec<(Coord, Hint)> = vec![];
    for (coord, entity) in grid.iter() {
        let hint = match entity {
            Entity::Cell(cell) => cell_hint(grid, coord, cell.kind),
            Entity::Column(col) => column_hint(grid, coord, col.orientation),
        };
        hints.push((*coord, hint));
    }
    for (coord, hint) in hints {
        match grid.at_mut(&coord).expect("entity still placed") {
            Entity::Cell(cell) => cell.memo = Some(hint),
            Entity::Column(col) => col.memo = Some(hint),
        }
    }
}

/// Columns whose member ray crosses `coord`, found by derived query rather
/// than stored back-references.
pub fn columns_through(grid: &Grid, coord: &Coord) -> Vec<Coord> {
    grid.iter_columns()
        .filter(|(c, col)| column_members(grid, c, col.orientation).contains(coord))
        .map(|(c, _)| *c)
        .collect()
}

/// Invalidate the memos affected by a kind change at `coord`: the cell
/// itself, every cell whose flower reaches it, and every column whose ray
/// crosses it.
pub fn invalidate_kind_change(grid: &mut Grid, coord: &Coord) {
    let mut stale: Vec<Coord> = vec![*coord];
    stale.extend(
        coord
            .neighbors18()
            .iter()
            .filter(|c| grid.cell(c).is_some())
            .cloned(),
    );
    stale.extend(columns_through(grid, coord));
    for c in stale {
        match grid.at_mut(&c) {
            Some(Entity::Cell(cell)) => cell.memo = None,
            Some(Entity::Column(col)) => col.memo = None,
            None => (),
        }
    }
}

/// Invalidate every memo. Placement and removal shift the grid bounds, which
/// every column ray depends on.
pub fn invalidate_all(grid: &mut Grid) {
    let coords = grid.coords();
    for c in coords {
        match grid.at_mut(&c) {
            Some(Entity::Cell(cell)) => cell.memo = None,
            Some(Entity::Column(col)) => col.memo = None,
            None => (),
        }
    }
}
