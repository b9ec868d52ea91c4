use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::error::Error;

use itertools::Itertools;

use backend::Backend;
use backend::Constraint;
use backend::Op;
use backend::Problem;
use backend::Verdict;
use coords::Coord;
use errors::SolverInfeasible;
use grid::Grid;
use grid::Kind;

/// One number on the board: a revealed cell with a count, or a column.
struct Source {
    members: Vec<Coord>,
    value: usize,
    together: Option<bool>,
    /// Cell sources wrap around when walking members; columns do not.
    circular: bool,
}

fn gather_sources(grid: &Grid) -> Vec<Source> {
    let mut sources = vec![];
    for (_, cell) in grid.iter_cells() {
        if cell.display().is_none() {
            continue;
        }
        if let Some(value) = cell.value() {
            sources.push(Source {
                members: cell.members().to_vec(),
                value,
                together: cell.together(),
                circular: true,
            });
        }
    }
    for (_, col) in grid.iter_columns() {
        sources.push(Source {
            members: col.members().to_vec(),
            value: col.value().expect("hints recomputed"),
            together: col.together(),
            circular: false,
        });
    }
    sources
}

/// The equivalence quotient of the unknown cells. Cells referenced by the
/// same set of sources are interchangeable and share one bounded variable;
/// cells under a together flag keep their own variable because position
/// matters there.
struct Quotient {
    /// Member coords per class, class index = variable index.
    classes: Vec<Vec<Coord>>,
    /// Unknown coord -> variable index.
    var_of: BTreeMap<Coord, usize>,
}

fn build_quotient(grid: &Grid, sources: &[Source]) -> Quotient {
    let mut referencing: BTreeMap<Coord, BTreeSet<usize>> = BTreeMap::new();
    let mut positional: BTreeSet<Coord> = BTreeSet::new();
    for (id, source) in sources.iter().enumerate() {
        for member in &source.members {
            referencing.entry(*member).or_insert_with(BTreeSet::new).insert(id);
            if source.together.is_some() {
                positional.insert(*member);
            }
        }
    }
    let unknowns: Vec<Coord> = grid
        .iter_cells()
        .filter(|(_, cell)| cell.display().is_none())
        .map(|(c, _)| *c)
        .collect();
    let buckets = unknowns.into_iter().into_group_map_by(|coord| {
        let ids: Vec<usize> = referencing
            .get(coord)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        let singleton = if positional.contains(coord) {
            Some(*coord)
        } else {
            None
        };
        (ids, singleton)
    });
    let mut classes: Vec<Vec<Coord>> = vec![];
    let mut var_of = BTreeMap::new();
    for (_, coords) in buckets.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        let var = classes.len();
        for coord in &coords {
            var_of.insert(*coord, var);
        }
        classes.push(coords);
    }
    Quotient { classes, var_of }
}

/// Split a member list into the variable terms of its unknowns and the count
/// of its already-displayed Full cells. Equivalent members collapse onto one
/// variable term.
fn member_terms(grid: &Grid, quotient: &Quotient, members: &[Coord]) -> (Vec<(usize, i64)>, i64) {
    let mut vars = BTreeSet::new();
    let mut known_full = 0;
    for member in members {
        match grid.cell(member).expect("member is a cell").display() {
            Some(Kind::Full) => known_full += 1,
            Some(Kind::Empty) => (),
            None => {
                vars.insert(quotient.var_of[member]);
            }
        }
    }
    (vars.into_iter().map(|v| (v, 1)).collect(), known_full)
}

/// Same, for a positional slice where every unknown is a singleton class and
/// repeats keep their multiplicity.
fn positional_terms(grid: &Grid, quotient: &Quotient, members: &[Coord]) -> (Vec<(usize, i64)>, i64) {
    let mut terms = vec![];
    let mut known_full = 0;
    for member in members {
        match grid.cell(member).expect("member is a cell").display() {
            Some(Kind::Full) => known_full += 1,
            Some(Kind::Empty) => (),
            None => terms.push((quotient.var_of[member], 1)),
        }
    }
    (terms, known_full)
}

fn encode(grid: &Grid, remaining: usize, sources: &[Source], quotient: &Quotient) -> Problem {
    let bounds: Vec<i64> = quotient.classes.iter().map(|c| c.len() as i64).collect();
    let mut rows = vec![];

    // Global row: the still-covered Full cells are spread over the classes.
    let global_terms: Vec<(usize, i64)> = (0..bounds.len()).map(|v| (v, 1)).collect();
    rows.push(Constraint::new(global_terms, Op::Eq, remaining as i64));

    for source in sources {
        let (terms, known_full) = member_terms(grid, quotient, &source.members);
        rows.push(Constraint::new(
            terms,
            Op::Eq,
            source.value as i64 - known_full,
        ));
        match source.together {
            None => (),
            Some(together) => {
                if source.circular {
                    encode_cell_together(grid, quotient, source, together, &mut rows);
                } else {
                    encode_column_together(grid, quotient, source, together, &mut rows);
                }
            }
        }
    }
    Problem {
        objective: vec![0; bounds.len()],
        bounds,
        constraints: rows,
    }
}

fn encode_column_together(
    grid: &Grid,
    quotient: &Quotient,
    source: &Source,
    together: bool,
    rows: &mut Vec<Constraint>,
) {
    let k = source.value;
    let n = source.members.len();
    if k < 2 {
        return;
    }
    if together {
        // {k}: two Fulls at least k apart would leave a hole in the run.
        for span in k..n {
            for start in 0..(n - span) {
                let pair = [source.members[start], source.members[start + span]];
                let (terms, known_full) = positional_terms(grid, quotient, &pair);
                rows.push(Constraint::new(terms, Op::Le, 1 - known_full));
            }
        }
    } else {
        // -k-: no window of k consecutive members is all Full.
        for window in source.members.windows(k) {
            let (terms, known_full) = positional_terms(grid, quotient, window);
            rows.push(Constraint::new(terms, Op::Le, k as i64 - 1 - known_full));
        }
    }
}

fn encode_cell_together(
    grid: &Grid,
    quotient: &Quotient,
    source: &Source,
    together: bool,
    rows: &mut Vec<Constraint>,
) {
    let k = source.value;
    let n = source.members.len();
    if !(2..=4).contains(&k) || n < 2 {
        return;
    }
    let m = |i: usize| -> Coord { source.members[i % n] };
    if together {
        // No lonely Full and no lonely gap: walking the ring, a Full must
        // touch a Full and a gap must touch a gap, wherever the walk is over
        // true hex neighbors.
        for i in 0..n {
            let mut members = vec![m(i)];
            let mut signs = vec![1];
            if m(i).is_neighbor(&m(i + n - 1)) {
                members.push(m(i + n - 1));
                signs.push(-1);
            }
            if m(i).is_neighbor(&m(i + 1)) {
                members.push(m(i + 1));
                signs.push(-1);
            }
            let mut terms = vec![];
            let mut constant = 0;
            for (member, sign) in members.iter().zip(signs.iter()) {
                match grid.cell(member).expect("member is a cell").display() {
                    Some(Kind::Full) => constant += sign,
                    Some(Kind::Empty) => (),
                    None => terms.push((quotient.var_of[member], *sign)),
                }
            }
            rows.push(Constraint::new(terms.clone(), Op::Le, -constant));
            rows.push(Constraint::new(terms, Op::Ge, -1 - constant));
        }
    } else {
        // Any k consecutive true neighbors hold at most k - 1 Fulls.
        for i in 0..n {
            if !(0..k - 1).all(|j| m(i + j).is_neighbor(&m(i + j + 1))) {
                continue;
            }
            let window: Vec<Coord> = (0..k).map(|j| m(i + j)).collect();
            let (terms, known_full) = positional_terms(grid, quotient, &window);
            rows.push(Constraint::new(terms, Op::Le, k as i64 - 1 - known_full));
        }
    }
}

/// Prove forced cells: find a feasible assignment, take the variables at
/// their extremes as candidates, then repeatedly try to push candidates off
/// their extreme. Survivors of an optimum that could not move any of them are
/// forced.
pub fn solve(
    grid: &Grid,
    remaining: usize,
    backend: &mut dyn Backend,
    verbose: bool,
) -> Result<Vec<(Coord, Kind)>, Box<dyn Error>> {
    let sources = gather_sources(grid);
    let quotient = build_quotient(grid, &sources);
    if quotient.classes.is_empty() {
        return Ok(vec![]);
    }
    let mut problem = encode(grid, remaining, &sources, &quotient);
    if verbose {
        println!(
            "ILP with {} classes over {} unknowns, {} rows",
            quotient.classes.len(),
            quotient.var_of.len(),
            problem.constraints.len(),
        );
    }

    let assignment = match backend.solve(&problem)? {
        Verdict::Infeasible => return Err(Box::new(SolverInfeasible)),
        Verdict::Solved(assignment) => assignment,
    };
    let mut at_max: BTreeSet<usize> = (0..problem.bounds.len())
        .filter(|v| assignment[*v] == problem.bounds[*v])
        .collect();
    let mut at_zero: BTreeSet<usize> = (0..problem.bounds.len())
        .filter(|v| assignment[*v] == 0)
        .collect();

    loop {
        if at_max.is_empty() && at_zero.is_empty() {
            return Ok(vec![]);
        }
        problem.objective = vec![0; problem.bounds.len()];
        for v in &at_max {
            problem.objective[*v] = -1;
        }
        for v in &at_zero {
            problem.objective[*v] = 1;
        }
        let assignment = match backend.solve(&problem)? {
            Verdict::Infeasible => return Err(Box::new(SolverInfeasible)),
            Verdict::Solved(assignment) => assignment,
        };
        let survivors_max: BTreeSet<usize> = at_max
            .iter()
            .filter(|v| assignment[**v] == problem.bounds[**v])
            .cloned()
            .collect();
        let survivors_zero: BTreeSet<usize> = at_zero
            .iter()
            .filter(|v| assignment[**v] == 0)
            .cloned()
            .collect();
        let saturated = survivors_max == at_max && survivors_zero == at_zero;
        at_max = survivors_max;
        at_zero = survivors_zero;
        if saturated {
            // The optimum could not move a single candidate off its extreme:
            // all of them are forced.
            break;
        }
    }

    let mut conclusions = vec![];
    for (var, class) in quotient.classes.iter().enumerate() {
        if at_max.contains(&var) {
            conclusions.extend(class.iter().map(|c| (*c, Kind::Full)));
        } else if at_zero.contains(&var) {
            conclusions.extend(class.iter().map(|c| (*c, Kind::Empty)));
        }
    }
    Ok(conclusions)
}
