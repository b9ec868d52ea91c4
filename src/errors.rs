use std::error::Error;
use std::fmt;

use coords::Coord;

/// Malformed header, metadata or row in a level text. Fatal: the load is
/// abandoned.
#[derive(Debug)]
pub struct ParseError(pub String);

impl Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "parse error: {}", self.0)
    }
}

/// An editor operation would collide with an existing entity. The operation
/// is rejected and the scene is unchanged.
#[derive(Debug)]
pub struct GridConflict;

impl Error for GridConflict {}

impl fmt::Display for GridConflict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "grid conflict")
    }
}

/// The MILP has no solution at all: the level's declared remaining count
/// contradicts the visible state. Never silently recovered.
#[derive(Debug)]
pub struct SolverInfeasible;

impl Error for SolverInfeasible {}

impl fmt::Display for SolverInfeasible {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "solver infeasible")
    }
}

/// A proved forced value disagrees with the cell's declared kind. The level
/// data is corrupted.
#[derive(Debug)]
pub struct ContradictoryHint(pub Coord);

impl Error for ContradictoryHint {}

impl fmt::Display for ContradictoryHint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "contradictory hint at ({}, {})", self.0.x(), self.0.y())
    }
}

/// Non-fatal emitter complaints, returned as a secondary value next to the
/// best-effort output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EmitWarning {
    TooWide,
    TooTall,
    OverlapsUI,
}

impl fmt::Display for EmitWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EmitWarning::TooWide => write!(f, "level is wider than the 33x33 frame"),
            EmitWarning::TooTall => write!(f, "level is taller than the 33x33 frame"),
            EmitWarning::OverlapsUI => write!(f, "level overlaps the reserved UI area"),
        }
    }
}
