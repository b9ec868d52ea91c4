use std::error::Error;

use backend::Backend;
use backend::BranchBound;
use codec;
use codec::EmitOptions;
use codec::Level;
use coords::Coord;
use errors::ContradictoryHint;
use errors::EmitWarning;
use grid::Grid;
use grid::Kind;
use hints;
use milp;
use solver;

/// What a reveal attempt did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Mistake,
}

/// One loaded level in play: the grid plus the counters the player sees and
/// the solve machinery. All mutation goes through calls into the scene.
pub struct Scene {
    pub level: Level,
    remaining: usize,
    mistakes: u32,
    /// Re-entry guard: starting a solve while one is in progress is a no-op.
    solving: u32,
    undo_history: Vec<Vec<Coord>>,
    redo_history: Vec<Vec<Coord>>,
    backend: Box<dyn Backend>,
    pub verbose: bool,
}

impl Scene {
    pub fn of_level(level: Level) -> Scene {
        let remaining = level
            .grid
            .iter_cells()
            .filter(|(_, cell)| cell.kind == Kind::Full && cell.display().is_none())
            .count();
        Scene {
            level,
            remaining,
            mistakes: 0,
            solving: 0,
            undo_history: vec![],
            redo_history: vec![],
            backend: Box::new(BranchBound::new(None)),
            verbose: false,
        }
    }

    pub fn load_text(text: &str) -> Result<Scene, Box<dyn Error>> {
        Ok(Scene::of_level(codec::decode(text)?))
    }

    pub fn save_text(&self, opts: EmitOptions) -> (String, Option<EmitWarning>) {
        codec::encode(&self.level, opts)
    }

    pub fn grid(&self) -> &Grid {
        &self.level.grid
    }

    /// Number of Full cells the player has not uncovered yet.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    /// Adopt a mistake counter coming from a restored save.
    pub fn set_mistakes(&mut self, mistakes: u32) {
        self.mistakes = mistakes;
    }

    pub fn full_update(&mut self) {
        hints::full_update(&mut self.level.grid);
    }

    /// Attempt to uncover a cell as `want`. A wrong guess is counted and the
    /// cell stays covered: the display never contradicts the truth.
    pub fn reveal(&mut self, coord: &Coord, want: Kind) -> Outcome {
        let cell = match self.level.grid.cell_mut(coord) {
            None => return Outcome::Mistake,
            Some(cell) => cell,
        };
        if cell.display().is_some() {
            return Outcome::Correct;
        }
        if cell.kind != want {
            self.mistakes += 1;
            return Outcome::Mistake;
        }
        cell.set_display(Some(want));
        if want == Kind::Full {
            self.remaining -= 1;
        }
        self.undo_history.push(vec![*coord]);
        self.redo_history.clear();
        Outcome::Correct
    }

    /// One solver pass: the arithmetic eliminations, or a MILP proof when
    /// they stall. Conclusions are applied to the display state and returned;
    /// `None` when a solve is already in progress.
    pub fn solve_step(&mut self) -> Result<Option<Vec<(Coord, Kind)>>, Box<dyn Error>> {
        if self.solving > 0 {
            return Ok(None);
        }
        self.solving += 1;
        let result = self.solve_step_inner();
        self.solving -= 1;
        result.map(Some)
    }

    fn solve_step_inner(&mut self) -> Result<Vec<(Coord, Kind)>, Box<dyn Error>> {
        if self.verbose {
            let covered = self
                .level
                .grid
                .iter_cells()
                .filter(|(_, cell)| cell.display().is_none())
                .count();
            println!(
                "Solver step with covered:{} remaining:{}",
                covered, self.remaining
            );
        }
        let mut conclusions = solver::solve_simple(&self.level.grid);
        if conclusions.is_empty() {
            conclusions = milp::solve(
                &self.level.grid,
                self.remaining,
                &mut *self.backend,
                self.verbose,
            )?;
        }
        self.apply(&conclusions)?;
        Ok(conclusions)
    }

    /// Uncover a batch of proved conclusions as one undoable step. The whole
    /// batch is checked against the truth first so a corrupted level leaves
    /// the scene untouched.
    fn apply(&mut self, conclusions: &[(Coord, Kind)]) -> Result<(), Box<dyn Error>> {
        for (coord, kind) in conclusions {
            match self.level.grid.cell(coord) {
                Some(cell) if cell.kind == *kind => (),
                _ => return Err(Box::new(ContradictoryHint(*coord))),
            }
        }
        if conclusions.is_empty() {
            return Ok(());
        }
        let mut batch = vec![];
        for (coord, kind) in conclusions {
            let cell = self.level.grid.cell_mut(coord).expect("checked above");
            if cell.display().is_some() {
                continue;
            }
            cell.set_display(Some(*kind));
            if *kind == Kind::Full {
                self.remaining -= 1;
            }
            batch.push(*coord);
        }
        self.undo_history.push(batch);
        self.redo_history.clear();
        Ok(())
    }

    /// Run solver passes until nothing new comes out.
    /// True iff the level ended fully uncovered.
    pub fn solve_complete(&mut self) -> Result<bool, Box<dyn Error>> {
        loop {
            match self.solve_step()? {
                None => break,
                Some(conclusions) if conclusions.is_empty() => break,
                Some(_) => (),
            }
        }
        let all_uncovered = self
            .level
            .grid
            .iter_cells()
            .all(|(_, cell)| cell.display().is_some());
        Ok(self.remaining == 0 && all_uncovered)
    }

    /// Cover the most recent batch of reveals again.
    pub fn undo(&mut self) {
        while let Some(batch) = self.undo_history.pop() {
            let mut covered_any = false;
            for coord in &batch {
                let cell = self.level.grid.cell_mut(coord).expect("revealed cell");
                if cell.display().is_none() {
                    continue;
                }
                if cell.kind == Kind::Full {
                    self.remaining += 1;
                }
                cell.set_display(None);
                covered_any = true;
            }
            if covered_any {
                self.redo_history.push(batch);
                break;
            }
        }
    }

    pub fn redo(&mut self) {
        if let Some(batch) = self.redo_history.pop() {
            for coord in &batch {
                let cell = self.level.grid.cell_mut(coord).expect("revealed cell");
                let kind = cell.kind;
                if cell.display().is_none() {
                    cell.set_display(Some(kind));
                    if kind == Kind::Full {
                        self.remaining -= 1;
                    }
                }
            }
            self.undo_history.push(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a level text with the tokens placed directly in the frame.
    fn level_text(tokens: &[(isize, isize, &str)]) -> String {
        let mut frame = vec![vec![('.', '.'); codec::FRAME]; codec::FRAME];
        for (x, y, tok) in tokens {
            let mut chars = tok.chars();
            frame[*y as usize][*x as usize] =
                (chars.next().unwrap(), chars.next().unwrap());
        }
        let mut lines = vec![
            codec::HEADER.to_string(),
            "scene test".to_string(),
            "tester".to_string(),
            String::new(),
            String::new(),
        ];
        for row in &frame {
            lines.push(row.iter().flat_map(|(l, r)| vec![*l, *r]).collect());
        }
        lines.join("\n")
    }

    #[test]
    pub fn test_reveal_and_mistakes() {
        let text = level_text(&[(16, 16, "x."), (16, 14, "o.")]);
        let mut scene = Scene::load_text(&text).unwrap();
        assert_eq!(scene.remaining(), 1);
        assert_eq!(scene.reveal(&Coord::new(16, 16), Kind::Empty), Outcome::Mistake);
        assert_eq!(scene.mistakes(), 1);
        assert_eq!(scene.remaining(), 1);
        assert_eq!(scene.reveal(&Coord::new(16, 16), Kind::Full), Outcome::Correct);
        assert_eq!(scene.remaining(), 0);
        // Revealing again is a no-op
        assert_eq!(scene.reveal(&Coord::new(16, 16), Kind::Full), Outcome::Correct);
        assert_eq!(scene.mistakes(), 1);
    }

    #[test]
    pub fn test_row_of_three_is_solved() {
        // Two revealed blacks counting the covered blue between them.
        let text = level_text(&[(15, 15, "O+"), (16, 16, "x."), (17, 15, "O+")]);
        let mut scene = Scene::load_text(&text).unwrap();
        let conclusions = scene.solve_step().unwrap().unwrap();
        assert_eq!(conclusions, vec![(Coord::new(16, 16), Kind::Full)]);
        assert_eq!(
            scene.grid().cell(&Coord::new(16, 16)).unwrap().display(),
            Some(Kind::Full)
        );
        assert_eq!(scene.remaining(), 0);
    }

    #[test]
    pub fn test_solve_step_is_idempotent() {
        let text = level_text(&[(15, 15, "O+"), (16, 16, "x."), (17, 15, "O+")]);
        let mut scene = Scene::load_text(&text).unwrap();
        assert!(!scene.solve_step().unwrap().unwrap().is_empty());
        assert!(scene.solve_step().unwrap().unwrap().is_empty());
        assert!(scene.solve_step().unwrap().unwrap().is_empty());
    }

    #[test]
    pub fn test_solving_guard() {
        let text = level_text(&[(16, 16, "x.")]);
        let mut scene = Scene::load_text(&text).unwrap();
        scene.solving = 1;
        assert!(scene.solve_step().unwrap().is_none());
        scene.solving = 0;
    }

    #[test]
    pub fn test_solve_complete_on_forced_level() {
        // A zero-count black next to one blue: the blue is found through the
        // global count once the black's neighborhood is exhausted.
        let text = level_text(&[(16, 16, "O+"), (16, 14, "o."), (18, 16, "x.")]);
        let mut scene = Scene::load_text(&text).unwrap();
        assert!(scene.solve_complete().unwrap());
        assert_eq!(scene.remaining(), 0);
        assert!(scene
            .grid()
            .iter_cells()
            .all(|(_, cell)| cell.display().is_some()));
    }

    #[test]
    pub fn test_solve_complete_reports_stuck_levels() {
        // One Full among two interchangeable covered neighbors: no proof
        // exists and the level stays partly covered.
        let text = level_text(&[(16, 16, "O+"), (16, 14, "x."), (16, 18, "o.")]);
        let mut scene = Scene::load_text(&text).unwrap();
        assert!(!scene.solve_complete().unwrap());
        assert_eq!(scene.remaining(), 1);
    }

    #[test]
    pub fn test_undo_redo_round_trip() {
        let text = level_text(&[(15, 15, "O+"), (16, 16, "x."), (17, 15, "O+")]);
        let mut scene = Scene::load_text(&text).unwrap();
        scene.solve_step().unwrap().unwrap();
        assert_eq!(scene.remaining(), 0);
        scene.undo();
        assert_eq!(scene.remaining(), 1);
        assert_eq!(scene.grid().cell(&Coord::new(16, 16)).unwrap().display(), None);
        scene.redo();
        assert_eq!(scene.remaining(), 0);
        assert_eq!(
            scene.grid().cell(&Coord::new(16, 16)).unwrap().display(),
            Some(Kind::Full)
        );
    }

    #[test]
    pub fn test_display_save_restores_progress() {
        let text = level_text(&[(15, 15, "O+"), (16, 16, "x."), (17, 15, "O+")]);
        let mut scene = Scene::load_text(&text).unwrap();
        scene.solve_step().unwrap().unwrap();
        let (saved, _) = scene.save_text(EmitOptions {
            padding: false,
            display: true,
        });
        // The uncovered blue is written as revealed
        assert!(saved.contains("X."));
        let restored = Scene::load_text(&saved).unwrap();
        assert_eq!(restored.remaining(), 0);
    }

    #[test]
    pub fn test_contradiction_is_fatal_and_harmless() {
        let text = level_text(&[(16, 16, "x."), (16, 14, "o.")]);
        let mut scene = Scene::load_text(&text).unwrap();
        let bogus = vec![(Coord::new(16, 16), Kind::Empty)];
        let err = scene.apply(&bogus).err().expect("must fail");
        assert!(err.downcast::<ContradictoryHint>().is_ok());
        // Pre-operation state intact
        assert_eq!(scene.grid().cell(&Coord::new(16, 16)).unwrap().display(), None);
        assert_eq!(scene.remaining(), 1);
    }
}
