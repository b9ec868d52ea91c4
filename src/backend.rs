use std::error::Error;
use std::fmt;
use std::time::Duration;
use std::time::Instant;

#[derive(Debug)]
pub struct Timeout;

impl Error for Timeout {}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Timeout")
    }
}

/// Wall clock for a backend run. The backend's timeout is the only
/// cancellation mechanism the solver stack has.
pub struct Clock {
    start_time: Instant,
    max_duration: Option<Duration>,
}

impl Clock {
    pub fn new(max_seconds: Option<u64>) -> Clock {
        Clock {
            start_time: Instant::now(),
            max_duration: max_seconds.map(Duration::from_secs),
        }
    }

    pub fn reset_timer(&mut self) {
        self.start_time = Instant::now();
    }

    pub fn check_timeout(&self) -> Result<(), Box<dyn Error>> {
        match self.max_duration {
            Some(max) if self.start_time.elapsed() >= max => Err(Box::new(Timeout)),
            _ => Ok(()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Le,
    Ge,
    Eq,
}

/// One linear row: `Σ coef·var  op  rhs`.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub terms: Vec<(usize, i64)>,
    pub op: Op,
    pub rhs: i64,
}

impl Constraint {
    pub fn new(terms: Vec<(usize, i64)>, op: Op, rhs: i64) -> Constraint {
        Constraint { terms, op, rhs }
    }
}

/// A bounded-integer program. Every variable ranges over `0..=bounds[i]`;
/// the objective is maximized. An all-zero objective asks for any feasible
/// assignment.
#[derive(Clone, Debug, Default)]
pub struct Problem {
    pub bounds: Vec<i64>,
    pub constraints: Vec<Constraint>,
    pub objective: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Solved(Vec<i64>),
    Infeasible,
}

/// The pluggable optimizer behind the ILP solver. One bundled
/// implementation; hosts may wrap another library behind the same trait.
pub trait Backend {
    fn solve(&mut self, problem: &Problem) -> Result<Verdict, Box<dyn Error>>;
}

/// Exact depth-first branch and bound. Prunes on per-constraint reachable
/// intervals and on an optimistic completion of the objective. Small hint
/// programs collapse almost immediately under the interval pruning.
pub struct BranchBound {
    max_seconds: Option<u64>,
}

impl BranchBound {
    pub fn new(max_seconds: Option<u64>) -> BranchBound {
        BranchBound { max_seconds }
    }
}

struct Search<'a> {
    problem: &'a Problem,
    /// (constraint index, coefficient) incidences per variable.
    incidence: Vec<Vec<(usize, i64)>>,
    /// Σ of the already-assigned terms, per constraint.
    sums: Vec<i64>,
    /// Lowest/highest contribution still reachable from unassigned vars.
    min_rest: Vec<i64>,
    max_rest: Vec<i64>,
    assignment: Vec<i64>,
    objective_value: i64,
    /// Optimistic completion of the objective by the unassigned suffix.
    optimistic_rest: i64,
    best: Option<(i64, Vec<i64>)>,
    feasibility_only: bool,
    clock: Clock,
    nodes: u64,
}

impl<'a> Search<'a> {
    fn new(problem: &'a Problem, clock: Clock) -> Search<'a> {
        let n = problem.bounds.len();
        assert_eq!(problem.objective.len(), n);
        let mut incidence = vec![vec![]; n];
        let mut min_rest = vec![0; problem.constraints.len()];
        let mut max_rest = vec![0; problem.constraints.len()];
        for (ci, con) in problem.constraints.iter().enumerate() {
            for (var, coef) in &con.terms {
                assert!(*var < n, "constraint term on unknown variable");
                incidence[*var].push((ci, *coef));
                let reach = coef * problem.bounds[*var];
                if reach < 0 {
                    min_rest[ci] += reach;
                } else {
                    max_rest[ci] += reach;
                }
            }
        }
        let optimistic_rest = problem
            .objective
            .iter()
            .zip(problem.bounds.iter())
            .map(|(c, ub)| (c * ub).max(0))
            .sum();
        Search {
            problem,
            incidence,
            sums: vec![0; problem.constraints.len()],
            min_rest,
            max_rest,
            assignment: vec![0; n],
            objective_value: 0,
            optimistic_rest,
            best: None,
            feasibility_only: problem.objective.iter().all(|c| *c == 0),
            clock,
            nodes: 0,
        }
    }

    fn constraint_can_hold(&self, ci: usize) -> bool {
        let con = &self.problem.constraints[ci];
        let lo = self.sums[ci] + self.min_rest[ci];
        let hi = self.sums[ci] + self.max_rest[ci];
        match con.op {
            Op::Le => lo <= con.rhs,
            Op::Ge => hi >= con.rhs,
            Op::Eq => lo <= con.rhs && hi >= con.rhs,
        }
    }

    /// Returns true when the caller should stop unwinding (feasibility-only
    /// searches stop at the first leaf).
    fn run(&mut self, var: usize) -> Result<bool, Box<dyn Error>> {
        self.nodes += 1;
        if self.nodes % 1024 == 0 {
            self.clock.check_timeout()?;
        }
        let n = self.problem.bounds.len();
        if var == n {
            let better = match &self.best {
                None => true,
                Some((best, _)) => self.objective_value > *best,
            };
            if better {
                self.best = Some((self.objective_value, self.assignment.clone()));
            }
            return Ok(self.feasibility_only);
        }
        if let Some((best, _)) = &self.best {
            // Even a perfect completion cannot beat the incumbent.
            if self.objective_value + self.optimistic_rest <= *best {
                return Ok(false);
            }
        }
        let ub = self.problem.bounds[var];
        let coef = self.problem.objective[var];
        // Try the promising end of the domain first.
        let values: Vec<i64> = if coef > 0 {
            (0..=ub).rev().collect()
        } else {
            (0..=ub).collect()
        };
        for value in values {
            self.enter(var, value);
            let viable = self.incidence[var]
                .iter()
                .all(|(ci, _)| self.constraint_can_hold(*ci));
            if viable {
                let stop = self.run(var + 1)?;
                if stop {
                    return Ok(true);
                }
            }
            self.leave(var, value);
        }
        Ok(false)
    }

    fn enter(&mut self, var: usize, value: i64) {
        self.assignment[var] = value;
        let ub = self.problem.bounds[var];
        for i in 0..self.incidence[var].len() {
            let (ci, coef) = self.incidence[var][i];
            self.sums[ci] += coef * value;
            let reach = coef * ub;
            if reach < 0 {
                self.min_rest[ci] -= reach;
            } else {
                self.max_rest[ci] -= reach;
            }
        }
        self.objective_value += self.problem.objective[var] * value;
        self.optimistic_rest -= (self.problem.objective[var] * ub).max(0);
    }

    fn leave(&mut self, var: usize, value: i64) {
        let ub = self.problem.bounds[var];
        for i in 0..self.incidence[var].len() {
            let (ci, coef) = self.incidence[var][i];
            self.sums[ci] -= coef * value;
            let reach = coef * ub;
            if reach < 0 {
                self.min_rest[ci] += reach;
            } else {
                self.max_rest[ci] += reach;
            }
        }
        self.objective_value -= self.problem.objective[var] * value;
        self.optimistic_rest += (self.problem.objective[var] * ub).max(0);
        self.assignment[var] = 0;
    }
}

impl Backend for BranchBound {
    fn solve(&mut self, problem: &Problem) -> Result<Verdict, Box<dyn Error>> {
        // Constant rows (no terms) never survive the search, reject them up
        // front so an empty program still answers honestly.
        for con in &problem.constraints {
            if con.terms.is_empty() {
                let holds = match con.op {
                    Op::Le => 0 <= con.rhs,
                    Op::Ge => 0 >= con.rhs,
                    Op::Eq => con.rhs == 0,
                };
                if !holds {
                    return Ok(Verdict::Infeasible);
                }
            }
        }
        let mut search = Search::new(problem, Clock::new(self.max_seconds));
        search.run(0)?;
        match search.best.take() {
            None => Ok(Verdict::Infeasible),
            Some((_, assignment)) => Ok(Verdict::Solved(assignment)),
        }
    }
}
