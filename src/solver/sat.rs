//! A small deterministic boolean optimizer.
//!
//! The candidate-selection problem is a pure 0/1 program: one boolean
//! variable per candidate, linear constraints (block exclusivity,
//! parent-child coupling, uniqueness, orphan prevention), and a weighted
//! linear objective to maximize. This module solves it with constraint
//! propagation plus branch-and-bound. The search is fully deterministic:
//! variables branch in a fixed order and the first solution reaching the
//! best objective is kept.
//!
//! Constraints optionally carry an enforcement literal, matching the
//! reified form composite coupling needs ("if the parent is selected, the
//! children sum to one").

use std::time::Instant;

/// Index of a boolean decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

/// Sentinel for "no lower bound".
pub const NO_MIN: i64 = i64::MIN / 4;
/// Sentinel for "no upper bound".
pub const NO_MAX: i64 = i64::MAX / 4;

#[derive(Debug, Clone)]
struct Constraint {
    terms: Vec<(VarId, i64)>,
    min: i64,
    max: i64,
    /// The constraint only applies when this variable is true.
    enforce: Option<VarId>,
}

/// Outcome status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// The returned solution is provably optimal.
    Optimal,
    /// The time budget expired; the returned solution is the best found.
    Feasible,
    /// No assignment satisfies the constraints (within the time budget).
    Infeasible,
}

/// A solved assignment.
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolveStatus,
    /// Value per variable, indexed by `VarId`.
    pub values: Vec<bool>,
    /// Objective value of the assignment.
    pub objective: i64,
}

/// A 0/1 linear model with a maximization objective.
#[derive(Debug, Clone, Default)]
pub struct BoolModel {
    weights: Vec<i64>,
    constraints: Vec<Constraint>,
}

impl BoolModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable with the given objective weight.
    pub fn new_var(&mut self, weight: i64) -> VarId {
        self.weights.push(weight);
        VarId(self.weights.len() - 1)
    }

    /// Number of variables in the model.
    pub fn num_vars(&self) -> usize {
        self.weights.len()
    }

    /// Number of constraints in the model.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Adds `min <= sum(terms) <= max`.
    pub fn add_range(&mut self, terms: Vec<(VarId, i64)>, min: i64, max: i64) {
        self.constraints.push(Constraint {
            terms,
            min,
            max,
            enforce: None,
        });
    }

    /// Adds `min <= sum(terms) <= max`, enforced only when `enforce` is
    /// true.
    pub fn add_range_if(
        &mut self,
        enforce: VarId,
        terms: Vec<(VarId, i64)>,
        min: i64,
        max: i64,
    ) {
        self.constraints.push(Constraint {
            terms,
            min,
            max,
            enforce: Some(enforce),
        });
    }

    /// Fixes a variable to a constant.
    pub fn fix(&mut self, var: VarId, value: bool) {
        let v = i64::from(value);
        self.add_range(vec![(var, 1)], v, v);
    }

    /// Solves the model, maximizing the objective.
    ///
    /// `deadline` bounds the search; on expiry the best feasible solution
    /// found so far is returned with [`SolveStatus::Feasible`].
    pub fn solve(&self, deadline: Option<Instant>) -> Solution {
        let n = self.weights.len();
        // Branch order: heaviest weight first, index as tie-break.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|a, b| self.weights[*b].cmp(&self.weights[*a]).then(a.cmp(b)));

        let mut search = Search {
            model: self,
            order,
            assignment: vec![None; n],
            best: None,
            deadline,
            timed_out: false,
        };
        search.propagate_and_branch(0);

        match search.best {
            Some((objective, values)) => Solution {
                status: if search.timed_out {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::Optimal
                },
                values,
                objective,
            },
            None => Solution {
                status: SolveStatus::Infeasible,
                values: Vec::new(),
                objective: 0,
            },
        }
    }
}

struct Search<'a> {
    model: &'a BoolModel,
    order: Vec<usize>,
    assignment: Vec<Option<bool>>,
    best: Option<(i64, Vec<bool>)>,
    deadline: Option<Instant>,
    timed_out: bool,
}

enum Propagation {
    /// Forced assignments recorded, with the vars forced (for undo).
    Ok(Vec<usize>),
    Conflict(Vec<usize>),
}

impl<'a> Search<'a> {
    fn out_of_time(&mut self) -> bool {
        if self.timed_out {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out = true;
                return true;
            }
        }
        false
    }

    /// Upper bound on the objective completable from the current partial
    /// assignment.
    fn upper_bound(&self) -> i64 {
        let mut bound = 0;
        for (i, value) in self.assignment.iter().enumerate() {
            bound += match value {
                Some(true) => self.model.weights[i],
                Some(false) => 0,
                None => self.model.weights[i].max(0),
            };
        }
        bound
    }

    fn current_objective(&self) -> i64 {
        self.assignment
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(true) => self.model.weights[i],
                _ => 0,
            })
            .sum()
    }

    /// Propagates constraints to a fixpoint, recording forced assignments.
    fn propagate(&mut self) -> Propagation {
        let mut forced: Vec<usize> = Vec::new();
        loop {
            let mut changed = false;
            for constraint in &self.model.constraints {
                // Enforcement literal handling.
                let active = match constraint.enforce {
                    Some(e) => match self.assignment[e.0] {
                        Some(false) => continue,
                        Some(true) => true,
                        // Undecided: only usable to force the literal off
                        // when the constraint is already impossible.
                        None => false,
                    },
                    None => true,
                };

                let mut min_possible = 0i64;
                let mut max_possible = 0i64;
                for (var, coef) in &constraint.terms {
                    match self.assignment[var.0] {
                        Some(true) => {
                            min_possible += coef;
                            max_possible += coef;
                        }
                        Some(false) => {}
                        None => {
                            min_possible += (*coef).min(0);
                            max_possible += (*coef).max(0);
                        }
                    }
                }

                let impossible = min_possible > constraint.max || max_possible < constraint.min;
                if impossible {
                    match constraint.enforce {
                        Some(e) if self.assignment[e.0].is_none() => {
                            // The body cannot hold, so the literal must be
                            // false.
                            self.assignment[e.0] = Some(false);
                            forced.push(e.0);
                            changed = true;
                            continue;
                        }
                        Some(e) if self.assignment[e.0] == Some(false) => continue,
                        _ => return Propagation::Conflict(forced),
                    }
                }
                if !active {
                    continue;
                }

                // Try forcing each unassigned term.
                for (var, coef) in &constraint.terms {
                    if self.assignment[var.0].is_some() {
                        continue;
                    }
                    let lo_contrib = (*coef).min(0);
                    let hi_contrib = (*coef).max(0);
                    for value in [true, false] {
                        let delta = if value { *coef } else { 0 };
                        let min_if = min_possible - lo_contrib + delta;
                        let max_if = max_possible - hi_contrib + delta;
                        if min_if > constraint.max || max_if < constraint.min {
                            let forced_value = !value;
                            self.assignment[var.0] = Some(forced_value);
                            forced.push(var.0);
                            changed = true;
                            break;
                        }
                    }
                    if changed {
                        break;
                    }
                }
                if changed {
                    break;
                }
            }
            if !changed {
                return Propagation::Ok(forced);
            }
        }
    }

    fn undo(&mut self, forced: Vec<usize>) {
        for idx in forced {
            self.assignment[idx] = None;
        }
    }

    fn record_if_better(&mut self) {
        let objective = self.current_objective();
        let better = match &self.best {
            Some((best_obj, _)) => objective > *best_obj,
            None => true,
        };
        if better {
            let values = self
                .assignment
                .iter()
                .map(|v| v.unwrap_or(false))
                .collect();
            self.best = Some((objective, values));
        }
    }

    fn propagate_and_branch(&mut self, depth: usize) {
        if self.out_of_time() {
            return;
        }
        let forced = match self.propagate() {
            Propagation::Ok(forced) => forced,
            Propagation::Conflict(forced) => {
                self.undo(forced);
                return;
            }
        };

        // Prune when even the optimistic completion cannot beat the best.
        if let Some((best_obj, _)) = &self.best {
            if self.upper_bound() <= *best_obj {
                self.undo(forced);
                return;
            }
        }

        // Find the next unassigned variable in branch order.
        let next = self
            .order
            .iter()
            .skip(depth)
            .position(|i| self.assignment[*i].is_none())
            .map(|offset| depth + offset);

        match next {
            None => {
                self.record_if_better();
                self.undo(forced);
            }
            Some(position) => {
                let var = self.order[position];
                // Try the objective-improving value first.
                let first = self.model.weights[var] >= 0;
                for value in [first, !first] {
                    if self.out_of_time() {
                        break;
                    }
                    self.assignment[var] = Some(value);
                    self.propagate_and_branch(position + 1);
                    self.assignment[var] = None;
                }
                self.undo(forced);
            }
        }
    }
}
