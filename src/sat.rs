//! The SAT reasoner (C6): CNF encoding of the catalogue and completion set,
//! used for goal-compatibility, undoability, and minimal-path queries that
//! the BFS-based path analyzer can only approximate.
//!
//! Every action gets one boolean variable meaning "this action is completed
//! in some hypothetical extension of the current run". Already-completed
//! actions are forced true; every other action is constrained by
//! `x_a -> Precondition(a)` (Tseitin-lowered through `And`/`Or`/item
//! lookups), never the converse: preconditions becoming true never forces
//! an action to be performed.

use std::collections::BTreeSet;

use varisat::{ExtendFormula, Lit, Solver};

use crate::model::{ActionId, GameData, Goal, GoalId};
use crate::precondition::PreconditionExpression;
use crate::snapshot::order_by_dependency;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatQueryResult {
    Satisfiable,
    Unsatisfiable,
    /// The solver could not decide (propagated from a solver-internal error).
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalCompatibilityReport {
    pub result: SatQueryResult,
    pub goals: Vec<GoalId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoabilityReport {
    pub result: SatQueryResult,
    pub action_id: ActionId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimalPathReport {
    pub result: SatQueryResult,
    pub path: Vec<ActionId>,
}

/// Can every listed goal's target action be completed in some single
/// consistent extension of `completed`? A precise answer to the question
/// `ActionGraphSnapshot::check_conflicts_when_adding_goal` only approximates.
pub fn goal_compatibility(game_data: &GameData, completed: &BTreeSet<ActionId>, goals: &[Goal]) -> GoalCompatibilityReport {
    tracing::debug!(goal_count = goals.len(), "checking goal compatibility via SAT");
    let mut encoder = Encoder::new(game_data);
    encoder.assert_action_preconditions();
    encoder.force_completed(completed);
    for goal in goals {
        let lit = encoder.action_lit(&goal.target_id, true);
        encoder.clauses.push(vec![lit]);
    }
    let (outcome, _) = run_solver(encoder.clauses);
    GoalCompatibilityReport {
        result: to_result(outcome),
        goals: goals.iter().map(|g| g.id.clone()).collect(),
    }
}

/// Is there a consistent world in which every other completed action
/// remains completed but `action_id` is not? Precise variant of
/// `ActionGraphSnapshot::can_undo`'s structural over-approximation.
pub fn undoability(game_data: &GameData, completed: &BTreeSet<ActionId>, action_id: &str) -> UndoabilityReport {
    tracing::debug!(action_id, "checking undoability via SAT");
    let mut encoder = Encoder::new(game_data);
    encoder.assert_action_preconditions();
    for id in completed {
        if id != action_id {
            let lit = encoder.action_lit(id, true);
            encoder.clauses.push(vec![lit]);
        }
    }
    let forced_false = encoder.action_lit(action_id, false);
    encoder.clauses.push(vec![forced_false]);
    let (outcome, _) = run_solver(encoder.clauses);
    UndoabilityReport {
        result: to_result(outcome),
        action_id: action_id.to_string(),
    }
}

/// Minimal-cardinality set of not-yet-completed actions that makes
/// `target_id` completable, found by iteratively tightening an
/// at-most-k cardinality bound until the formula becomes satisfiable.
pub fn optimal_path(game_data: &GameData, completed: &BTreeSet<ActionId>, target_id: &str) -> OptimalPathReport {
    tracing::debug!(target_id, "searching for optimal path via SAT");
    if completed.contains(target_id) {
        return OptimalPathReport {
            result: SatQueryResult::Satisfiable,
            path: Vec::new(),
        };
    }

    let candidate_ids: Vec<ActionId> = game_data
        .actions()
        .iter()
        .map(|a| a.id.clone())
        .filter(|id| !completed.contains(id) && id != target_id)
        .collect();

    for k in 0..=candidate_ids.len() {
        let mut encoder = Encoder::new(game_data);
        encoder.assert_action_preconditions();
        encoder.force_completed(completed);
        let target_lit = encoder.action_lit(target_id, true);
        encoder.clauses.push(vec![target_lit]);

        let candidate_lits: Vec<Lit> = candidate_ids.iter().map(|id| encoder.action_lit(id, true)).collect();
        let mut next_var = encoder.next_var;
        encoder.clauses.extend(at_most_k(&candidate_lits, k, &mut next_var));

        match run_solver(encoder.clauses) {
            (Some(true), Some(model)) => {
                let chosen: Vec<ActionId> = candidate_ids
                    .iter()
                    .zip(candidate_lits.iter())
                    .filter(|(_, lit)| model.contains(lit))
                    .map(|(id, _)| id.clone())
                    .collect();
                let path = order_by_dependency(game_data, chosen);
                return OptimalPathReport {
                    result: SatQueryResult::Satisfiable,
                    path,
                };
            }
            (Some(false), _) => continue,
            _ => {
                return OptimalPathReport {
                    result: SatQueryResult::Unknown,
                    path: Vec::new(),
                };
            }
        }
    }

    OptimalPathReport {
        result: SatQueryResult::Unsatisfiable,
        path: Vec::new(),
    }
}

fn to_result(outcome: Option<bool>) -> SatQueryResult {
    match outcome {
        Some(true) => SatQueryResult::Satisfiable,
        Some(false) => SatQueryResult::Unsatisfiable,
        None => SatQueryResult::Unknown,
    }
}

fn run_solver(clauses: Vec<Vec<Lit>>) -> (Option<bool>, Option<Vec<Lit>>) {
    let mut solver = Solver::new();
    for clause in &clauses {
        solver.add_clause(clause);
    }
    match solver.solve() {
        Ok(true) => (Some(true), solver.model()),
        Ok(false) => (Some(false), None),
        Err(_) => (None, None),
    }
}

struct Encoder<'g> {
    game_data: &'g GameData,
    action_var: std::collections::BTreeMap<ActionId, usize>,
    next_var: usize,
    clauses: Vec<Vec<Lit>>,
    true_lit: Lit,
}

impl<'g> Encoder<'g> {
    fn new(game_data: &'g GameData) -> Self {
        let mut action_var = std::collections::BTreeMap::new();
        let mut next_var = 1usize;
        for action in game_data.actions() {
            action_var.insert(action.id.clone(), next_var);
            next_var += 1;
        }
        let true_var = next_var;
        next_var += 1;
        let true_lit = Lit::from_dimacs(true_var as isize);
        Self {
            game_data,
            action_var,
            next_var,
            clauses: vec![vec![true_lit]],
            true_lit,
        }
    }

    fn false_lit(&self) -> Lit {
        !self.true_lit
    }

    fn action_lit(&self, action_id: &str, positive: bool) -> Lit {
        match self.action_var.get(action_id) {
            Some(&v) => {
                let lit = Lit::from_dimacs(v as isize);
                if positive { lit } else { !lit }
            }
            // A reference to an action outside the catalogue can never be
            // completed, matching `evaluate`'s "absent" treatment.
            None => {
                if positive {
                    self.false_lit()
                } else {
                    self.true_lit
                }
            }
        }
    }

    fn fresh_var(&mut self) -> Lit {
        let v = self.next_var;
        self.next_var += 1;
        Lit::from_dimacs(v as isize)
    }

    fn encode(&mut self, expr: &PreconditionExpression) -> Lit {
        match expr {
            PreconditionExpression::Always => self.true_lit,
            PreconditionExpression::ActionRequired(id) => self.action_lit(id, true),
            PreconditionExpression::ActionForbidden(id) => self.action_lit(id, false),
            PreconditionExpression::ItemRequired(item_id) => self.encode_item(item_id),
            PreconditionExpression::And(children) => {
                let child_lits: Vec<Lit> = children.iter().map(|c| self.encode(c)).collect();
                let v = self.fresh_var();
                for &c in &child_lits {
                    self.clauses.push(vec![!v, c]);
                }
                let mut backward = vec![v];
                backward.extend(child_lits.iter().map(|&c| !c));
                self.clauses.push(backward);
                v
            }
            PreconditionExpression::Or(children) => {
                let child_lits: Vec<Lit> = children.iter().map(|c| self.encode(c)).collect();
                let v = self.fresh_var();
                let mut forward = vec![!v];
                forward.extend(child_lits.iter().copied());
                self.clauses.push(forward);
                for &c in &child_lits {
                    self.clauses.push(vec![!c, v]);
                }
                v
            }
        }
    }

    fn encode_item(&mut self, item_id: &str) -> Lit {
        let providers: Vec<ActionId> = self.game_data.providers_of(item_id).map(|a| a.id.clone()).collect();
        match providers.len() {
            0 => self.false_lit(),
            1 => self.action_lit(&providers[0], true),
            _ => {
                let provider_lits: Vec<Lit> = providers.iter().map(|p| self.action_lit(p, true)).collect();
                let v = self.fresh_var();
                let mut forward = vec![!v];
                forward.extend(provider_lits.iter().copied());
                self.clauses.push(forward);
                for &p in &provider_lits {
                    self.clauses.push(vec![!p, v]);
                }
                v
            }
        }
    }

    fn assert_action_preconditions(&mut self) {
        let action_ids: Vec<ActionId> = self.game_data.actions().iter().map(|a| a.id.clone()).collect();
        for action_id in action_ids {
            let Some(action) = self.game_data.action(&action_id) else {
                continue;
            };
            let precond_expr = action.preconditions.clone();
            let precond_lit = self.encode(&precond_expr);
            let action_lit = self.action_lit(&action_id, true);
            self.clauses.push(vec![!action_lit, precond_lit]);
        }
    }

    fn force_completed(&mut self, completed: &BTreeSet<ActionId>) {
        for id in completed {
            let lit = self.action_lit(id, true);
            self.clauses.push(vec![lit]);
        }
    }
}

/// Sinz's sequential-counter "at most k" encoding over `xs`, allocating
/// fresh variables from `next_var`. Empty when `k >= xs.len()`.
fn at_most_k(xs: &[Lit], k: usize, next_var: &mut usize) -> Vec<Vec<Lit>> {
    let n = xs.len();
    if n == 0 || k >= n {
        return Vec::new();
    }
    if k == 0 {
        return xs.iter().map(|&x| vec![!x]).collect();
    }

    let mut s: Vec<Vec<Lit>> = Vec::with_capacity(n - 1);
    for _ in 0..n - 1 {
        let row: Vec<Lit> = (0..k)
            .map(|_| {
                let v = *next_var;
                *next_var += 1;
                Lit::from_dimacs(v as isize)
            })
            .collect();
        s.push(row);
    }

    let mut clauses = Vec::new();
    clauses.push(vec![!xs[0], s[0][0]]);
    for row in s[0].iter().skip(1) {
        clauses.push(vec![!*row]);
    }

    for i in 1..n - 1 {
        clauses.push(vec![!xs[i], s[i][0]]);
        clauses.push(vec![!s[i - 1][0], s[i][0]]);
        for j in 1..k {
            clauses.push(vec![!xs[i], !s[i - 1][j - 1], s[i][j]]);
            clauses.push(vec![!s[i - 1][j], s[i][j]]);
        }
        clauses.push(vec![!xs[i], !s[i - 1][k - 1]]);
    }
    clauses.push(vec![!xs[n - 1], !s[n - 2][k - 1]]);
    clauses
}
