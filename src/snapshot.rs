//! The action-graph snapshot (C5): an immutable facade over a `GameData`
//! and a run state, combining the precondition engine, goal analyzer, and
//! path analyzer with BFS shortest-path search, undoability, conflict
//! detection, and multi-goal unification.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use crate::engine::{evaluate, get_inventory};
use crate::error::{KernelError, KernelResult, ViolatedPredicate};
use crate::model::{ActionId, GameAction, GameData, Goal, GoalId, ItemId};

/// Per-goal BFS result, rebuilt from scratch whenever a snapshot is built.
/// Never carried over from one snapshot to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPathInfo {
    pub is_achievable: bool,
    /// -1 when unreachable; otherwise the number of actions still needed.
    pub path_length: i64,
    pub path: Vec<ActionId>,
    pub blocking_actions: Vec<ActionId>,
}

impl CachedPathInfo {
    fn unreachable() -> Self {
        Self {
            is_achievable: false,
            path_length: -1,
            path: Vec::new(),
            blocking_actions: Vec::new(),
        }
    }

    fn unreachable_with_blockers(blocking_actions: Vec<ActionId>) -> Self {
        Self {
            is_achievable: false,
            path_length: -1,
            path: Vec::new(),
            blocking_actions,
        }
    }

    fn already_achievable() -> Self {
        Self {
            is_achievable: true,
            path_length: 0,
            path: Vec::new(),
            blocking_actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSeverity {
    MutualExclusion,
    InducedConflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub severity: ConflictSeverity,
    pub involved_goals: Vec<GoalId>,
    pub description: String,
}

/// An action available right now, with its structural impact on active goals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentAction {
    pub action_id: ActionId,
    /// Goal id -> candidate paths containing this action. The outer `Vec`
    /// is kept for a future multi-path search; today it holds at most one
    /// inner path.
    pub enables_goals: Vec<(GoalId, Vec<Vec<ActionId>>)>,
    pub blocks_goals: Vec<GoalId>,
}

/// An immutable value combining a catalogue, a completion set, and active
/// goals. All transformations return a new snapshot.
#[derive(Debug, Clone)]
pub struct ActionGraphSnapshot {
    game_data: Arc<GameData>,
    completed: BTreeSet<ActionId>,
    goals: Vec<Goal>,
    path_cache: BTreeMap<GoalId, CachedPathInfo>,
}

impl ActionGraphSnapshot {
    pub fn new(game_data: Arc<GameData>, completed: BTreeSet<ActionId>, goals: Vec<Goal>) -> Self {
        let path_cache = build_cache(&game_data, &completed, &goals);
        Self {
            game_data,
            completed,
            goals,
            path_cache,
        }
    }

    pub fn game_data(&self) -> &GameData {
        &self.game_data
    }

    pub fn completed(&self) -> &BTreeSet<ActionId> {
        &self.completed
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn inventory(&self) -> BTreeSet<ItemId> {
        get_inventory(&self.game_data, &self.completed)
    }

    pub fn path_info(&self, goal_id: &str) -> Option<&CachedPathInfo> {
        self.path_cache.get(goal_id)
    }

    pub fn resolve_path(&self, ids: &[ActionId]) -> Vec<GameAction> {
        ids.iter().filter_map(|id| self.game_data.action(id).cloned()).collect()
    }

    pub fn ready_goals(&self) -> Vec<&Goal> {
        self.goals
            .iter()
            .filter(|g| {
                !self.completed.contains(&g.target_id)
                    && self
                        .path_cache
                        .get(&g.id)
                        .is_some_and(|c| c.is_achievable && c.path_length == 0)
            })
            .collect()
    }

    pub fn achievable_goals(&self) -> Vec<&Goal> {
        self.goals
            .iter()
            .filter(|g| {
                !self.completed.contains(&g.target_id)
                    && self
                        .path_cache
                        .get(&g.id)
                        .is_some_and(|c| c.is_achievable && c.path_length > 0)
            })
            .collect()
    }

    pub fn completed_goals(&self) -> Vec<&Goal> {
        self.goals.iter().filter(|g| self.completed.contains(&g.target_id)).collect()
    }

    pub fn unachievable_goals(&self) -> Vec<&Goal> {
        self.goals
            .iter()
            .filter(|g| {
                !self.completed.contains(&g.target_id)
                    && self.path_cache.get(&g.id).is_none_or(|c| !c.is_achievable)
            })
            .collect()
    }

    pub fn current_actions(&self) -> Vec<CurrentAction> {
        let inventory = self.inventory();
        let mut actions: Vec<CurrentAction> = self
            .game_data
            .actions()
            .iter()
            .filter(|a| !self.completed.contains(&a.id) && evaluate(&a.preconditions, &self.completed, &inventory))
            .map(|a| {
                let enables_goals = self
                    .goals
                    .iter()
                    .filter_map(|g| {
                        self.path_cache.get(&g.id).and_then(|info| {
                            if info.is_achievable && info.path.contains(&a.id) {
                                Some((g.id.clone(), vec![info.path.clone()]))
                            } else {
                                None
                            }
                        })
                    })
                    .collect();

                let blocks_goals = self
                    .goals
                    .iter()
                    .filter(|g| match self.game_data.action(&g.target_id) {
                        Some(target) => {
                            target.preconditions.extract_forbidden_actions().contains(&a.id)
                                || a.preconditions.extract_forbidden_actions().contains(&g.target_id)
                        }
                        None => false,
                    })
                    .map(|g| g.id.clone())
                    .collect();

                CurrentAction {
                    action_id: a.id.clone(),
                    enables_goals,
                    blocks_goals,
                }
            })
            .collect();

        actions.sort_by(|x, y| {
            let nx = self.game_data.action(&x.action_id).map(|a| a.name.as_str()).unwrap_or("");
            let ny = self.game_data.action(&y.action_id).map(|a| a.name.as_str()).unwrap_or("");
            nx.cmp(ny)
        });
        actions
    }

    pub fn completed_actions(&self) -> Vec<(ActionId, bool)> {
        self.completed.iter().map(|id| (id.clone(), self.can_undo(id))).collect()
    }

    /// Conservative over-approximation: ignores `Or`-alternatives that might
    /// remain satisfied without `action_id`.
    pub fn can_undo(&self, action_id: &str) -> bool {
        if !self.completed.contains(action_id) {
            return false;
        }
        !self.completed.iter().any(|other| {
            other != action_id
                && self
                    .game_data
                    .action(other)
                    .is_some_and(|a| a.preconditions.extract_required_actions().contains(action_id))
        })
    }

    pub fn perform_action(&self, action_id: &str) -> KernelResult<ActionGraphSnapshot> {
        let Some(action) = self.game_data.action(action_id) else {
            return Err(KernelError::PreconditionViolation {
                action: action_id.to_string(),
                predicate: ViolatedPredicate::NotInCatalogue,
            });
        };
        if self.completed.contains(action_id) {
            return Err(KernelError::PreconditionViolation {
                action: action_id.to_string(),
                predicate: ViolatedPredicate::AlreadyCompleted,
            });
        }
        let inventory = self.inventory();
        if !evaluate(&action.preconditions, &self.completed, &inventory) {
            return Err(KernelError::PreconditionViolation {
                action: action_id.to_string(),
                predicate: ViolatedPredicate::PreconditionsNotMet,
            });
        }
        let mut completed = self.completed.clone();
        completed.insert(action_id.to_string());
        tracing::debug!(action_id, "performing action");
        Ok(ActionGraphSnapshot::new(self.game_data.clone(), completed, self.goals.clone()))
    }

    pub fn undo_action(&self, action_id: &str) -> KernelResult<ActionGraphSnapshot> {
        if !self.completed.contains(action_id) {
            return Err(KernelError::PreconditionViolation {
                action: action_id.to_string(),
                predicate: ViolatedPredicate::NotCompleted,
            });
        }
        if !self.can_undo(action_id) {
            return Err(KernelError::PreconditionViolation {
                action: action_id.to_string(),
                predicate: ViolatedPredicate::CannotUndo,
            });
        }
        let mut completed = self.completed.clone();
        completed.remove(action_id);
        tracing::debug!(action_id, "undoing action");
        Ok(ActionGraphSnapshot::new(self.game_data.clone(), completed, self.goals.clone()))
    }

    pub fn add_goals(&self, goals: impl IntoIterator<Item = Goal>) -> ActionGraphSnapshot {
        let mut new_goals = self.goals.clone();
        for g in goals {
            if !new_goals.contains(&g) {
                new_goals.push(g);
            }
        }
        ActionGraphSnapshot::new(self.game_data.clone(), self.completed.clone(), new_goals)
    }

    pub fn remove_goals(&self, goals: &[Goal]) -> ActionGraphSnapshot {
        let new_goals: Vec<Goal> = self.goals.iter().filter(|g| !goals.contains(g)).cloned().collect();
        ActionGraphSnapshot::new(self.game_data.clone(), self.completed.clone(), new_goals)
    }

    /// Fast/advisory conflict scan: structural direct conflicts plus a
    /// cache-diff induced-conflict pass. This only catches conflicts that
    /// surface as a single existing goal flipping from achievable to
    /// unachievable; use `sat::goal_compatibility` for a precise answer.
    pub fn check_conflicts_when_adding_goal(&self, goal: &Goal) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        let Some(target) = self.game_data.action(&goal.target_id) else {
            conflicts.push(Conflict {
                severity: ConflictSeverity::MutualExclusion,
                involved_goals: vec![goal.id.clone()],
                description: format!("goal '{}' targets a missing action '{}'", goal.id, goal.target_id),
            });
            return conflicts;
        };

        let forbidden_by_goal = target.preconditions.extract_forbidden_actions();
        for other in &self.goals {
            if other.id == goal.id {
                continue;
            }
            let other_forbids_goal = self
                .game_data
                .action(&other.target_id)
                .map(|a| a.preconditions.extract_forbidden_actions().contains(&goal.target_id))
                .unwrap_or(false);
            if forbidden_by_goal.contains(&other.target_id) || other_forbids_goal {
                conflicts.push(Conflict {
                    severity: ConflictSeverity::MutualExclusion,
                    involved_goals: vec![goal.id.clone(), other.id.clone()],
                    description: format!("goal '{}' and goal '{}' structurally forbid each other's target", goal.id, other.id),
                });
            }
        }

        let extended = self.add_goals(std::iter::once(goal.clone()));
        for other in &self.goals {
            if other.id == goal.id {
                continue;
            }
            let was_achievable = self.path_cache.get(&other.id).is_some_and(|c| c.is_achievable);
            let now_achievable = extended.path_cache.get(&other.id).is_some_and(|c| c.is_achievable);
            if was_achievable && !now_achievable {
                conflicts.push(Conflict {
                    severity: ConflictSeverity::InducedConflict,
                    involved_goals: vec![goal.id.clone(), other.id.clone()],
                    description: format!("adding goal '{}' makes goal '{}' unreachable", goal.id, other.id),
                });
            }
        }

        conflicts
    }

    /// Minimal, dependency-ordered sequence of actions satisfying every
    /// ready/achievable goal. Cycles leave some nodes unemitted; the
    /// partial order is still returned.
    pub fn get_unified_path_to_goals(&self) -> Vec<ActionId> {
        let relevant: BTreeSet<GoalId> = self
            .ready_goals()
            .into_iter()
            .chain(self.achievable_goals())
            .map(|g| g.id.clone())
            .collect();

        let mut nodes: Vec<ActionId> = Vec::new();
        let mut seen = BTreeSet::new();
        for goal in &self.goals {
            if !relevant.contains(&goal.id) {
                continue;
            }
            if let Some(info) = self.path_cache.get(&goal.id) {
                for id in &info.path {
                    if seen.insert(id.clone()) {
                        nodes.push(id.clone());
                    }
                }
            }
            if !self.completed.contains(&goal.target_id) && seen.insert(goal.target_id.clone()) {
                nodes.push(goal.target_id.clone());
            }
        }

        order_by_dependency(&self.game_data, nodes)
    }
}

/// Order `nodes` so that `x` precedes `y` whenever `y` structurally requires
/// `x` (either directly, or as an item provider), breaking ties by the
/// input order. Cycles leave the offending nodes unemitted.
pub(crate) fn order_by_dependency(game_data: &GameData, nodes: Vec<ActionId>) -> Vec<ActionId> {
    let n = nodes.len();
    let mut indegree = vec![0usize; n];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (y_index, y_id) in nodes.iter().enumerate() {
        let Some(y_action) = game_data.action(y_id) else {
            continue;
        };
        let required_actions = y_action.preconditions.extract_required_actions();
        for (x_index, x_id) in nodes.iter().enumerate() {
            if x_index == y_index {
                continue;
            }
            let required_item_edge = y_action.preconditions.extract_required_items().iter().any(|item_id| {
                game_data
                    .action(x_id)
                    .is_some_and(|x_action| x_action.rewards.iter().any(|r| &r.item_id == item_id))
            });
            if required_actions.contains(x_id) || required_item_edge {
                adjacency[x_index].push(y_index);
                indegree[y_index] += 1;
            }
        }
    }

    kahn_topo_sort(&nodes, &mut indegree, &adjacency)
}

fn kahn_topo_sort(nodes: &[ActionId], indegree: &mut [usize], adjacency: &[Vec<usize>]) -> Vec<ActionId> {
    let n = nodes.len();
    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);
    for _ in 0..n {
        let next = (0..n).find(|&i| !emitted[i] && indegree[i] == 0);
        match next {
            Some(i) => {
                emitted[i] = true;
                order.push(nodes[i].clone());
                for &j in &adjacency[i] {
                    if !emitted[j] {
                        indegree[j] -= 1;
                    }
                }
            }
            None => break,
        }
    }
    order
}

fn build_cache(game_data: &GameData, completed: &BTreeSet<ActionId>, goals: &[Goal]) -> BTreeMap<GoalId, CachedPathInfo> {
    let mut cache = BTreeMap::new();
    for goal in goals {
        cache
            .entry(goal.id.clone())
            .or_insert_with(|| bfs_path(game_data, completed, &goal.target_id));
    }
    cache
}

fn bfs_path(game_data: &GameData, completed: &BTreeSet<ActionId>, target_id: &str) -> CachedPathInfo {
    let Some(target) = game_data.action(target_id) else {
        return CachedPathInfo::unreachable();
    };
    if completed.contains(target_id) {
        return CachedPathInfo::already_achievable();
    }

    let inventory = get_inventory(game_data, completed);
    if evaluate(&target.preconditions, completed, &inventory) {
        return CachedPathInfo::already_achievable();
    }

    let blockers: Vec<ActionId> = target
        .preconditions
        .extract_forbidden_actions()
        .intersection(completed)
        .cloned()
        .collect();
    if !blockers.is_empty() {
        return CachedPathInfo::unreachable_with_blockers(blockers);
    }

    let mut visited: BTreeSet<ActionId> = BTreeSet::new();
    let mut predecessor: BTreeMap<ActionId, ActionId> = BTreeMap::new();
    let mut queue: VecDeque<ActionId> = VecDeque::new();

    for action in game_data.actions() {
        if !completed.contains(&action.id) && evaluate(&action.preconditions, completed, &inventory) {
            if visited.insert(action.id.clone()) {
                queue.push_back(action.id.clone());
            }
        }
    }

    while let Some(cur) = queue.pop_front() {
        if cur == target_id {
            let path = reconstruct_path(&predecessor, &cur);
            return CachedPathInfo {
                is_achievable: true,
                path_length: path.len() as i64,
                path,
                blocking_actions: Vec::new(),
            };
        }

        let path_so_far = reconstruct_path(&predecessor, &cur);
        let mut completed_for_step = completed.clone();
        completed_for_step.extend(path_so_far);
        completed_for_step.insert(cur.clone());
        let inventory_for_step = get_inventory(game_data, &completed_for_step);

        for action in game_data.actions() {
            if completed_for_step.contains(&action.id) || visited.contains(&action.id) {
                continue;
            }
            if evaluate(&action.preconditions, &completed_for_step, &inventory_for_step) {
                visited.insert(action.id.clone());
                predecessor.insert(action.id.clone(), cur.clone());
                queue.push_back(action.id.clone());
            }
        }
    }

    CachedPathInfo::unreachable()
}

/// Walk the predecessor chain backward from `node`, returning the actions
/// that must run before it, in execution order.
fn reconstruct_path(predecessor: &BTreeMap<ActionId, ActionId>, node: &ActionId) -> Vec<ActionId> {
    let mut result = Vec::new();
    let mut cur = node.clone();
    while let Some(p) = predecessor.get(&cur) {
        result.push(p.clone());
        cur = p.clone();
    }
    result.reverse();
    result
}
