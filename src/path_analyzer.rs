//! The path analyzer (C4): per-action availability and single-step goal
//! impact, used by the snapshot's `currentActions` accessor.

use std::collections::BTreeSet;

use crate::engine::{evaluate, get_inventory};
use crate::model::{ActionId, GameData, Goal, GoalId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionAvailability {
    pub action_id: ActionId,
    pub is_available: bool,
    /// Goals that would stop being (directly) achievable if this action were
    /// performed next. Single-step simulation only, not a reachability
    /// analysis.
    pub would_break_goals: Vec<GoalId>,
    /// Goals this action is a structural requirement for.
    pub required_for_goals: Vec<GoalId>,
}

pub fn is_available(game_data: &GameData, completed: &BTreeSet<ActionId>, action_id: &str) -> bool {
    if completed.contains(action_id) {
        return false;
    }
    match game_data.action(action_id) {
        Some(action) => {
            let inventory = get_inventory(game_data, completed);
            evaluate(&action.preconditions, completed, &inventory)
        }
        None => false,
    }
}

/// Compute per-action availability and goal impact for every action in the
/// catalogue, sorted by action name for deterministic display order.
pub fn analyze_actions(
    game_data: &GameData,
    completed: &BTreeSet<ActionId>,
    goals: &[Goal],
) -> Vec<ActionAvailability> {
    let inventory = get_inventory(game_data, completed);

    let mut results: Vec<ActionAvailability> = game_data
        .actions()
        .iter()
        .map(|action| {
            let is_available = !completed.contains(&action.id)
                && evaluate(&action.preconditions, completed, &inventory);

            let would_break_goals = if is_available {
                would_break_goals(game_data, completed, &action.id, goals)
            } else {
                Vec::new()
            };

            let required_for_goals = required_for_goals(game_data, &action.id, goals);

            ActionAvailability {
                action_id: action.id.clone(),
                is_available,
                would_break_goals,
                required_for_goals,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        let name_a = game_data.action(&a.action_id).map(|x| x.name.as_str()).unwrap_or("");
        let name_b = game_data.action(&b.action_id).map(|x| x.name.as_str()).unwrap_or("");
        name_a.cmp(name_b)
    });
    results
}

fn would_break_goals(
    game_data: &GameData,
    completed: &BTreeSet<ActionId>,
    action_id: &str,
    goals: &[Goal],
) -> Vec<GoalId> {
    let mut simulated = completed.clone();
    simulated.insert(action_id.to_string());
    let simulated_inventory = get_inventory(game_data, &simulated);

    goals
        .iter()
        .filter(|goal| {
            if simulated.contains(&goal.target_id) {
                return false;
            }
            match game_data.action(&goal.target_id) {
                Some(target) => !evaluate(&target.preconditions, &simulated, &simulated_inventory),
                None => true,
            }
        })
        .map(|g| g.id.clone())
        .collect()
}

fn required_for_goals(game_data: &GameData, action_id: &str, goals: &[Goal]) -> Vec<GoalId> {
    goals
        .iter()
        .filter(|goal| {
            if goal.target_id == action_id {
                return true;
            }
            match game_data.action(&goal.target_id) {
                Some(target) => target.preconditions.extract_required_actions().contains(action_id),
                None => false,
            }
        })
        .map(|g| g.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GameAction;
    use crate::precondition::PreconditionExpression;

    fn fixture() -> GameData {
        GameData::new("g", "Game", "1.0")
            .with_action(GameAction::new("A1", "Start"))
            .with_action(
                GameAction::new("A2", "Second")
                    .with_preconditions(PreconditionExpression::ActionRequired("A1".into())),
            )
            .with_action(
                GameAction::new("AC", "Conflict")
                    .with_preconditions(PreconditionExpression::ActionForbidden("A2".into())),
            )
    }

    #[test]
    fn available_excludes_completed_and_unmet_preconditions() {
        let data = fixture();
        let completed: BTreeSet<ActionId> = ["A1".to_string()].into_iter().collect();
        assert!(!is_available(&data, &completed, "A1"));
        assert!(is_available(&data, &completed, "A2"));
        assert!(!is_available(&data, &BTreeSet::new(), "A2"));
    }

    #[test]
    fn performing_ac_would_break_goal_on_a2() {
        let data = fixture();
        let completed: BTreeSet<ActionId> = ["A1".to_string()].into_iter().collect();
        let goals = vec![Goal::new("goal-a2", "A2")];
        let results = analyze_actions(&data, &completed, &goals);
        let ac = results.iter().find(|r| r.action_id == "AC").unwrap();
        assert_eq!(ac.would_break_goals, vec!["goal-a2".to_string()]);
    }

    #[test]
    fn a1_is_required_for_goal_on_a2() {
        let data = fixture();
        let completed = BTreeSet::new();
        let goals = vec![Goal::new("goal-a2", "A2")];
        let results = analyze_actions(&data, &completed, &goals);
        let a1 = results.iter().find(|r| r.action_id == "A1").unwrap();
        assert_eq!(a1.required_for_goals, vec!["goal-a2".to_string()]);
    }

    #[test]
    fn results_are_sorted_by_action_name() {
        let data = fixture();
        let results = analyze_actions(&data, &BTreeSet::new(), &[]);
        let names: Vec<&str> = results
            .iter()
            .map(|r| data.action(&r.action_id).unwrap().name.as_str())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
