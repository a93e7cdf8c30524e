//! The goal analyzer (C3): classifies a goal as completed, directly
//! achievable, achievable, or unachievable, with supporting required- and
//! blocking-action lists.

use std::collections::BTreeSet;

use crate::engine::evaluate;
use crate::model::{ActionId, GameData, Goal, ItemId};
use crate::precondition::PreconditionExpression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalClassification {
    Completed,
    DirectlyAchievable,
    Achievable,
    Unachievable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalReport {
    pub classification: GoalClassification,
    pub required_actions: Vec<ActionId>,
    pub blocking_actions: Vec<ActionId>,
}

/// Result of recursively checking whether an expression can eventually hold.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AchievabilityResult {
    achievable: bool,
    required_actions: Vec<ActionId>,
    blocking_actions: Vec<ActionId>,
}

impl AchievabilityResult {
    fn ok(required: Vec<ActionId>) -> Self {
        Self {
            achievable: true,
            required_actions: required,
            blocking_actions: Vec::new(),
        }
    }

    fn fail(blocking: Vec<ActionId>) -> Self {
        Self {
            achievable: false,
            required_actions: Vec::new(),
            blocking_actions: blocking,
        }
    }
}

/// Classify `goal` against the catalogue and current completion/inventory.
/// A goal whose target action is missing from the catalogue is
/// `Unachievable`, never an error.
pub fn classify_goal(
    goal: &Goal,
    game_data: &GameData,
    completed: &BTreeSet<ActionId>,
    inventory: &BTreeSet<ItemId>,
) -> GoalReport {
    if completed.contains(&goal.target_id) {
        return GoalReport {
            classification: GoalClassification::Completed,
            required_actions: Vec::new(),
            blocking_actions: Vec::new(),
        };
    }

    let Some(target) = game_data.action(&goal.target_id) else {
        return GoalReport {
            classification: GoalClassification::Unachievable,
            required_actions: Vec::new(),
            blocking_actions: Vec::new(),
        };
    };

    if evaluate(&target.preconditions, completed, inventory) {
        return GoalReport {
            classification: GoalClassification::DirectlyAchievable,
            required_actions: Vec::new(),
            blocking_actions: Vec::new(),
        };
    }

    let visited = BTreeSet::new();
    let result = check_achievability(&target.preconditions, game_data, completed, inventory, &visited);

    GoalReport {
        classification: if result.achievable {
            GoalClassification::Achievable
        } else {
            GoalClassification::Unachievable
        },
        required_actions: result.required_actions,
        blocking_actions: result.blocking_actions,
    }
}

fn check_achievability(
    expr: &PreconditionExpression,
    game_data: &GameData,
    completed: &BTreeSet<ActionId>,
    inventory: &BTreeSet<ItemId>,
    visited: &BTreeSet<ActionId>,
) -> AchievabilityResult {
    match expr {
        PreconditionExpression::Always => AchievabilityResult::ok(Vec::new()),

        PreconditionExpression::ActionRequired(action_id) => {
            if completed.contains(action_id) {
                return AchievabilityResult::ok(Vec::new());
            }
            if visited.contains(action_id) {
                return AchievabilityResult::fail(Vec::new());
            }
            let Some(action) = game_data.action(action_id) else {
                return AchievabilityResult::fail(Vec::new());
            };
            let mut next_visited = visited.clone();
            next_visited.insert(action_id.clone());
            let inner = check_achievability(&action.preconditions, game_data, completed, inventory, &next_visited);
            if inner.achievable {
                let mut required = inner.required_actions;
                required.push(action_id.clone());
                AchievabilityResult::ok(required)
            } else {
                AchievabilityResult::fail(inner.blocking_actions)
            }
        }

        PreconditionExpression::ActionForbidden(action_id) => {
            if completed.contains(action_id) {
                AchievabilityResult::fail(vec![action_id.clone()])
            } else {
                AchievabilityResult::ok(Vec::new())
            }
        }

        PreconditionExpression::ItemRequired(item_id) => {
            if inventory.contains(item_id) {
                return AchievabilityResult::ok(Vec::new());
            }
            let mut blocking = Vec::new();
            for provider in game_data.providers_of(item_id) {
                if completed.contains(&provider.id) {
                    // Already completed but item missing from inventory means
                    // the catalogue is inconsistent; skip, don't loop forever.
                    continue;
                }
                if visited.contains(&provider.id) {
                    continue;
                }
                let mut next_visited = visited.clone();
                next_visited.insert(provider.id.clone());
                let inner = check_achievability(
                    &provider.preconditions,
                    game_data,
                    completed,
                    inventory,
                    &next_visited,
                );
                if inner.achievable {
                    let mut required = inner.required_actions;
                    required.push(provider.id.clone());
                    return AchievabilityResult::ok(required);
                }
                blocking.extend(inner.blocking_actions);
            }
            AchievabilityResult::fail(blocking)
        }

        PreconditionExpression::And(children) => {
            let mut required = Vec::new();
            let mut blocking = Vec::new();
            let mut all_ok = true;
            for child in children {
                let result = check_achievability(child, game_data, completed, inventory, visited);
                if result.achievable {
                    for id in result.required_actions {
                        if !required.contains(&id) {
                            required.push(id);
                        }
                    }
                } else {
                    all_ok = false;
                    for id in result.blocking_actions {
                        if !blocking.contains(&id) {
                            blocking.push(id);
                        }
                    }
                }
            }
            if all_ok {
                AchievabilityResult::ok(required)
            } else {
                AchievabilityResult::fail(blocking)
            }
        }

        PreconditionExpression::Or(children) => {
            let mut best: Option<Vec<ActionId>> = None;
            let mut blocking = Vec::new();
            for child in children {
                let result = check_achievability(child, game_data, completed, inventory, visited);
                if result.achievable {
                    let is_smaller = best
                        .as_ref()
                        .map(|b| result.required_actions.len() < b.len())
                        .unwrap_or(true);
                    if is_smaller {
                        best = Some(result.required_actions);
                    }
                } else {
                    for id in result.blocking_actions {
                        if !blocking.contains(&id) {
                            blocking.push(id);
                        }
                    }
                }
            }
            match best {
                Some(required) => AchievabilityResult::ok(required),
                None => AchievabilityResult::fail(blocking),
            }
        }
    }
}
