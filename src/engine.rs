//! The precondition engine (C2): total, side-effect-free evaluation against
//! a completion set and its derived inventory.

use std::collections::BTreeSet;

use crate::model::{ActionId, GameData, ItemId};
use crate::precondition::PreconditionExpression;

/// Union of `reward.item_id` over every completed action. Deterministic in
/// the completed set alone, independent of catalogue iteration order.
pub fn get_inventory(game_data: &GameData, completed: &BTreeSet<ActionId>) -> BTreeSet<ItemId> {
    let mut inventory = BTreeSet::new();
    for action_id in completed {
        if let Some(action) = game_data.action(action_id) {
            for reward in &action.rewards {
                inventory.insert(reward.item_id.clone());
            }
        }
    }
    inventory
}

/// Evaluate a precondition expression against a completion set and its
/// inventory. Unknown action/item references evaluate as absent rather than
/// erroring.
pub fn evaluate(
    expr: &PreconditionExpression,
    completed: &BTreeSet<ActionId>,
    inventory: &BTreeSet<ItemId>,
) -> bool {
    match expr {
        PreconditionExpression::Always => true,
        PreconditionExpression::ActionRequired(id) => completed.contains(id),
        PreconditionExpression::ActionForbidden(id) => !completed.contains(id),
        PreconditionExpression::ItemRequired(id) => inventory.contains(id),
        PreconditionExpression::And(children) => {
            children.iter().all(|c| evaluate(c, completed, inventory))
        }
        PreconditionExpression::Or(children) => {
            children.iter().any(|c| evaluate(c, completed, inventory))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GameAction, Item};

    fn data() -> GameData {
        GameData::new("g", "Game", "1.0")
            .with_action(GameAction::new("a1", "Alpha").with_reward("item1"))
            .with_item(Item {
                id: "item1".into(),
                name: "Key".into(),
                description: String::new(),
            })
    }

    #[test]
    fn inventory_is_union_of_completed_rewards() {
        let data = data();
        let completed: BTreeSet<ActionId> = ["a1".to_string()].into_iter().collect();
        let inv = get_inventory(&data, &completed);
        assert!(inv.contains("item1"));
    }

    #[test]
    fn inventory_ignores_uncompleted_actions() {
        let data = data();
        let completed = BTreeSet::new();
        assert!(get_inventory(&data, &completed).is_empty());
    }

    #[test]
    fn evaluate_always_is_true() {
        let completed = BTreeSet::new();
        let inventory = BTreeSet::new();
        assert!(evaluate(&PreconditionExpression::Always, &completed, &inventory));
    }

    #[test]
    fn evaluate_action_required() {
        let completed: BTreeSet<ActionId> = ["a1".to_string()].into_iter().collect();
        let inventory = BTreeSet::new();
        assert!(evaluate(
            &PreconditionExpression::ActionRequired("a1".into()),
            &completed,
            &inventory
        ));
        assert!(!evaluate(
            &PreconditionExpression::ActionRequired("a2".into()),
            &completed,
            &inventory
        ));
    }

    #[test]
    fn evaluate_action_forbidden() {
        let completed: BTreeSet<ActionId> = ["a1".to_string()].into_iter().collect();
        let inventory = BTreeSet::new();
        assert!(!evaluate(
            &PreconditionExpression::ActionForbidden("a1".into()),
            &completed,
            &inventory
        ));
        assert!(evaluate(
            &PreconditionExpression::ActionForbidden("a2".into()),
            &completed,
            &inventory
        ));
    }

    #[test]
    fn evaluate_and_or() {
        let completed: BTreeSet<ActionId> = ["a1".to_string()].into_iter().collect();
        let inventory = BTreeSet::new();
        let and_expr = PreconditionExpression::And(vec![
            PreconditionExpression::ActionRequired("a1".into()),
            PreconditionExpression::ActionRequired("a2".into()),
        ]);
        assert!(!evaluate(&and_expr, &completed, &inventory));

        let or_expr = PreconditionExpression::Or(vec![
            PreconditionExpression::ActionRequired("a1".into()),
            PreconditionExpression::ActionRequired("a2".into()),
        ]);
        assert!(evaluate(&or_expr, &completed, &inventory));
    }

    #[test]
    fn evaluate_missing_reference_is_false_not_panic() {
        let completed = BTreeSet::new();
        let inventory = BTreeSet::new();
        assert!(!evaluate(
            &PreconditionExpression::ActionRequired("ghost".into()),
            &completed,
            &inventory
        ));
        assert!(!evaluate(
            &PreconditionExpression::ItemRequired("ghost-item".into()),
            &completed,
            &inventory
        ));
    }
}
