//! The precondition language (C1): a finite, acyclic, pure boolean
//! expression tree over completed actions and held items.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{ActionId, ItemId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreconditionExpression {
    Always,
    ActionRequired(ActionId),
    ActionForbidden(ActionId),
    ItemRequired(ItemId),
    And(Vec<PreconditionExpression>),
    Or(Vec<PreconditionExpression>),
}

impl PreconditionExpression {
    pub fn and(children: Vec<PreconditionExpression>) -> Self {
        PreconditionExpression::And(children)
    }

    pub fn or(children: Vec<PreconditionExpression>) -> Self {
        PreconditionExpression::Or(children)
    }

    /// Union of `actionId` under every `ActionRequired`, reached through
    /// `And` and `Or` alike. An over-approximation: an `Or` branch that is
    /// never actually taken still contributes its required actions.
    pub fn extract_required_actions(&self) -> BTreeSet<ActionId> {
        let mut out = BTreeSet::new();
        collect(self, &mut |node| {
            if let PreconditionExpression::ActionRequired(id) = node {
                out.insert(id.clone());
            }
        });
        out
    }

    /// Union of `actionId` under every `ActionForbidden`.
    pub fn extract_forbidden_actions(&self) -> BTreeSet<ActionId> {
        let mut out = BTreeSet::new();
        collect(self, &mut |node| {
            if let PreconditionExpression::ActionForbidden(id) = node {
                out.insert(id.clone());
            }
        });
        out
    }

    /// Union of `itemId` under every `ItemRequired`.
    pub fn extract_required_items(&self) -> BTreeSet<ItemId> {
        let mut out = BTreeSet::new();
        collect(self, &mut |node| {
            if let PreconditionExpression::ItemRequired(id) = node {
                out.insert(id.clone());
            }
        });
        out
    }
}

/// Iterative pre-order walk with an explicit work stack, so traversal depth
/// does not depend on the host call stack even on adversarial catalogues.
fn collect<'a>(root: &'a PreconditionExpression, visit: &mut impl FnMut(&'a PreconditionExpression)) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visit(node);
        match node {
            PreconditionExpression::And(children) | PreconditionExpression::Or(children) => {
                stack.extend(children.iter());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PreconditionExpression {
        PreconditionExpression::And(vec![
            PreconditionExpression::ActionRequired("a1".into()),
            PreconditionExpression::Or(vec![
                PreconditionExpression::ActionForbidden("a2".into()),
                PreconditionExpression::ItemRequired("item1".into()),
            ]),
        ])
    }

    #[test]
    fn extracts_required_actions_through_and_or() {
        let expr = sample();
        let required = expr.extract_required_actions();
        assert_eq!(required.len(), 1);
        assert!(required.contains("a1"));
    }

    #[test]
    fn extracts_forbidden_actions_through_or() {
        let expr = sample();
        let forbidden = expr.extract_forbidden_actions();
        assert!(forbidden.contains("a2"));
    }

    #[test]
    fn extracts_required_items() {
        let expr = sample();
        let items = expr.extract_required_items();
        assert!(items.contains("item1"));
    }

    #[test]
    fn always_has_no_extracted_ids() {
        let expr = PreconditionExpression::Always;
        assert!(expr.extract_required_actions().is_empty());
        assert!(expr.extract_forbidden_actions().is_empty());
        assert!(expr.extract_required_items().is_empty());
    }

    #[test]
    fn or_branches_are_unioned_not_alternated() {
        // Structural extraction must not pick just one Or branch.
        let expr = PreconditionExpression::Or(vec![
            PreconditionExpression::ActionRequired("a1".into()),
            PreconditionExpression::ActionRequired("a2".into()),
        ]);
        let required = expr.extract_required_actions();
        assert_eq!(required.len(), 2);
    }
}
