use std::collections::BTreeSet;
use std::sync::Arc;

use progression_kernel::{
    sat, ActionGraphSnapshot, ConflictSeverity, GameAction, GameData, Goal, Item, KernelError, PreconditionExpression,
    SatQueryResult, ViolatedPredicate,
};

/// A1 grants item1, A2 requires A1, A3 requires item1, AC forbids A2.
fn fixture() -> Arc<GameData> {
    Arc::new(
        GameData::new("demo-game", "Demo", "1.0")
            .with_item(Item {
                id: "item1".into(),
                name: "Rusty Key".into(),
                description: "Opens the first door".into(),
            })
            .with_action(GameAction::new("A1", "Pick up the key").with_reward("item1"))
            .with_action(
                GameAction::new("A2", "Open the door")
                    .with_preconditions(PreconditionExpression::ActionRequired("A1".into())),
            )
            .with_action(
                GameAction::new("A3", "Use the key on the chest")
                    .with_preconditions(PreconditionExpression::ItemRequired("item1".into())),
            )
            .with_action(
                GameAction::new("AC", "Seal the door shut")
                    .with_preconditions(PreconditionExpression::ActionForbidden("A2".into())),
            ),
    )
}

#[test]
fn s1_goal_partition_after_completing_a1() {
    let data = fixture();
    let completed: BTreeSet<_> = ["A1".to_string()].into_iter().collect();
    let goals = vec![Goal::new("goal-a2", "A2"), Goal::new("goal-a3", "A3")];
    let snapshot = ActionGraphSnapshot::new(data, completed, goals);

    let ready: Vec<_> = snapshot.ready_goals().into_iter().map(|g| g.id.clone()).collect();
    assert_eq!(ready.len(), 2);
    assert!(ready.contains(&"goal-a2".to_string()));
    assert!(ready.contains(&"goal-a3".to_string()));
}

#[test]
fn s2_adding_a_conflicting_goal_is_flagged_before_commitment() {
    let data = fixture();
    let completed: BTreeSet<_> = ["A1".to_string()].into_iter().collect();
    let snapshot = ActionGraphSnapshot::new(data, completed, vec![Goal::new("goal-a2", "A2")]);

    let conflicts = snapshot.check_conflicts_when_adding_goal(&Goal::new("goal-ac", "AC"));
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].severity, ConflictSeverity::MutualExclusion);
}

#[test]
fn s3_performing_the_conflicting_action_reclassifies_the_blocked_goal() {
    let data = fixture();
    let completed: BTreeSet<_> = ["A1".to_string()].into_iter().collect();
    let goals = vec![Goal::new("goal-a2", "A2"), Goal::new("goal-a3", "A3")];
    let before = ActionGraphSnapshot::new(data, completed, goals);
    assert_eq!(before.ready_goals().len(), 2);

    let after = before.perform_action("AC").expect("AC has no preconditions blocking it yet");
    assert_eq!(after.unachievable_goals().len(), 1);
    assert_eq!(after.unachievable_goals()[0].id, "goal-a2");
    assert_eq!(after.ready_goals().len(), 1);
    assert_eq!(after.ready_goals()[0].id, "goal-a3");

    // The original snapshot is untouched: transformations never mutate in place.
    assert_eq!(before.ready_goals().len(), 2);
}

#[test]
fn s4_empty_catalogue_has_no_crashes_and_no_goals() {
    let data = Arc::new(GameData::new("empty", "Nothing Here", "0.1"));
    let snapshot = ActionGraphSnapshot::new(data, BTreeSet::new(), Vec::new());
    assert!(snapshot.current_actions().is_empty());
    assert!(snapshot.completed_actions().is_empty());
    assert!(snapshot.get_unified_path_to_goals().is_empty());
}

#[test]
fn s5_goal_on_a_nonexistent_action_is_unachievable_not_an_error() {
    let data = fixture();
    let snapshot = ActionGraphSnapshot::new(data, BTreeSet::new(), vec![Goal::new("goal-ghost", "does-not-exist")]);
    assert_eq!(snapshot.unachievable_goals().len(), 1);
    let info = snapshot.path_info("goal-ghost").unwrap();
    assert!(!info.is_achievable);
    assert_eq!(info.path_length, -1);
}

#[test]
fn s6_sat_undoability_matches_structural_can_undo_in_the_easy_case() {
    let data = fixture();
    let completed: BTreeSet<_> = ["A1".to_string(), "A2".to_string()].into_iter().collect();
    let snapshot = ActionGraphSnapshot::new(data.clone(), completed.clone(), Vec::new());

    assert!(!snapshot.can_undo("A1"));
    let report = sat::undoability(&data, &completed, "A1");
    assert_eq!(report.result, SatQueryResult::Unsatisfiable);
}

#[test]
fn performing_an_action_twice_is_rejected_not_a_silent_no_op() {
    let data = fixture();
    let snapshot = ActionGraphSnapshot::new(data, BTreeSet::new(), Vec::new());
    let after = snapshot.perform_action("A1").unwrap();
    let result = after.perform_action("A1");
    assert!(matches!(
        result,
        Err(KernelError::PreconditionViolation {
            predicate: ViolatedPredicate::AlreadyCompleted,
            ..
        })
    ));
}
