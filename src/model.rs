//! Static and dynamic data model: catalogues, actions, items, goals, runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::precondition::PreconditionExpression;

pub type ActionId = String;
pub type ItemId = String;
pub type GoalId = String;

/// An item a player may hold. Immutable, identified by `id` within a `GameData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
}

/// A reward asserts: completing the owning action grants this item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub item_id: ItemId,
    pub description: String,
}

/// Display/search metadata only; opaque to the reasoning kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCategory {
    Exploration,
    Quest,
    ItemPickup,
    Boss,
    Other(String),
}

/// An atomic, at-most-once event a player may perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAction {
    pub id: ActionId,
    pub name: String,
    pub description: String,
    pub preconditions: PreconditionExpression,
    pub rewards: Vec<Reward>,
    pub category: ActionCategory,
}

impl GameAction {
    pub fn new(id: impl Into<ActionId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            preconditions: PreconditionExpression::Always,
            rewards: Vec::new(),
            category: ActionCategory::Other("unspecified".to_string()),
        }
    }

    pub fn with_preconditions(mut self, expr: PreconditionExpression) -> Self {
        self.preconditions = expr;
        self
    }

    pub fn with_reward(mut self, item_id: impl Into<ItemId>) -> Self {
        self.rewards.push(Reward {
            item_id: item_id.into(),
            description: String::new(),
        });
        self
    }

    pub fn with_category(mut self, category: ActionCategory) -> Self {
        self.category = category;
        self
    }
}

/// A static game catalogue: every action and item a run can reference.
///
/// Insertion order is preserved (a `Vec`-backed, insertion-ordered map rather
/// than a hash map) because the BFS path search and the unified-plan
/// topological sort both break ties by catalogue iteration order; semantic
/// results never depend on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameData {
    pub game_id: String,
    pub name: String,
    pub version: String,
    actions: Vec<GameAction>,
    items: Vec<Item>,
}

impl GameData {
    pub fn new(game_id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            name: name.into(),
            version: version.into(),
            actions: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: GameAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn action(&self, id: &str) -> Option<&GameAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Actions in catalogue (insertion) order.
    pub fn actions(&self) -> &[GameAction] {
        &self.actions
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Actions whose rewards contain the given item, in catalogue order.
    pub fn providers_of<'a>(&'a self, item_id: &'a str) -> impl Iterator<Item = &'a GameAction> + 'a {
        self.actions
            .iter()
            .filter(move |a| a.rewards.iter().any(|r| r.item_id == item_id))
    }
}

/// A declared intention to complete a specific target action.
///
/// Two goals are equal iff all four fields match structurally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub target_id: ActionId,
    pub description: String,
    pub priority: i32,
}

impl Goal {
    pub fn new(id: impl Into<GoalId>, target_id: impl Into<ActionId>) -> Self {
        Self {
            id: id.into(),
            target_id: target_id.into(),
            description: String::new(),
            priority: 0,
        }
    }
}

/// The dynamic state of a single playthrough against a `GameData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRun {
    pub game_id: String,
    pub game_version: String,
    pub run_name: String,
    pub completed_actions: BTreeMap<ActionId, ()>,
    pub goals: Vec<Goal>,
    pub created_at: String,
    pub updated_at: String,
}

impl GameRun {
    pub fn new(game_id: impl Into<String>, game_version: impl Into<String>, run_name: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            game_version: game_version.into(),
            run_name: run_name.into(),
            completed_actions: BTreeMap::new(),
            goals: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    pub fn is_completed(&self, action_id: &str) -> bool {
        self.completed_actions.contains_key(action_id)
    }
}
