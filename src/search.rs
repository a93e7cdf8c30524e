//! The goal search adapter (C7): bag-of-terms ranking over goal metadata.
//! Colocated with the kernel but not part of the core reasoning surface.
//! Loaders are free to implement their own search instead.

use crate::model::{ActionCategory, GameData, Goal};

/// A goal plus the display text a caller wants searchable, since `Goal`
/// itself carries only an id, a target, and a priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchableGoal<'a> {
    pub goal: &'a Goal,
    pub name: &'a str,
    pub description: &'a str,
    pub keywords: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit<'a> {
    pub goal: &'a Goal,
    pub score: u32,
}

const NAME_WEIGHT: u32 = 10;
const DESCRIPTION_WEIGHT: u32 = 5;
const CATEGORY_WEIGHT: u32 = 3;
const KEYWORD_WEIGHT: u32 = 1;

/// Rank `goals` against a whitespace-tokenized `query`, scoring each
/// searchable field independently and summing matches. Ties keep the
/// input order (a stable sort).
pub fn search<'a>(game_data: &GameData, goals: &[SearchableGoal<'a>], query: &str) -> Vec<SearchHit<'a>> {
    let terms: Vec<String> = query.split_whitespace().map(|t| t.to_lowercase()).collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit<'a>> = goals
        .iter()
        .filter_map(|entry| {
            let score = score_entry(game_data, entry, &terms);
            if score > 0 {
                Some(SearchHit { goal: entry.goal, score })
            } else {
                None
            }
        })
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits
}

fn score_entry(game_data: &GameData, entry: &SearchableGoal<'_>, terms: &[String]) -> u32 {
    let name = entry.name.to_lowercase();
    let description = entry.description.to_lowercase();
    let category = game_data
        .action(&entry.goal.target_id)
        .map(category_text)
        .unwrap_or_default();
    let keywords: Vec<String> = entry.keywords.iter().map(|k| k.to_lowercase()).collect();

    terms
        .iter()
        .map(|term| {
            let mut score = 0;
            if name.contains(term.as_str()) {
                score += NAME_WEIGHT;
            }
            if description.contains(term.as_str()) {
                score += DESCRIPTION_WEIGHT;
            }
            if category.contains(term.as_str()) {
                score += CATEGORY_WEIGHT;
            }
            if keywords.iter().any(|k| k.contains(term.as_str())) {
                score += KEYWORD_WEIGHT;
            }
            score
        })
        .sum()
}

fn category_text(action: &crate::model::GameAction) -> String {
    match &action.category {
        ActionCategory::Exploration => "exploration".to_string(),
        ActionCategory::Quest => "quest".to_string(),
        ActionCategory::ItemPickup => "item pickup".to_string(),
        ActionCategory::Boss => "boss".to_string(),
        ActionCategory::Other(label) => label.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GameAction;

    fn fixture() -> GameData {
        GameData::new("g", "Game", "1.0")
            .with_action(GameAction::new("boss1", "Defeat the Dragon").with_category(ActionCategory::Boss))
            .with_action(GameAction::new("quest1", "Find the Key").with_category(ActionCategory::Quest))
    }

    #[test]
    fn name_match_outranks_description_only_match() {
        let data = fixture();
        let g1 = Goal::new("g1", "boss1");
        let g2 = Goal::new("g2", "quest1");
        let goals = vec![
            SearchableGoal {
                goal: &g1,
                name: "Slay the dragon",
                description: "",
                keywords: &[],
            },
            SearchableGoal {
                goal: &g2,
                name: "Side quest",
                description: "involves a dragon somehow",
                keywords: &[],
            },
        ];
        let hits = search(&data, &goals, "dragon");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].goal.id, "g1");
    }

    #[test]
    fn category_contributes_to_score() {
        let data = fixture();
        let g1 = Goal::new("g1", "boss1");
        let goals = vec![SearchableGoal {
            goal: &g1,
            name: "Defeat it",
            description: "",
            keywords: &[],
        }];
        let hits = search(&data, &goals, "boss");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, CATEGORY_WEIGHT);
    }

    #[test]
    fn empty_query_returns_no_hits() {
        let data = fixture();
        let g1 = Goal::new("g1", "boss1");
        let goals = vec![SearchableGoal {
            goal: &g1,
            name: "Defeat it",
            description: "",
            keywords: &[],
        }];
        assert!(search(&data, &goals, "").is_empty());
    }

    #[test]
    fn no_match_is_excluded_not_zero_scored() {
        let data = fixture();
        let g1 = Goal::new("g1", "boss1");
        let goals = vec![SearchableGoal {
            goal: &g1,
            name: "Defeat it",
            description: "",
            keywords: &[],
        }];
        assert!(search(&data, &goals, "unrelated").is_empty());
    }
}
