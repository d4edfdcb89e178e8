//! Read-only projections over a collection. Recomputed on every call.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::TimeZone;
use serde::Serialize;

use crate::models::{Card, Rarity};
use crate::quota::local_date_key;

/// Cards per local date key, ascending by date. Within a date the collection
/// order (newest first) is kept.
pub fn group_by_local_date<Tz: TimeZone>(cards: &[Card], tz: &Tz) -> BTreeMap<String, Vec<Card>> {
    let mut by_date: BTreeMap<String, Vec<Card>> = BTreeMap::new();
    for card in cards {
        by_date
            .entry(local_date_key(&card.created_at, tz))
            .or_default()
            .push(card.clone());
    }
    by_date
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptSummary {
    pub concept: String,
    pub count: usize,
    pub first_date: String,
    pub last_date: String,
    pub concept_description: String,
    pub base_project: String,
    pub base_url: String,
}

/// One summary per distinct concept, sorted by concept name. The
/// representative description/project/url come from the newest card of that
/// concept.
pub fn summarize_by_concept<Tz: TimeZone>(cards: &[Card], tz: &Tz) -> Vec<ConceptSummary> {
    let mut by_concept: HashMap<&str, ConceptSummary> = HashMap::new();

    for card in cards {
        let date = local_date_key(&card.created_at, tz);
        let insight = &card.insight;
        by_concept
            .entry(insight.concept.as_str())
            .and_modify(|s| {
                s.count += 1;
                if date < s.first_date {
                    s.first_date = date.clone();
                }
                if date > s.last_date {
                    s.last_date = date.clone();
                }
            })
            .or_insert_with(|| ConceptSummary {
                concept: insight.concept.clone(),
                count: 1,
                first_date: date.clone(),
                last_date: date.clone(),
                concept_description: insight.concept_description.clone(),
                base_project: insight.base_project.clone(),
                base_url: insight.base_url.clone(),
            });
    }

    let mut summaries: Vec<ConceptSummary> = by_concept.into_values().collect();
    summaries.sort_by(|a, b| compare_concepts(&a.concept, &b.concept));
    summaries
}

/// Case-insensitive ordering with an exact tiebreak, so "amm" and "AMM" sort
/// together and the result is total.
///
/// This is not locale collation: after lowercasing, strings compare by code
/// point. Accented Latin letters sort after `z` ("Éther" after "Zk"), and
/// all Latin names sort before Hangul ones.
pub fn compare_concepts(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Cards per rarity tier, in tier order; tiers with no cards are included.
pub fn rarity_counts(cards: &[Card]) -> Vec<(Rarity, usize)> {
    Rarity::ALL
        .iter()
        .map(|r| (*r, cards.iter().filter(|c| c.insight.rarity == *r).count()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::card::fixtures::card;
    use chrono::{FixedOffset, Utc};

    fn seoul() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_group_by_date_keeps_collection_order() {
        let cards = vec![
            card("c", "AMM", 2026, 10, 17, 9, 0),
            card("b", "MEV", 2026, 10, 17, 8, 0),
            card("a", "AMM", 2026, 10, 16, 8, 0),
        ];
        let groups = group_by_local_date(&cards, &Utc);
        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, vec!["2026-10-16", "2026-10-17"]);
        let day: Vec<&str> = groups["2026-10-17"].iter().map(|c| c.id.as_str()).collect();
        assert_eq!(day, vec!["c", "b"]);
    }

    #[test]
    fn test_group_by_date_uses_local_timezone() {
        // 15:30 UTC on the 17th is 00:30 on the 18th in Seoul
        let cards = vec![card("a", "AMM", 2026, 10, 17, 15, 30)];
        assert!(group_by_local_date(&cards, &seoul()).contains_key("2026-10-18"));
        assert!(group_by_local_date(&cards, &Utc).contains_key("2026-10-17"));
    }

    #[test]
    fn test_group_then_flatten_recovers_every_card() {
        let cards = vec![
            card("e", "ZK", 2026, 10, 18, 2, 0),
            card("d", "AMM", 2026, 10, 17, 20, 0),
            card("c", "AMM", 2026, 10, 17, 9, 0),
            card("b", "MEV", 2026, 10, 15, 8, 0),
            card("a", "AMM", 2026, 10, 15, 7, 0),
        ];
        let groups = group_by_local_date(&cards, &seoul());
        let mut flattened: Vec<String> = groups.into_values().flatten().map(|c| c.id).collect();
        flattened.sort();
        let mut expected: Vec<String> = cards.iter().map(|c| c.id.clone()).collect();
        expected.sort();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn test_group_empty_collection() {
        assert!(group_by_local_date(&[], &Utc).is_empty());
    }

    #[test]
    fn test_same_concept_on_two_dates_is_one_summary() {
        let cards = vec![
            card("2", "AMM", 2026, 10, 17, 9, 0),
            card("1", "AMM", 2026, 10, 12, 9, 0),
        ];
        let summaries = summarize_by_concept(&cards, &Utc);
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.count, 2);
        assert_eq!(s.first_date, "2026-10-12");
        assert_eq!(s.last_date, "2026-10-17");
        assert_eq!(s.base_project, "Uniswap");
    }

    #[test]
    fn test_summaries_sorted_by_concept() {
        let cards = vec![
            card("1", "zk-SNARK", 2026, 10, 17, 9, 0),
            card("2", "AMM", 2026, 10, 17, 8, 0),
            card("3", "MEV", 2026, 10, 17, 7, 0),
            card("4", "account abstraction", 2026, 10, 17, 6, 0),
        ];
        let names: Vec<String> = summarize_by_concept(&cards, &Utc)
            .into_iter()
            .map(|s| s.concept)
            .collect();
        assert_eq!(names, vec!["account abstraction", "AMM", "MEV", "zk-SNARK"]);
    }

    #[test]
    fn test_compare_concepts_is_total() {
        assert_eq!(compare_concepts("AMM", "amm"), Ordering::Less);
        assert_eq!(compare_concepts("amm", "AMM"), Ordering::Greater);
        assert_eq!(compare_concepts("MEV", "MEV"), Ordering::Equal);
    }

    #[test]
    fn test_rarity_counts_cover_all_tiers() {
        let mut epic = card("2", "ZK", 2026, 10, 17, 8, 0);
        epic.insight.rarity = Rarity::Epic;
        let cards = vec![card("1", "AMM", 2026, 10, 17, 9, 0), epic];
        assert_eq!(
            rarity_counts(&cards),
            vec![
                (Rarity::Common, 0),
                (Rarity::Rare, 1),
                (Rarity::Epic, 1),
                (Rarity::Mythic, 0),
            ]
        );
    }

    #[test]
    fn test_compare_concepts_is_code_point_order_after_lowercasing() {
        let mut names = vec!["합의", "Éther", "zk", "AMM", "amm", "Bridge"];
        names.sort_by(|a, b| compare_concepts(a, b));
        assert_eq!(names, vec!["AMM", "amm", "Bridge", "zk", "Éther", "합의"]);
    }
}
