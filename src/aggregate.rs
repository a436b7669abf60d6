//! Aggregation engine: distinct counts, multi-use ratios and grouped
//! distinct-user summaries over a tall relation.
//!
//! Every operation here is a pure fold over the relation. Empty input is
//! never an error: counts are 0 and ratios are `None` (safe-divide).

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::core::GroupKey;
use crate::normalize::ValueRelation;

/// Per-group mapping from value to distinct-user count.
///
/// Records the first-seen order of values alongside the counts, which the
/// ranker's `FirstSeen` tie-break consumes. The count map is persistent
/// (`im`) so handing summaries to the presentation layer is a cheap clone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValueSummary {
    counts: im::HashMap<String, usize>,
    order: Vec<String>,
}

impl ValueSummary {
    /// Distinct-user count for a value, 0 when absent
    pub fn count(&self, value: &str) -> usize {
        self.counts.get(value).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &im::HashMap<String, usize> {
        &self.counts
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// (value, count) pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.order
            .iter()
            .map(move |v| (v.as_str(), self.count(v)))
    }
}

/// Count of distinct values in the relation; 0 on empty input
pub fn distinct_values(relation: &ValueRelation) -> usize {
    relation
        .iter()
        .map(|row| row.value.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Count of distinct users in the relation; 0 on empty input
pub fn distinct_users(relation: &ValueRelation) -> usize {
    relation
        .iter()
        .map(|row| row.user_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Share of users holding strictly more than `threshold` distinct values.
///
/// Users with zero rows never reach the relation, so they count toward
/// neither numerator nor denominator. `None` when the relation has no users.
pub fn multi_use_ratio(relation: &ValueRelation, threshold: usize) -> Option<f64> {
    let values_per_user = fold_values_per_user(relation);
    let total = values_per_user.len();
    if total == 0 {
        return None;
    }
    let multi = values_per_user
        .values()
        .filter(|values| values.len() > threshold)
        .count();
    Some(multi as f64 / total as f64)
}

fn fold_values_per_user<'a>(relation: &'a ValueRelation) -> HashMap<&'a str, HashSet<&'a str>> {
    relation.iter().fold(HashMap::new(), |mut acc, row| {
        acc.entry(row.user_id.as_str())
            .or_default()
            .insert(row.value.as_str());
        acc
    })
}

/// Summarize the relation as value → distinct-user count.
///
/// A user appearing several times for the same value is counted once.
pub fn summarize(relation: &ValueRelation) -> ValueSummary {
    let mut users_per_value: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for row in relation.iter() {
        let users = users_per_value.entry(row.value.as_str()).or_default();
        if users.is_empty() {
            order.push(row.value.clone());
        }
        users.insert(row.user_id.as_str());
    }
    let counts = order
        .iter()
        .map(|value| (value.clone(), users_per_value[value.as_str()].len()))
        .collect();
    ValueSummary { counts, order }
}

/// Summarize the relation per group, where `group_of` maps a UserID to its
/// group key (grouping dimensions are per-user attributes).
///
/// Within each group no user is double-counted for a value.
pub fn grouped_summarize<F>(relation: &ValueRelation, group_of: F) -> HashMap<GroupKey, ValueSummary>
where
    F: Fn(&str) -> GroupKey,
{
    // GroupKey → value → users, with first-seen value order kept per group
    let mut groups: HashMap<GroupKey, (HashMap<String, HashSet<String>>, Vec<String>)> =
        HashMap::new();
    for row in relation.iter() {
        let key = group_of(&row.user_id);
        let (users_per_value, order) = groups.entry(key).or_default();
        let users = users_per_value.entry(row.value.clone()).or_default();
        if users.is_empty() {
            order.push(row.value.clone());
        }
        users.insert(row.user_id.clone());
    }

    groups
        .into_iter()
        .map(|(key, (users_per_value, order))| {
            let counts = order
                .iter()
                .map(|value| (value.clone(), users_per_value[value].len()))
                .collect();
            (key, ValueSummary { counts, order })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::BaseRecord;
    use crate::normalize::USE_CASE_COLUMNS;
    use pretty_assertions::assert_eq;

    fn record(user_id: &str, uc1: Option<&str>, uc2: Option<&str>) -> BaseRecord {
        let mut r = BaseRecord::new(user_id);
        r.use_case_1 = uc1.map(String::from);
        r.use_case_2 = uc2.map(String::from);
        r
    }

    fn relation(records: &[BaseRecord]) -> ValueRelation {
        ValueRelation::unpivot(records, USE_CASE_COLUMNS, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn distinct_counts_are_zero_on_empty_relation() {
        let rel = ValueRelation::default();
        assert_eq!(distinct_values(&rel), 0);
        assert_eq!(distinct_users(&rel), 0);
    }

    #[test]
    fn distinct_values_deduplicates_across_users() {
        let rel = relation(&[
            record("U1", Some("Loans"), Some("Savings")),
            record("U2", Some("Loans"), None),
        ]);
        assert_eq!(distinct_values(&rel), 2);
        assert_eq!(distinct_users(&rel), 2);
    }

    #[test]
    fn multi_use_ratio_excludes_zero_row_users() {
        // U3 has no rows at all, so it is outside both numerator and
        // denominator.
        let rel = relation(&[
            record("U1", Some("Loans"), Some("Savings")),
            record("U2", Some("Loans"), None),
            record("U3", None, None),
        ]);
        assert_eq!(multi_use_ratio(&rel, 1), Some(0.5));
    }

    #[test]
    fn multi_use_ratio_is_none_without_users() {
        assert_eq!(multi_use_ratio(&ValueRelation::default(), 1), None);
    }

    #[test]
    fn multi_use_threshold_is_strictly_greater_than() {
        let rel = relation(&[record("U1", Some("Loans"), Some("Savings"))]);
        assert_eq!(multi_use_ratio(&rel, 1), Some(1.0));
        assert_eq!(multi_use_ratio(&rel, 2), Some(0.0));
    }

    #[test]
    fn duplicate_value_for_one_user_counts_once_for_multi_use() {
        let rel = relation(&[record("U1", Some("Loans"), Some("Loans"))]);
        assert_eq!(multi_use_ratio(&rel, 1), Some(0.0));
    }

    #[test]
    fn summarize_counts_distinct_users_per_value() {
        let rel = relation(&[
            record("U1", Some("Loans"), Some("Savings")),
            record("U2", Some("Loans"), Some("Loans")),
        ]);
        let summary = summarize(&rel);
        assert_eq!(summary.count("Loans"), 2);
        assert_eq!(summary.count("Savings"), 1);
        assert_eq!(summary.count("Insurance"), 0);
        assert_eq!(summary.len(), 2);
    }

    #[test]
    fn summarize_keeps_first_seen_order() {
        let rel = relation(&[
            record("U1", Some("Savings"), Some("Airtime")),
            record("U2", Some("Loans"), Some("Savings")),
        ]);
        let summary = summarize(&rel);
        let order: Vec<&str> = summary.iter().map(|(v, _)| v).collect();
        assert_eq!(order, vec!["Savings", "Airtime", "Loans"]);
    }

    #[test]
    fn summarize_empty_relation() {
        let summary = summarize(&ValueRelation::default());
        assert!(summary.is_empty());
        assert_eq!(summary.len(), 0);
    }

    #[test]
    fn grouped_summarize_partitions_by_key() {
        let rel = relation(&[
            record("U1", Some("Loans"), None),
            record("U2", Some("Loans"), Some("Savings")),
            record("U3", Some("Savings"), None),
        ]);
        // U1 and U2 share a group, U3 is alone.
        let summaries = grouped_summarize(&rel, |user| {
            let part = if user == "U3" { "B" } else { "A" };
            GroupKey::new(vec![part.to_string()])
        });
        assert_eq!(summaries.len(), 2);
        let a = &summaries[&GroupKey::new(vec!["A".to_string()])];
        assert_eq!(a.count("Loans"), 2);
        assert_eq!(a.count("Savings"), 1);
        let b = &summaries[&GroupKey::new(vec!["B".to_string()])];
        assert_eq!(b.count("Savings"), 1);
        assert_eq!(b.count("Loans"), 0);
    }

    #[test]
    fn grouped_summarize_does_not_double_count_a_user_in_a_group() {
        let rel = relation(&[record("U1", Some("Loans"), Some("Loans"))]);
        let summaries = grouped_summarize(&rel, |_| GroupKey::new(vec!["all".to_string()]));
        let all = &summaries[&GroupKey::new(vec!["all".to_string()])];
        assert_eq!(all.count("Loans"), 1);
    }
}
