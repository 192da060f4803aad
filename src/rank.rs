// Leaderboards and change-threshold alerting.
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ratios::finite_or_zero;
use crate::types::{EntityChange, RankedEntity, ScoredEntity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Stable sort by value. Equal values keep their input order so an
/// unchanged input always renders in the same order.
pub fn rank(entities: &[ScoredEntity], direction: SortDirection, limit: Option<usize>) -> Vec<RankedEntity> {
    let mut ordered: Vec<(&str, f64)> = entities
        .iter()
        .map(|e| (e.id.as_str(), finite_or_zero(e.value)))
        .collect();
    ordered.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    ordered
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(i, (id, value))| RankedEntity {
            rank: i + 1,
            id: id.to_string(),
            value,
        })
        .collect()
}

/// Ranks entities by their percent change. Entities without a comparable
/// baseline are left out.
pub fn rank_by_change(changes: &[EntityChange], direction: SortDirection, limit: Option<usize>) -> Vec<RankedEntity> {
    let scored: Vec<ScoredEntity> = changes
        .iter()
        .filter_map(|c| {
            c.change
                .percent_change
                .value()
                .map(|pct| ScoredEntity::new(c.id.clone(), pct))
        })
        .collect();
    rank(&scored, direction, limit)
}

/// Keeps entities whose absolute percent change is at least `threshold`,
/// largest movement first.
///
/// A threshold of `0` disables filtering: every entity is returned,
/// including those with no comparison, which sort last.
pub fn filter_by_change(changes: &[EntityChange], threshold: f64) -> Vec<EntityChange> {
    let threshold = finite_or_zero(threshold).abs();
    let mut kept: Vec<&EntityChange> = changes
        .iter()
        .filter(|c| {
            threshold == 0.0
                || c.change
                    .percent_change
                    .magnitude()
                    .is_some_and(|m| m >= threshold)
        })
        .collect();
    kept.sort_by(|a, b| {
        match (
            a.change.percent_change.magnitude(),
            b.change.percent_change.magnitude(),
        ) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    kept.into_iter().cloned().collect()
}
