// Roll-ups shared by every dashboard view: aggregate a selection, project
// its newest month, and compare it against last month and last year.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{aggregate, aggregate_by_entity, calendar_month};
use crate::compare::{compare_all, PeriodComparison};
use crate::metrics::MetricKey;
use crate::projection::project_latest;
use crate::types::{AggregatedPeriod, ChangeResult, EntityChange, EntityGroup, PerformanceRecord, Period, ProjectedPeriod};

/// Metrics shown on KPI cards and in alert tables.
pub const HEADLINE_METRICS: [MetricKey; 7] = [
    MetricKey::Revenue,
    MetricKey::Orders,
    MetricKey::Profit,
    MetricKey::AdSpend,
    MetricKey::Roas,
    MetricKey::Aov,
    MetricKey::ConvRate,
];

/// Latest (projected) state of one series plus its comparisons.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub name: String,
    pub latest: ProjectedPeriod,
    pub comparison: PeriodComparison,
}

impl Snapshot {
    pub fn period(&self) -> Period {
        self.latest.period()
    }

    pub fn mom(&self, metric: MetricKey) -> Option<&ChangeResult> {
        self.comparison.mom(metric)
    }

    pub fn yoy(&self, metric: MetricKey) -> Option<&ChangeResult> {
        self.comparison.yoy(metric)
    }
}

/// Snapshot of a chronological series, or `None` when it is empty.
pub fn snapshot(series: &[AggregatedPeriod], metrics: &[MetricKey], reference_date: NaiveDate) -> Option<Snapshot> {
    let latest = project_latest(series, reference_date)?;
    let comparison = compare_all(&latest, series, metrics);
    Some(Snapshot {
        name: latest.group().to_string(),
        latest,
        comparison,
    })
}

/// Aggregated series plus snapshot for a group, by calendar month.
pub fn group_snapshot(
    records: &[PerformanceRecord],
    group: &EntityGroup,
    metrics: &[MetricKey],
    reference_date: NaiveDate,
) -> Option<Snapshot> {
    let series = aggregate(records, group, calendar_month);
    snapshot(&series, metrics, reference_date)
}

/// One snapshot per client, ordered by client id.
pub fn entity_snapshots(
    records: &[PerformanceRecord],
    metrics: &[MetricKey],
    reference_date: NaiveDate,
) -> Vec<Snapshot> {
    entity_series(records)
        .values()
        .filter_map(|series| snapshot(series, metrics, reference_date))
        .collect()
}

pub fn entity_series(records: &[PerformanceRecord]) -> BTreeMap<String, Vec<AggregatedPeriod>> {
    aggregate_by_entity(records, calendar_month)
}

/// MoM change of `metric` for every snapshot whose latest month is `period`.
///
/// Clients that stopped reporting before `period` are not current and are
/// skipped rather than compared on stale data.
pub fn changes_for_period(snapshots: &[Snapshot], period: Period, metric: MetricKey) -> Vec<EntityChange> {
    snapshots
        .iter()
        .filter(|s| s.period() == period)
        .filter_map(|s| {
            s.mom(metric).map(|change| EntityChange {
                id: s.name.clone(),
                change: change.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PercentChange;
    use approx::assert_relative_eq;

    fn record(id: &str, year: i32, month: u32, revenue: f64, days: Option<u32>) -> PerformanceRecord {
        PerformanceRecord {
            revenue,
            orders: revenue / 100.0,
            days_of_data: days,
            ..PerformanceRecord::new(id, year, month)
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
    }

    #[test]
    fn projected_latest_is_compared_to_closed_months() {
        let records = vec![
            record("a", 2023, 6, 800.0, None),
            record("a", 2024, 5, 1_000.0, None),
            record("a", 2024, 6, 500.0, Some(15)),
        ];
        let group = EntityGroup::with_members("brand", ["a"]);
        let snap = group_snapshot(&records, &group, &HEADLINE_METRICS, as_of()).unwrap();
        assert!(snap.latest.is_projected);
        assert_eq!(snap.latest.totals.revenue, 1_000.0);
        assert_eq!(snap.mom(MetricKey::Revenue).unwrap().percent_change, PercentChange::Percent(0.0));
        assert_relative_eq!(
            snap.yoy(MetricKey::Revenue).unwrap().percent_change.value().unwrap(),
            25.0
        );
    }

    #[test]
    fn empty_selection_has_no_snapshot() {
        let records = vec![record("a", 2024, 6, 1.0, None)];
        assert!(group_snapshot(&records, &EntityGroup::new("none"), &HEADLINE_METRICS, as_of()).is_none());
    }

    #[test]
    fn stale_clients_are_left_out_of_period_changes() {
        let records = vec![
            record("current", 2024, 5, 100.0, None),
            record("current", 2024, 6, 150.0, None),
            record("stale", 2024, 4, 100.0, None),
            record("stale", 2024, 5, 10.0, None),
        ];
        let snaps = entity_snapshots(&records, &[MetricKey::Revenue], as_of());
        assert_eq!(snaps.len(), 2);
        let june = Period { year: 2024, month: 6 };
        let changes = changes_for_period(&snaps, june, MetricKey::Revenue);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, "current");
    }

    #[test]
    fn churned_client_keeps_its_last_reported_month() {
        let records = vec![record("old", 2024, 3, 1_000.0, Some(10))];
        let snaps = entity_snapshots(&records, &[MetricKey::Revenue], as_of());
        assert_eq!(snaps.len(), 1);
        assert!(!snaps[0].latest.is_projected);
        assert_eq!(snaps[0].latest.totals.revenue, 1_000.0);
    }
}
