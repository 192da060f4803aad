use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use crate::projection::days_in_month;
use crate::ratios::derive_ratios;
use crate::types::{Absolutes, AggregatedPeriod, EntityGroup, PerformanceRecord, Period};

/// Default period key: the record's own calendar month.
pub fn calendar_month(record: &PerformanceRecord) -> Period {
    record.period()
}

/// Sums the records of every included group member into one entry per
/// period, oldest first.
///
/// Periods without contributing records are absent rather than zero-filled.
/// An empty result means there was nothing to aggregate.
///
/// A member that reports no `days_of_data` counts as a complete month, so a
/// period is only partial when every contributing member is partial.
pub fn aggregate<F>(
    records: &[PerformanceRecord],
    group: &EntityGroup,
    period_key: F,
) -> Vec<AggregatedPeriod>
where
    F: Fn(&PerformanceRecord) -> Period,
{
    let included: HashSet<&str> = group.included_ids().collect();
    let periods = sum_by_period(
        &group.name,
        records
            .iter()
            .filter(|r| included.contains(r.entity_id.as_str())),
        &period_key,
    );
    debug!(
        group = %group.name,
        members = included.len(),
        periods = periods.len(),
        "aggregated group"
    );
    periods
}

/// One series per entity, keyed and ordered by entity id.
pub fn aggregate_by_entity<F>(
    records: &[PerformanceRecord],
    period_key: F,
) -> BTreeMap<String, Vec<AggregatedPeriod>>
where
    F: Fn(&PerformanceRecord) -> Period,
{
    let mut by_entity: BTreeMap<&str, Vec<&PerformanceRecord>> = BTreeMap::new();
    for r in records {
        by_entity.entry(r.entity_id.as_str()).or_default().push(r);
    }
    by_entity
        .into_iter()
        .map(|(id, rows)| {
            let series = sum_by_period(id, rows.into_iter(), &period_key);
            (id.to_string(), series)
        })
        .collect()
}

/// Sorted, de-duplicated entity ids present in `records`.
pub fn distinct_entities(records: &[PerformanceRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.entity_id.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn sum_by_period<'a, I, F>(name: &str, records: I, period_key: &F) -> Vec<AggregatedPeriod>
where
    I: Iterator<Item = &'a PerformanceRecord>,
    F: Fn(&PerformanceRecord) -> Period,
{
    #[derive(Default)]
    struct Acc<'a> {
        totals: Absolutes,
        partial_days: Option<u32>,
        complete_days: Option<u32>,
        members: HashSet<&'a str>,
    }

    let mut map: BTreeMap<Period, Acc<'a>> = BTreeMap::new();
    for r in records {
        let e = map.entry(period_key(r)).or_default();
        e.totals += r.absolutes();
        match r.days_of_data {
            Some(days) => e.partial_days = e.partial_days.max(Some(days)),
            None => e.complete_days = e.complete_days.max(Some(days_in_month(r.year, r.month))),
        }
        e.members.insert(r.entity_id.as_str());
    }

    let latest = map.keys().next_back().copied();
    map.into_iter()
        .map(|(period, acc)| AggregatedPeriod {
            group: name.to_string(),
            period,
            ratios: derive_ratios(&acc.totals),
            totals: acc.totals,
            days_of_data: acc
                .partial_days
                .map(|days| acc.complete_days.map_or(days, |full| days.max(full))),
            member_count: acc.members.len(),
            is_latest: Some(period) == latest,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(id: &str, year: i32, month: u32, revenue: f64, orders: f64) -> PerformanceRecord {
        PerformanceRecord {
            revenue,
            orders,
            ..PerformanceRecord::new(id, year, month)
        }
    }

    #[test]
    fn sums_then_derives_ratios() {
        // Averaging per-client AOVs would give (10 + 100) / 2 = 55.
        let records = vec![
            record("a", 2024, 5, 100.0, 10.0),
            record("b", 2024, 5, 1_000.0, 10.0),
        ];
        let group = EntityGroup::with_members("both", ["a", "b"]);
        let out = aggregate(&records, &group, calendar_month);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].totals.orders, 20.0);
        assert_relative_eq!(out[0].ratios.aov, 55.0);
        assert_eq!(out[0].member_count, 2);
    }

    #[test]
    fn excluded_members_are_not_summed() {
        let records = vec![
            record("a", 2024, 5, 100.0, 1.0),
            record("b", 2024, 5, 900.0, 9.0),
        ];
        let mut group = EntityGroup::with_members("brand", ["a", "b"]);
        group.set_included("b", false);
        let out = aggregate(&records, &group, calendar_month);
        assert_eq!(out[0].totals.revenue, 100.0);
        assert_eq!(records[1].revenue, 900.0);
    }

    #[test]
    fn output_is_chronological_and_marks_latest() {
        let records = vec![
            record("a", 2024, 2, 1.0, 1.0),
            record("a", 2023, 12, 1.0, 1.0),
            record("a", 2024, 1, 1.0, 1.0),
        ];
        let group = EntityGroup::with_members("g", ["a"]);
        let out = aggregate(&records, &group, calendar_month);
        let periods: Vec<String> = out.iter().map(|p| p.period.to_string()).collect();
        assert_eq!(periods, vec!["2023-12", "2024-01", "2024-02"]);
        assert_eq!(
            out.iter().map(|p| p.is_latest).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    #[test]
    fn missing_months_are_not_gap_filled() {
        let records = vec![record("a", 2024, 1, 1.0, 1.0), record("a", 2024, 4, 1.0, 1.0)];
        let group = EntityGroup::with_members("g", ["a"]);
        assert_eq!(aggregate(&records, &group, calendar_month).len(), 2);
    }

    #[test]
    fn empty_group_yields_empty_series() {
        let records = vec![record("a", 2024, 1, 1.0, 1.0)];
        assert!(aggregate(&records, &EntityGroup::new("nobody"), calendar_month).is_empty());
        let strangers = EntityGroup::with_members("strangers", ["zzz"]);
        assert!(aggregate(&records, &strangers, calendar_month).is_empty());
    }

    #[test]
    fn group_days_of_data_is_the_largest_reported() {
        let mut a = record("a", 2024, 6, 1.0, 1.0);
        a.days_of_data = Some(12);
        let mut b = record("b", 2024, 6, 1.0, 1.0);
        b.days_of_data = Some(14);
        let group = EntityGroup::with_members("g", ["a", "b"]);
        let out = aggregate(&[a, b], &group, calendar_month);
        assert_eq!(out[0].days_of_data, Some(14));
    }

    #[test]
    fn member_without_days_counts_as_complete_month() {
        let a = record("a", 2024, 6, 3_000.0, 30.0);
        let mut b = record("b", 2024, 6, 500.0, 5.0);
        b.days_of_data = Some(15);
        let group = EntityGroup::with_members("g", ["a", "b"]);
        let out = aggregate(&[a.clone(), b], &group, calendar_month);
        assert_eq!(out[0].days_of_data, Some(30));

        let as_of = chrono::NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let projected = crate::projection::project(&out[0], as_of);
        assert!(!projected.is_projected);
        assert_eq!(projected.totals.revenue, 3_500.0);

        // nobody reported days: nothing to go on
        let only_a = aggregate(&[a], &group, calendar_month);
        assert_eq!(only_a[0].days_of_data, None);
    }

    #[test]
    fn fulfillment_days_are_order_weighted() {
        let mut a = record("a", 2024, 6, 0.0, 30.0);
        a.avg_fulfillment_days = 2.0;
        let mut b = record("b", 2024, 6, 0.0, 10.0);
        b.avg_fulfillment_days = 6.0;
        let group = EntityGroup::with_members("g", ["a", "b"]);
        let out = aggregate(&[a, b], &group, calendar_month);
        assert_relative_eq!(out[0].ratios.avg_fulfillment_days, 3.0);
    }

    #[test]
    fn custom_period_key_buckets_records() {
        let records = vec![record("a", 2024, 1, 10.0, 1.0), record("a", 2024, 2, 20.0, 1.0)];
        let group = EntityGroup::with_members("g", ["a"]);
        let quarter_start = |r: &PerformanceRecord| Period {
            year: r.year,
            month: (r.month - 1) / 3 * 3 + 1,
        };
        let out = aggregate(&records, &group, quarter_start);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].totals.revenue, 30.0);
    }

    #[test]
    fn per_entity_series_are_independent() {
        let records = vec![
            record("b", 2024, 1, 5.0, 1.0),
            record("a", 2024, 1, 1.0, 1.0),
            record("a", 2024, 2, 2.0, 1.0),
        ];
        let series = aggregate_by_entity(&records, calendar_month);
        assert_eq!(series.keys().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(series["a"].len(), 2);
        assert!(series["b"][0].is_latest);
        assert_eq!(distinct_entities(&records), vec!["a", "b"]);
    }
}
