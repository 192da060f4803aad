// Full-month estimates for the in-progress month.
use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::ratios::derive_ratios;
use crate::types::{AggregatedPeriod, Period, ProjectedPeriod};

/// Number of days in the given calendar month, or 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(start), Some(end)) => (end - start).num_days() as u32,
        _ => 0,
    }
}

/// Scales the latest period of a series to a full-month estimate.
///
/// Projection happens only when the period is flagged `is_latest`, falls in
/// the reference date's own month, and `0 < days_of_data < days_in_month`
/// once `days_of_data` is capped at the reference day. Months before the
/// reference month are closed and months after it have not started, so both
/// come back unchanged with `is_projected = false`.
pub fn project(period: &AggregatedPeriod, reference_date: NaiveDate) -> ProjectedPeriod {
    if !period.is_latest {
        return ProjectedPeriod::unprojected(period.clone());
    }
    if period.period != Period::from_date(reference_date) {
        debug!(period = %period.period, as_of = %reference_date, "not the reference month, not projected");
        return ProjectedPeriod::unprojected(period.clone());
    }
    let Some(days) = period.days_of_data.map(|d| d.min(reference_date.day())) else {
        return ProjectedPeriod::unprojected(period.clone());
    };
    let month_days = days_in_month(period.period.year, period.period.month);
    if days == 0 || days >= month_days {
        return ProjectedPeriod::unprojected(period.clone());
    }

    let factor = month_days as f64 / days as f64;
    let totals = period.totals.scaled(factor);
    debug!(
        group = %period.group,
        period = %period.period,
        days,
        month_days,
        factor,
        "projected partial month"
    );
    ProjectedPeriod {
        base: period.clone(),
        projection_factor: Some(factor),
        is_projected: true,
        ratios: derive_ratios(&totals),
        totals,
    }
}

/// Runs `project` over a whole series. Only the entry flagged `is_latest`
/// can change; history passes through as-is.
pub fn project_series(series: &[AggregatedPeriod], reference_date: NaiveDate) -> Vec<ProjectedPeriod> {
    series.iter().map(|p| project(p, reference_date)).collect()
}

/// Projection of the newest period, or `None` for an empty series.
pub fn project_latest(series: &[AggregatedPeriod], reference_date: NaiveDate) -> Option<ProjectedPeriod> {
    series.last().map(|p| project(p, reference_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Absolutes;
    use approx::assert_relative_eq;

    fn period(year: i32, month: u32, days_of_data: Option<u32>, is_latest: bool) -> AggregatedPeriod {
        let totals = Absolutes {
            revenue: 1_000.0,
            orders: 10.0,
            ad_spend: 250.0,
            sessions: 400.0,
            ..Absolutes::default()
        };
        AggregatedPeriod {
            group: "g".into(),
            period: Period { year, month },
            ratios: derive_ratios(&totals),
            totals,
            days_of_data,
            member_count: 1,
            is_latest,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 6), 30);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 13), 0);
    }

    #[test]
    fn half_month_doubles_absolutes() {
        let p = project(&period(2024, 6, Some(15), true), date(2024, 6, 30));
        assert!(p.is_projected);
        assert_eq!(p.projection_factor, Some(2.0));
        assert_eq!(p.totals.revenue, 2_000.0);
        assert_eq!(p.totals.orders, 20.0);
        // ratios are rederived and therefore unchanged by uniform scaling
        assert_relative_eq!(p.ratios.aov, 100.0);
        assert_relative_eq!(p.ratios.roas, 4.0);
    }

    #[test]
    fn complete_or_unknown_months_pass_through() {
        for days in [None, Some(0), Some(30), Some(31)] {
            let input = period(2024, 6, days, true);
            let p = project(&input, date(2024, 6, 30));
            assert!(!p.is_projected);
            assert_eq!(p.projection_factor, None);
            assert_eq!(p.totals, input.totals);
            assert_eq!(p.ratios, input.ratios);
        }
    }

    #[test]
    fn history_is_never_projected() {
        let p = project(&period(2024, 5, Some(10), false), date(2024, 6, 10));
        assert!(!p.is_projected);
        assert_eq!(p.totals.revenue, 1_000.0);
    }

    #[test]
    fn days_capped_at_reference_day() {
        // 20 days claimed but only 10 have elapsed as of the reference date
        let p = project(&period(2024, 6, Some(20), true), date(2024, 6, 10));
        assert_eq!(p.projection_factor, Some(3.0));
        assert_eq!(p.totals.revenue, 3_000.0);
    }

    #[test]
    fn future_periods_are_not_projected() {
        let p = project(&period(2024, 9, Some(5), true), date(2024, 6, 10));
        assert!(!p.is_projected);
    }

    #[test]
    fn closed_months_are_not_projected() {
        // a client that stopped reporting in March, viewed in June
        let input = period(2024, 3, Some(10), true);
        let p = project(&input, date(2024, 6, 20));
        assert!(!p.is_projected);
        assert_eq!(p.projection_factor, None);
        assert_eq!(p.totals.revenue, 1_000.0);
        assert_eq!(p.base, input);

        // the day after June closes, June is history
        assert!(!project(&period(2024, 6, Some(15), true), date(2024, 7, 1)).is_projected);
    }

    #[test]
    fn series_projection_touches_only_latest() {
        let series = vec![period(2024, 5, Some(10), false), period(2024, 6, Some(10), true)];
        let out = project_series(&series, date(2024, 6, 30));
        assert!(!out[0].is_projected);
        assert!(out[1].is_projected);
        assert_eq!(project_latest(&series, date(2024, 6, 30)), Some(out[1].clone()));
        assert_eq!(project_latest(&[], date(2024, 6, 30)), None);
    }
}
