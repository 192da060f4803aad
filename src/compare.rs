// Period-over-period change with metric polarity.
use serde::Serialize;

use crate::metrics::{MetricKey, PeriodMetrics};
use crate::ratios::finite_or_zero;
use crate::types::{ChangeResult, PercentChange, Period};

/// Signed percent change from `reference` to `current`.
///
/// A missing, zero, or non-finite baseline gives `NotAvailable`; relative
/// change against nothing is undefined, not zero.
pub fn percent_change(current: f64, reference: Option<f64>) -> PercentChange {
    match reference {
        Some(r) if r.is_finite() && r != 0.0 => {
            let pct = (finite_or_zero(current) - r) / r * 100.0;
            if pct.is_finite() {
                PercentChange::Percent(pct)
            } else {
                PercentChange::NotAvailable
            }
        }
        _ => PercentChange::NotAvailable,
    }
}

pub fn compare(current: f64, reference: Option<f64>, metric: MetricKey) -> ChangeResult {
    let percent_change = percent_change(current, reference);
    let is_favorable = match percent_change {
        PercentChange::Percent(p) if metric.higher_is_better() => p > 0.0,
        PercentChange::Percent(p) => p < 0.0,
        PercentChange::NotAvailable => false,
    };
    ChangeResult {
        metric_key: metric,
        current_value: finite_or_zero(current),
        reference_value: reference.filter(|r| r.is_finite()),
        percent_change,
        is_favorable,
    }
}

/// Exact-period lookup. No fallback to a neighbouring month.
pub fn find_period<T: PeriodMetrics>(history: &[T], period: Period) -> Option<&T> {
    history.iter().find(|p| p.period() == period)
}

/// Change against the calendar month immediately before `current`.
pub fn month_over_month<C, H>(current: &C, history: &[H], metric: MetricKey) -> ChangeResult
where
    C: PeriodMetrics,
    H: PeriodMetrics,
{
    compare_with(current, history, current.period().prev(), metric)
}

/// Change against the same calendar month one year earlier.
pub fn year_over_year<C, H>(current: &C, history: &[H], metric: MetricKey) -> ChangeResult
where
    C: PeriodMetrics,
    H: PeriodMetrics,
{
    compare_with(current, history, current.period().year_ago(), metric)
}

fn compare_with<C, H>(current: &C, history: &[H], target: Period, metric: MetricKey) -> ChangeResult
where
    C: PeriodMetrics,
    H: PeriodMetrics,
{
    let reference = find_period(history, target).map(|p| p.metric(metric));
    compare(current.metric(metric), reference, metric)
}

/// MoM and YoY results for a list of metrics, in the order requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub month_over_month: Vec<ChangeResult>,
    pub year_over_year: Vec<ChangeResult>,
}

impl PeriodComparison {
    pub fn mom(&self, metric: MetricKey) -> Option<&ChangeResult> {
        self.month_over_month.iter().find(|c| c.metric_key == metric)
    }

    pub fn yoy(&self, metric: MetricKey) -> Option<&ChangeResult> {
        self.year_over_year.iter().find(|c| c.metric_key == metric)
    }
}

pub fn compare_all<C, H>(current: &C, history: &[H], metrics: &[MetricKey]) -> PeriodComparison
where
    C: PeriodMetrics,
    H: PeriodMetrics,
{
    PeriodComparison {
        month_over_month: metrics
            .iter()
            .map(|m| month_over_month(current, history, *m))
            .collect(),
        year_over_year: metrics
            .iter()
            .map(|m| year_over_year(current, history, *m))
            .collect(),
    }
}
