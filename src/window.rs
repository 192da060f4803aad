// Trailing windows over a chronological series.
use crate::types::AggregatedPeriod;

/// The last `months_back` entries of `series`.
///
/// With `exclude_current`, the entry flagged `is_latest` (the possibly
/// partial month) is dropped before counting back, so trend lines only show
/// closed months. A series whose newest entry is not flagged is taken as
/// all history. The input must already be oldest-first; nothing is
/// re-sorted.
pub fn select_window(series: &[AggregatedPeriod], months_back: usize, exclude_current: bool) -> &[AggregatedPeriod] {
    let history = match series.split_last() {
        Some((last, rest)) if exclude_current && last.is_latest => rest,
        _ => series,
    };
    let start = history.len().saturating_sub(months_back);
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, calendar_month};
    use crate::types::{EntityGroup, PerformanceRecord};

    fn series(months: &[u32]) -> Vec<AggregatedPeriod> {
        let records: Vec<PerformanceRecord> = months
            .iter()
            .map(|m| PerformanceRecord::new("a", 2024, *m))
            .collect();
        aggregate(&records, &EntityGroup::with_members("g", ["a"]), calendar_month)
    }

    fn months(window: &[AggregatedPeriod]) -> Vec<u32> {
        window.iter().map(|p| p.period.month).collect()
    }

    #[test]
    fn trailing_window_including_current() {
        let s = series(&[1, 2, 3, 4, 5]);
        assert_eq!(months(select_window(&s, 3, false)), vec![3, 4, 5]);
    }

    #[test]
    fn excluding_current_drops_latest_first() {
        let s = series(&[1, 2, 3, 4, 5]);
        assert_eq!(months(select_window(&s, 3, true)), vec![2, 3, 4]);
    }

    #[test]
    fn only_the_flagged_latest_is_excluded() {
        // a slice that already stops short of the latest month
        let s = series(&[1, 2, 3, 4, 5]);
        assert_eq!(months(select_window(&s[..4], 12, true)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn short_series_and_edges() {
        let s = series(&[1, 2]);
        assert_eq!(months(select_window(&s, 12, false)), vec![1, 2]);
        assert_eq!(months(select_window(&s, 12, true)), vec![1]);
        assert!(select_window(&s, 0, false).is_empty());
        assert!(select_window(&[], 3, true).is_empty());
    }

    #[test]
    fn order_is_preserved() {
        let mut s = series(&[1, 4, 5]);
        s.swap(0, 1);
        assert_eq!(months(select_window(&s, 3, false)), vec![4, 1, 5]);
    }
}
