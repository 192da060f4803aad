// Monthly client performance metrics: aggregation over client groups,
// partial-month projection, period-over-period comparison, ranking and
// trend windows.
//
// The engine modules (`ratios`, `aggregate`, `projection`, `compare`,
// `rank`, `window`, `summary`) are pure functions over in-memory records.
// `loader`, `output`, `reports` and `config` wrap them for the CLI.
pub mod aggregate;
pub mod compare;
pub mod config;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod projection;
pub mod rank;
pub mod ratios;
pub mod reports;
pub mod summary;
pub mod types;
pub mod util;
pub mod window;

pub use aggregate::{aggregate, aggregate_by_entity, calendar_month};
pub use compare::{compare, month_over_month, year_over_year, PeriodComparison};
pub use error::{AppError, Result};
pub use metrics::{MetricKey, PeriodMetrics};
pub use projection::{days_in_month, project, project_latest, project_series};
pub use rank::{filter_by_change, rank, rank_by_change, SortDirection};
pub use ratios::{derive_ratios, safe_div};
pub use types::{
    Absolutes, AggregatedPeriod, ChangeResult, EntityChange, EntityGroup, GroupMember, PercentChange,
    PerformanceRecord, Period, ProjectedPeriod, RankedEntity, Ratios, ScoredEntity,
};
pub use window::select_window;
