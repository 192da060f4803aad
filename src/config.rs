// Command-line configuration and group definitions.
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::metrics::MetricKey;
use crate::types::EntityGroup;

/// Monthly client performance reports: group KPIs, trends, leaderboards and
/// pacing alerts.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// CSV export of monthly performance records.
    #[arg(long, default_value = "client_performance.csv")]
    pub input: PathBuf,

    /// JSON file with group definitions (brands, books of business).
    #[arg(long)]
    pub groups: Option<PathBuf>,

    /// Reference date for projections (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Number of closed months shown in trend tables.
    #[arg(long, default_value_t = 12)]
    pub months_back: usize,

    /// Minimum absolute MoM change (%) for an alert. 0 shows all clients.
    #[arg(long, default_value_t = 0.0)]
    pub alert_threshold: f64,

    /// Metric watched for alerts (e.g. revenue, adSpend, roas, convRate).
    #[arg(long, default_value = "revenue")]
    pub alert_metric: MetricKey,

    /// Number of clients on the leaderboard.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Directory the report files are written to.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

/// Inputs for one report run. Everything time-dependent flows from
/// `reference_date`; nothing reads the clock after startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub reference_date: NaiveDate,
    pub months_back: usize,
    pub alert_threshold: f64,
    pub alert_metric: MetricKey,
    pub top: usize,
}

impl Cli {
    pub fn settings(&self, today: NaiveDate) -> Result<ReportSettings> {
        if !self.alert_threshold.is_finite() || self.alert_threshold < 0.0 {
            return Err(AppError::InvalidArgument(format!(
                "alert threshold must be a non-negative number, got {}",
                self.alert_threshold
            )));
        }
        Ok(ReportSettings {
            reference_date: self.as_of.unwrap_or(today),
            months_back: self.months_back,
            alert_threshold: self.alert_threshold,
            alert_metric: self.alert_metric,
            top: self.top,
        })
    }
}

/// Loads group definitions from a JSON array of
/// `{"name": ..., "members": [{"entityId": ..., "included": true}]}`.
pub fn load_groups<P: AsRef<Path>>(path: P) -> Result<Vec<EntityGroup>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let groups: Vec<EntityGroup> = serde_json::from_str(&text)?;
    if let Some(unnamed) = groups.iter().position(|g| g.name.trim().is_empty()) {
        return Err(AppError::InvalidArgument(format!(
            "group #{} in {} has no name",
            unnamed + 1,
            path.as_ref().display()
        )));
    }
    debug!(count = groups.len(), "loaded group definitions");
    Ok(groups)
}

/// The group used when no definitions are supplied: every known client.
pub fn default_group(entity_ids: &[String]) -> EntityGroup {
    EntityGroup::with_members("All Clients", entity_ids.iter().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["client_metrics"]);
        assert_eq!(cli.input, PathBuf::from("client_performance.csv"));
        assert_eq!(cli.months_back, 12);
        assert_eq!(cli.alert_threshold, 0.0);
        assert_eq!(cli.alert_metric, MetricKey::Revenue);
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(cli.settings(today).unwrap().reference_date, today);
    }

    #[test]
    fn as_of_overrides_today() {
        let cli = Cli::parse_from([
            "client_metrics",
            "--as-of",
            "2024-03-31",
            "--alert-threshold",
            "15",
            "--alert-metric",
            "adSpend",
        ]);
        let settings = cli.settings(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()).unwrap();
        assert_eq!(settings.reference_date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(settings.alert_threshold, 15.0);
        assert_eq!(settings.alert_metric, MetricKey::AdSpend);
    }

    #[test]
    fn unknown_alert_metric_is_rejected() {
        assert!(Cli::try_parse_from(["client_metrics", "--alert-metric", "bounceRate"]).is_err());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let cli = Cli::parse_from(["client_metrics", "--alert-threshold=-5"]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert!(matches!(cli.settings(today), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn loads_group_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.json");
        std::fs::write(
            &path,
            r#"[{"name": "Brand A", "members": [
                {"entityId": "acme", "included": true},
                {"entityId": "globex", "included": false}
            ]}]"#,
        )
        .unwrap();
        let groups = load_groups(&path).unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].includes("acme"));
        assert!(!groups[0].includes("globex"));
    }

    #[test]
    fn unnamed_group_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.json");
        std::fs::write(&path, r#"[{"name": " ", "members": []}]"#).unwrap();
        assert!(load_groups(&path).is_err());
    }
}
