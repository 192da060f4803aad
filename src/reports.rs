use tracing::info;

use crate::aggregate::{aggregate, calendar_month, distinct_entities};
use crate::config::ReportSettings;
use crate::metrics::MetricKey;
use crate::rank::{filter_by_change, rank, SortDirection};
use crate::summary::{changes_for_period, entity_snapshots, snapshot, Snapshot, HEADLINE_METRICS};
use crate::types::{
    AlertRow, EntityChange, EntityGroup, GroupKpiRow, LeaderboardRow, PerformanceRecord, Period, ScoredEntity,
    SummaryStats, TrendRow,
};
use crate::util::{format_change, format_number};
use crate::window::select_window;

/// Everything produced by one report run.
#[derive(Debug)]
pub struct ReportBundle {
    pub kpis: Vec<GroupKpiRow>,
    pub trends: Vec<TrendRow>,
    pub leaderboard: Vec<LeaderboardRow>,
    pub alerts: Vec<AlertRow>,
    pub summary: SummaryStats,
}

pub fn generate_reports(records: &[PerformanceRecord], groups: &[EntityGroup], settings: &ReportSettings) -> ReportBundle {
    let group_snaps: Vec<Snapshot> = groups
        .iter()
        .filter_map(|g| {
            let series = aggregate(records, g, calendar_month);
            snapshot(&series, &HEADLINE_METRICS, settings.reference_date)
        })
        .collect();
    let client_snaps = entity_snapshots(records, &HEADLINE_METRICS, settings.reference_date);
    let latest_period = client_snaps.iter().map(Snapshot::period).max();

    let kpis = generate_group_kpis(&group_snaps);
    let trends = generate_trends(records, groups, settings.months_back);
    let (leaderboard, alerts) = match latest_period {
        Some(period) => (
            generate_leaderboard(&client_snaps, period, settings.top),
            generate_alerts(&client_snaps, period, settings.alert_metric, settings.alert_threshold),
        ),
        None => (Vec::new(), Vec::new()),
    };
    let summary = generate_summary(records, groups, &group_snaps, latest_period, alerts.len(), settings);
    info!(
        groups = kpis.len(),
        trend_rows = trends.len(),
        leaderboard = leaderboard.len(),
        alerts = alerts.len(),
        "reports generated"
    );
    ReportBundle {
        kpis,
        trends,
        leaderboard,
        alerts,
        summary,
    }
}

/// One KPI row per group: the latest month (projected when partial) with
/// its MoM and YoY movement.
pub fn generate_group_kpis(snapshots: &[Snapshot]) -> Vec<GroupKpiRow> {
    let change = |snap: &Snapshot, metric: MetricKey, yoy: bool| {
        let result = if yoy { snap.yoy(metric) } else { snap.mom(metric) };
        result.map_or_else(|| "N/A".to_string(), |c| format_change(c.percent_change))
    };
    snapshots
        .iter()
        .map(|s| {
            let latest = &s.latest;
            GroupKpiRow {
                group: s.name.clone(),
                period: s.period().to_string(),
                projected: yes_no(latest.is_projected),
                revenue: format_number(latest.totals.revenue, 2),
                orders: format_number(latest.totals.orders, 0),
                ad_spend: format_number(latest.totals.ad_spend, 2),
                roas: format_number(latest.ratios.roas, 2),
                aov: format_number(latest.ratios.aov, 2),
                conv_rate: format!("{}%", format_number(latest.ratios.conv_rate, 2)),
                revenue_mom: change(s, MetricKey::Revenue, false),
                revenue_yoy: change(s, MetricKey::Revenue, true),
                ad_spend_mom: change(s, MetricKey::AdSpend, false),
            }
        })
        .collect()
}

/// Closed-month history per group, oldest first. The in-progress month is
/// left out so projections never bend the trend line.
pub fn generate_trends(records: &[PerformanceRecord], groups: &[EntityGroup], months_back: usize) -> Vec<TrendRow> {
    groups
        .iter()
        .flat_map(|g| {
            let series = aggregate(records, g, calendar_month);
            select_window(&series, months_back, true)
                .iter()
                .map(|p| TrendRow {
                    group: p.group.clone(),
                    period: p.period.to_string(),
                    revenue: format_number(p.totals.revenue, 2),
                    orders: format_number(p.totals.orders, 0),
                    ad_spend: format_number(p.totals.ad_spend, 2),
                    profit: format_number(p.totals.profit, 2),
                    roas: format_number(p.ratios.roas, 2),
                    profit_margin: format!("{}%", format_number(p.ratios.profit_margin, 2)),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Clients reporting in `period`, ranked by (projected) revenue.
pub fn generate_leaderboard(client_snaps: &[Snapshot], period: Period, top: usize) -> Vec<LeaderboardRow> {
    let current: Vec<&Snapshot> = client_snaps.iter().filter(|s| s.period() == period).collect();
    let scored: Vec<ScoredEntity> = current
        .iter()
        .map(|s| ScoredEntity::new(s.name.clone(), s.latest.totals.revenue))
        .collect();
    rank(&scored, SortDirection::Desc, Some(top))
        .into_iter()
        .filter_map(|ranked| {
            let snap = current.iter().find(|s| s.name == ranked.id)?;
            Some(LeaderboardRow {
                rank: ranked.rank,
                client: ranked.id,
                revenue: format_number(ranked.value, 2),
                projected: yes_no(snap.latest.is_projected),
                revenue_mom: snap
                    .mom(MetricKey::Revenue)
                    .map_or_else(|| "N/A".to_string(), |c| format_change(c.percent_change)),
            })
        })
        .collect()
}

/// Clients whose `metric` moved by at least `threshold` percent month over
/// month, largest movement first.
pub fn generate_alerts(client_snaps: &[Snapshot], period: Period, metric: MetricKey, threshold: f64) -> Vec<AlertRow> {
    let changes: Vec<EntityChange> = changes_for_period(client_snaps, period, metric);
    filter_by_change(&changes, threshold)
        .into_iter()
        .map(|c| AlertRow {
            client: c.id,
            metric: c.change.metric_key.label().to_string(),
            current: format_number(c.change.current_value, 2),
            previous: c
                .change
                .reference_value
                .map_or_else(|| "N/A".to_string(), |v| format_number(v, 2)),
            change: format_change(c.change.percent_change),
            favorable: yes_no(c.change.is_favorable),
        })
        .collect()
}

pub fn generate_summary(
    records: &[PerformanceRecord],
    groups: &[EntityGroup],
    group_snaps: &[Snapshot],
    latest_period: Option<Period>,
    alert_count: usize,
    settings: &ReportSettings,
) -> SummaryStats {
    // Summed over the clients of every group, counting each client once.
    let everyone = EntityGroup::with_members(
        "all",
        distinct_entities(records)
            .into_iter()
            .filter(|id| groups.iter().any(|g| g.includes(id))),
    );
    let overall = snapshot(
        &aggregate(records, &everyone, calendar_month),
        &[],
        settings.reference_date,
    );
    let (projected_revenue, projected_ad_spend, blended_roas) = overall
        .map(|s| (s.latest.totals.revenue, s.latest.totals.ad_spend, s.latest.ratios.roas))
        .unwrap_or((0.0, 0.0, 0.0));
    SummaryStats {
        as_of: settings.reference_date,
        latest_period,
        total_records: records.len(),
        total_clients: distinct_entities(records).len(),
        total_groups: group_snaps.len(),
        projected_revenue,
        projected_ad_spend,
        blended_roas,
        alert_count,
    }
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "yes" } else { "no" };
    text.to_string()
}
