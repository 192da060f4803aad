use std::fmt;
use std::ops::AddAssign;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use tabled::Tabled;

use crate::metrics::MetricKey;

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Returns `None` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The calendar month immediately before this one.
    pub fn prev(self) -> Self {
        if self.month <= 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Same calendar month, one year earlier.
    pub fn year_ago(self) -> Self {
        Self {
            year: self.year - 1,
            month: self.month,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Raw CSV row as exported by the reporting spreadsheets.
///
/// Every column is optional and kept as text; `loader` does the cleaning.
/// The aliases map the different header spellings used across client
/// sheets onto one record shape.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRow {
    #[serde(rename = "Client", alias = "Account", alias = "Store", alias = "client")]
    pub client: Option<String>,
    #[serde(rename = "Year", alias = "year")]
    pub year: Option<String>,
    #[serde(rename = "Month", alias = "month")]
    pub month: Option<String>,
    #[serde(rename = "Revenue", alias = "Sales", alias = "Total Sales", alias = "revenue")]
    pub revenue: Option<String>,
    #[serde(rename = "Orders", alias = "orders")]
    pub orders: Option<String>,
    #[serde(
        rename = "OrdersCanceled",
        alias = "Canceled Orders",
        alias = "Cancelled Orders",
        alias = "ordersCanceled"
    )]
    pub orders_canceled: Option<String>,
    #[serde(rename = "Profit", alias = "profit")]
    pub profit: Option<String>,
    #[serde(rename = "AdSpend", alias = "Ad Spend", alias = "Spend", alias = "adSpend")]
    pub ad_spend: Option<String>,
    #[serde(rename = "Sessions", alias = "sessions")]
    pub sessions: Option<String>,
    #[serde(
        rename = "AvgFulfillmentDays",
        alias = "Fulfillment Days",
        alias = "avgFulfillmentDays"
    )]
    pub avg_fulfillment_days: Option<String>,
    #[serde(rename = "DaysOfData", alias = "Days of Data", alias = "daysOfData")]
    pub days_of_data: Option<String>,
}

/// One client, one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub entity_id: String,
    pub year: i32,
    pub month: u32,
    pub revenue: f64,
    pub orders: f64,
    pub orders_canceled: f64,
    pub profit: f64,
    pub ad_spend: f64,
    pub sessions: f64,
    pub avg_fulfillment_days: f64,
    /// Present when the month is still in progress or was back-filled.
    #[serde(default)]
    pub days_of_data: Option<u32>,
}

impl PerformanceRecord {
    /// A record with every absolute set to zero.
    pub fn new(entity_id: impl Into<String>, year: i32, month: u32) -> Self {
        Self {
            entity_id: entity_id.into(),
            year,
            month,
            revenue: 0.0,
            orders: 0.0,
            orders_canceled: 0.0,
            profit: 0.0,
            ad_spend: 0.0,
            sessions: 0.0,
            avg_fulfillment_days: 0.0,
            days_of_data: None,
        }
    }

    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            month: self.month,
        }
    }

    /// The summable fields of this record. Non-finite inputs become `0`.
    pub fn absolutes(&self) -> Absolutes {
        use crate::ratios::finite_or_zero;
        let orders = finite_or_zero(self.orders);
        Absolutes {
            revenue: finite_or_zero(self.revenue),
            orders,
            orders_canceled: finite_or_zero(self.orders_canceled),
            profit: finite_or_zero(self.profit),
            ad_spend: finite_or_zero(self.ad_spend),
            sessions: finite_or_zero(self.sessions),
            fulfillment_day_orders: finite_or_zero(self.avg_fulfillment_days * orders),
        }
    }
}

/// Summable metrics of a record or a group of records.
///
/// `fulfillment_day_orders` carries `avg_fulfillment_days * orders` so the
/// average can be rederived after summing instead of averaging averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Absolutes {
    pub revenue: f64,
    pub orders: f64,
    pub orders_canceled: f64,
    pub profit: f64,
    pub ad_spend: f64,
    pub sessions: f64,
    pub fulfillment_day_orders: f64,
}

impl Absolutes {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            revenue: self.revenue * factor,
            orders: self.orders * factor,
            orders_canceled: self.orders_canceled * factor,
            profit: self.profit * factor,
            ad_spend: self.ad_spend * factor,
            sessions: self.sessions * factor,
            fulfillment_day_orders: self.fulfillment_day_orders * factor,
        }
    }
}

impl AddAssign for Absolutes {
    fn add_assign(&mut self, rhs: Self) {
        self.revenue += rhs.revenue;
        self.orders += rhs.orders;
        self.orders_canceled += rhs.orders_canceled;
        self.profit += rhs.profit;
        self.ad_spend += rhs.ad_spend;
        self.sessions += rhs.sessions;
        self.fulfillment_day_orders += rhs.fulfillment_day_orders;
    }
}

/// Derived metrics. Always recomputed from `Absolutes`, never stored on input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ratios {
    pub aov: f64,
    pub roas: f64,
    pub conv_rate: f64,
    pub cancel_rate: f64,
    pub profit_margin: f64,
    pub profit_per_order: f64,
    pub avg_fulfillment_days: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub entity_id: String,
    pub included: bool,
}

/// A named set of clients: a brand, a manager's book of business, or a
/// custom selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityGroup {
    pub name: String,
    #[serde(default)]
    pub members: Vec<GroupMember>,
}

impl EntityGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// A group with every listed entity included.
    pub fn with_members<I, S>(name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: ids
                .into_iter()
                .map(|id| GroupMember {
                    entity_id: id.into(),
                    included: true,
                })
                .collect(),
        }
    }

    /// Sets the membership flag for `entity_id`, adding it if unknown.
    pub fn set_included(&mut self, entity_id: &str, included: bool) {
        match self.members.iter_mut().find(|m| m.entity_id == entity_id) {
            Some(member) => member.included = included,
            None => self.members.push(GroupMember {
                entity_id: entity_id.to_string(),
                included,
            }),
        }
    }

    pub fn includes(&self, entity_id: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.included && m.entity_id == entity_id)
    }

    pub fn included_ids(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|m| m.included)
            .map(|m| m.entity_id.as_str())
    }
}

/// One group, one period: summed absolutes with ratios derived post-sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPeriod {
    pub group: String,
    pub period: Period,
    pub totals: Absolutes,
    pub ratios: Ratios,
    /// Largest `days_of_data` reported by any contributing record.
    pub days_of_data: Option<u32>,
    /// Number of distinct entities that contributed records.
    pub member_count: usize,
    /// True only for the most recent period of the series it came from.
    pub is_latest: bool,
}

/// An aggregated period, scaled to a full-month estimate when it is the
/// latest, partial month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedPeriod {
    pub base: AggregatedPeriod,
    pub projection_factor: Option<f64>,
    pub is_projected: bool,
    pub totals: Absolutes,
    pub ratios: Ratios,
}

impl ProjectedPeriod {
    pub fn unprojected(base: AggregatedPeriod) -> Self {
        Self {
            totals: base.totals,
            ratios: base.ratios,
            projection_factor: None,
            is_projected: false,
            base,
        }
    }

    pub fn period(&self) -> Period {
        self.base.period
    }

    pub fn group(&self) -> &str {
        &self.base.group
    }
}

/// Relative change between two values.
///
/// `NotAvailable` is distinct from a zero change: it means there was no
/// usable baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    Percent(f64),
    NotAvailable,
}

impl PercentChange {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Percent(p) => Some(p),
            Self::NotAvailable => None,
        }
    }

    pub fn magnitude(self) -> Option<f64> {
        self.value().map(f64::abs)
    }

    pub fn is_available(self) -> bool {
        matches!(self, Self::Percent(_))
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{:.2}%", p),
            Self::NotAvailable => f.write_str("N/A"),
        }
    }
}

impl Serialize for PercentChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Percent(p) => serializer.serialize_f64(*p),
            Self::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResult {
    pub metric_key: MetricKey,
    pub current_value: f64,
    pub reference_value: Option<f64>,
    pub percent_change: PercentChange,
    pub is_favorable: bool,
}

/// Ranker input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntity {
    pub id: String,
    pub value: f64,
}

impl ScoredEntity {
    pub fn new(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// Ranker output. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntity {
    pub rank: usize,
    pub id: String,
    pub value: f64,
}

/// A change result attached to the entity it was computed for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityChange {
    pub id: String,
    pub change: ChangeResult,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupKpiRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Projected")]
    #[tabled(rename = "Projected")]
    pub projected: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[serde(rename = "Orders")]
    #[tabled(rename = "Orders")]
    pub orders: String,
    #[serde(rename = "AdSpend")]
    #[tabled(rename = "AdSpend")]
    pub ad_spend: String,
    #[serde(rename = "ROAS")]
    #[tabled(rename = "ROAS")]
    pub roas: String,
    #[serde(rename = "AOV")]
    #[tabled(rename = "AOV")]
    pub aov: String,
    #[serde(rename = "ConvRate")]
    #[tabled(rename = "ConvRate")]
    pub conv_rate: String,
    #[serde(rename = "RevenueMoM")]
    #[tabled(rename = "RevenueMoM")]
    pub revenue_mom: String,
    #[serde(rename = "RevenueYoY")]
    #[tabled(rename = "RevenueYoY")]
    pub revenue_yoy: String,
    #[serde(rename = "AdSpendMoM")]
    #[tabled(rename = "AdSpendMoM")]
    pub ad_spend_mom: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[serde(rename = "Orders")]
    #[tabled(rename = "Orders")]
    pub orders: String,
    #[serde(rename = "AdSpend")]
    #[tabled(rename = "AdSpend")]
    pub ad_spend: String,
    #[serde(rename = "Profit")]
    #[tabled(rename = "Profit")]
    pub profit: String,
    #[serde(rename = "ROAS")]
    #[tabled(rename = "ROAS")]
    pub roas: String,
    #[serde(rename = "ProfitMargin")]
    #[tabled(rename = "ProfitMargin")]
    pub profit_margin: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LeaderboardRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Client")]
    #[tabled(rename = "Client")]
    pub client: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[serde(rename = "Projected")]
    #[tabled(rename = "Projected")]
    pub projected: String,
    #[serde(rename = "RevenueMoM")]
    #[tabled(rename = "RevenueMoM")]
    pub revenue_mom: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AlertRow {
    #[serde(rename = "Client")]
    #[tabled(rename = "Client")]
    pub client: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Current")]
    #[tabled(rename = "Current")]
    pub current: String,
    #[serde(rename = "Previous")]
    #[tabled(rename = "Previous")]
    pub previous: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
    #[serde(rename = "Favorable")]
    #[tabled(rename = "Favorable")]
    pub favorable: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub as_of: NaiveDate,
    pub latest_period: Option<Period>,
    pub total_records: usize,
    pub total_clients: usize,
    pub total_groups: usize,
    pub projected_revenue: f64,
    pub projected_ad_spend: f64,
    pub blended_roas: f64,
    pub alert_count: usize,
}
