// Metric keys, their polarity, and how to read each one off a record or
// an aggregated period.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ratios::derive_ratios;
use crate::types::{Absolutes, AggregatedPeriod, PerformanceRecord, Period, ProjectedPeriod, Ratios};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    Revenue,
    Orders,
    OrdersCanceled,
    Profit,
    AdSpend,
    Sessions,
    Aov,
    Roas,
    ConvRate,
    CancelRate,
    ProfitMargin,
    ProfitPerOrder,
    AvgFulfillmentDays,
}

/// `(metric, higher_is_better)`.
pub const POLARITY: [(MetricKey, bool); 13] = [
    (MetricKey::Revenue, true),
    (MetricKey::Orders, true),
    (MetricKey::OrdersCanceled, false),
    (MetricKey::Profit, true),
    (MetricKey::AdSpend, false),
    (MetricKey::Sessions, true),
    (MetricKey::Aov, true),
    (MetricKey::Roas, true),
    (MetricKey::ConvRate, true),
    (MetricKey::CancelRate, false),
    (MetricKey::ProfitMargin, true),
    (MetricKey::ProfitPerOrder, true),
    (MetricKey::AvgFulfillmentDays, false),
];

impl MetricKey {
    pub const ALL: [MetricKey; 13] = [
        MetricKey::Revenue,
        MetricKey::Orders,
        MetricKey::OrdersCanceled,
        MetricKey::Profit,
        MetricKey::AdSpend,
        MetricKey::Sessions,
        MetricKey::Aov,
        MetricKey::Roas,
        MetricKey::ConvRate,
        MetricKey::CancelRate,
        MetricKey::ProfitMargin,
        MetricKey::ProfitPerOrder,
        MetricKey::AvgFulfillmentDays,
    ];

    pub fn higher_is_better(self) -> bool {
        POLARITY
            .iter()
            .find(|(key, _)| *key == self)
            .map(|(_, higher)| *higher)
            .unwrap_or(true)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Orders => "orders",
            Self::OrdersCanceled => "ordersCanceled",
            Self::Profit => "profit",
            Self::AdSpend => "adSpend",
            Self::Sessions => "sessions",
            Self::Aov => "aov",
            Self::Roas => "roas",
            Self::ConvRate => "convRate",
            Self::CancelRate => "cancelRate",
            Self::ProfitMargin => "profitMargin",
            Self::ProfitPerOrder => "profitPerOrder",
            Self::AvgFulfillmentDays => "avgFulfillmentDays",
        }
    }

    /// Column label used in rendered reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Revenue => "Revenue",
            Self::Orders => "Orders",
            Self::OrdersCanceled => "Canceled Orders",
            Self::Profit => "Profit",
            Self::AdSpend => "Ad Spend",
            Self::Sessions => "Sessions",
            Self::Aov => "AOV",
            Self::Roas => "ROAS",
            Self::ConvRate => "Conv. Rate",
            Self::CancelRate => "Cancel Rate",
            Self::ProfitMargin => "Profit Margin",
            Self::ProfitPerOrder => "Profit / Order",
            Self::AvgFulfillmentDays => "Fulfillment Days",
        }
    }

    /// Reads this metric from a set of absolutes and their derived ratios.
    pub fn value_of(self, totals: &Absolutes, ratios: &Ratios) -> f64 {
        match self {
            Self::Revenue => totals.revenue,
            Self::Orders => totals.orders,
            Self::OrdersCanceled => totals.orders_canceled,
            Self::Profit => totals.profit,
            Self::AdSpend => totals.ad_spend,
            Self::Sessions => totals.sessions,
            Self::Aov => ratios.aov,
            Self::Roas => ratios.roas,
            Self::ConvRate => ratios.conv_rate,
            Self::CancelRate => ratios.cancel_rate,
            Self::ProfitMargin => ratios.profit_margin,
            Self::ProfitPerOrder => ratios.profit_per_order,
            Self::AvgFulfillmentDays => ratios.avg_fulfillment_days,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MetricKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(wanted))
            .or_else(|| match wanted.to_ascii_lowercase().as_str() {
                "spend" | "ad_spend" => Some(Self::AdSpend),
                "conversionrate" | "conversion_rate" => Some(Self::ConvRate),
                "margin" | "profit_margin" => Some(Self::ProfitMargin),
                _ => None,
            })
            .ok_or_else(|| AppError::InvalidArgument(format!("unknown metric `{}`", s)))
    }
}

/// Anything that sits in a monthly series and can report metric values.
pub trait PeriodMetrics {
    fn period(&self) -> Period;
    fn metric(&self, key: MetricKey) -> f64;
}

impl PeriodMetrics for AggregatedPeriod {
    fn period(&self) -> Period {
        self.period
    }

    fn metric(&self, key: MetricKey) -> f64 {
        key.value_of(&self.totals, &self.ratios)
    }
}

impl PeriodMetrics for ProjectedPeriod {
    fn period(&self) -> Period {
        self.base.period
    }

    fn metric(&self, key: MetricKey) -> f64 {
        key.value_of(&self.totals, &self.ratios)
    }
}

impl PeriodMetrics for PerformanceRecord {
    fn period(&self) -> Period {
        PerformanceRecord::period(self)
    }

    fn metric(&self, key: MetricKey) -> f64 {
        let totals = self.absolutes();
        key.value_of(&totals, &derive_ratios(&totals))
    }
}
