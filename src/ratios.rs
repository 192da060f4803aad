// Derived metrics. Every ratio here is finite: a zero or non-finite
// denominator yields 0 so callers never have to special-case NaN.
use crate::types::{Absolutes, Ratios};

pub fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// `num / den`, or `0` when the denominator is zero or either side is not
/// a finite number.
pub fn safe_div(num: f64, den: f64) -> f64 {
    let num = finite_or_zero(num);
    let den = finite_or_zero(den);
    if den == 0.0 {
        return 0.0;
    }
    finite_or_zero(num / den)
}

pub fn derive_ratios(totals: &Absolutes) -> Ratios {
    Ratios {
        aov: safe_div(totals.revenue, totals.orders),
        roas: safe_div(totals.revenue, totals.ad_spend),
        conv_rate: safe_div(totals.orders, totals.sessions) * 100.0,
        cancel_rate: safe_div(totals.orders_canceled, totals.orders) * 100.0,
        profit_margin: safe_div(totals.profit, totals.revenue) * 100.0,
        profit_per_order: safe_div(totals.profit, totals.orders),
        avg_fulfillment_days: safe_div(totals.fulfillment_day_orders, totals.orders),
    }
}
