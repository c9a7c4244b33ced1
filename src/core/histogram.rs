use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Pivot;

/// Fraction of the pivot range added on each side of the histogram.
const RANGE_BUFFER: f64 = 0.05;
const AUTO_PRECISION_MIN: usize = 10;
const AUTO_PRECISION_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub center_price: f64,
    pub accumulated_weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn centers(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.center_price).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.accumulated_weight).collect()
    }
}

/// Bin count derived from volatility: pivot range over mean bar range,
/// clamped to [10, 100]. Falls back to `fallback` when the bars have no range.
pub fn auto_precision(range: f64, mean_bar_range: f64, fallback: usize) -> usize {
    if !(mean_bar_range > 0.0) || !range.is_finite() {
        return fallback;
    }
    let raw = (range / mean_bar_range).round();
    (raw.max(0.0) as usize).clamp(AUTO_PRECISION_MIN, AUTO_PRECISION_MAX)
}

/// Bins pivot levels into `precision` equal-width buckets.
///
/// Returns `None` when there is nothing to bin or every pivot sits at the
/// same price (zero range).
pub fn build(pivots: &[Pivot], precision: usize, mean_bar_range: Option<f64>) -> Option<Histogram> {
    if pivots.is_empty() || precision == 0 {
        return None;
    }

    let mut mn = pivots.iter().map(|p| p.level).fold(f64::INFINITY, f64::min);
    let mut mx = pivots.iter().map(|p| p.level).fold(f64::NEG_INFINITY, f64::max);
    let raw_range = mx - mn;
    if !(raw_range > 0.0) {
        debug!(level = mn, "pivot range is zero, no histogram");
        return None;
    }

    let buffer = raw_range * RANGE_BUFFER;
    mn -= buffer;
    mx += buffer;
    let range = mx - mn;

    let precision = match mean_bar_range {
        Some(mbr) => auto_precision(range, mbr, precision),
        None => precision,
    };
    let width = range / precision as f64;

    let mut bins: Vec<HistogramBin> = (0..precision)
        .map(|k| {
            let lower = mn + width * k as f64;
            let upper = mn + width * (k + 1) as f64;
            HistogramBin {
                lower_bound: lower,
                upper_bound: upper,
                center_price: (lower + upper) / 2.0,
                accumulated_weight: 0.0,
            }
        })
        .collect();

    for p in pivots {
        let raw = ((p.level - mn) / width).floor();
        let idx = (raw.max(0.0) as usize).min(precision - 1);
        bins[idx].accumulated_weight += p.weight;
    }

    debug!(bins = precision, min = mn, max = mx, "built pivot histogram");
    Some(Histogram { bins })
}
