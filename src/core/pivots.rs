use tracing::debug;

use crate::models::{CandleSeries, Pivot, PivotKind};

/// Finds strict local highs and lows over several window lengths.
pub struct PivotDetector {
    pub lengths: Vec<usize>,
    pub include_highs: bool,
    pub include_lows: bool,
    /// Most recent pivots retained; 0 disables the cap.
    pub lookback: usize,
}

impl PivotDetector {
    pub fn new(lengths: Vec<usize>) -> Self {
        Self {
            lengths,
            include_highs: true,
            include_lows: true,
            lookback: 0,
        }
    }

    pub fn with_kinds(mut self, highs: bool, lows: bool) -> Self {
        self.include_highs = highs;
        self.include_lows = lows;
        self
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// All pivots for every window length, most recent first after the
    /// lookback cap. Falls back to the series extremes when nothing qualifies.
    pub fn detect(&self, candles: &CandleSeries) -> Vec<Pivot> {
        let mut pivots = Vec::new();
        for &l in &self.lengths {
            self.find_swings(candles, l, &mut pivots);
        }

        if pivots.is_empty() {
            pivots = self.extremes(candles);
            debug!(count = pivots.len(), "no windowed pivots, using series extremes");
        }

        // Stable sort keeps detection order among equal timestamps.
        pivots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if self.lookback > 0 && pivots.len() > self.lookback {
            pivots.truncate(self.lookback);
        }
        pivots
    }

    fn find_swings(&self, candles: &CandleSeries, lb: usize, out: &mut Vec<Pivot>) {
        let len = candles.len();
        if lb == 0 || len <= lb * 2 {
            return;
        }

        for i in lb..(len - lb) {
            let window = (i - lb)..=(i + lb);

            if self.include_highs {
                let current_high = candles[i].high;
                let is_swing = window
                    .clone()
                    .all(|j| j == i || candles[j].high < current_high);
                if is_swing {
                    out.push(Self::pivot(candles, i, PivotKind::High, lb));
                }
            }

            if self.include_lows {
                let current_low = candles[i].low;
                let is_swing = window.clone().all(|j| j == i || candles[j].low > current_low);
                if is_swing {
                    out.push(Self::pivot(candles, i, PivotKind::Low, lb));
                }
            }
        }
    }

    /// Both extremes regardless of the kind flags, so the histogram always
    /// has a range to work with.
    fn extremes(&self, candles: &CandleSeries) -> Vec<Pivot> {
        let high = candles
            .high_idx_max()
            .map(|i| Self::pivot(candles, i, PivotKind::High, 0));
        let low = candles
            .low_idx_min()
            .map(|i| Self::pivot(candles, i, PivotKind::Low, 0));
        high.into_iter().chain(low).collect()
    }

    fn pivot(candles: &CandleSeries, i: usize, kind: PivotKind, length: usize) -> Pivot {
        let c = &candles[i];
        Pivot {
            index: i,
            level: match kind {
                PivotKind::High => c.high,
                PivotKind::Low => c.low,
            },
            kind,
            timestamp: c.timestamp,
            weight: 1.0,
            length,
        }
    }
}
