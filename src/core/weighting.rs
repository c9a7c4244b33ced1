use crate::models::{CandleSeries, Pivot, WeightingScheme};

/// Assigns histogram weights to pivots in place.
///
/// Recency weights are the pivot's distance in bars from the end of the
/// series, shifted so the most recent retained pivot weighs exactly 1.
/// Magnitude weights use the pivot bar's volume, or 1 when the bar carries
/// none.
pub fn assign_weights(pivots: &mut [Pivot], candles: &CandleSeries, scheme: WeightingScheme) {
    let n = candles.len();
    match scheme {
        WeightingScheme::Uniform => {
            for p in pivots.iter_mut() {
                p.weight = 1.0;
            }
        }
        WeightingScheme::Recency => {
            for p in pivots.iter_mut() {
                p.weight = n.saturating_sub(1 + p.index) as f64;
            }
            let min = pivots
                .iter()
                .map(|p| p.weight)
                .fold(f64::INFINITY, f64::min);
            if min.is_finite() {
                for p in pivots.iter_mut() {
                    p.weight = p.weight - min + 1.0;
                }
            }
        }
        WeightingScheme::Magnitude => {
            for p in pivots.iter_mut() {
                let volume = candles.get(p.index).map(|c| c.volume).unwrap_or(0.0);
                p.weight = if volume.is_finite() && volume > 0.0 {
                    volume
                } else {
                    1.0
                };
            }
        }
    }
}
