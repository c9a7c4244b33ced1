use chrono::{DateTime, Duration, Utc};

use crate::models::{Candle, CandleSeries, Timeframe, WeightingScheme, ZoneCandidate};

fn base() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Base timestamp plus `minutes`, matching the candle builders below.
pub fn ts(minutes: i64) -> DateTime<Utc> {
    base() + Duration::minutes(minutes)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: ts(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();

    CandleSeries::new(candles)
}

/// n bars whose highs and lows rise by `step` every minute.
pub fn make_rising(n: usize, start: f64, step: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let mid = start + i as f64 * step;
            (mid, mid + 0.5, mid - 0.5, mid)
        })
        .collect();
    make_candles(&data)
}

/// Triangle wave between `lo` and `hi` with the given period; each bar spans
/// half a point either side of the wave.
pub fn zigzag(n: usize, period: usize, lo: f64, hi: f64) -> CandleSeries {
    let half = period as f64 / 2.0;
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let phase = (i % period) as f64;
            let frac = if phase <= half {
                phase / half
            } else {
                (period as f64 - phase) / half
            };
            let mid = lo + (hi - lo) * frac;
            (mid, mid + 0.5, mid - 0.5, mid)
        })
        .collect();
    make_candles(&data)
}

/// n identical bars at `price` with a range of 1.
pub fn flat(n: usize, price: f64) -> CandleSeries {
    make_candles(&vec![(price, price + 0.5, price - 0.5, price); n])
}

pub fn candidate(value: f64, strength: f64, first: i64, last: i64) -> ZoneCandidate {
    ZoneCandidate {
        value,
        strength,
        qualifier: WeightingScheme::Uniform,
        timeframe: Timeframe::M1,
        first_detected: ts(first),
        last_confirmed: ts(last),
        parameters: serde_json::json!({}),
    }
}
