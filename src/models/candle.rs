use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar. Timestamps are always UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn total_range(&self) -> f64 {
        self.high - self.low
    }

    /// Finite prices with `high >= low`.
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite());
        finite && self.high >= self.low
    }

    /// True range against the previous close (plain range for the first bar).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => self
                .total_range()
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
            None => self.total_range(),
        }
    }
}

/// Why a bar sequence was rejected before entering the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesDefect {
    Empty,
    MalformedBar(usize),
    OutOfOrder(usize),
}

impl std::fmt::Display for SeriesDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesDefect::Empty => write!(f, "no bars"),
            SeriesDefect::MalformedBar(i) => write!(f, "bar {i} has non-finite prices or high < low"),
            SeriesDefect::OutOfOrder(i) => write!(f, "bar {i} is not strictly after its predecessor"),
        }
    }
}

/// Wraps Vec<Candle> with the helpers the zone pipeline needs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn highs_max(&self) -> f64 {
        self.candles
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn lows_min(&self) -> f64 {
        self.candles
            .iter()
            .map(|c| c.low)
            .fold(f64::INFINITY, f64::min)
    }

    /// Index of the first candle carrying the highest high
    pub fn high_idx_max(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, c) in self.candles.iter().enumerate() {
            match best {
                Some(b) if self.candles[b].high >= c.high => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// Index of the first candle carrying the lowest low
    pub fn low_idx_min(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, c) in self.candles.iter().enumerate() {
            match best {
                Some(b) if self.candles[b].low <= c.low => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// Mean high-low range; 0 for an empty series.
    pub fn mean_range(&self) -> f64 {
        if self.candles.is_empty() {
            return 0.0;
        }
        self.candles.iter().map(Candle::total_range).sum::<f64>() / self.candles.len() as f64
    }

    /// True range of every bar, the first measured against its own range.
    pub fn true_ranges(&self) -> Vec<f64> {
        self.candles
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let prev = i.checked_sub(1).map(|p| self.candles[p].close);
                c.true_range(prev)
            })
            .collect()
    }

    /// Checks the input contract: nonempty, well-formed bars, strictly
    /// ascending timestamps.
    pub fn validate(&self) -> Result<(), SeriesDefect> {
        if self.candles.is_empty() {
            return Err(SeriesDefect::Empty);
        }
        for (i, c) in self.candles.iter().enumerate() {
            if !c.is_well_formed() {
                return Err(SeriesDefect::MalformedBar(i));
            }
            if i > 0 && c.timestamp <= self.candles[i - 1].timestamp {
                return Err(SeriesDefect::OutOfOrder(i));
            }
        }
        Ok(())
    }

    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
    }
}

impl std::ops::Index<usize> for CandleSeries {
    type Output = Candle;
    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
