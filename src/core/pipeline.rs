use tracing::debug;

use crate::config::SrZoneParams;
use crate::core::histogram::{self, Histogram};
use crate::core::peaks::{Peak, PeakDetector};
use crate::core::pivots::PivotDetector;
use crate::core::smoothing;
use crate::core::weighting::assign_weights;
use crate::models::{CandleSeries, Pivot, SeriesDefect, Timeframe, WeightingScheme, ZoneCandidate};

/// A candidate level together with the pivots that support it.
#[derive(Debug, Clone)]
pub struct ZoneProposal {
    pub candidate: ZoneCandidate,
    pub pivots: Vec<Pivot>,
}

/// Everything one pass produced, kept for inspection and tests.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub pivots: Vec<Pivot>,
    pub histogram: Histogram,
    pub smoothed: Vec<f64>,
    pub peaks: Vec<Peak>,
    pub proposals: Vec<ZoneProposal>,
}

/// Pivots, histogram, smoothing and peak detection for one qualifier.
/// Holds no state between runs.
pub struct ZonePipeline {
    params: SrZoneParams,
}

impl ZonePipeline {
    pub fn new(params: SrZoneParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SrZoneParams {
        &self.params
    }

    pub fn run(
        &self,
        candles: &CandleSeries,
        scheme: WeightingScheme,
        timeframe: Timeframe,
    ) -> Result<PipelineOutput, SeriesDefect> {
        candles.validate()?;
        let p = &self.params;

        let mut pivots = PivotDetector::new(p.lengths.clone())
            .with_kinds(p.include_pivot_highs, p.include_pivot_lows)
            .with_lookback(p.pivot_lookback)
            .detect(candles);
        assign_weights(&mut pivots, candles, scheme);

        let mean_range = p.auto_precision.then(|| candles.mean_range());
        let Some(histogram) = histogram::build(&pivots, p.precision, mean_range) else {
            debug!(qualifier = %scheme, "degenerate pivot range, no zones");
            return Ok(PipelineOutput {
                pivots,
                ..PipelineOutput::default()
            });
        };

        let smoothed = smoothing::smooth(&histogram.weights(), p.filter_length);
        let peaks =
            PeakDetector::new(p.scale, p.threshold_ratio).detect(&histogram.centers(), &smoothed);

        let proposals = self.proposals(&peaks, &pivots, candles, scheme, timeframe);
        debug!(
            qualifier = %scheme,
            pivots = pivots.len(),
            peaks = peaks.len(),
            "zone pipeline finished"
        );

        Ok(PipelineOutput {
            pivots,
            histogram,
            smoothed,
            peaks,
            proposals,
        })
    }

    fn proposals(
        &self,
        peaks: &[Peak],
        pivots: &[Pivot],
        candles: &CandleSeries,
        scheme: WeightingScheme,
        timeframe: Timeframe,
    ) -> Vec<ZoneProposal> {
        // validate() guarantees at least one bar
        let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
            return Vec::new();
        };
        let tolerance = self.params.zone_tolerance;
        let parameters = self.params.to_json();

        // Each pivot supports only its nearest peak within tolerance.
        let owners: Vec<Option<usize>> = pivots
            .iter()
            .map(|pv| {
                peaks
                    .iter()
                    .enumerate()
                    .map(|(k, peak)| (k, (pv.level - peak.level).abs()))
                    .filter(|(_, d)| *d <= tolerance)
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(k, _)| k)
            })
            .collect();

        peaks
            .iter()
            .enumerate()
            .map(|(k, peak)| {
                let supporting: Vec<Pivot> = pivots
                    .iter()
                    .zip(&owners)
                    .filter(|(_, owner)| **owner == Some(k))
                    .map(|(pv, _)| pv.clone())
                    .collect();
                let first_detected = supporting
                    .iter()
                    .map(|pv| pv.timestamp)
                    .min()
                    .unwrap_or(first.timestamp);
                let last_confirmed = last.timestamp.max(first_detected);

                ZoneProposal {
                    candidate: ZoneCandidate {
                        value: peak.level,
                        strength: peak.score,
                        qualifier: scheme,
                        timeframe,
                        first_detected,
                        last_confirmed,
                        parameters: parameters.clone(),
                    },
                    pivots: supporting,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_rising, zigzag};

    #[test]
    fn same_input_same_output() {
        let s = zigzag(100, 20, 96.0, 104.0);
        let pipe = ZonePipeline::new(SrZoneParams::default());
        let a = pipe.run(&s, WeightingScheme::Uniform, Timeframe::M1).unwrap();
        let b = pipe.run(&s, WeightingScheme::Uniform, Timeframe::M1).unwrap();
        assert_eq!(a.peaks, b.peaks);
        assert_eq!(a.smoothed, b.smoothed);
    }

    #[test]
    fn two_clusters_give_two_peaks() {
        let s = zigzag(100, 20, 96.0, 104.0);
        let out = ZonePipeline::new(SrZoneParams::default())
            .run(&s, WeightingScheme::Uniform, Timeframe::M1)
            .unwrap();
        assert_eq!(out.peaks.len(), 2, "peaks: {:?}", out.peaks);
        let mut levels: Vec<f64> = out.peaks.iter().map(|p| p.level).collect();
        levels.sort_by(|a, b| a.total_cmp(b));
        assert!((levels[0] - 96.0).abs() < 1.0, "low level {}", levels[0]);
        assert!((levels[1] - 104.0).abs() < 1.0, "high level {}", levels[1]);
        assert!(out.smoothed.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn proposals_carry_supporting_pivots() {
        let s = zigzag(100, 20, 96.0, 104.0);
        let params = SrZoneParams {
            zone_tolerance: 2.0,
            ..SrZoneParams::default()
        };
        let out = ZonePipeline::new(params)
            .run(&s, WeightingScheme::Recency, Timeframe::M1)
            .unwrap();
        for prop in &out.proposals {
            assert!(!prop.pivots.is_empty());
            let c = &prop.candidate;
            assert!(c.first_detected <= c.last_confirmed);
            assert_eq!(c.last_confirmed, s.last().unwrap().timestamp);
            assert!(prop.pivots.iter().all(|p| (p.level - c.value).abs() <= 2.0));
        }
    }

    #[test]
    fn pivots_attach_to_their_nearest_zone() {
        // clusters are 8 apart, inside the default tolerance of 15
        let s = zigzag(100, 20, 96.0, 104.0);
        let out = ZonePipeline::new(SrZoneParams::default())
            .run(&s, WeightingScheme::Uniform, Timeframe::M1)
            .unwrap();
        assert_eq!(out.proposals.len(), 2);

        let attached: usize = out.proposals.iter().map(|p| p.pivots.len()).sum();
        assert_eq!(attached, out.pivots.len());
        for prop in &out.proposals {
            assert!(!prop.pivots.is_empty());
            let kind = prop.pivots[0].kind;
            assert!(prop.pivots.iter().all(|p| p.kind == kind));
            assert!(prop.pivots.iter().all(|p| (p.level - prop.candidate.value).abs() < 2.0));
        }
        let firsts: Vec<_> = out.proposals.iter().map(|p| p.candidate.first_detected).collect();
        assert_ne!(firsts[0], firsts[1]);
    }

    #[test]
    fn excluded_kind_still_yields_candidates_on_fallback() {
        let s = make_rising(8, 100.0, 1.0);
        let params = SrZoneParams {
            include_pivot_lows: false,
            ..SrZoneParams::default()
        };
        let out = ZonePipeline::new(params)
            .run(&s, WeightingScheme::Uniform, Timeframe::M1)
            .unwrap();
        assert_eq!(out.pivots.len(), 2);
        assert!(!out.proposals.is_empty());
    }

    #[test]
    fn monotonic_input_still_yields_candidates() {
        let s = make_rising(30, 100.0, 1.0);
        let out = ZonePipeline::new(SrZoneParams::default())
            .run(&s, WeightingScheme::Uniform, Timeframe::M1)
            .unwrap();
        assert_eq!(out.pivots.len(), 2);
        assert!(!out.proposals.is_empty());
    }

    #[test]
    fn bad_input_is_rejected() {
        let pipe = ZonePipeline::new(SrZoneParams::default());
        assert_eq!(
            pipe.run(&CandleSeries::default(), WeightingScheme::Uniform, Timeframe::M1)
                .err(),
            Some(SeriesDefect::Empty)
        );
    }
}
