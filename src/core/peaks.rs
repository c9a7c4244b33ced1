use serde::{Deserialize, Serialize};
use tracing::debug;

/// A local maximum of the smoothed histogram. `index` is fractional when the
/// peak sits in the middle of an even-length plateau.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub index: f64,
    pub level: f64,
    pub score: f64,
}

/// Plateau-aware peak finder over a quantized copy of the histogram.
pub struct PeakDetector {
    pub scale: usize,
    pub threshold_ratio: f64,
}

impl PeakDetector {
    pub fn new(scale: usize, threshold_ratio: f64) -> Self {
        Self {
            scale,
            threshold_ratio,
        }
    }

    /// Peaks above the strength threshold, strongest first. Never empty for
    /// a nonempty histogram.
    pub fn detect(&self, centers: &[f64], smoothed: &[f64]) -> Vec<Peak> {
        if smoothed.is_empty() || centers.len() != smoothed.len() {
            return Vec::new();
        }

        let max_hist = smoothed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let candidates: Vec<Peak> = self
            .peak_indices(smoothed)
            .into_iter()
            .filter_map(|idx| resolve(idx, centers, smoothed))
            .collect();

        let mut peaks = filter_by(&candidates, self.threshold_ratio * max_hist);
        if peaks.is_empty() {
            let lower = self.threshold_ratio / 2.0;
            debug!(threshold = lower, "no peaks above threshold, retrying lower");
            peaks = filter_by(&candidates, lower * max_hist);
        }
        if peaks.is_empty() {
            peaks = extremes(centers, smoothed);
            debug!(count = peaks.len(), "using histogram extremes as peaks");
        }

        peaks.sort_by(|a, b| b.score.total_cmp(&a.score));
        peaks
    }

    /// Raw peak positions, before thresholding.
    pub fn peak_indices(&self, smoothed: &[f64]) -> Vec<f64> {
        let n = smoothed.len();
        let real_minimum = smoothed
            .iter()
            .copied()
            .filter(|v| *v > 0.0)
            .fold(f64::INFINITY, f64::min);
        let real_minimum = if real_minimum.is_finite() { real_minimum } else { 0.0 };
        let max_val = smoothed.iter().copied().fold(f64::NEG_INFINITY, f64::max) - real_minimum;
        if !(max_val > 0.0) {
            return Vec::new();
        }

        let steps = (self.scale.max(2) - 1) as f64;
        let bucket = |i: isize| -> i64 {
            if i < 0 || i as usize >= n {
                return 0;
            }
            ((smoothed[i as usize] - real_minimum) / max_val * steps).round() as i64 + 1
        };

        let mut out = Vec::new();
        let mut i: isize = 0;
        while (i as usize) < n {
            let center = bucket(i);
            let previous = bucket(i - 1);
            let next = bucket(i + 1);

            if center > previous {
                if center == next {
                    let mut j = i + 1;
                    while (j as usize) < n && bucket(j) == center {
                        j += 1;
                    }
                    if center > bucket(j) {
                        out.push(plateau_midpoint(i as usize, j as usize));
                    }
                    i = j;
                    continue;
                } else if center > next {
                    out.push(i as f64);
                }
            }
            i += 1;
        }
        out
    }
}

/// Midpoint of the plateau `[start, end)`. Even lengths land between bins.
fn plateau_midpoint(start: usize, end: usize) -> f64 {
    let len = end - start;
    if len % 2 == 1 {
        (start + (len - 1) / 2) as f64
    } else {
        start as f64 + len as f64 / 2.0 - 0.5
    }
}

fn resolve(idx: f64, centers: &[f64], smoothed: &[f64]) -> Option<Peak> {
    if idx.fract() == 0.0 {
        let k = idx as usize;
        return Some(Peak {
            index: idx,
            level: *centers.get(k)?,
            score: *smoothed.get(k)?,
        });
    }
    let lo = idx.floor() as usize;
    let hi = lo + 1;
    Some(Peak {
        index: idx,
        level: (centers.get(lo)? + centers.get(hi)?) / 2.0,
        score: (smoothed.get(lo)? + smoothed.get(hi)?) / 2.0,
    })
}

fn filter_by(candidates: &[Peak], threshold: f64) -> Vec<Peak> {
    candidates
        .iter()
        .filter(|p| p.score >= threshold)
        .cloned()
        .collect()
}

fn extremes(centers: &[f64], smoothed: &[f64]) -> Vec<Peak> {
    let mut min_idx = 0;
    let mut max_idx = 0;
    for (i, v) in smoothed.iter().enumerate() {
        if *v < smoothed[min_idx] {
            min_idx = i;
        }
        if *v > smoothed[max_idx] {
            max_idx = i;
        }
    }
    let mut out = vec![Peak {
        index: min_idx as f64,
        level: centers[min_idx],
        score: smoothed[min_idx],
    }];
    if max_idx != min_idx {
        out.push(Peak {
            index: max_idx as f64,
            level: centers[max_idx],
            score: smoothed[max_idx],
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centers(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn single_bar_peak() {
        let s = [0.0, 1.0, 5.0, 1.0, 0.0];
        let peaks = PeakDetector::new(30, 0.25).detect(&centers(5), &s);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].index - 2.0).abs() < 1e-9);
        assert!((peaks[0].level - 102.0).abs() < 1e-9);
        assert!((peaks[0].score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn odd_plateau_resolves_to_middle_bin() {
        let s = [0.0, 1.0, 3.0, 3.0, 3.0, 1.0, 0.0];
        let idx = PeakDetector::new(30, 0.25).peak_indices(&s);
        assert_eq!(idx, vec![3.0]);
    }

    #[test]
    fn even_plateau_resolves_between_bins() {
        let s = [0.0, 1.0, 3.0, 3.0, 1.0, 0.0];
        let peaks = PeakDetector::new(30, 0.25).detect(&centers(6), &s);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].index - 2.5).abs() < 1e-9);
        assert!((peaks[0].level - 102.5).abs() < 1e-9);
        assert!((peaks[0].score - 3.0).abs() < 1e-9);
    }

    #[test]
    fn plateau_followed_by_rise_is_not_a_peak() {
        let s = [0.0, 2.0, 2.0, 4.0, 0.0];
        let idx = PeakDetector::new(30, 0.25).peak_indices(&s);
        assert_eq!(idx, vec![3.0]);
    }

    #[test]
    fn weak_peaks_are_filtered() {
        let s = [0.0, 5.0, 0.0, 1.0, 0.0, 0.0];
        let peaks = PeakDetector::new(30, 0.25).detect(&centers(6), &s);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].level - 101.0).abs() < 1e-9);

        let all = PeakDetector::new(30, 0.1).detect(&centers(6), &s);
        assert_eq!(all.len(), 2);
        assert!(all[0].score > all[1].score);
    }

    #[test]
    fn retries_with_half_threshold() {
        // The only peak is an even plateau whose averaged score sits below max.
        let s = [1.0, 10.0, 9.9, 1.0];
        let peaks = PeakDetector::new(30, 1.0).detect(&centers(4), &s);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].index - 1.5).abs() < 1e-9);
        assert!((peaks[0].score - 9.95).abs() < 1e-9);
    }

    #[test]
    fn flat_histogram_falls_back_to_extremes() {
        let s = [2.0, 2.0, 2.0];
        let peaks = PeakDetector::new(30, 0.25).detect(&centers(3), &s);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].level - 100.0).abs() < 1e-9);

        let zeros = [0.0; 4];
        assert_eq!(PeakDetector::new(30, 0.25).detect(&centers(4), &zeros).len(), 1);
    }

    #[test]
    fn nonempty_histogram_always_has_a_peak() {
        let cases: [&[f64]; 4] = [
            &[1.0],
            &[1.0, 2.0, 3.0, 4.0],
            &[4.0, 3.0, 2.0, 1.0],
            &[0.0, 0.5, 0.0, 7.0, 7.0],
        ];
        for s in cases {
            let peaks = PeakDetector::new(30, 0.25).detect(&centers(s.len()), s);
            assert!(!peaks.is_empty(), "no peak for {s:?}");
        }
    }
}
