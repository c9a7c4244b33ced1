use std::f64::consts::PI;

/// Normalized sinc with a bandwidth: `sin(pi*x/bw) / (pi*x/bw)`, 1 at zero.
pub fn sinc(x: f64, bandwidth: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    let arg = PI * x / bandwidth;
    arg.sin() / arg
}

/// Windowed-sinc smoothing over the whole histogram, clamped at zero.
///
/// Each output is the kernel-weighted mean of every input bin, using a
/// bandwidth of `length + 1`. Non-positive lengths leave the input as is.
pub fn smooth(values: &[f64], length: f64) -> Vec<f64> {
    if !(length > 0.0) || values.is_empty() {
        return values.to_vec();
    }

    let bandwidth = length + 1.0;
    let n = values.len();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let mut sum = 0.0;
        let mut sum_weight = 0.0;
        for (j, v) in values.iter().enumerate() {
            let w = sinc(i as f64 - j as f64, bandwidth);
            sum += v * w;
            sum_weight += w;
        }
        let estimate = if sum_weight > 0.0 { sum / sum_weight } else { 0.0 };
        out.push(estimate.max(0.0));
    }
    out
}
