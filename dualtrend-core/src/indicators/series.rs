//! Series primitives shared by every indicator.
//!
//! Conventions: outputs have the same length as inputs, and `f64::NAN` marks
//! an undefined value (warm-up, or a window touching an undefined sample).

/// Exponential moving average with `alpha = 2 / (period + 1)`.
///
/// Seeded at the first defined sample (`ema[0] == series[0]` for a clean
/// series), not at an SMA of the first window. Undefined samples before the
/// seed stay undefined; an undefined sample after the seed holds the previous
/// EMA value.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev: Option<f64> = None;

    for (out, &v) in result.iter_mut().zip(values) {
        let next = match (prev, v.is_nan()) {
            (None, true) => continue,
            (None, false) => v,
            (Some(p), true) => p,
            (Some(p), false) => v * alpha + p * (1.0 - alpha),
        };
        *out = next;
        prev = Some(next);
    }

    result
}

/// Apply `stat` to every trailing window of `window` samples.
///
/// Undefined until `window` samples have accumulated; undefined for any window
/// containing an undefined sample.
fn rolling<F>(values: &[f64], window: usize, stat: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = stat(slice);
    }

    result
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Shift a series forward by `offset` bars: `out[i] = values[i - offset]`.
pub fn shift_forward(values: &[f64], offset: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    for i in offset..n {
        result[i] = values[i - offset];
    }
    result
}

/// Element-wise `a - b`; undefined where either side is.
pub fn difference(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}
