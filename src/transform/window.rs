//! Trailing window functions over nullable series.
//!
//! Every function here is causal: the output at position `i` depends only on
//! positions `..=i`. Nulls are skipped inside a window, and a window with
//! fewer than `min_periods` present values yields null.

/// Trailing rolling mean.
///
/// # Arguments
/// * `series` - Input values in time order
/// * `window` - Number of rows ending at the current row
/// * `min_periods` - Present values needed for a result
pub fn rolling_mean(series: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_apply(series, window, min_periods.max(1), |s| {
        s.iter().sum::<f64>() / s.len() as f64
    })
}

/// Trailing rolling sample standard deviation (n - 1 denominator).
///
/// Windows with fewer than two present values are null regardless of
/// `min_periods`.
pub fn rolling_std(series: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_apply(series, window, min_periods.max(2), |s| {
        let mean = s.iter().sum::<f64>() / s.len() as f64;
        let var = s.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (s.len() - 1) as f64;
        var.sqrt()
    })
}

/// Difference from the previous row. The first row is null.
pub fn diff(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(series.len());
    out.push(None);
    for w in series.windows(2) {
        out.push(match (w[0], w[1]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        });
    }
    out.truncate(series.len());
    out
}

/// Percentage change from the previous row; null when the previous value is
/// zero or either value is missing.
pub fn pct_change(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(series.len());
    out.push(None);
    for w in series.windows(2) {
        out.push(match (w[0], w[1]) {
            (Some(prev), Some(cur)) if prev != 0.0 => Some((cur - prev) / prev * 100.0),
            _ => None,
        });
    }
    out.truncate(series.len());
    out
}

fn rolling_apply<F>(
    series: &[Option<f64>],
    window: usize,
    min_periods: usize,
    f: F,
) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    if window == 0 {
        return vec![None; series.len()];
    }

    let mut buf = Vec::with_capacity(window);
    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            buf.clear();
            buf.extend(series[start..=i].iter().flatten());
            (buf.len() >= min_periods).then(|| f(&buf))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn rolling_mean_partial_windows() {
        let out = rolling_mean(&some(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3, 1);
        assert_eq!(out[0], Some(1.0));
        assert_eq!(out[1], Some(1.5));
        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[4], Some(4.0));
    }

    #[test]
    fn rolling_mean_skips_nulls() {
        let out = rolling_mean(&[Some(2.0), None, Some(4.0)], 3, 1);
        assert_eq!(out, vec![Some(2.0), Some(2.0), Some(3.0)]);

        let strict = rolling_mean(&[Some(2.0), None, Some(4.0)], 3, 3);
        assert_eq!(strict, vec![None, None, None]);
    }

    #[test]
    fn rolling_std_needs_two_values() {
        let out = rolling_std(&some(&[1.0, 3.0, 5.0]), 2, 1);
        assert_eq!(out[0], None);
        assert_relative_eq!(out[1].unwrap(), 2.0_f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(out[2].unwrap(), 2.0_f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn rolling_is_causal() {
        let base = some(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut changed = base.clone();
        changed[5] = Some(600.0);
        let a = rolling_mean(&base, 3, 1);
        let b = rolling_mean(&changed, 3, 1);
        assert_eq!(a[..5], b[..5]);
        assert_ne!(a[5], b[5]);
    }

    #[test]
    fn diff_and_pct_change() {
        let series = [Some(0.0), Some(10.0), Some(15.0), None, Some(5.0)];
        assert_eq!(diff(&series), vec![None, Some(10.0), Some(5.0), None, None]);
        let pct = pct_change(&series);
        assert_eq!(pct[1], None);
        assert_relative_eq!(pct[2].unwrap(), 50.0, epsilon = 1e-10);
        assert!(diff(&[]).is_empty());
    }

    #[test]
    fn zero_window_is_all_null() {
        assert_eq!(rolling_mean(&some(&[1.0, 2.0]), 0, 1), vec![None, None]);
    }
}
