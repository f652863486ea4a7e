//! Two-pass summary statistics: collect every value, summarize, then map.

/// Sorted copy of `values`, non-finite entries removed.
pub(crate) fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.iter().copied().filter(|v| v.is_finite()).collect::<Vec<_>>();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Linear-interpolation quantile on a **sorted** slice.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        n => {
            let idx = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = idx.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = idx - lo as f64;
            Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
        }
    }
}

/// Quantile of an unsorted sample. `None` when the sample is empty.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted_finite(values), q)
}

#[inline]
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Mean and population standard deviation. `None` when the sample is empty.
pub(crate) fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() { return None }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

/// Sample standard deviation (divide by `n - 1`). `None` below two values.
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 { return None }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Min-max scaler fit once on the full segment set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit on the finite values of `values`. `None` when there are none.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let (min, max) = values.iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        Some(Self { min, max })
    }

    #[inline] pub fn min(&self) -> f64 { self.min }

    #[inline] pub fn max(&self) -> f64 { self.max }

    /// True when every fitted value was the same.
    #[inline] pub fn is_constant(&self) -> bool { self.max - self.min <= f64::EPSILON * self.max.abs().max(1.0) }

    /// Map into [0, 1]. A constant column maps to 0.0.
    pub fn transform(&self, value: f64) -> f64 {
        if self.is_constant() { return 0.0 }
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_linearly() {
        let values = [0.0, 1.0, 2.0, 3.0, 100.0];
        assert!((quantile(&values, 0.95).unwrap() - 80.6).abs() < 1e-9);
        assert_eq!(quantile(&values, 0.5), Some(2.0));
        assert_eq!(quantile(&values, 0.0), Some(0.0));
        assert_eq!(quantile(&values, 1.0), Some(100.0));
    }

    #[test]
    fn quantile_edge_cases() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[42.0], 0.99), Some(42.0));
        assert_eq!(median(&[10.0, 20.0]), Some(15.0));
        assert_eq!(median(&[3.0, f64::NAN, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn population_and_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let (mean, std) = mean_and_std(&values).unwrap();
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
        assert!((sample_std(&values).unwrap() - 2.138_089_935).abs() < 1e-8);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn scaler_maps_extremes_to_unit_interval() {
        let scaler = MinMaxScaler::fit(&[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(scaler.transform(2.0), 0.0);
        assert_eq!(scaler.transform(4.0), 0.5);
        assert_eq!(scaler.transform(6.0), 1.0);
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let scaler = MinMaxScaler::fit(&[0.3, 0.3, 0.3]).unwrap();
        assert!(scaler.is_constant());
        assert_eq!(scaler.transform(0.3), 0.0);
        assert!(MinMaxScaler::fit(&[]).is_none());
    }
}
