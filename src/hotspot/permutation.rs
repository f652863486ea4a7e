use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};

/// Permuted statistics within this distance of the observed one count as ties.
const EPSILON: f64 = 1e-10;

/// Independent, schedule-free RNG stream for one segment of a run.
pub(crate) fn segment_rng(seed: u64, segment: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (segment as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Fresh run seed drawn from the thread-local entropy source.
pub(crate) fn entropy_seed() -> u64 {
    rand::rng().random()
}

/// Conditional permutation test for the local spatial lag of `focal`.
///
/// The focal value and every weight stay fixed; the `weights.len()` neighbor
/// slots are refilled with values drawn without replacement from the other
/// `values.len() - 1` locations. Returns how many of the `permutations` lags
/// reached the observed lag (ties included).
pub(crate) fn upper_tail_count<R: Rng + ?Sized>(
    values: &[f64],
    focal: usize,
    self_weight: f64,
    weights: &[f64],
    observed: f64,
    permutations: usize,
    rng: &mut R,
) -> usize {
    let n = values.len();
    let k = weights.len();
    debug_assert!(k < n, "a row cannot have more neighbors than other locations");

    let fixed = self_weight * values[focal];
    (0..permutations)
        .filter(|_| {
            let lag = fixed + index::sample(&mut *rng, n - 1, k).iter()
                .map(|j| if j >= focal { j + 1 } else { j }) // skip the focal location
                .zip(weights)
                .map(|(j, w)| w * values[j])
                .sum::<f64>();
            lag >= observed - EPSILON
        })
        .count()
}

/// Two-sided pseudo p-value from the upper-tail count, folded onto the
/// smaller tail: `min(1, 2 (min(upper, N - upper) + 1) / (N + 1))`.
pub(crate) fn folded_pvalue(upper: usize, permutations: usize) -> f64 {
    let tail = upper.min(permutations - upper);
    (2.0 * (tail + 1) as f64 / (permutations + 1) as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folded_pvalue_bounds() {
        assert_eq!(folded_pvalue(999, 999), 0.002);
        assert_eq!(folded_pvalue(0, 999), 0.002);
        assert_eq!(folded_pvalue(500, 999), 1.0);
        assert!((folded_pvalue(250, 999) - 0.502).abs() < 1e-12);
    }

    #[test]
    fn identical_others_tie_every_permutation() {
        let values = [0.1, 0.1, 0.1, 0.9, 0.1];
        let weights = [0.25, 0.25, 0.25, 0.25];
        let observed = 0.25 * 0.9 + 0.1;
        let mut rng = segment_rng(42, 3);
        assert_eq!(upper_tail_count(&values, 3, 0.25, &weights, observed, 99, &mut rng), 99);
    }

    #[test]
    fn focal_value_is_never_drawn() {
        // The only large value is the focal one; no permutation may reach a lag
        // that would need it in a neighbor slot.
        let values = [0.0, 0.0, 100.0, 0.0];
        let weights = [1.0];
        let mut rng = segment_rng(7, 2);
        assert_eq!(upper_tail_count(&values, 2, 0.0, &weights, 1.0, 500, &mut rng), 0);
    }

    #[test]
    fn streams_are_reproducible_per_segment() {
        let a = segment_rng(42, 5).random::<u64>();
        let b = segment_rng(42, 5).random::<u64>();
        let c = segment_rng(42, 6).random::<u64>();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
