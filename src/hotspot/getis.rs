use anyhow::{ensure, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::graph::SpatialWeights;
use crate::score::stats::mean_and_std;
use super::classify::normal_pvalue;
use super::permutation::{entropy_seed, folded_pvalue, segment_rng, upper_tail_count};

/// Standard deviations at or below this are treated as a constant field.
const MIN_STD: f64 = 1e-12;

/// Local Gi* statistic of one segment. `None` for segments without neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GiStar {
    pub z: Option<f64>,
    /// Conditional-permutation p-value, in (0, 1].
    pub p_sim: Option<f64>,
    /// Normal-approximation p-value.
    pub p_norm: Option<f64>,
    pub neighbor_count: u32,
}

impl GiStar {
    fn undefined() -> Self {
        Self { z: None, p_sim: None, p_norm: None, neighbor_count: 0 }
    }
}

/// Gi* statistics for a whole network plus what is needed to reproduce them.
#[derive(Debug, Clone, PartialEq)]
pub struct GiStarField {
    pub stats: Vec<GiStar>,
    /// Seed the permutation streams were derived from.
    pub seed: u64,
    pub permutations: usize,
    /// Every value was the same; all defined z-scores are zero.
    pub constant: bool,
}

/// Getis-Ord Gi* with conditional-permutation significance.
#[derive(Debug, Clone, Copy)]
pub struct LocalAutocorrelationEngine {
    permutations: usize,
    seed: Option<u64>,
}

impl LocalAutocorrelationEngine {
    /// `seed: None` draws a fresh seed per run; it is reported in the result.
    pub fn new(permutations: usize, seed: Option<u64>) -> Result<Self> {
        ensure!(permutations >= 1, "[hotspot::getis] at least one permutation is required");
        Ok(Self { permutations, seed })
    }

    /// Compute Gi* for every row of `weights` over `values` (one per row).
    pub fn compute(&self, values: &[f64], weights: &SpatialWeights) -> Result<GiStarField> {
        let n = values.len();
        ensure!(n == weights.node_count(),
            "[hotspot::getis] {} values for {} weight rows", n, weights.node_count());
        ensure!(values.iter().all(|v| v.is_finite()), "[hotspot::getis] values must be finite");

        let seed = self.seed.unwrap_or_else(entropy_seed);
        let permutations = self.permutations;
        let Some((mean, std)) = mean_and_std(values) else {
            return Ok(GiStarField { stats: Vec::new(), seed, permutations, constant: false });
        };
        let constant = std <= MIN_STD;
        if constant {
            warn!(value = mean, "risk_score is constant; every z-score is 0");
        }
        debug!(n, mean, std, seed, permutations, "computing Gi*");

        let stats = (0..n).into_par_iter()
            .map(|i| {
                let degree = weights.degree(i);
                if degree == 0 { return GiStar::undefined() }
                let neighbor_count = degree as u32;
                if constant {
                    return GiStar { z: Some(0.0), p_sim: Some(1.0), p_norm: Some(1.0), neighbor_count };
                }

                let self_weight = weights.star_self_weight(i);
                let (neighbors, row): (Vec<usize>, Vec<f64>) = weights.edges_with_weights(i).unzip();

                let sum_w = self_weight + row.iter().sum::<f64>();
                let sum_w2 = self_weight * self_weight + row.iter().map(|w| w * w).sum::<f64>();
                let lag = self_weight * values[i]
                    + neighbors.iter().zip(&row).map(|(&j, w)| w * values[j]).sum::<f64>();

                let z = gi_star_z(lag, sum_w, sum_w2, mean, std, n);

                let mut rng = segment_rng(seed, i);
                let upper = upper_tail_count(values, i, self_weight, &row, lag, permutations, &mut rng);

                GiStar {
                    z: Some(z),
                    p_sim: Some(folded_pvalue(upper, permutations)),
                    p_norm: Some(normal_pvalue(z)),
                    neighbor_count,
                }
            })
            .collect::<Vec<_>>();

        info!(
            segments = n,
            undefined = stats.iter().filter(|s| s.z.is_none()).count(),
            permutations,
            seed,
            "computed local Gi*"
        );

        Ok(GiStarField { stats, seed, permutations, constant })
    }
}

/// Gi* z-score of a star-weighted spatial lag. Zero when the variance term vanishes.
fn gi_star_z(lag: f64, sum_w: f64, sum_w2: f64, mean: f64, std: f64, n: usize) -> f64 {
    if n < 2 { return 0.0 }
    let n = n as f64;
    let spread = (n * sum_w2 - sum_w * sum_w) / (n - 1.0);
    let denom = std * spread.max(0.0).sqrt();
    if denom <= f64::EPSILON { return 0.0 }
    (lag - mean * sum_w) / denom
}
