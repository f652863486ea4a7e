use serde::{Deserialize, Serialize};

use super::stats::{quantile_sorted, sorted_finite};

/// Percentile-based risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [RiskTier::Low, RiskTier::Moderate, RiskTier::High, RiskTier::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High",
            RiskTier::Critical => "Critical",
        }
    }
}

/// Tier boundaries computed from the empirical `risk_score` distribution.
///
/// Intervals are right-closed: Low = [min, b0], Moderate = (b0, b1],
/// High = (b1, b2], Critical = (b2, max]. The minimum score is always `Low`,
/// even when ties pull the lower breaks down onto it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierBreaks {
    pub min: f64,
    pub max: f64,
    pub breaks: [f64; 3],
}

impl TierBreaks {
    /// Fit the breaks at the given quantile cutoffs. `None` for an empty sample.
    pub fn fit(scores: &[f64], cutoffs: [f64; 3]) -> Option<Self> {
        let sorted = sorted_finite(scores);
        let min = *sorted.first()?;
        let max = *sorted.last()?;
        let mut breaks = [0.0; 3];
        for (b, q) in breaks.iter_mut().zip(cutoffs) {
            *b = quantile_sorted(&sorted, q)?;
        }
        Some(Self { min, max, breaks })
    }

    /// Every score identical; the tiers collapse and everything is `Low`.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.max - self.min <= f64::EPSILON * self.max.abs().max(1.0)
    }

    pub fn classify(&self, score: f64) -> RiskTier {
        if self.is_degenerate() { return RiskTier::Low }
        let [b0, b1, b2] = self.breaks;
        if score <= b0 { RiskTier::Low }
        else if score <= b1 { RiskTier::Moderate }
        else if score <= b2 { RiskTier::High }
        else { RiskTier::Critical }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUTOFFS: [f64; 3] = [0.40, 0.70, 0.90];

    #[test]
    fn uniform_scores_populate_every_tier() {
        let scores = (0..100).map(|i| i as f64 / 99.0).collect::<Vec<_>>();
        let breaks = TierBreaks::fit(&scores, CUTOFFS).unwrap();

        let mut counts = [0; 4];
        for &s in &scores {
            counts[breaks.classify(s) as usize] += 1;
        }
        assert_eq!(counts, [40, 30, 20, 10]);
    }

    #[test]
    fn boundaries_are_right_closed() {
        let breaks = TierBreaks { min: 0.0, max: 1.0, breaks: [0.4, 0.7, 0.9] };
        assert_eq!(breaks.classify(0.0), RiskTier::Low);
        assert_eq!(breaks.classify(0.4), RiskTier::Low);
        assert_eq!(breaks.classify(0.401), RiskTier::Moderate);
        assert_eq!(breaks.classify(0.7), RiskTier::Moderate);
        assert_eq!(breaks.classify(0.9), RiskTier::High);
        assert_eq!(breaks.classify(1.0), RiskTier::Critical);
    }

    #[test]
    fn tied_minimum_scores_stay_low() {
        let mut scores = vec![0.0; 9];
        scores.push(1.0);
        let breaks = TierBreaks::fit(&scores, CUTOFFS).unwrap();
        assert_eq!(breaks.breaks[0], 0.0);
        assert_eq!(breaks.breaks[1], 0.0);

        let tiers = scores.iter().map(|&s| breaks.classify(s)).collect::<Vec<_>>();
        assert!(tiers[..9].iter().all(|&t| t == RiskTier::Low), "{tiers:?}");
        assert_eq!(tiers[9], RiskTier::Critical);
    }

    #[test]
    fn constant_scores_collapse_to_low() {
        let breaks = TierBreaks::fit(&[0.5; 10], CUTOFFS).unwrap();
        assert!(breaks.is_degenerate());
        assert_eq!(breaks.classify(0.5), RiskTier::Low);
    }

    #[test]
    fn empty_scores_have_no_breaks() {
        assert!(TierBreaks::fit(&[], CUTOFFS).is_none());
    }
}
