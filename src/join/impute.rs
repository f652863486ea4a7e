use serde::{Deserialize, Serialize};

use crate::score::stats::median;

/// How a join fills segments that no record reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPolicy {
    /// Dataset median of the matched primary values, flagged as imputed.
    Median,
    /// Literal zero; absence is an observation.
    Zero,
}

impl FillPolicy {
    /// Fill value for the unmatched segments, and whether it had to fall back to
    /// zero because nothing was observed.
    pub(crate) fn fill_value(self, observed: &[f64]) -> (f64, bool) {
        match self {
            FillPolicy::Zero => (0.0, false),
            FillPolicy::Median => match median(observed) {
                Some(value) => (value, false),
                None => (0.0, true),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_policy_uses_observed_values() {
        assert_eq!(FillPolicy::Median.fill_value(&[0.1, 0.9, 0.2]), (0.2, false));
    }

    #[test]
    fn median_of_nothing_falls_back_to_zero() {
        assert_eq!(FillPolicy::Median.fill_value(&[]), (0.0, true));
    }

    #[test]
    fn zero_policy_ignores_observations() {
        assert_eq!(FillPolicy::Zero.fill_value(&[5.0]), (0.0, false));
    }
}
