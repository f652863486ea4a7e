use serde::{Deserialize, Serialize};

/// The input layer contributing most to a segment's composite score.
///
/// Variant order is the tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskFactor {
    #[serde(rename = "Surface Condition")]
    Surface,
    #[serde(rename = "Behavioral Complexity")]
    Behavior,
    #[serde(rename = "Accident History")]
    Accidents,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 3] = [RiskFactor::Surface, RiskFactor::Behavior, RiskFactor::Accidents];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskFactor::Surface => "Surface Condition",
            RiskFactor::Behavior => "Behavioral Complexity",
            RiskFactor::Accidents => "Accident History",
        }
    }

    /// Factor with the strictly largest weighted contribution, given in
    /// (surface, behavior, accidents) order. Ties keep the earlier factor.
    pub fn dominant(contributions: [f64; 3]) -> Self {
        let mut best = (RiskFactor::Surface, contributions[0]);
        for (factor, value) in Self::ALL.into_iter().zip(contributions).skip(1) {
            if value > best.1 {
                best = (factor, value);
            }
        }
        best.0
    }
}
