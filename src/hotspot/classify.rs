use serde::{Deserialize, Serialize};

/// Seven ordered hotspot categories, hottest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HotspotClass {
    #[serde(rename = "Hot Spot (99%)")]
    Hot99,
    #[serde(rename = "Hot Spot (95%)")]
    Hot95,
    #[serde(rename = "Hot Spot (90%)")]
    Hot90,
    #[serde(rename = "Not Significant")]
    NotSignificant,
    #[serde(rename = "Cold Spot (90%)")]
    Cold90,
    #[serde(rename = "Cold Spot (95%)")]
    Cold95,
    #[serde(rename = "Cold Spot (99%)")]
    Cold99,
}

impl HotspotClass {
    pub const ALL: [HotspotClass; 7] = [
        HotspotClass::Hot99,
        HotspotClass::Hot95,
        HotspotClass::Hot90,
        HotspotClass::NotSignificant,
        HotspotClass::Cold90,
        HotspotClass::Cold95,
        HotspotClass::Cold99,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HotspotClass::Hot99 => "Hot Spot (99%)",
            HotspotClass::Hot95 => "Hot Spot (95%)",
            HotspotClass::Hot90 => "Hot Spot (90%)",
            HotspotClass::NotSignificant => "Not Significant",
            HotspotClass::Cold90 => "Cold Spot (90%)",
            HotspotClass::Cold95 => "Cold Spot (95%)",
            HotspotClass::Cold99 => "Cold Spot (99%)",
        }
    }

    #[inline] pub fn is_hot(self) -> bool { self < HotspotClass::NotSignificant }

    #[inline] pub fn is_cold(self) -> bool { self > HotspotClass::NotSignificant }
}

/// Maps `(z, p)` pairs to hotspot categories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotspotClassifier {
    /// Significance levels for the 99%, 95% and 90% classes, ascending.
    levels: [f64; 3],
}

impl Default for HotspotClassifier {
    fn default() -> Self {
        Self { levels: [0.01, 0.05, 0.10] }
    }
}

impl HotspotClassifier {
    pub fn new(levels: [f64; 3]) -> Self {
        Self { levels }
    }

    /// Most confident class whose level admits `p`, signed by `z`.
    /// Undefined or zero `z` (and undefined `p`) is never significant.
    pub fn classify(&self, z: Option<f64>, p: Option<f64>) -> HotspotClass {
        const HOT: [HotspotClass; 3] = [HotspotClass::Hot99, HotspotClass::Hot95, HotspotClass::Hot90];
        const COLD: [HotspotClass; 3] = [HotspotClass::Cold99, HotspotClass::Cold95, HotspotClass::Cold90];

        let (Some(z), Some(p)) = (z, p) else { return HotspotClass::NotSignificant };
        if !z.is_finite() || !p.is_finite() || z == 0.0 { return HotspotClass::NotSignificant }

        let classes = if z > 0.0 { HOT } else { COLD };
        self.levels.iter()
            .zip(classes)
            .find(|(level, _)| p <= **level)
            .map_or(HotspotClass::NotSignificant, |(_, class)| class)
    }
}

/// Standard normal CDF, Abramowitz & Stegun 26.2.17 (error < 7.5e-8).
pub fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 { return 0.0; }
    if x > 8.0 { return 1.0; }

    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989422804014327; // 1/sqrt(2*pi)
    let p = d * (-x * x / 2.0).exp()
        * (t * (0.3193815
            + t * (-0.3565638
                + t * (1.781478
                    + t * (-1.821256
                        + t * 1.330274)))));

    if x > 0.0 { 1.0 - p } else { p }
}

/// Two-sided normal-approximation p-value of a z-score.
#[inline]
pub fn normal_pvalue(z: f64) -> f64 {
    (2.0 * normal_cdf(-z.abs())).min(1.0)
}
