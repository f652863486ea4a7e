use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::layers::RiskLayerRecord;
use crate::score::stats::sample_std;

/// Readable distress band of a segment's mean distress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DistressClass {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl DistressClass {
    /// Upper bounds (inclusive) of each band; the first band also includes 0.
    const BREAKS: [(f64, DistressClass); 5] = [
        (0.03, DistressClass::Excellent),
        (0.07, DistressClass::Good),
        (0.12, DistressClass::Fair),
        (0.20, DistressClass::Poor),
        (1.00, DistressClass::Critical),
    ];

    /// Band of `distress`, or `None` outside [0, 1].
    pub fn from_distress(distress: f64) -> Option<Self> {
        if !(0.0..=1.0).contains(&distress) { return None }
        Self::BREAKS.iter()
            .find(|(upper, _)| distress <= *upper)
            .map(|&(_, class)| class)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DistressClass::Excellent => "Excellent",
            DistressClass::Good => "Good",
            DistressClass::Fair => "Fair",
            DistressClass::Poor => "Poor",
            DistressClass::Critical => "Critical",
        }
    }
}

/// Per-key summary of the distress samples of one segment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DistressAggregate {
    pub(crate) mean: f64,
    pub(crate) max: f64,
    pub(crate) std: Option<f64>,
    pub(crate) sample_count: u32,
}

/// Group keyed records and summarize each group.
///
/// Rows carrying a `sample_count` weight contribute that many samples to the
/// mean and to the count; rows without one count once. Records with a
/// non-finite value are skipped and returned as the second element.
pub(crate) fn aggregate_by_key(records: &[RiskLayerRecord]) -> (AHashMap<&str, DistressAggregate>, usize) {
    let mut groups: AHashMap<&str, Vec<(f64, f64)>> = AHashMap::new();
    let mut invalid = 0;

    for record in records {
        match record.segment_key() {
            Some(key) if record.value.is_finite() => {
                let weight = record.weight.filter(|w| w.is_finite() && *w > 0.0).unwrap_or(1.0);
                groups.entry(key).or_default().push((record.value, weight));
            }
            _ => invalid += 1,
        }
    }

    let aggregates = groups.into_iter()
        .map(|(key, samples)| {
            let total = samples.iter().map(|(_, w)| w).sum::<f64>();
            let mean = samples.iter().map(|(v, w)| v * w).sum::<f64>() / total;
            let max = samples.iter().map(|(v, _)| *v).fold(f64::NEG_INFINITY, f64::max);
            let values = samples.iter().map(|(v, _)| *v).collect::<Vec<_>>();
            (key, DistressAggregate { mean, max, std: sample_std(&values), sample_count: total.round() as u32 })
        })
        .collect();

    (aggregates, invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distress_bands_are_right_closed() {
        assert_eq!(DistressClass::from_distress(0.0), Some(DistressClass::Excellent));
        assert_eq!(DistressClass::from_distress(0.03), Some(DistressClass::Excellent));
        assert_eq!(DistressClass::from_distress(0.031), Some(DistressClass::Good));
        assert_eq!(DistressClass::from_distress(0.12), Some(DistressClass::Fair));
        assert_eq!(DistressClass::from_distress(0.2), Some(DistressClass::Poor));
        assert_eq!(DistressClass::from_distress(0.5), Some(DistressClass::Critical));
        assert_eq!(DistressClass::from_distress(1.5), None);
        assert_eq!(DistressClass::from_distress(f64::NAN), None);
    }

    #[test]
    fn aggregates_mean_max_count_per_key() {
        let records = vec![
            RiskLayerRecord::distress("a", 0.1, None),
            RiskLayerRecord::distress("a", 0.3, None),
            RiskLayerRecord::distress("b", 0.05, None),
            RiskLayerRecord::distress("b", f64::NAN, None),
        ];
        let (groups, invalid) = aggregate_by_key(&records);

        assert_eq!(invalid, 1);
        let a = &groups["a"];
        assert!((a.mean - 0.2).abs() < 1e-12);
        assert_eq!(a.max, 0.3);
        assert_eq!(a.sample_count, 2);
        assert!((a.std.unwrap() - 0.141_421_356).abs() < 1e-8);

        let b = &groups["b"];
        assert_eq!(b.sample_count, 1);
        assert_eq!(b.std, None);
    }

    #[test]
    fn sample_counts_weight_the_mean() {
        let records = vec![
            RiskLayerRecord::distress("a", 0.1, Some(3.0)),
            RiskLayerRecord::distress("a", 0.5, Some(1.0)),
        ];
        let (groups, _) = aggregate_by_key(&records);
        assert!((groups["a"].mean - 0.2).abs() < 1e-12);
        assert_eq!(groups["a"].sample_count, 4);
    }
}
