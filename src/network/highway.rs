use std::str::FromStr;

use serde_json::Value;
use smallvec::SmallVec;

/// Base behavioral complexity for a tag that is not in the table.
pub(crate) const UNKNOWN_COMPLEXITY: f64 = 0.35;

/// OSM `highway` classification of a road segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighwayKind {
    Motorway,
    MotorwayLink,
    Trunk,
    TrunkLink,
    Primary,
    PrimaryLink,
    Secondary,
    SecondaryLink,
    Tertiary,
    TertiaryLink,
    Residential,
    LivingStreet,
    Unclassified,
    Service,
    Pedestrian,
    Cycleway,
    Footway,
    Path,
    Steps,
    Unknown,
}

impl HighwayKind {
    /// Expected agent-interaction density; higher means less predictable traffic.
    pub fn base_complexity(self) -> f64 {
        match self {
            Self::Motorway      => 0.20,
            Self::MotorwayLink  => 0.25,
            Self::Trunk         => 0.30,
            Self::TrunkLink     => 0.30,
            Self::Primary       => 0.70,
            Self::PrimaryLink   => 0.60,
            Self::Secondary     => 0.65,
            Self::SecondaryLink => 0.55,
            Self::Tertiary      => 0.50,
            Self::TertiaryLink  => 0.45,
            Self::Residential   => 0.30,
            Self::LivingStreet  => 0.40,
            Self::Unclassified  => 0.30,
            Self::Service       => 0.35,
            Self::Pedestrian    => 0.80,
            Self::Cycleway      => 0.60,
            Self::Footway       => 0.50,
            Self::Path          => 0.40,
            Self::Steps         => 0.30,
            Self::Unknown       => UNKNOWN_COMPLEXITY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Motorway      => "motorway",
            Self::MotorwayLink  => "motorway_link",
            Self::Trunk         => "trunk",
            Self::TrunkLink     => "trunk_link",
            Self::Primary       => "primary",
            Self::PrimaryLink   => "primary_link",
            Self::Secondary     => "secondary",
            Self::SecondaryLink => "secondary_link",
            Self::Tertiary      => "tertiary",
            Self::TertiaryLink  => "tertiary_link",
            Self::Residential   => "residential",
            Self::LivingStreet  => "living_street",
            Self::Unclassified  => "unclassified",
            Self::Service       => "service",
            Self::Pedestrian    => "pedestrian",
            Self::Cycleway      => "cycleway",
            Self::Footway       => "footway",
            Self::Path          => "path",
            Self::Steps         => "steps",
            Self::Unknown       => "unknown",
        }
    }
}

impl FromStr for HighwayKind {
    type Err = std::convert::Infallible;

    /// Never fails: tags outside the table map to `Unknown`.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(match tag.trim() {
            "motorway"       => Self::Motorway,
            "motorway_link"  => Self::MotorwayLink,
            "trunk"          => Self::Trunk,
            "trunk_link"     => Self::TrunkLink,
            "primary"        => Self::Primary,
            "primary_link"   => Self::PrimaryLink,
            "secondary"      => Self::Secondary,
            "secondary_link" => Self::SecondaryLink,
            "tertiary"       => Self::Tertiary,
            "tertiary_link"  => Self::TertiaryLink,
            "residential"    => Self::Residential,
            "living_street"  => Self::LivingStreet,
            "unclassified"   => Self::Unclassified,
            "service"        => Self::Service,
            "pedestrian"     => Self::Pedestrian,
            "cycleway"       => Self::Cycleway,
            "footway"        => Self::Footway,
            "path"           => Self::Path,
            "steps"          => Self::Steps,
            _                => Self::Unknown,
        })
    }
}

/// Raw `highway` attribute as it appears in source data: some edges carry
/// a single tag, merged edges carry a list.
#[derive(Debug, Clone, PartialEq)]
pub enum HighwayClass {
    Single(HighwayKind),
    Multiple(SmallVec<[HighwayKind; 2]>),
}

impl HighwayClass {
    /// Parse a GeoJSON property value (string or array of strings).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(tag) => Some(Self::Single(parse_kind(tag))),
            Value::Array(items) => {
                let kinds = items.iter()
                    .filter_map(Value::as_str)
                    .map(parse_kind)
                    .collect::<SmallVec<[HighwayKind; 2]>>();
                (!kinds.is_empty()).then_some(Self::Multiple(kinds))
            }
            _ => None,
        }
    }

    /// Collapse to one classification: the kind with the highest base complexity.
    /// Earlier tags win ties.
    pub fn effective(&self) -> HighwayKind {
        match self {
            Self::Single(kind) => *kind,
            Self::Multiple(kinds) => kinds.iter().copied()
                .fold(None, |best: Option<HighwayKind>, kind| match best {
                    Some(b) if b.base_complexity() >= kind.base_complexity() => Some(b),
                    _ => Some(kind),
                })
                .unwrap_or(HighwayKind::Unknown),
        }
    }
}

#[inline]
fn parse_kind(tag: &str) -> HighwayKind {
    tag.parse().unwrap_or(HighwayKind::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_tag_resolves_to_itself() {
        let class = HighwayClass::from_value(&json!("primary")).unwrap();
        assert_eq!(class, HighwayClass::Single(HighwayKind::Primary));
        assert_eq!(class.effective(), HighwayKind::Primary);
    }

    #[test]
    fn list_resolves_to_max_complexity() {
        let class = HighwayClass::from_value(&json!(["residential", "pedestrian", "primary"])).unwrap();
        assert_eq!(class.effective(), HighwayKind::Pedestrian);
    }

    #[test]
    fn unknown_tags_use_default_complexity() {
        let class = HighwayClass::from_value(&json!(["bridleway", "motorway"])).unwrap();
        // bridleway (0.35) beats motorway (0.20)
        assert_eq!(class.effective(), HighwayKind::Unknown);
        assert_eq!(class.effective().base_complexity(), UNKNOWN_COMPLEXITY);
    }

    #[test]
    fn non_string_values_are_absent() {
        assert_eq!(HighwayClass::from_value(&json!(null)), None);
        assert_eq!(HighwayClass::from_value(&json!(3)), None);
        assert_eq!(HighwayClass::from_value(&json!([])), None);
    }

    #[test]
    fn tag_names_round_trip() {
        for tag in ["motorway", "living_street", "steps", "tertiary_link"] {
            assert_eq!(parse_kind(tag).as_str(), tag);
        }
    }
}
