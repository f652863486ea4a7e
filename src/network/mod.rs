mod attributes;
mod highway;
mod network;
mod segment;

pub use attributes::{
    AccidentAttributes, ComplexityAttributes, DistressAttributes, HotspotAttributes, RiskAttributes, Stage,
};
pub use highway::{HighwayClass, HighwayKind};
pub use network::{RoadNetwork, SourceFeature};
pub use segment::RoadSegment;
