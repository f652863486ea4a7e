mod graph;
mod weights;

pub use graph::SpatialWeights;
pub use weights::SpatialWeightsBuilder;
