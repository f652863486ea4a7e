#![doc = "Road-segment risk fusion, scoring and hotspot analysis"]
mod config;
mod geom;
mod graph;
mod hotspot;
mod io;
mod join;
mod layers;
mod network;
mod pipeline;
mod proxy;
mod score;

#[doc(inline)]
pub use config::{HotspotConfig, JoinConfig, LayerWeights, ProjectionConfig, ProxyConfig, RiskConfig, ScoringConfig};

#[doc(inline)]
pub use geom::Projector;

#[doc(inline)]
pub use graph::{SpatialWeights, SpatialWeightsBuilder};

#[doc(inline)]
pub use hotspot::{
    analyze as analyze_hotspots, normal_cdf, normal_pvalue, GiStar, GiStarField, HotspotClass, HotspotClassifier,
    HotspotReport, LocalAutocorrelationEngine,
};

#[doc(inline)]
pub use io::{assert_not_stdout, check_overwrite, read_layer, read_network, write_network, write_proxy, write_segments, LayerRead};

#[doc(inline)]
pub use join::{DistressClass, FillPolicy, JoinReport, SpatialJoinEngine};

#[doc(inline)]
pub use layers::{LayerTag, RecordLocator, RiskLayer, RiskLayerRecord};

#[doc(inline)]
pub use network::{
    AccidentAttributes, ComplexityAttributes, DistressAttributes, HighwayClass, HighwayKind, HotspotAttributes,
    RiskAttributes, RoadNetwork, RoadSegment, SourceFeature, Stage,
};

#[doc(inline)]
pub use pipeline::{
    ComplexitySource, Condition, Distribution, FileHash, Manifest, Pipeline, PipelineInputs, RunDiagnostics,
    RunOutcome, DIAGNOSTICS_NAME, MANIFEST_NAME, PROXY_NAME, SEGMENTS_NAME,
};

#[doc(inline)]
pub use proxy::{generate as generate_proxy, to_layer as proxy_layer, ProxyScenario};

#[doc(inline)]
pub use score::{stats, MinMaxScaler, RiskFactor, RiskNormalizer, RiskTier, ScoringReport, TierBreaks};
