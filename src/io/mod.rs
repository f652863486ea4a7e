//! Reading and writing, organized by format.
//!
//! - `geojson` - road networks and stage artifacts
//! - `csv` - risk-layer tables, the per-segment table, proxy tables
//! - `fs` - output path checks and atomic writes shared by every format

pub(crate) mod csv;
pub(crate) mod fs;
pub(crate) mod geojson;

pub use csv::{read_layer, write_proxy, write_segments, LayerRead};
pub use fs::{assert_not_stdout, check_overwrite};
pub use geojson::{read_network, write_network};
