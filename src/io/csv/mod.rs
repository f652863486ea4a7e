//! CSV format reading and writing operations.

pub(crate) mod read;
mod write;

pub use read::{read_layer, LayerRead};
pub use write::{write_proxy, write_segments};
