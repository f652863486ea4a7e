mod index;
mod proj;

pub(crate) use index::SegmentIndex;
pub use proj::Projector;
