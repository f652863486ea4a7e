use geo::Point;
use rayon::prelude::*;

use crate::geom::SegmentIndex;

/// For each point, the index of the nearest polyline within `radius` (inclusive),
/// or `None` when every polyline is farther away.
///
/// Equal distances resolve to the segment with the lowest id.
pub(crate) fn nearest_within(
    index: &SegmentIndex<'_>,
    ids: &[&str],
    points: &[Point<f64>],
    radius: f64,
) -> Vec<Option<usize>> {
    debug_assert_eq!(index.len(), ids.len());

    points.par_iter()
        .map(|&point| {
            index.within(point, radius)
                .min_by(|&(a, da), &(b, db)| da.total_cmp(&db).then_with(|| ids[a].cmp(ids[b])))
                .map(|(idx, _)| idx)
        })
        .collect()
}
