use geo::{BoundingRect, Distance, Euclidean, MultiLineString, Point};
use rstar::{primitives::{GeomWithData, Rectangle}, RTree, AABB};

/// Envelope of one polyline, tagged with its position in the index.
type Envelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// R-tree over projected segment polylines for radius-bounded nearest lookups.
#[derive(Debug)]
pub(crate) struct SegmentIndex<'a> {
    shapes: Vec<&'a MultiLineString<f64>>,
    rtree: RTree<Envelope>,
}

impl<'a> SegmentIndex<'a> {
    /// Index the given polylines. Candidate indices refer to positions in `shapes`.
    pub(crate) fn new(shapes: Vec<&'a MultiLineString<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| {
                        let rect = shape.bounding_rect()?;
                        Some(Envelope::new(Rectangle::from_corners(rect.min().into(), rect.max().into()), i))
                    })
                    .collect()
            ),
            shapes,
        }
    }

    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Every polyline whose Euclidean distance to `point` is at most `radius`,
    /// paired with that distance. Order is unspecified.
    pub(crate) fn within(&self, point: Point<f64>, radius: f64) -> impl Iterator<Item = (usize, f64)> + '_ {
        let envelope = AABB::from_corners(
            [point.x() - radius, point.y() - radius],
            [point.x() + radius, point.y() + radius],
        );

        self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(move |env| (env.data, distance_to_lines(&point, self.shapes[env.data])))
            .filter(move |&(_, dist)| dist <= radius)
    }
}

/// Shortest distance from a point to any part of a polyline.
pub(crate) fn distance_to_lines(point: &Point<f64>, lines: &MultiLineString<f64>) -> f64 {
    lines.0.iter()
        .map(|line| Euclidean.distance(point, line))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    fn horizontal(y: f64) -> MultiLineString<f64> {
        MultiLineString::new(vec![line_string![(x: 0.0, y: y), (x: 100.0, y: y)]])
    }

    #[test]
    fn point_to_polyline_distance() {
        let line = horizontal(0.0);
        assert_eq!(distance_to_lines(&Point::new(50.0, 20.0), &line), 20.0);
        assert_eq!(distance_to_lines(&Point::new(130.0, 40.0), &line), 50.0); // past the end
    }

    #[test]
    fn within_filters_by_exact_distance() {
        let a = horizontal(0.0);
        let b = horizontal(60.0);
        let index = SegmentIndex::new(vec![&a, &b]);

        let mut hits = index.within(Point::new(50.0, 29.9), 30.0).collect::<Vec<_>>();
        hits.sort_by_key(|&(i, _)| i);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);

        // Envelope hit at the corner is rejected by the true distance.
        assert_eq!(index.within(Point::new(125.0, 25.0), 30.0).count(), 0);
    }

    #[test]
    fn radius_is_inclusive() {
        let a = horizontal(0.0);
        let index = SegmentIndex::new(vec![&a]);
        assert_eq!(index.within(Point::new(10.0, 30.0), 30.0).count(), 1);
    }
}
