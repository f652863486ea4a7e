use std::sync::Arc;

/// A row-standardized spatial weights graph in compressed sparse row format.
///
/// Rows are indexed like the segments of the network they were built from.
/// Neighbor lists are sorted by index and never contain the row itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialWeights {
    size: usize,
    ids: Vec<Arc<str>>,
    offsets: Vec<u32>,
    edges: Vec<u32>,
    edge_weights: Vec<f64>,
}

impl SpatialWeights {
    /// Construct the graph from per-node adjacency lists and matching weights.
    pub(crate) fn new(ids: Vec<Arc<str>>, edges: &[Vec<u32>], edge_weights: &[Vec<f64>]) -> Self {
        let num_nodes = ids.len();
        assert!(edges.len() == num_nodes, "edges.len() must equal num_nodes");
        assert!(edge_weights.len() == num_nodes, "edge_weights.len() must equal num_nodes");
        edges.iter().zip(edge_weights.iter()).enumerate().for_each(|(i, (edges, weights))| {
            assert!(edges.len() == weights.len(), "edges[{i}].len() must equal edge_weights[{i}].len()");
        });

        Self {
            size: num_nodes,
            ids,
            offsets: std::iter::once(0u32).chain(
                edges.iter()
                    .map(|v| v.len() as u32)
                    .scan(0u32, |acc, len| {*acc += len; Some(*acc)})
            ).collect::<Vec<u32>>(),
            edges: edges.iter().flatten().copied().collect(),
            edge_weights: edge_weights.iter().flatten().copied().collect(),
        }
    }

    /// Number of segments (rows).
    #[inline] pub fn node_count(&self) -> usize { self.size }

    /// Number of directed neighbor entries.
    #[inline] pub fn edge_count(&self) -> usize { self.edges.len() }

    /// Segment id of a row.
    #[inline] pub fn id(&self, node: usize) -> &str { &self.ids[node] }

    #[inline]
    fn range(&self, node: usize) -> std::ops::Range<usize> {
        self.offsets[node] as usize .. self.offsets[node + 1] as usize
    }

    /// Number of neighbors of a given row.
    #[inline] pub fn degree(&self, node: usize) -> usize { self.range(node).len() }

    /// Get an iterator over the neighbors of a given row.
    #[inline]
    pub fn edges(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.range(node).map(move |v| self.edges[v] as usize)
    }

    /// Get an iterator over the neighbors and weights of a given row.
    #[inline]
    pub fn edges_with_weights(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.range(node).map(move |v| (self.edges[v] as usize, self.edge_weights[v]))
    }

    /// Neighbor ids and weights of the segment `id`, in row order.
    pub fn neighbors_of<'a>(&'a self, id: &str) -> Option<impl Iterator<Item = (&'a str, f64)> + 'a> {
        let node = self.ids.iter().position(|candidate| &**candidate == id)?;
        Some(self.edges_with_weights(node).map(move |(j, w)| (&*self.ids[j], w)))
    }

    /// Sum of a row's weights: 1.0 for rows with neighbors, 0.0 for islands.
    #[inline]
    pub fn row_sum(&self, node: usize) -> f64 {
        self.range(node).map(|v| self.edge_weights[v]).sum()
    }

    /// Weight the star variant of Gi* gives a row to itself: the row's total
    /// neighbor weight, i.e. a unit diagonal added before row standardization.
    /// Zero for islands.
    #[inline]
    pub fn star_self_weight(&self, node: usize) -> f64 {
        self.row_sum(node)
    }

    /// Rows without any neighbor.
    pub fn islands(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.size).filter(|&node| self.degree(node) == 0)
    }

    /// Mean number of neighbors per row.
    pub fn mean_degree(&self) -> f64 {
        if self.size == 0 { 0.0 } else { self.edge_count() as f64 / self.size as f64 }
    }
}
