//! Space-partitioning trees over a training sample.
//!
//! Both tree kinds share one arena layout: nodes live in a `Vec` in preorder,
//! the root is node 0, and every node owns a contiguous range of the
//! tree-ordered points. The input points are permuted into that order once
//! the build finishes, and `index` maps each tree position back to the
//! caller's sample index.

pub mod ball_tree;
pub mod kd_tree;
pub mod region;

pub use region::BoundingRegion;

use crate::common_types::{Coordinate, PointSet};
use crate::error::{Error, Result};
use crate::kde::metric::DistanceMetric;
use log::{debug, trace};
use std::fmt;
use std::ops::Range;

/// Subtrees at least this large build their two halves in parallel.
pub(crate) const PARALLEL_BUILD_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TreeKind {
    /// Axis-aligned boxes, split at the midpoint of the widest dimension.
    #[default]
    KdTree,
    /// Metric balls, split around two far-apart seed points.
    BallTree,
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeKind::KdTree => f.write_str("kd-tree"),
            TreeKind::BallTree => f.write_str("ball tree"),
        }
    }
}

/// Position of a node in its tree's arena.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    region: BoundingRegion,
    start: usize,
    end: usize,
    children: Option<(NodeId, NodeId)>,
}

impl Node {
    pub fn region(&self) -> &BoundingRegion {
        &self.region
    }

    /// Tree positions of the points under this node.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn count(&self) -> usize {
        self.end - self.start
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
struct BuildSpec {
    kind: TreeKind,
    metric: DistanceMetric,
    leaf_size: usize,
    parallel_threshold: usize,
}

impl BuildSpec {
    fn region_for<F: Coordinate>(&self, points: &PointSet<F>, indices: &[usize]) -> BoundingRegion {
        match self.kind {
            TreeKind::KdTree => BoundingRegion::bounding_box(points, indices),
            TreeKind::BallTree => BoundingRegion::bounding_ball(points, indices, self.metric),
        }
    }

    fn split<F: Coordinate>(
        &self,
        points: &PointSet<F>,
        indices: &mut [usize],
        region: &BoundingRegion,
    ) -> usize {
        match self.kind {
            TreeKind::KdTree => kd_tree::split(points, indices, region),
            TreeKind::BallTree => ball_tree::split(points, indices, self.metric),
        }
    }
}

/// An immutable tree over a fixed sample set.
#[derive(Debug, Clone)]
pub struct SpatialTree<F> {
    points: PointSet<F>,
    index: Vec<usize>,
    nodes: Vec<Node>,
    kind: TreeKind,
    metric: DistanceMetric,
    leaf_size: usize,
}

impl<F: Coordinate> SpatialTree<F> {
    pub const ROOT: NodeId = 0;

    /// Builds a tree of `kind` over `points`. Leaves hold at most `leaf_size`
    /// points; ball radii are measured with `metric`.
    pub fn build(
        points: PointSet<F>,
        kind: TreeKind,
        metric: DistanceMetric,
        leaf_size: usize,
    ) -> Result<Self> {
        Self::build_with_threshold(points, kind, metric, leaf_size, PARALLEL_BUILD_THRESHOLD)
    }

    pub fn from_rows(
        rows: &[Vec<F>],
        kind: TreeKind,
        metric: DistanceMetric,
        leaf_size: usize,
    ) -> Result<Self> {
        Self::build(PointSet::from_rows(rows)?, kind, metric, leaf_size)
    }

    fn build_with_threshold(
        points: PointSet<F>,
        kind: TreeKind,
        metric: DistanceMetric,
        leaf_size: usize,
        parallel_threshold: usize,
    ) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidArgument(
                "cannot build a tree over an empty sample set".to_string(),
            ));
        }
        if leaf_size == 0 {
            return Err(Error::InvalidArgument("leaf_size must be at least 1".to_string()));
        }

        let spec = BuildSpec {
            kind,
            metric,
            leaf_size,
            parallel_threshold,
        };
        let mut index: Vec<usize> = (0..points.len()).collect();
        let nodes = build_subtree(&points, &mut index, 0, spec);
        let points = points.gather(&index);

        let tree = SpatialTree {
            points,
            index,
            nodes,
            kind,
            metric,
            leaf_size,
        };
        debug!(
            "built {} over {} points: {} nodes, {} leaves, depth {}",
            kind,
            tree.num_points(),
            tree.nodes.len(),
            tree.leaves().count(),
            tree.depth()
        );
        Ok(tree)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> &Node {
        &self.nodes[Self::ROOT]
    }

    /// Points in tree order; node ranges index into this set.
    pub fn points(&self) -> &PointSet<F> {
        &self.points
    }

    /// Caller's sample index of the point at tree position `position`.
    pub fn original_index(&self, position: usize) -> usize {
        self.index[position]
    }

    pub fn index_map(&self) -> &[usize] {
        &self.index
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn dim(&self) -> usize {
        self.points.dim()
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Number of levels; a single-leaf tree has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(Self::ROOT, 1)];
        while let Some((id, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let Some((left, right)) = self.nodes[id].children {
                stack.push((left, level + 1));
                stack.push((right, level + 1));
            }
        }
        deepest
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_leaf())
    }
}

/// Builds the subtree over `indices` into a fresh arena rooted at 0.
/// `offset` is the tree position of `indices[0]`.
fn build_subtree<F: Coordinate>(
    points: &PointSet<F>,
    indices: &mut [usize],
    offset: usize,
    spec: BuildSpec,
) -> Vec<Node> {
    let mut nodes = Vec::with_capacity(2 * indices.len() / spec.leaf_size + 1);
    build_into(points, indices, offset, spec, &mut nodes);
    nodes
}

fn build_into<F: Coordinate>(
    points: &PointSet<F>,
    indices: &mut [usize],
    offset: usize,
    spec: BuildSpec,
    nodes: &mut Vec<Node>,
) -> NodeId {
    let len = indices.len();
    let region = spec.region_for(points, indices);
    let id = nodes.len();

    if len <= spec.leaf_size {
        nodes.push(Node {
            region,
            start: offset,
            end: offset + len,
            children: None,
        });
        return id;
    }

    let mid = spec.split(points, indices, &region);
    trace!("node {id}: {len} points split {mid} / {}", len - mid);
    nodes.push(Node {
        region,
        start: offset,
        end: offset + len,
        children: None,
    });

    let (left_half, right_half) = indices.split_at_mut(mid);
    let (left, right) = if len >= spec.parallel_threshold {
        let (left_nodes, right_nodes) = rayon::join(
            || build_subtree(points, left_half, offset, spec),
            || build_subtree(points, right_half, offset + mid, spec),
        );
        (splice(nodes, left_nodes), splice(nodes, right_nodes))
    } else {
        let left = build_into(points, left_half, offset, spec, nodes);
        let right = build_into(points, right_half, offset + mid, spec, nodes);
        (left, right)
    };

    let (head, descendants) = nodes.split_at_mut(id + 1);
    let parent = &mut head[id];
    parent.children = Some((left, right));
    // A child ball can poke out of the parent's tight radius; grow the
    // parent until it covers both.
    parent.region.cover(&descendants[left - id - 1].region, spec.metric);
    parent.region.cover(&descendants[right - id - 1].region, spec.metric);
    id
}

/// Appends a sub-arena, shifting its child links; returns the new id of its root.
fn splice(nodes: &mut Vec<Node>, sub: Vec<Node>) -> NodeId {
    let base = nodes.len();
    nodes.extend(sub.into_iter().map(|mut node| {
        node.children = node.children.map(|(l, r)| (l + base, r + base));
        node
    }));
    base
}

/// Moves every index satisfying `pred` to the front, keeping a deterministic
/// order, and returns how many there are.
pub(crate) fn partition_in_place(indices: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut boundary = 0;
    for i in 0..indices.len() {
        if pred(indices[i]) {
            indices.swap(boundary, i);
            boundary += 1;
        }
    }
    boundary
}
