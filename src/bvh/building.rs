use index_vec::IndexVec;
use ordered_float::OrderedFloat;

use crate::{
    geometry::{WorldBox, WorldPoint},
    scene::Primitive,
};

use super::{Bvh, BvhNode, LEAF_MAX_PRIMITIVES, NodeIdx, PrimitiveRange};

/// Below this depth only median splits are used, which bounds the total tree depth
/// to `MEDIAN_ONLY_DEPTH + 32` for any primitive count that fits into u32.
const MEDIAN_ONLY_DEPTH: usize = 24;

impl Bvh {
    /// Builds the hierarchy over all primitives of a mesh.
    pub fn build(primitives: &[Primitive]) -> Bvh {
        assert!(primitives.len() <= u32::MAX as usize);

        let mut bvh = Bvh {
            nodes: IndexVec::with_capacity(primitives.len().saturating_mul(2)),
            primitive_indices: (0..primitives.len() as u32).collect(),
        };

        if !primitives.is_empty() {
            let mut indices = std::mem::take(&mut bvh.primitive_indices);
            bvh.build_recursive(primitives, &mut indices, 0, 0);
            bvh.primitive_indices = indices;
        }

        let statistics = bvh.statistics();
        log::debug!(
            "Built BVH over {} primitives: {} nodes, depth {}, leaf fill {}",
            primitives.len(),
            bvh.nodes.len(),
            statistics.depth,
            statistics.leaf_fill
        );

        bvh
    }

    fn build_recursive(
        &mut self,
        primitives: &[Primitive],
        indices: &mut [u32],
        first: usize,
        depth: usize,
    ) -> NodeIdx {
        let bounds = indices.iter().fold(WorldBox::empty(), |acc, i| {
            acc.union(primitives[*i as usize].bounds())
        });

        if indices.len() <= LEAF_MAX_PRIMITIVES {
            return self.nodes.push(BvhNode::Leaf {
                bounds,
                primitives: PrimitiveRange::new(first, indices.len()),
            });
        }

        let split = split_primitives(primitives, indices, &bounds, depth >= MEDIAN_ONLY_DEPTH);

        // Create placeholder node that will be overwriten later, keeps the parent in front of
        // its children
        let node_index = self.nodes.push(BvhNode::Leaf {
            bounds,
            primitives: PrimitiveRange::default(),
        });

        let (left, right) = indices.split_at_mut(split);
        let left = self.build_recursive(primitives, left, first, depth + 1);
        let right = self.build_recursive(primitives, right, first + split, depth + 1);

        self.nodes[node_index] = BvhNode::Inner {
            bounds,
            children: [left, right],
        };
        node_index
    }
}

/// Reorders the primitive indices and returns the position where they should be split.
/// Both halves are always non-empty.
fn split_primitives(
    primitives: &[Primitive],
    indices: &mut [u32],
    bounds: &WorldBox,
    median_only: bool,
) -> usize {
    debug_assert!(indices.len() > 1);

    let centroid = |i: &u32| primitives[*i as usize].centroid();

    let mut centroid_bounds = WorldBox::empty();
    for i in indices.iter() {
        centroid_bounds.grow(&centroid(i));
    }

    let centroid_size = centroid_bounds.size();
    let axis = if centroid_size.x.max(centroid_size.y).max(centroid_size.z) > 0.0 {
        centroid_bounds.largest_axis()
    } else {
        bounds.largest_axis()
    };

    if !median_only {
        let split_value = centroid_bounds.center()[axis];
        let split = itertools::partition(indices.iter_mut(), |i| centroid(i)[axis] <= split_value);
        if split > 0 && split < indices.len() {
            return split;
        }
    }

    median_split(indices, axis, centroid)
}

/// Splits at the median centroid along the axis.
/// Ties are broken by primitive index, so the result doesn't depend on the input order.
fn median_split(indices: &mut [u32], axis: usize, centroid: impl Fn(&u32) -> WorldPoint) -> usize {
    let mid = indices.len() / 2;
    indices.select_nth_unstable_by_key(mid, |i| (OrderedFloat(centroid(i)[axis]), *i));
    mid
}
