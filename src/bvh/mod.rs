//! Binary bounding volume hierarchy over the primitives of one mesh.
//!
//! Nodes live in a flat arena and reference their children by index, leaves reference
//! a contiguous range of a permutation of the mesh's primitive indices. Neither nodes
//! nor the permutation hold pointers, so the whole structure can be copied to the
//! device as plain arrays.

pub(crate) mod building;
mod statistics;
mod traversal;

use index_vec::IndexVec;

use crate::{geometry::WorldBox, scene::Primitive};

pub use statistics::{BvhStatistics, EnclosureError};
pub use traversal::{BvhView, Hit, MAX_TRAVERSAL_DEPTH, intersect_primitives};

/// Nodes with this many primitives or less are not split.
pub const LEAF_MAX_PRIMITIVES: usize = 2;

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

/// Half open range of indices into `Bvh::primitive_indices`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveRange {
    pub start: u32,
    pub end: u32,
}

impl PrimitiveRange {
    pub fn new(start: usize, count: usize) -> PrimitiveRange {
        PrimitiveRange {
            start: start as u32,
            end: (start + count) as u32,
        }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn into_range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BvhNode {
    Leaf {
        bounds: WorldBox,
        primitives: PrimitiveRange,
    },
    Inner {
        bounds: WorldBox,
        children: [NodeIdx; 2],
    },
}

impl BvhNode {
    pub fn bounds(&self) -> &WorldBox {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Inner { bounds, .. } => bounds,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Bvh {
    /// Root is the first node, empty for meshes without primitives.
    nodes: IndexVec<NodeIdx, BvhNode>,
    /// Permutation of primitive indices of the mesh, leaves reference ranges of this.
    primitive_indices: Vec<u32>,
}

impl Bvh {
    pub fn nodes(&self) -> &IndexVec<NodeIdx, BvhNode> {
        &self.nodes
    }

    pub fn primitive_indices(&self) -> &[u32] {
        &self.primitive_indices
    }

    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.as_raw_slice().first()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bounds(&self) -> WorldBox {
        self.root().map_or_else(WorldBox::empty, |root| *root.bounds())
    }

    /// Traversable view of this BVH, `primitives` must be the primitives it was built from.
    pub fn view<'a>(&'a self, primitives: &'a [Primitive]) -> BvhView<'a> {
        BvhView::new(
            self.nodes.as_raw_slice(),
            &self.primitive_indices,
            primitives,
        )
    }
}
