use std::fmt::Display;

use thiserror::Error;

use crate::{scene::Primitive, util::Stats};

use super::{Bvh, BvhNode, NodeIdx};

#[derive(Clone, Debug, Default)]
pub struct BvhStatistics {
    /// Depth of leaves, root only tree has depth 1
    pub depth: Stats,
    /// Primitive counts of leaves
    pub leaf_fill: Stats,
    pub inner_count: usize,
}

impl Display for BvhStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "depth: {}, leaf fill: {}, {} inner nodes",
            self.depth, self.leaf_fill, self.inner_count
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnclosureError {
    #[error("Node {node:?} doesn't enclose its child {child:?}")]
    Child { node: NodeIdx, child: NodeIdx },

    #[error("Leaf {node:?} doesn't enclose primitive {primitive}")]
    Primitive { node: NodeIdx, primitive: u32 },
}

impl Bvh {
    pub fn statistics(&self) -> BvhStatistics {
        BvhStatistics {
            depth: self.leaf_depths().into_iter().collect(),
            leaf_fill: self
                .nodes
                .iter()
                .filter_map(|node| match node {
                    BvhNode::Leaf { primitives, .. } => Some(primitives.len()),
                    BvhNode::Inner { .. } => None,
                })
                .collect(),
            inner_count: self
                .nodes
                .iter()
                .filter(|node| matches!(node, BvhNode::Inner { .. }))
                .count(),
        }
    }

    /// Number of levels of the tree, 0 for empty tree.
    pub fn depth(&self) -> usize {
        self.leaf_depths().into_iter().max().unwrap_or(0)
    }

    fn leaf_depths(&self) -> Vec<usize> {
        let mut depths = Vec::new();
        if self.is_empty() {
            return depths;
        }

        let mut stack = vec![(NodeIdx::from_raw(0), 1)];
        while let Some((node, depth)) = stack.pop() {
            match &self.nodes[node] {
                BvhNode::Leaf { .. } => depths.push(depth),
                BvhNode::Inner { children, .. } => {
                    stack.extend(children.iter().map(|&child| (child, depth + 1)));
                }
            }
        }
        depths
    }

    /// Verifies that every node's box encloses its children or its primitives.
    pub fn check_enclosure(&self, primitives: &[Primitive]) -> Result<(), EnclosureError> {
        for (node, content) in self.nodes.iter_enumerated() {
            match content {
                BvhNode::Leaf {
                    bounds,
                    primitives: range,
                } => {
                    for primitive in &self.primitive_indices[range.into_range()] {
                        if !bounds.encloses(primitives[*primitive as usize].bounds()) {
                            return Err(EnclosureError::Primitive {
                                node,
                                primitive: *primitive,
                            });
                        }
                    }
                }
                BvhNode::Inner { bounds, children } => {
                    for child in children {
                        if !bounds.encloses(self.nodes[*child].bounds()) {
                            return Err(EnclosureError::Child {
                                node,
                                child: *child,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
