use std::fmt;

/// Index of a node in a [`Skeleton`](super::Skeleton).
///
/// Nodes are stored in topological order, so a parent's id is always
/// smaller than any of its descendants'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The root node. Every valid skeleton has one.
    pub const ROOT: NodeId = NodeId(0);

    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Skinning slot of a bone; this is the value vertices store in their
/// bone index attribute and the position in the bone palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneIndex(pub(crate) u32);

impl BoneIndex {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for BoneIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bone#{}", self.0)
    }
}
