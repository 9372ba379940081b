//! Static node tree with its bone subset.
//!
//! A skeleton is authored as a [`SkeletonDesc`] (names and child lists, in
//! any order) and validated into a [`Skeleton`] whose nodes are stored in
//! pre-order. Pose evaluation then becomes a single forward pass.

use super::id::{BoneIndex, NodeId};
use crate::error::AssetError;
use crate::math::Mat4;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node name treated as the root-motion carrier when none is given.
pub const DEFAULT_ROOT_MOTION_NODE: &str = "root";

fn default_root_motion_node() -> Option<String> {
    Some(DEFAULT_ROOT_MOTION_NODE.to_string())
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

/// One node of the authored tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeDesc {
    pub name: String,
    #[serde(default)]
    pub children: Vec<String>,
}

/// A skinned bone: node name plus inverse bind matrix (model space to
/// bone space).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoneDesc {
    pub name: String,
    pub offset: Mat4,
}

/// Authoring / interchange form of a skeleton.
///
/// Bone order is significant: the n-th entry of `bones` is skinning slot n.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SkeletonDesc {
    pub nodes: Vec<NodeDesc>,
    #[serde(default)]
    pub bones: Vec<BoneDesc>,
    /// Applied above the root node. Importers use it for axis correction.
    #[serde(default = "identity")]
    pub root_transform: Mat4,
    #[serde(default = "default_root_motion_node")]
    pub root_motion_node: Option<String>,
}

impl SkeletonDesc {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Validated node.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub bone: Option<BoneIndex>,
}

#[derive(Debug, Clone)]
struct Bone {
    node: NodeId,
    offset: Mat4,
    /// Nearest ancestor that is also a bone.
    parent: Option<BoneIndex>,
}

/// Validated, immutable skeleton.
///
/// Invariants: exactly one root at [`NodeId::ROOT`]; nodes in pre-order,
/// so `parent < child` for every edge; each bone names exactly one node.
#[derive(Debug, Clone)]
pub struct Skeleton {
    nodes: Vec<Node>,
    bones: Vec<Bone>,
    by_name: HashMap<String, NodeId>,
    root_transform: Mat4,
    root_motion_node: Option<NodeId>,
}

impl Skeleton {
    pub fn new(desc: SkeletonDesc) -> Result<Self, AssetError> {
        if desc.nodes.is_empty() {
            return Err(AssetError::EmptySkeleton);
        }

        // Authored position of every node.
        let mut authored: HashMap<&str, usize> = HashMap::with_capacity(desc.nodes.len());
        for (i, node) in desc.nodes.iter().enumerate() {
            if authored.insert(node.name.as_str(), i).is_some() {
                return Err(AssetError::DuplicateNode(node.name.clone()));
            }
        }

        let mut has_parent = vec![false; desc.nodes.len()];
        for node in &desc.nodes {
            for child in &node.children {
                let &c = authored
                    .get(child.as_str())
                    .ok_or_else(|| AssetError::UnknownChild {
                        parent: node.name.clone(),
                        child: child.clone(),
                    })?;
                if has_parent[c] {
                    return Err(AssetError::MultipleParents(child.clone()));
                }
                has_parent[c] = true;
            }
        }

        let roots: Vec<usize> = (0..desc.nodes.len()).filter(|&i| !has_parent[i]).collect();
        if roots.len() != 1 {
            return Err(AssetError::RootCount(roots.len()));
        }

        // Pre-order walk. Children are pushed reversed so siblings keep their
        // authored order.
        let mut order: Vec<(usize, Option<NodeId>)> = Vec::with_capacity(desc.nodes.len());
        let mut stack = vec![(roots[0], None)];
        while let Some((i, parent)) = stack.pop() {
            let id = NodeId(order.len() as u32);
            order.push((i, parent));
            for child in desc.nodes[i].children.iter().rev() {
                stack.push((authored[child.as_str()], Some(id)));
            }
        }

        if order.len() != desc.nodes.len() {
            let mut visited = vec![false; desc.nodes.len()];
            for &(i, _) in &order {
                visited[i] = true;
            }
            let lost = visited.iter().position(|v| !v).unwrap_or(0);
            return Err(AssetError::Unreachable(desc.nodes[lost].name.clone()));
        }

        let mut nodes: Vec<Node> = order
            .iter()
            .map(|&(i, parent)| Node {
                name: desc.nodes[i].name.clone(),
                parent,
                children: Vec::new(),
                bone: None,
            })
            .collect();
        for id in 1..nodes.len() {
            if let Some(parent) = nodes[id].parent {
                nodes[parent.index()].children.push(NodeId(id as u32));
            }
        }

        let by_name: HashMap<String, NodeId> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), NodeId(i as u32)))
            .collect();

        let mut bones = Vec::with_capacity(desc.bones.len());
        for (slot, bone) in desc.bones.into_iter().enumerate() {
            let &node = by_name
                .get(&bone.name)
                .ok_or_else(|| AssetError::UnknownBone(bone.name.clone()))?;
            if nodes[node.index()].bone.is_some() {
                return Err(AssetError::DuplicateBone(bone.name));
            }
            nodes[node.index()].bone = Some(BoneIndex(slot as u32));
            bones.push(Bone {
                node,
                offset: bone.offset,
                parent: None,
            });
        }

        for bone in &mut bones {
            let mut cursor = nodes[bone.node.index()].parent;
            while let Some(id) = cursor {
                if let Some(b) = nodes[id.index()].bone {
                    bone.parent = Some(b);
                    break;
                }
                cursor = nodes[id.index()].parent;
            }
        }

        let root_motion_node = desc
            .root_motion_node
            .as_deref()
            .and_then(|name| by_name.get(name).copied());

        log::info!(
            "Loaded skeleton: {} nodes, {} bones",
            nodes.len(),
            bones.len()
        );

        Ok(Self {
            nodes,
            bones,
            by_name,
            root_transform: desc.root_transform,
            root_motion_node,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Self::new(SkeletonDesc::from_json(json)?)
    }

    /// Nodes in topological (pre-order) order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn find_bone(&self, name: &str) -> Option<BoneIndex> {
        self.find_node(name).and_then(|id| self.nodes[id.index()].bone)
    }

    pub fn bone_node(&self, bone: BoneIndex) -> NodeId {
        self.bones[bone.index()].node
    }

    pub fn bone_offset(&self, bone: BoneIndex) -> Mat4 {
        self.bones[bone.index()].offset
    }

    /// Parent in the bone-only hierarchy (helper nodes skipped).
    pub fn bone_parent(&self, bone: BoneIndex) -> Option<BoneIndex> {
        self.bones[bone.index()].parent
    }

    /// Direct children in the bone-only hierarchy.
    pub fn bone_children(&self, bone: BoneIndex) -> impl Iterator<Item = BoneIndex> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.parent == Some(bone))
            .map(|(i, _)| BoneIndex(i as u32))
    }

    pub fn root_transform(&self) -> Mat4 {
        self.root_transform
    }

    pub fn root_motion_node(&self) -> Option<NodeId> {
        self.root_motion_node
    }

    /// Override which node carries root motion, or disable the policy.
    pub fn set_root_motion_node(&mut self, node: Option<NodeId>) {
        self.root_motion_node = node;
    }

    pub fn set_root_transform(&mut self, m: Mat4) {
        self.root_transform = m;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, children: &[&str]) -> NodeDesc {
        NodeDesc {
            name: name.to_string(),
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn bone(name: &str) -> BoneDesc {
        BoneDesc {
            name: name.to_string(),
            offset: Mat4::IDENTITY,
        }
    }

    fn desc(nodes: Vec<NodeDesc>, bones: Vec<BoneDesc>) -> SkeletonDesc {
        SkeletonDesc {
            nodes,
            bones,
            root_transform: Mat4::IDENTITY,
            root_motion_node: default_root_motion_node(),
        }
    }

    #[test]
    fn test_nodes_stored_in_preorder() {
        // Authored out of order on purpose.
        let skeleton = Skeleton::new(desc(
            vec![
                node("hand", &[]),
                node("arm", &["hand"]),
                node("root", &["hips"]),
                node("hips", &["arm", "leg"]),
                node("leg", &[]),
            ],
            vec![bone("hips"), bone("hand")],
        ))
        .unwrap();

        let names: Vec<&str> = skeleton.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["root", "hips", "arm", "hand", "leg"]);
        for (i, n) in skeleton.nodes().iter().enumerate() {
            if let Some(p) = n.parent {
                assert!(p.index() < i, "parent must precede child");
            }
        }
        assert_eq!(skeleton.root_motion_node(), Some(NodeId::ROOT));
    }

    #[test]
    fn test_bone_parent_skips_helper_nodes() {
        let skeleton = Skeleton::new(desc(
            vec![
                node("root", &["hips"]),
                node("hips", &["arm"]),
                node("arm", &["hand"]),
                node("hand", &[]),
            ],
            vec![bone("hand"), bone("hips")],
        ))
        .unwrap();

        let hand = skeleton.find_bone("hand").unwrap();
        let hips = skeleton.find_bone("hips").unwrap();
        assert_eq!(hand, BoneIndex(0));
        assert_eq!(skeleton.bone_parent(hand), Some(hips));
        assert_eq!(skeleton.bone_parent(hips), None);
        assert_eq!(skeleton.bone_children(hips).collect::<Vec<_>>(), [hand]);
        assert!(skeleton.find_bone("arm").is_none());
    }

    #[test]
    fn test_rejects_two_roots() {
        let err = Skeleton::new(desc(vec![node("a", &[]), node("b", &[])], vec![])).unwrap_err();
        assert!(matches!(err, AssetError::RootCount(2)));
    }

    #[test]
    fn test_rejects_cycle() {
        let err = Skeleton::new(desc(
            vec![node("root", &[]), node("a", &["b"]), node("b", &["a"])],
            vec![],
        ))
        .unwrap_err();
        assert!(matches!(err, AssetError::Unreachable(_)));
    }

    #[test]
    fn test_rejects_unknown_and_duplicate_names() {
        let err = Skeleton::new(desc(vec![node("root", &["ghost"])], vec![])).unwrap_err();
        assert!(matches!(err, AssetError::UnknownChild { .. }));

        let err = Skeleton::new(desc(vec![node("root", &[]), node("root", &[])], vec![]))
            .unwrap_err();
        assert!(matches!(err, AssetError::DuplicateNode(_)));

        let err = Skeleton::new(desc(vec![node("root", &[])], vec![bone("spine")])).unwrap_err();
        assert!(matches!(err, AssetError::UnknownBone(_)));

        let err =
            Skeleton::new(desc(vec![node("root", &[])], vec![bone("root"), bone("root")]))
                .unwrap_err();
        assert!(matches!(err, AssetError::DuplicateBone(_)));
    }

    #[test]
    fn test_rejects_shared_child() {
        let err = Skeleton::new(desc(
            vec![node("root", &["a", "b"]), node("a", &["c"]), node("b", &["c"]), node("c", &[])],
            vec![],
        ))
        .unwrap_err();
        assert!(matches!(err, AssetError::MultipleParents(_)));
    }

    #[test]
    fn test_skeleton_from_json() {
        let json = r#"{
            "nodes": [
                { "name": "Armature", "children": ["spine"] },
                { "name": "spine" }
            ],
            "bones": [
                { "name": "spine", "offset": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,-1,0,1] }
            ]
        }"#;

        let skeleton = Skeleton::from_json(json).unwrap();
        assert_eq!(skeleton.node_count(), 2);
        assert_eq!(skeleton.bone_count(), 1);
        let spine = skeleton.find_bone("spine").unwrap();
        assert_eq!(skeleton.bone_offset(spine).w_axis.y, -1.0);
        // No node called "root" here.
        assert_eq!(skeleton.root_motion_node(), None);
    }
}
