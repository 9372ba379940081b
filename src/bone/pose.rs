use super::clip::AnimationClip;
use super::hierarchy::Skeleton;
use super::id::{BoneIndex, NodeId};
use crate::math::{Mat4, MatrixConvention};

/// Final skinning transforms, one per bone slot.
///
/// Stored column-major with column vectors; see [`BonePalette::to_gpu`] for
/// export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BonePalette {
    matrices: Vec<Mat4>,
}

impl BonePalette {
    /// Palette of `count` identity matrices.
    pub fn identity(count: usize) -> Self {
        Self {
            matrices: vec![Mat4::IDENTITY; count],
        }
    }

    pub fn from_matrices(matrices: Vec<Mat4>) -> Self {
        Self { matrices }
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    pub fn get(&self, bone: BoneIndex) -> Option<&Mat4> {
        self.matrices.get(bone.index())
    }

    pub fn as_slice(&self) -> &[Mat4] {
        &self.matrices
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mat4> {
        self.matrices.iter()
    }

    /// Flatten for upload, 16 floats per bone.
    pub fn to_gpu(&self, convention: MatrixConvention) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.matrices.len() * 16);
        for m in &self.matrices {
            out.extend_from_slice(&convention.export(m));
        }
        out
    }
}

/// Scratch buffers for pose evaluation.
///
/// Reuse one `Pose` per animated instance to avoid reallocating every frame.
#[derive(Debug, Clone, Default)]
pub struct Pose {
    globals: Vec<Mat4>,
    palette: BonePalette,
}

impl Pose {
    pub fn new(skeleton: &Skeleton) -> Self {
        Self {
            globals: vec![Mat4::IDENTITY; skeleton.node_count()],
            palette: BonePalette::identity(skeleton.bone_count()),
        }
    }

    /// Evaluate `clip` at `time_seconds` into this buffer.
    ///
    /// Without a clip every node takes its identity local transform. The
    /// clip is expected to have passed [`AnimationClip::validate`] against
    /// `skeleton`; unknown track names are simply never looked up.
    pub fn evaluate_into(
        &mut self,
        skeleton: &Skeleton,
        clip: Option<&AnimationClip>,
        time_seconds: f32,
    ) {
        self.globals.clear();
        self.globals.resize(skeleton.node_count(), Mat4::IDENTITY);
        self.palette.matrices.clear();
        self.palette
            .matrices
            .resize(skeleton.bone_count(), Mat4::IDENTITY);

        let ticks = clip.map_or(0.0, |c| c.ticks_at(time_seconds));
        let suppressed = match clip {
            Some(c) if !c.root_motion => skeleton.root_motion_node(),
            _ => None,
        };

        // Nodes are in topological order, so every parent global is ready
        // before its children read it.
        for (i, node) in skeleton.nodes().iter().enumerate() {
            let parent = match node.parent {
                Some(p) => self.globals[p.index()],
                None => skeleton.root_transform(),
            };

            let local = if suppressed == Some(NodeId(i as u32)) {
                Mat4::IDENTITY
            } else {
                clip.and_then(|c| c.tracks_for(&node.name))
                    .map_or(Mat4::IDENTITY, |tracks| tracks.local_transform(ticks))
            };

            let global = parent * local;
            self.globals[i] = global;

            if let Some(bone) = node.bone {
                self.palette.matrices[bone.index()] = global * skeleton.bone_offset(bone);
            }
        }
    }

    /// Model-space transform of a node from the last evaluation.
    pub fn global(&self, node: NodeId) -> Mat4 {
        self.globals
            .get(node.index())
            .copied()
            .unwrap_or(Mat4::IDENTITY)
    }

    pub fn palette(&self) -> &BonePalette {
        &self.palette
    }

    pub fn into_palette(self) -> BonePalette {
        self.palette
    }
}

/// One-shot evaluation into a fresh palette.
pub fn evaluate_pose(
    clip: Option<&AnimationClip>,
    time_seconds: f32,
    skeleton: &Skeleton,
) -> BonePalette {
    let mut pose = Pose::new(skeleton);
    pose.evaluate_into(skeleton, clip, time_seconds);
    pose.into_palette()
}
