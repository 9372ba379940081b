//! Error types.
//!
//! Asset structure problems are reported once, at load time. The per-frame
//! paths (pose evaluation, locomotion) never fail.

use thiserror::Error;

/// Load-time data errors for skeletons, clips and height maps.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("skeleton has no nodes")]
    EmptySkeleton,

    #[error("duplicate node name `{0}`")]
    DuplicateNode(String),

    #[error("node `{parent}` lists unknown child `{child}`")]
    UnknownChild { parent: String, child: String },

    #[error("node `{0}` has more than one parent")]
    MultipleParents(String),

    #[error("skeleton must have exactly one root, found {0}")]
    RootCount(usize),

    #[error("node `{0}` is not reachable from the root (cycle?)")]
    Unreachable(String),

    #[error("bone `{0}` does not name a node in the hierarchy")]
    UnknownBone(String),

    #[error("duplicate bone `{0}`")]
    DuplicateBone(String),

    #[error("clip `{clip}` animates unknown node `{node}`")]
    UnknownTrackTarget { clip: String, node: String },

    #[error("clip `{clip}`: {channel} track of `{node}` is empty")]
    EmptyTrack {
        clip: String,
        node: String,
        channel: &'static str,
    },

    #[error("clip `{clip}`: {channel} keys of `{node}` are not strictly increasing")]
    UnsortedKeys {
        clip: String,
        node: String,
        channel: &'static str,
    },

    #[error("clip `{clip}` has invalid timing (ticks/s {ticks_per_second}, duration {duration})")]
    InvalidTiming {
        clip: String,
        ticks_per_second: f32,
        duration: f32,
    },

    #[error("vertex {vertex} references bone {bone}, skeleton has {bone_count}")]
    BoneIndexOutOfRange {
        vertex: usize,
        bone: u32,
        bone_count: usize,
    },

    #[error("height map expects {expected} bytes, got {actual}")]
    HeightMapSize { expected: usize, actual: usize },

    #[error("height map must be at least 2x2, got {width}x{length}")]
    HeightMapTooSmall { width: usize, length: usize },
}

/// Malformed input to the plane slicer.
///
/// Geometric degeneracies (nothing to cut) are not errors; see
/// [`crate::slice::SliceResult`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SliceError {
    #[error("submesh range {base_index}..{end} exceeds index buffer of {len}")]
    SubmeshOutOfRange {
        base_index: usize,
        end: usize,
        len: usize,
    },

    #[error("index count {0} is not a multiple of 3")]
    NotTriangles(usize),

    #[error("index {index} (base vertex {base_vertex}) exceeds vertex buffer of {len}")]
    IndexOutOfRange {
        index: u32,
        base_vertex: usize,
        len: usize,
    },

    #[error("cutting plane is degenerate or not finite")]
    InvalidPlane,

    #[error("unknown mesh handle")]
    UnknownMesh,

    #[error("unknown entity {0}")]
    UnknownEntity(u32),

    #[error("mesh has no submesh {0}")]
    UnknownSubmesh(usize),
}
