//! Slice Sandbox - CPU core of a small 3D sandbox
//!
//! Skeletal pose evaluation, plane slicing of triangle meshes, and a
//! third/first-person character controller with its camera rig. Rendering
//! is left to the host; the `web` module exposes the core to JavaScript.

pub mod animation;
pub mod bone;
pub mod camera;
pub mod config;
pub mod error;
pub mod math;
pub mod mesh;
pub mod player;
pub mod scene;
pub mod shapes;
pub mod slice;
pub mod terrain;
pub mod timer;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animation::{sample_animation, AnimationLibrary, ClipTable};
pub use bone::{evaluate_pose, AnimationClip, BonePalette, Pose, Skeleton};
pub use camera::{compute_camera, CameraMode, CameraRig};
pub use config::SandboxConfig;
pub use error::{AssetError, SliceError};
pub use math::{Mat4, MatrixConvention, Plane, Quat, Vec3};
pub use mesh::{MeshData, MeshHandle, MeshRegistry, Vertex};
pub use player::{InputState, Key, Player, StateId, Transition};
pub use scene::{Entity, EntityId, FrameOutput, Scene, Transform};
pub use slice::{slice_mesh, SliceResult};
pub use terrain::{FlatGround, Ground, HeightMap, TerrainGround};
pub use timer::{FrameClock, TimeStep};
