use crate::bone::{AnimationClip, Pose, Skeleton};
use crate::error::AssetError;
use crate::player::StateId;
use serde::{Deserialize, Serialize};

/// Animation library - loaded once, read-only during playback
///
/// Clips are addressed by load order. Every clip is validated against the
/// skeleton it will drive when it is added.
#[derive(Debug, Clone, Default)]
pub struct AnimationLibrary {
    clips: Vec<AnimationClip>,
}

impl AnimationLibrary {
    /// Create empty animation library
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a clip, returning its index.
    pub fn add_clip(&mut self, clip: AnimationClip, skeleton: &Skeleton) -> Result<usize, AssetError> {
        clip.validate(skeleton)?;
        log::info!(
            "Loaded clip '{}' ({} tracks, {:.2}s)",
            clip.name,
            clip.tracks.len(),
            clip.duration_seconds()
        );
        self.clips.push(clip);
        Ok(self.clips.len() - 1)
    }

    /// Load an animation clip from JSON string
    pub fn load_json(&mut self, json: &str, skeleton: &Skeleton) -> Result<usize, AssetError> {
        self.add_clip(AnimationClip::from_json(json)?, skeleton)
    }

    pub fn get_clip(&self, index: usize) -> Option<&AnimationClip> {
        self.clips.get(index)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Locomotion state to clip index.
///
/// Fixed when the player is created; states may share a clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipTable {
    pub idle: usize,
    pub walk: usize,
    pub run: usize,
    pub jump: usize,
    pub fall: usize,
    pub land: usize,
}

impl Default for ClipTable {
    fn default() -> Self {
        Self {
            idle: 0,
            walk: 1,
            run: 2,
            jump: 3,
            fall: 4,
            land: 5,
        }
    }
}

impl ClipTable {
    pub fn clip_for(&self, state: StateId) -> usize {
        match state {
            StateId::Idle => self.idle,
            StateId::Walk => self.walk,
            StateId::Run => self.run,
            StateId::Jump => self.jump,
            StateId::Fall => self.fall,
            StateId::Land => self.land,
        }
    }
}

/// Sample animation
///
/// Evaluates the clip for `state` at `time` into `pose`. A state whose clip
/// is not loaded falls back to the idle clip, then to the unanimated pose.
pub fn sample_animation(
    library: &AnimationLibrary,
    table: &ClipTable,
    state: StateId,
    time: f32,
    skeleton: &Skeleton,
    pose: &mut Pose,
) {
    // 1. Try to get the state's own clip
    // 2. Fallback to idle if it is not loaded
    let clip = library
        .get_clip(table.clip_for(state))
        .or_else(|| library.get_clip(table.idle));
    pose.evaluate_into(skeleton, clip, time);
}
