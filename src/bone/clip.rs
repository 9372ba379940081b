use super::hierarchy::Skeleton;
use crate::error::AssetError;
use crate::math::{compose_srt, unit_factor, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Keyframe tracks
// ============================================================================

/// Values that can be blended between two keys.
pub trait Interpolate: Copy {
    fn interpolate(a: Self, b: Self, t: f32) -> Self;
}

impl Interpolate for Vec3 {
    #[inline]
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }
}

impl Interpolate for Quat {
    #[inline]
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t).normalize()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Keyframe<T> {
    /// Time in ticks
    pub time: f32,
    pub value: T,
}

/// Time-sorted keys for one channel of one node.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Track<T> {
    keys: Vec<Keyframe<T>>,
}

impl<T: Interpolate> Track<T> {
    pub fn new(keys: Vec<Keyframe<T>>) -> Self {
        Self { keys }
    }

    /// Single-key track.
    pub fn constant(value: T) -> Self {
        Self {
            keys: vec![Keyframe { time: 0.0, value }],
        }
    }

    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sample at `time` (ticks). `None` only for an empty track.
    ///
    /// Before the first key the first value is held, past the last key the
    /// last value is held.
    pub fn sample(&self, time: f32) -> Option<T> {
        let first = self.keys.first()?;
        if self.keys.len() == 1 {
            return Some(first.value);
        }

        // Binary search for keyframe (using partition_point for efficiency)
        let next_idx = self.keys.partition_point(|k| k.time <= time);

        if next_idx == 0 {
            return Some(first.value);
        }
        if next_idx >= self.keys.len() {
            return self.keys.last().map(|k| k.value);
        }

        let prev = &self.keys[next_idx - 1];
        let next = &self.keys[next_idx];
        let t = unit_factor(time, prev.time, next.time);
        Some(T::interpolate(prev.value, next.value, t))
    }

    fn check(&self, clip: &str, node: &str, channel: &'static str) -> Result<(), AssetError> {
        if self.keys.is_empty() {
            return Err(AssetError::EmptyTrack {
                clip: clip.to_string(),
                node: node.to_string(),
                channel,
            });
        }
        let sorted = self
            .keys
            .windows(2)
            .all(|w| w[0].time < w[1].time && w[1].time.is_finite());
        if !sorted || !self.keys[0].time.is_finite() {
            return Err(AssetError::UnsortedKeys {
                clip: clip.to_string(),
                node: node.to_string(),
                channel,
            });
        }
        Ok(())
    }
}

/// Translation, rotation and scale channels of one node. A missing channel
/// holds its rest value (zero, identity, one).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BoneTracks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Track<Vec3>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Track<Quat>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Track<Vec3>>,
}

impl BoneTracks {
    /// Local transform at `time` ticks: scale, then rotate, then translate.
    pub fn local_transform(&self, time: f32) -> Mat4 {
        let translation = self
            .translation
            .as_ref()
            .and_then(|t| t.sample(time))
            .unwrap_or(Vec3::ZERO);
        let rotation = self
            .rotation
            .as_ref()
            .and_then(|t| t.sample(time))
            .unwrap_or(Quat::IDENTITY);
        let scale = self
            .scale
            .as_ref()
            .and_then(|t| t.sample(time))
            .unwrap_or(Vec3::ONE);
        compose_srt(scale, rotation, translation)
    }

    fn check(&self, clip: &str, node: &str) -> Result<(), AssetError> {
        if let Some(t) = &self.translation {
            t.check(clip, node, "translation")?;
        }
        if let Some(t) = &self.rotation {
            t.check(clip, node, "rotation")?;
        }
        if let Some(t) = &self.scale {
            t.check(clip, node, "scale")?;
        }
        Ok(())
    }
}

// ============================================================================
// Animation clip
// ============================================================================

fn default_ticks_per_second() -> f32 {
    25.0
}

/// Keyframe animation for a skeleton, keyed by node name.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnimationClip {
    pub name: String,
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: f32,
    /// Length in ticks
    pub duration: f32,
    /// Whether the root-motion node's own channels are applied.
    #[serde(default)]
    pub root_motion: bool,
    #[serde(default)]
    pub tracks: HashMap<String, BoneTracks>,
}

impl AnimationClip {
    /// Parse from JSON string. Structure is checked, names are not; see
    /// [`AnimationClip::validate`].
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        let clip: AnimationClip = serde_json::from_str(json)?;
        clip.check_tracks()?;
        Ok(clip)
    }

    /// Full load-time check against the skeleton the clip will drive.
    pub fn validate(&self, skeleton: &Skeleton) -> Result<(), AssetError> {
        self.check_tracks()?;
        if let Some(node) = self
            .tracks
            .keys()
            .find(|name| skeleton.find_node(name).is_none())
        {
            return Err(AssetError::UnknownTrackTarget {
                clip: self.name.clone(),
                node: node.clone(),
            });
        }
        Ok(())
    }

    fn check_tracks(&self) -> Result<(), AssetError> {
        let timing_ok = self.ticks_per_second.is_finite()
            && self.ticks_per_second > 0.0
            && self.duration.is_finite()
            && self.duration > 0.0;
        if !timing_ok {
            return Err(AssetError::InvalidTiming {
                clip: self.name.clone(),
                ticks_per_second: self.ticks_per_second,
                duration: self.duration,
            });
        }
        for (node, tracks) in &self.tracks {
            tracks.check(&self.name, node)?;
        }
        Ok(())
    }

    /// Convert seconds to looped clip time in ticks.
    ///
    /// Degenerate timing yields 0, i.e. a static pose.
    pub fn ticks_at(&self, time_seconds: f32) -> f32 {
        if !(self.duration > 0.0) || !(self.ticks_per_second > 0.0) || !time_seconds.is_finite() {
            return 0.0;
        }
        let ticks = (time_seconds * self.ticks_per_second).rem_euclid(self.duration);
        // rem_euclid can round up to exactly `duration`.
        if ticks >= self.duration {
            0.0
        } else {
            ticks
        }
    }

    /// Length in seconds.
    pub fn duration_seconds(&self) -> f32 {
        if self.ticks_per_second > 0.0 {
            self.duration / self.ticks_per_second
        } else {
            0.0
        }
    }

    pub fn tracks_for(&self, node: &str) -> Option<&BoneTracks> {
        self.tracks.get(node)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
