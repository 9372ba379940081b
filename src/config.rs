//! Tuning constants, deserialisable from JSON.
//!
//! Every struct is `#[serde(default)]`, so a host can override a single
//! field and keep the rest.

use crate::animation::ClipTable;
use crate::error::AssetError;
use serde::{Deserialize, Serialize};

/// Player movement and state-machine constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Velocity added per second of held movement key
    pub acceleration: f32,
    pub jump_force: f32,
    pub gravity: f32,
    pub max_walk_speed: f32,
    pub max_run_speed: f32,
    pub max_fall_speed: f32,
    pub friction: f32,
    /// Impulse multiplier while airborne
    pub air_control: f32,
    /// Impulse multiplier while the run modifier is held
    pub run_boost: f32,
    /// Horizontal speed at or below which the player counts as standing
    pub idle_speed: f32,
    /// Seconds before Jump and Land hand over to the next state
    pub state_exit_time: f32,
    /// Radians of yaw/pitch per unit of look delta
    pub look_sensitivity: f32,
    pub pitch_limit_degrees: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            acceleration: 30.0,
            jump_force: 10.0,
            gravity: 10.0,
            max_walk_speed: 3.0,
            max_run_speed: 6.0,
            max_fall_speed: 10.0,
            friction: 10.0,
            air_control: 0.5,
            run_boost: 2.0,
            idle_speed: 0.1,
            state_exit_time: 0.85,
            look_sensitivity: 0.005,
            pitch_limit_degrees: 85.0,
        }
    }
}

impl LocomotionConfig {
    pub fn pitch_limit(&self) -> f32 {
        self.pitch_limit_degrees.to_radians()
    }
}

/// Camera rig constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    /// Height of the third-person look target above the player's feet
    pub target_height: f32,
    /// Eye height in first person
    pub eye_height: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Largest view pitch either way, in degrees
    pub pitch_limit_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            zoom: 500.0,
            min_zoom: 100.0,
            max_zoom: 510.0,
            zoom_step: 5.0,
            target_height: 150.0,
            eye_height: 180.0,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 1.0,
            far: 2000.0,
            pitch_limit_degrees: 85.0,
        }
    }
}

impl CameraConfig {
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom.max(self.min_zoom))
    }

    pub fn clamp_pitch(&self, pitch: f32) -> f32 {
        let limit = self.pitch_limit_degrees.to_radians();
        pitch.clamp(-limit, limit)
    }
}

/// Animation selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub clip_table: ClipTable,
}

/// Runtime slicing options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Distance each half is pushed away from the cut along the plane normal
    pub separation: f32,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self { separation: 5.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub locomotion: LocomotionConfig,
    pub camera: CameraConfig,
    pub animation: AnimationConfig,
    pub slice: SliceConfig,
}

impl SandboxConfig {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }
}
