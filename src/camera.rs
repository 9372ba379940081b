use crate::config::CameraConfig;
use crate::math::{Mat4, Quat, Vec3};
use crate::player::Player;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraMode {
    #[default]
    ThirdPerson,
    FirstPerson,
}

/// Camera placement derived from the player; recomputed every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    pub target: Vec3,
    pub view: Mat4,
}

/// Inputs to [`compute_camera`], copied out of the player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraInput {
    pub position: Vec3,
    pub yaw: Quat,
    pub pitch: f32,
    pub mode: CameraMode,
    pub zoom: f32,
}

impl CameraInput {
    pub fn from_player(player: &Player) -> Self {
        Self {
            position: player.motion.position,
            yaw: player.motion.yaw,
            pitch: player.motion.pitch,
            mode: player.camera_mode(),
            zoom: player.zoom(),
        }
    }
}

/// Place the camera for the given player state.
///
/// Third person orbits a target above the player at `zoom` distance,
/// tilted by pitch about the player's right axis. First person sits at eye
/// height and looks along the player's forward vector.
pub fn compute_camera(input: &CameraInput, config: &CameraConfig) -> CameraPose {
    let forward = input.yaw * Vec3::Z;
    let right = input.yaw * Vec3::X;
    let pitch = config.clamp_pitch(input.pitch);

    let (eye, target) = match input.mode {
        CameraMode::ThirdPerson => {
            let target = input.position + Vec3::new(0.0, config.target_height, 0.0);
            let look = Quat::from_axis_angle(right, pitch) * forward;
            let zoom = config.clamp_zoom(input.zoom);
            (target - look * zoom, target)
        }
        CameraMode::FirstPerson => {
            let eye = input.position + Vec3::new(0.0, config.eye_height, 0.0);
            (eye, eye + forward)
        }
    };

    CameraPose {
        eye,
        target,
        view: Mat4::look_at_lh(eye, target, Vec3::Y),
    }
}

/// Camera rig. Caches the last view for external queries.
#[derive(Clone, Debug)]
pub struct CameraRig {
    config: CameraConfig,
    pose: CameraPose,
}

impl CameraRig {
    pub fn new(config: CameraConfig) -> Self {
        let eye = Vec3::new(0.0, config.target_height, -config.zoom);
        let target = Vec3::new(0.0, config.target_height, 0.0);
        Self {
            config,
            pose: CameraPose {
                eye,
                target,
                view: Mat4::look_at_lh(eye, target, Vec3::Y),
            },
        }
    }

    pub fn update(&mut self, player: &Player) -> &CameraPose {
        self.pose = compute_camera(&CameraInput::from_player(player), &self.config);
        &self.pose
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    /// Compute view matrix
    pub fn view_matrix(&self) -> Mat4 {
        self.pose.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_lh(
            self.config.fov_y,
            self.config.aspect,
            self.config.near,
            self.config.far,
        )
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.config.aspect = width / height;
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}
