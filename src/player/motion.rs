//! Explicit-Euler body integration.
//!
//! Note the displacement step: position advances by the velocity vector
//! once per tick, not by `velocity * dt`. Velocities are therefore in units
//! per tick and movement speed depends on tick rate.

use crate::config::LocomotionConfig;
use crate::math::{horizontal_length, Quat, Vec3};
use crate::terrain::Ground;

/// Kinematic state of the player body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Rotation about +Y only
    pub yaw: Quat,
    /// Look pitch in radians, positive looks down
    pub pitch: f32,
    pub falling: bool,
    pub running: bool,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            yaw: Quat::IDENTITY,
            pitch: 0.0,
            falling: false,
            running: false,
        }
    }
}

impl Motion {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Facing direction (+Z at zero yaw).
    pub fn forward(&self) -> Vec3 {
        self.yaw * Vec3::Z
    }

    /// Strafe direction (+X at zero yaw).
    pub fn right(&self) -> Vec3 {
        self.yaw * Vec3::X
    }

    pub fn horizontal_speed(&self) -> f32 {
        horizontal_length(self.velocity)
    }

    /// Scale applied to movement impulses this tick.
    pub fn impulse_scale(&self, config: &LocomotionConfig) -> f32 {
        if self.falling {
            config.air_control
        } else if self.running {
            config.run_boost
        } else {
            1.0
        }
    }

    /// Turn and pitch by a look delta, keeping pitch inside `limit`.
    pub fn look(&mut self, yaw_delta: f32, pitch_delta: f32, limit: f32) {
        self.yaw = (Quat::from_rotation_y(yaw_delta) * self.yaw).normalize();
        self.pitch = (self.pitch + pitch_delta).clamp(-limit, limit);
    }

    /// One integration step: gravity, fall clamp, speed cap, friction,
    /// displacement, ground clamp.
    pub fn integrate<G: Ground + ?Sized>(&mut self, dt: f32, config: &LocomotionConfig, ground: &G) {
        self.velocity.y -= config.gravity * dt;
        if self.velocity.y < -config.max_fall_speed {
            self.velocity.y = -config.max_fall_speed;
        }

        let cap = if self.running {
            config.max_run_speed
        } else {
            config.max_walk_speed
        };
        self.velocity = clamp_horizontal(self.velocity, cap);
        self.velocity = apply_friction(self.velocity, config.friction * dt);

        self.position += self.velocity;

        let floor = ground.height_at(self.position.x, self.position.z);
        if self.position.y < floor {
            self.position.y = floor;
            self.velocity.y = 0.0;
            self.falling = false;
        }
    }
}

/// Uniformly scale the XZ part of `v` down to `max` if it is faster.
pub fn clamp_horizontal(v: Vec3, max: f32) -> Vec3 {
    let speed = horizontal_length(v);
    if speed <= max || speed <= 0.0 {
        return v;
    }
    let k = max.max(0.0) / speed;
    Vec3::new(v.x * k, v.y, v.z * k)
}

/// Decelerate the XZ part of `v` by `amount` along its own direction.
///
/// Each axis stops at zero instead of reversing.
pub fn apply_friction(v: Vec3, amount: f32) -> Vec3 {
    let speed = horizontal_length(v);
    if speed <= 0.0 {
        return v;
    }
    let fx = v.x / speed * amount;
    let fz = v.z / speed * amount;
    Vec3::new(toward_zero(v.x, fx), v.y, toward_zero(v.z, fz))
}

#[inline]
fn toward_zero(value: f32, step: f32) -> f32 {
    if value > 0.0 {
        (value - step).max(0.0)
    } else if value < 0.0 {
        (value - step).min(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FlatGround;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_friction_never_reverses_sign() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let v = Vec3::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            );
            let amount = rng.random_range(0.0..20.0);
            let out = apply_friction(v, amount);
            assert!(out.x * v.x >= 0.0, "x flipped: {v} -> {out}");
            assert!(out.z * v.z >= 0.0, "z flipped: {v} -> {out}");
            assert!(out.x.abs() <= v.x.abs() && out.z.abs() <= v.z.abs());
            assert_eq!(out.y, v.y);
        }
    }

    #[test]
    fn test_friction_on_still_body_is_noop() {
        let v = Vec3::new(0.0, -3.0, 0.0);
        assert_eq!(apply_friction(v, 5.0), v);
    }

    #[test]
    fn test_clamp_horizontal_preserves_direction() {
        let v = clamp_horizontal(Vec3::new(6.0, -2.0, 8.0), 5.0);
        assert!((horizontal_length(v) - 5.0).abs() < 1e-5);
        assert!((v.x / v.z - 0.75).abs() < 1e-5);
        assert_eq!(v.y, -2.0);
        assert_eq!(clamp_horizontal(Vec3::X, 5.0), Vec3::X);
    }

    #[test]
    fn test_fall_speed_clamped() {
        let config = LocomotionConfig::default();
        let mut body = Motion::at(Vec3::new(0.0, 1000.0, 0.0));
        body.velocity.y = -9.99;
        body.integrate(0.5, &config, &FlatGround);
        assert_eq!(body.velocity.y, -config.max_fall_speed);
    }

    #[test]
    fn test_ground_clamp_clears_falling() {
        let config = LocomotionConfig::default();
        let mut body = Motion::at(Vec3::new(0.0, 0.5, 0.0));
        body.falling = true;
        body.velocity.y = -2.0;
        body.integrate(1.0 / 60.0, &config, &FlatGround);
        assert_eq!(body.position.y, 0.0);
        assert_eq!(body.velocity.y, 0.0);
        assert!(!body.falling);
    }

    #[test]
    fn test_position_advances_by_velocity_per_tick() {
        // One tick moves by the whole velocity regardless of dt.
        let config = LocomotionConfig {
            friction: 0.0,
            gravity: 0.0,
            ..Default::default()
        };
        for dt in [1.0 / 30.0, 1.0 / 120.0] {
            let mut body = Motion::default();
            body.velocity = Vec3::new(2.0, 0.0, 0.0);
            body.integrate(dt, &config, &FlatGround);
            assert_eq!(body.position.x, 2.0);
        }
    }

    #[test]
    fn test_look_clamps_pitch_and_turns_forward() {
        let mut body = Motion::default();
        let limit = 85f32.to_radians();
        body.look(std::f32::consts::FRAC_PI_2, 10.0, limit);
        assert_eq!(body.pitch, limit);
        assert!(body.forward().abs_diff_eq(Vec3::X, 1e-5), "{}", body.forward());
        assert!(body.right().abs_diff_eq(-Vec3::Z, 1e-5), "{}", body.right());
    }
}
