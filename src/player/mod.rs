//! Player locomotion: input impulses, body integration and the state
//! machine that picks the animation.

pub mod input;
pub mod motion;
pub mod state;

pub use input::{InputState, Key};
pub use motion::Motion;
pub use state::{LocomotionState, StateId, Transition};

use crate::animation::ClipTable;
use crate::camera::CameraMode;
use crate::config::{CameraConfig, LocomotionConfig, SandboxConfig};
use crate::terrain::Ground;
use crate::timer::TimeStep;
use state::{Sense, Thresholds};

/// The controllable character.
#[derive(Debug, Clone)]
pub struct Player {
    pub motion: Motion,
    fsm: LocomotionState,
    camera_mode: CameraMode,
    zoom: f32,
    clips: ClipTable,
    locomotion: LocomotionConfig,
    camera: CameraConfig,
}

impl Player {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            motion: Motion::default(),
            fsm: LocomotionState::default(),
            camera_mode: CameraMode::default(),
            zoom: config.camera.clamp_zoom(config.camera.zoom),
            clips: config.animation.clip_table.clone(),
            locomotion: config.locomotion,
            camera: config.camera,
        }
    }

    pub fn state(&self) -> StateId {
        self.fsm.current()
    }

    /// Seconds spent in the current state; also the animation time.
    pub fn anim_time(&self) -> f32 {
        self.fsm.clock()
    }

    /// Clip index for the current state.
    pub fn clip_index(&self) -> usize {
        self.clips.clip_for(self.fsm.current())
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera_mode
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.locomotion
    }

    /// Force a state by raw id. Unknown ids are ignored.
    pub fn request_transition(&mut self, raw: u32) -> Option<Transition> {
        self.fsm.request_transition(raw)
    }

    /// Advance one tick and return the state changes it caused.
    pub fn tick<G: Ground + ?Sized>(
        &mut self,
        step: TimeStep,
        input: &InputState,
        ground: &G,
    ) -> Vec<Transition> {
        let dt = step.delta;
        let mut transitions = Vec::new();

        self.apply_input(dt, input, &mut transitions);

        self.motion.integrate(dt, &self.locomotion, ground);

        self.update_state(ground, &mut transitions);
        self.fsm.advance(dt);
        transitions
    }

    fn apply_input(&mut self, dt: f32, input: &InputState, out: &mut Vec<Transition>) {
        self.motion.running = input.is_held(Key::Run);

        let impulse = self.locomotion.acceleration * dt * self.motion.impulse_scale(&self.locomotion);
        let forward = self.motion.forward();
        let right = self.motion.right();
        if input.is_held(Key::Forward) {
            self.motion.velocity += forward * impulse;
        }
        if input.is_held(Key::Back) {
            self.motion.velocity -= forward * impulse;
        }
        if input.is_held(Key::Right) {
            self.motion.velocity += right * impulse;
        }
        if input.is_held(Key::Left) {
            self.motion.velocity -= right * impulse;
        }

        if self.camera_mode == CameraMode::ThirdPerson {
            if input.is_held(Key::ZoomIn) {
                self.zoom = self.camera.clamp_zoom(self.zoom - self.camera.zoom_step);
            }
            if input.is_held(Key::ZoomOut) {
                self.zoom = self.camera.clamp_zoom(self.zoom + self.camera.zoom_step);
            }
        }
        if input.was_pressed(Key::ThirdPerson) {
            self.camera_mode = CameraMode::ThirdPerson;
        }
        if input.was_pressed(Key::FirstPerson) {
            self.camera_mode = CameraMode::FirstPerson;
        }

        let look = input.look_delta() * self.locomotion.look_sensitivity;
        if look != crate::math::Vec2::ZERO {
            self.motion.look(look.x, look.y, self.locomotion.pitch_limit());
        }

        if input.was_pressed(Key::Jump) && !self.motion.falling {
            self.motion.velocity.y += self.locomotion.jump_force;
            self.motion.falling = true;
            out.extend(self.fsm.transition_to(StateId::Jump));
        }
    }

    fn update_state<G: Ground + ?Sized>(&mut self, ground: &G, out: &mut Vec<Transition>) {
        let floor = ground.height_at(self.motion.position.x, self.motion.position.z);
        if self.motion.position.y > floor && !self.motion.falling {
            self.motion.falling = true;
            out.extend(self.fsm.transition_to(StateId::Fall));
        }

        let sense = Sense {
            falling: self.motion.falling,
            horizontal_speed: self.motion.horizontal_speed(),
        };
        let limits = Thresholds {
            idle_speed: self.locomotion.idle_speed,
            max_walk_speed: self.locomotion.max_walk_speed,
            exit_time: self.locomotion.state_exit_time,
        };
        self.fsm.decide(sense, limits, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Vec2, Vec3};
    use crate::terrain::FlatGround;

    const DT: f32 = 1.0 / 60.0;

    fn step() -> TimeStep {
        TimeStep::fixed(DT)
    }

    #[test]
    fn test_resting_player_stays_idle() {
        let mut player = Player::new(&SandboxConfig::default());
        let input = InputState::new();
        for _ in 0..30 {
            assert!(player.tick(step(), &input, &FlatGround).is_empty());
        }
        assert_eq!(player.state(), StateId::Idle);
        assert_eq!(player.motion.position, Vec3::ZERO);
        assert!(player.anim_time() > 0.49);
    }

    #[test]
    fn test_walk_without_run_modifier() {
        let mut player = Player::new(&SandboxConfig::default());
        let mut input = InputState::new();
        input.key_down(Key::Forward);
        for _ in 0..60 {
            player.tick(step(), &input, &FlatGround);
            input.end_tick();
        }
        assert_eq!(player.state(), StateId::Walk);
        assert!(player.motion.horizontal_speed() <= player.config().max_walk_speed);
        assert!(player.motion.position.z > 0.0);
        assert_eq!(player.clip_index(), 1);
    }

    #[test]
    fn test_jump_is_edge_triggered_and_grounded_only() {
        let mut player = Player::new(&SandboxConfig::default());
        let mut input = InputState::new();
        input.key_down(Key::Jump);
        let events = player.tick(step(), &input, &FlatGround);
        assert_eq!(events, [Transition { from: StateId::Idle, to: StateId::Jump }]);
        assert!(player.motion.falling);
        let vy = player.motion.velocity.y;
        input.end_tick();

        // Pressing again mid-air adds nothing.
        input.key_up(Key::Jump);
        input.key_down(Key::Jump);
        player.tick(step(), &input, &FlatGround);
        assert!(player.motion.velocity.y < vy);
        assert_eq!(player.state(), StateId::Jump);
    }

    #[test]
    fn test_zoom_steps_only_in_third_person() {
        let config = SandboxConfig::default();
        let mut player = Player::new(&config);
        let mut input = InputState::new();
        input.key_down(Key::ZoomIn);
        player.tick(step(), &input, &FlatGround);
        assert_eq!(player.zoom(), config.camera.zoom - config.camera.zoom_step);
        input.end_tick();

        input.key_down(Key::FirstPerson);
        player.tick(step(), &input, &FlatGround);
        input.end_tick();
        let zoom = player.zoom();
        player.tick(step(), &input, &FlatGround);
        assert_eq!(player.camera_mode(), CameraMode::FirstPerson);
        assert_eq!(player.zoom(), zoom);

        input.key_up(Key::ZoomIn);
        input.key_down(Key::ZoomOut);
        input.key_down(Key::ThirdPerson);
        for _ in 0..100 {
            player.tick(step(), &input, &FlatGround);
            input.end_tick();
        }
        assert_eq!(player.zoom(), config.camera.max_zoom);
    }

    #[test]
    fn test_look_delta_turns_player() {
        let mut player = Player::new(&SandboxConfig::default());
        let mut input = InputState::new();
        input.add_look_delta(Vec2::new(100.0, 1.0e6));
        player.tick(step(), &input, &FlatGround);
        assert!(player.motion.forward().x > 0.0);
        assert_eq!(player.motion.pitch, player.config().pitch_limit());
    }

    #[test]
    fn test_walking_off_a_ledge_starts_falling() {
        struct Step;
        impl Ground for Step {
            fn height_at(&self, _x: f32, z: f32) -> f32 {
                if z < 1.0 {
                    50.0
                } else {
                    0.0
                }
            }
        }

        let mut player = Player::new(&SandboxConfig::default());
        player.motion.position.y = 50.0;
        let mut input = InputState::new();
        input.key_down(Key::Forward);
        let mut seen = Vec::new();
        for _ in 0..10 {
            seen.extend(player.tick(step(), &input, &Step));
        }
        assert!(seen.contains(&Transition { from: StateId::Walk, to: StateId::Fall }));
    }

    #[test]
    fn test_invalid_request_keeps_state() {
        let mut player = Player::new(&SandboxConfig::default());
        assert_eq!(player.request_transition(42), None);
        assert_eq!(player.state(), StateId::Idle);
    }
}
