use crate::math::Vec2;
use serde::{Deserialize, Serialize};

/// Semantic keys the sandbox reacts to. Mapping physical keys is the host's
/// job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Key {
    Forward = 0,
    Back = 1,
    Left = 2,
    Right = 3,
    Run = 4,
    Jump = 5,
    ZoomIn = 6,
    ZoomOut = 7,
    ThirdPerson = 8,
    FirstPerson = 9,
}

impl Key {
    pub const COUNT: usize = 10;

    pub const ALL: [Key; Self::COUNT] = [
        Key::Forward,
        Key::Back,
        Key::Left,
        Key::Right,
        Key::Run,
        Key::Jump,
        Key::ZoomIn,
        Key::ZoomOut,
        Key::ThirdPerson,
        Key::FirstPerson,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_u8(raw: u8) -> Option<Key> {
        Self::ALL.get(raw as usize).copied()
    }
}

/// Input accumulated between two ticks.
///
/// Held state persists; press edges and the look delta are consumed by
/// [`InputState::end_tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    held: [bool; Key::COUNT],
    pressed: [bool; Key::COUNT],
    look_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        if !self.held[key.index()] {
            self.pressed[key.index()] = true;
        }
        self.held[key.index()] = true;
    }

    pub fn key_up(&mut self, key: Key) {
        self.held[key.index()] = false;
    }

    pub fn set_key(&mut self, key: Key, down: bool) {
        if down {
            self.key_down(key);
        } else {
            self.key_up(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held[key.index()]
    }

    /// Went down since the last [`InputState::end_tick`].
    pub fn was_pressed(&self, key: Key) -> bool {
        self.pressed[key.index()]
    }

    /// Accumulate a mouse/stick delta: x turns, y pitches.
    pub fn add_look_delta(&mut self, delta: Vec2) {
        self.look_delta += delta;
    }

    pub fn look_delta(&self) -> Vec2 {
        self.look_delta
    }

    pub fn end_tick(&mut self) {
        self.pressed = [false; Key::COUNT];
        self.look_delta = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_edge_only_once() {
        let mut input = InputState::new();
        input.key_down(Key::Jump);
        assert!(input.was_pressed(Key::Jump));
        input.end_tick();

        // Auto-repeat while held is not a new press.
        input.key_down(Key::Jump);
        assert!(input.is_held(Key::Jump));
        assert!(!input.was_pressed(Key::Jump));

        input.key_up(Key::Jump);
        input.key_down(Key::Jump);
        assert!(input.was_pressed(Key::Jump));
    }

    #[test]
    fn test_look_delta_accumulates_until_tick_end() {
        let mut input = InputState::new();
        input.add_look_delta(Vec2::new(1.0, 2.0));
        input.add_look_delta(Vec2::new(3.0, -1.0));
        assert_eq!(input.look_delta(), Vec2::new(4.0, 1.0));
        input.set_key(Key::Forward, true);
        input.end_tick();
        assert_eq!(input.look_delta(), Vec2::ZERO);
        assert!(input.is_held(Key::Forward));
    }

    #[test]
    fn test_key_from_raw() {
        assert_eq!(Key::from_u8(0), Some(Key::Forward));
        assert_eq!(Key::from_u8(9), Some(Key::FirstPerson));
        assert_eq!(Key::from_u8(10), None);
    }
}
