//! Locomotion state machine.
//!
//! Six states, known at compile time: a closed enum plus a transition
//! function. The machine only owns the active state and its clock; the
//! decision inputs come from [`super::motion::Motion`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum StateId {
    #[default]
    Idle = 0,
    Walk = 1,
    Run = 2,
    Jump = 3,
    Fall = 4,
    Land = 5,
}

impl StateId {
    pub const COUNT: usize = 6;

    pub const ALL: [StateId; Self::COUNT] = [
        StateId::Idle,
        StateId::Walk,
        StateId::Run,
        StateId::Jump,
        StateId::Fall,
        StateId::Land,
    ];

    /// Checked conversion from a raw id.
    pub fn from_u32(raw: u32) -> Option<StateId> {
        Self::ALL.get(raw as usize).copied()
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            StateId::Idle => "Idle",
            StateId::Walk => "Walk",
            StateId::Run => "Run",
            StateId::Jump => "Jump",
            StateId::Fall => "Fall",
            StateId::Land => "Land",
        }
    }
}

/// An accepted state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
}

/// What the state machine needs to know about the body each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sense {
    pub falling: bool,
    pub horizontal_speed: f32,
}

/// Thresholds used by [`LocomotionState::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub idle_speed: f32,
    pub max_walk_speed: f32,
    pub exit_time: f32,
}

/// Active state plus seconds since it was entered.
#[derive(Debug, Clone, PartialEq)]
pub struct LocomotionState {
    current: StateId,
    clock: f32,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self::new(StateId::Idle)
    }
}

impl LocomotionState {
    pub fn new(initial: StateId) -> Self {
        Self {
            current: initial,
            clock: 0.0,
        }
    }

    pub fn current(&self) -> StateId {
        self.current
    }

    /// Seconds since the current state was entered.
    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn advance(&mut self, dt: f32) {
        self.clock += dt;
    }

    /// Switch to `to` and restart the state clock. Switching to the active
    /// state does nothing and keeps the clock running.
    pub fn transition_to(&mut self, to: StateId) -> Option<Transition> {
        if to == self.current {
            return None;
        }
        let from = self.current;
        self.current = to;
        self.clock = 0.0;
        log::debug!("Locomotion {} -> {}", from.name(), to.name());
        Some(Transition { from, to })
    }

    /// Transition by raw id; unknown ids are ignored.
    pub fn request_transition(&mut self, raw: u32) -> Option<Transition> {
        match StateId::from_u32(raw) {
            Some(to) => self.transition_to(to),
            None => {
                log::debug!("Ignoring transition to unknown state id {}", raw);
                None
            }
        }
    }

    /// Grounded speed selection followed by the active state's own rule.
    ///
    /// The airborne check (leaving the ground without jumping) is done by
    /// the caller, which owns the falling flag.
    pub fn decide(&mut self, sense: Sense, limits: Thresholds, out: &mut Vec<Transition>) {
        if !sense.falling {
            let target = if sense.horizontal_speed <= limits.idle_speed {
                match self.current {
                    StateId::Land | StateId::Fall => None,
                    _ => Some(StateId::Idle),
                }
            } else if sense.horizontal_speed > limits.max_walk_speed {
                Some(StateId::Run)
            } else {
                Some(StateId::Walk)
            };
            if let Some(t) = target.and_then(|to| self.transition_to(to)) {
                out.push(t);
            }
        }

        let next = match self.current {
            StateId::Jump if self.clock > limits.exit_time => Some(StateId::Fall),
            StateId::Fall if !sense.falling => Some(StateId::Land),
            StateId::Land if self.clock > limits.exit_time => Some(StateId::Idle),
            _ => None,
        };
        if let Some(t) = next.and_then(|to| self.transition_to(to)) {
            out.push(t);
        }
    }
}
