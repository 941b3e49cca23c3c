//! Per-entity facing and idle/moving animation state

use shared::{Direction, PLAYER_FRAMES};

/// Render frames between two sprite frames while moving.
pub const DEFAULT_CADENCE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle(Direction),
    Moving(Direction),
}

/// Logical image names for one direction: a walking strip and a still frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteSet {
    pub moving: &'static str,
    pub idle: &'static str,
}

pub fn player_sprites(direction: Direction) -> SpriteSet {
    match direction {
        Direction::Up => SpriteSet {
            moving: "player_up",
            idle: "player_idle_up",
        },
        Direction::Down => SpriteSet {
            moving: "player_down",
            idle: "player_idle_down",
        },
        Direction::Left => SpriteSet {
            moving: "player_left",
            idle: "player_idle_left",
        },
        Direction::Right => SpriteSet {
            moving: "player_right",
            idle: "player_idle_right",
        },
    }
}

/// Which image to draw and which cell of its strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteFrame {
    pub image: &'static str,
    pub index: usize,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct Animator {
    phase: Phase,
    frame: usize,
    elapsed: u32,
    max_frames: usize,
    cadence: u32,
}

impl Animator {
    pub fn new(facing: Direction, max_frames: usize, cadence: u32) -> Self {
        Self {
            phase: Phase::Idle(facing),
            frame: 0,
            elapsed: 0,
            max_frames: max_frames.max(1),
            cadence: cadence.max(1),
        }
    }

    /// Picks the target phase. `active` updates the facing whenever set;
    /// the phase is `Moving` only while that direction is also held.
    pub fn select(&mut self, active: Option<Direction>, held: bool) {
        let facing = active.unwrap_or_else(|| self.facing());
        let target = if active.is_some() && held {
            Phase::Moving(facing)
        } else {
            Phase::Idle(facing)
        };

        if matches!(target, Phase::Idle(_)) && matches!(self.phase, Phase::Moving(_)) {
            self.frame = 0;
            self.elapsed = 0;
        }
        self.phase = target;
    }

    /// Counts one applied movement frame.
    pub fn advance(&mut self) {
        if let Phase::Moving(_) = self.phase {
            self.elapsed = (self.elapsed + 1) % self.cadence;
            if self.elapsed == 0 {
                self.frame = (self.frame + 1) % self.max_frames;
            }
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn facing(&self) -> Direction {
        match self.phase {
            Phase::Idle(direction) | Phase::Moving(direction) => direction,
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.phase, Phase::Moving(_))
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn sprite(&self) -> SpriteFrame {
        let sprites = player_sprites(self.facing());
        match self.phase {
            Phase::Moving(_) => SpriteFrame {
                image: sprites.moving,
                index: self.frame,
                count: self.max_frames,
            },
            Phase::Idle(_) => SpriteFrame {
                image: sprites.idle,
                index: 0,
                count: 1,
            },
        }
    }
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(Direction::Left, PLAYER_FRAMES, DEFAULT_CADENCE)
    }
}
