use serde::{Deserialize, Serialize};
use std::fmt;

pub const CANVAS_WIDTH: f32 = 1024.0;
pub const CANVAS_HEIGHT: f32 = 576.0;

/// World units covered by one committed move.
pub const STEP: f32 = 3.0;

pub const PLAYER_WIDTH: f32 = 48.0;
pub const PLAYER_HEIGHT: f32 = 64.0;
pub const PLAYER_FRAMES: usize = 6;

/// Collision footprint relative to the sprite origin (the feet, not the head).
pub const PLAYER_FOOTPRINT: Rect = Rect {
    x: 8.0,
    y: 40.0,
    width: 32.0,
    height: 24.0,
};

/// Sprite origin of a freshly joined player, in world space.
pub const SPAWN_POSITION: Position = Position {
    x: 1200.0,
    y: 880.0,
};

pub const PROTOCOL_VERSION: u32 = 1;
pub const HEARTBEAT_INTERVAL_MS: u64 = 1000;
pub const CONNECTION_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Join { client_version: u32, room: String },
    Snapshot(PlayerSnapshot),
    Heartbeat,
    Leave,

    Joined { id: PeerId },
    Left { id: PeerId },
    Rejected { reason: String },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, delta: Position) -> Position {
        Position::new(self.x + delta.x, self.y + delta.y)
    }

    pub fn negated(self) -> Position {
        Position::new(-self.x, -self.y)
    }
}

/// Axis-aligned box. Edges are exclusive, so touching boxes do not overlap.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn at(origin: Position, width: f32, height: f32) -> Self {
        Self::new(origin.x, origin.y, width, height)
    }

    pub fn origin(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn translated(&self, delta: Position) -> Rect {
        Rect::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Player displacement for one committed move. World axes follow the
    /// screen: x grows rightwards, y grows downwards.
    pub fn delta(self) -> Position {
        match self {
            Direction::Up => Position::new(0.0, -STEP),
            Direction::Down => Position::new(0.0, STEP),
            Direction::Left => Position::new(-STEP, 0.0),
            Direction::Right => Position::new(STEP, 0.0),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

/// Replicated state of one player.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PeerId,
    pub position: Position,
    pub facing: Direction,
    pub moving: bool,
}

impl PlayerSnapshot {
    pub fn spawned(id: PeerId) -> Self {
        Self {
            id,
            position: SPAWN_POSITION,
            facing: Direction::Left,
            moving: false,
        }
    }

    /// World-space collision footprint.
    pub fn footprint(&self) -> Rect {
        PLAYER_FOOTPRINT.translated(self.position)
    }
}
