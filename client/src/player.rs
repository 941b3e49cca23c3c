use crate::animation::Animator;
use shared::{
    Direction, PeerId, PlayerSnapshot, Position, Rect, CANVAS_HEIGHT, CANVAS_WIDTH,
    PLAYER_FOOTPRINT, PLAYER_HEIGHT, PLAYER_WIDTH, SPAWN_POSITION,
};

/// Screen origin that keeps the local sprite centered on the canvas.
pub fn centered_origin() -> Position {
    Position::new(
        CANVAS_WIDTH / 2.0 - PLAYER_WIDTH / 2.0,
        CANVAS_HEIGHT / 2.0 - PLAYER_HEIGHT / 2.0,
    )
}

/// The player driven by this client. Its screen position never changes;
/// moving it pans the camera instead.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub id: Option<PeerId>,
    screen: Position,
    world: Position,
    footprint: Rect,
    pub animator: Animator,
}

impl LocalPlayer {
    pub fn new(screen: Position, world: Position, footprint: Rect) -> Self {
        Self {
            id: None,
            screen,
            world,
            footprint,
            animator: Animator::default(),
        }
    }

    pub fn spawned() -> Self {
        Self::new(centered_origin(), SPAWN_POSITION, PLAYER_FOOTPRINT)
    }

    pub fn screen_position(&self) -> Position {
        self.screen
    }

    pub fn world_position(&self) -> Position {
        self.world
    }

    /// Collision footprint in screen space.
    pub fn footprint(&self) -> Rect {
        self.footprint.translated(self.screen)
    }

    pub fn sprite_rect(&self) -> Rect {
        Rect::at(self.screen, PLAYER_WIDTH, PLAYER_HEIGHT)
    }

    pub(crate) fn step_world(&mut self, delta: Position) {
        self.world = self.world.offset(delta);
    }

    pub fn snapshot(&self, id: PeerId, moving: bool) -> PlayerSnapshot {
        PlayerSnapshot {
            id,
            position: self.world,
            facing: self.animator.facing(),
            moving,
        }
    }
}

/// Drawable proxy for a peer, overwritten by every snapshot for its id.
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    pub id: PeerId,
    pub position: Position,
    pub facing: Direction,
    pub moving: bool,
    pub animator: Animator,
}

impl RemotePlayer {
    pub fn from_snapshot(snapshot: PlayerSnapshot) -> Self {
        let mut animator = Animator::new(
            snapshot.facing,
            shared::PLAYER_FRAMES,
            crate::animation::DEFAULT_CADENCE,
        );
        animator.select(Some(snapshot.facing), snapshot.moving);
        Self {
            id: snapshot.id,
            position: snapshot.position,
            facing: snapshot.facing,
            moving: snapshot.moving,
            animator,
        }
    }

    pub fn apply(&mut self, snapshot: &PlayerSnapshot) {
        self.position = snapshot.position;
        self.facing = snapshot.facing;
        self.moving = snapshot.moving;
        self.animator.select(Some(snapshot.facing), snapshot.moving);
    }

    /// World-space collision footprint.
    pub fn footprint(&self) -> Rect {
        PLAYER_FOOTPRINT.translated(self.position)
    }

    pub fn sprite_rect(&self) -> Rect {
        Rect::at(self.position, PLAYER_WIDTH, PLAYER_HEIGHT)
    }
}
