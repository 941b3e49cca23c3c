//! Collision-gated movement with a fixed-screen player and a scrolling world

use crate::obstacles::ObstacleField;
use crate::player::LocalPlayer;
use log::trace;
use shared::{Direction, Position, Rect};

/// World coordinate drawn at the screen origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Camera {
    pub origin: Position,
}

impl Camera {
    pub fn new(origin: Position) -> Self {
        Self { origin }
    }

    /// Camera that shows `player` at its fixed screen position.
    pub fn following(player: &LocalPlayer) -> Self {
        let world = player.world_position();
        let screen = player.screen_position();
        Self::new(Position::new(world.x - screen.x, world.y - screen.y))
    }

    pub fn to_screen(&self, world: Rect) -> Rect {
        world.translated(self.origin.negated())
    }

    pub fn pan(&mut self, delta: Position) {
        self.origin = self.origin.offset(delta);
    }
}

/// Whether remote players block the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RemoteCollision {
    #[default]
    Block,
    PassThrough,
}

/// Tries to move `player` by `delta`. `blockers` are world-space footprints
/// of other entities. Returns false, with nothing moved, if the displaced
/// footprint overlaps any obstacle, or a blocker the player does not
/// already overlap. Players stacked on the same spot can always walk
/// apart. On success the
/// camera pans by `delta`, so every movable shifts by `-delta` on screen
/// while the player keeps its screen position.
pub fn resolve(
    player: &mut LocalPlayer,
    direction: Direction,
    delta: Position,
    obstacles: &ObstacleField,
    blockers: &[Rect],
    camera: &mut Camera,
) -> bool {
    let current = player.footprint();
    let candidate = current.translated(delta);

    let blocked = obstacles
        .iter()
        .any(|rect| candidate.overlaps(&camera.to_screen(*rect)))
        || blockers
            .iter()
            .map(|rect| camera.to_screen(*rect))
            .any(|rect| !current.overlaps(&rect) && candidate.overlaps(&rect));

    if blocked {
        trace!("Move {:?} blocked at {:?}", direction, player.world_position());
        return false;
    }

    camera.pan(delta);
    player.step_world(delta);
    true
}
