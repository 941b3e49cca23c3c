use crate::assets::AssetStore;
use crate::input::InputState;
use crate::movement::{self, Camera, RemoteCollision};
use crate::network::Channel;
use crate::obstacles::ObstacleField;
use crate::player::LocalPlayer;
use crate::rendering::{PaintSurface, Renderer};
use crate::sync::{RemotePlayers, Synchronizer};
use log::{info, warn};
use shared::{Packet, PeerId, Rect};

#[derive(Debug, Clone, Copy, Default)]
pub struct GameConfig {
    pub remote_collision: RemoteCollision,
}

/// Everything drawn and collided with. Movables live in world space and are
/// shown at `world - camera`.
#[derive(Debug, Clone)]
pub struct World {
    pub obstacles: ObstacleField,
    pub camera: Camera,
    pub local: LocalPlayer,
    pub remotes: RemotePlayers,
}

/// Anything whose screen position scrolls with the world.
#[derive(Debug, Clone, PartialEq)]
pub enum Movable {
    Background,
    Foreground,
    Obstacle(usize),
    Remote(PeerId),
}

impl World {
    pub fn new(obstacles: ObstacleField, local: LocalPlayer) -> Self {
        Self {
            camera: Camera::following(&local),
            obstacles,
            local,
            remotes: RemotePlayers::new(),
        }
    }

    /// Screen rectangles of every movable this frame.
    pub fn movables(&self) -> Vec<(Movable, Rect)> {
        let bounds = self.camera.to_screen(self.obstacles.bounds());
        let mut movables = vec![(Movable::Background, bounds), (Movable::Foreground, bounds)];
        movables.extend(
            self.obstacles
                .iter()
                .enumerate()
                .map(|(i, rect)| (Movable::Obstacle(i), self.camera.to_screen(*rect))),
        );
        movables.extend(
            self.remotes
                .iter()
                .map(|remote| (Movable::Remote(remote.id.clone()), self.camera.to_screen(remote.sprite_rect()))),
        );
        movables
    }

    /// World-space footprints that block the local player besides obstacles.
    pub fn blockers(&self, policy: RemoteCollision) -> Vec<Rect> {
        match policy {
            RemoteCollision::Block => self.remotes.footprints(),
            RemoteCollision::PassThrough => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Loading,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub committed: bool,
    pub published: bool,
}

/// The render/update loop, independent of what schedules its frames.
pub struct Game<C: Channel> {
    state: LoopState,
    config: GameConfig,
    world: World,
    input: InputState,
    sync: Synchronizer,
    channel: Option<C>,
}

impl<C: Channel> Game<C> {
    pub fn new(world: World, config: GameConfig, channel: Option<C>) -> Self {
        Self {
            state: LoopState::Loading,
            config,
            world,
            input: InputState::new(),
            sync: Synchronizer::new(),
            channel,
        }
    }

    /// Called once assets are in; frames only run after this.
    pub fn start(&mut self) {
        if self.state == LoopState::Loading {
            info!("Game loop running");
            self.state = LoopState::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        if let Some(channel) = self.channel.as_mut() {
            if let Err(e) = channel.send(Packet::Leave) {
                warn!("Failed to send leave: {}", e);
            }
        }
        self.input.clear();
        self.state = LoopState::Stopped;
        info!("Game loop stopped");
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn sync(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn take_channel(&mut self) -> Option<C> {
        self.channel.take()
    }

    /// Applies every network event that arrived since the last frame.
    pub fn pump_network(&mut self) {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        while let Some(event) = channel.try_recv() {
            self.sync.handle_event(event, &mut self.world.remotes);
        }
    }

    /// One frame: network events, drawing, then input resolution.
    pub fn step<S: PaintSurface>(
        &mut self,
        renderer: &Renderer,
        surface: &mut S,
        assets: &AssetStore<S::Image>,
    ) -> FrameReport {
        if self.state != LoopState::Running {
            return FrameReport::default();
        }

        self.pump_network();
        renderer.draw_frame(surface, assets, &self.world);
        self.update()
    }

    /// Animation selection, movement and publishing for this frame.
    pub fn update(&mut self) -> FrameReport {
        if self.state != LoopState::Running {
            return FrameReport::default();
        }

        let moving = self.input.moving_direction();
        self.world
            .local
            .animator
            .select(self.input.active(), moving.is_some());

        let committed = match moving {
            Some(direction) => {
                let blockers = self.world.blockers(self.config.remote_collision);
                movement::resolve(
                    &mut self.world.local,
                    direction,
                    direction.delta(),
                    &self.world.obstacles,
                    &blockers,
                    &mut self.world.camera,
                )
            }
            None => false,
        };

        if committed {
            self.world.local.animator.advance();
        }
        self.world.remotes.advance_animations();

        let published = match self.sync.outbound(&self.world.local, committed) {
            Some(snapshot) => self.publish(Packet::Snapshot(snapshot)),
            None => false,
        };

        FrameReport {
            committed,
            published,
        }
    }

    fn publish(&mut self, packet: Packet) -> bool {
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };
        match channel.send(packet) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to publish snapshot: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Phase;
    use crate::network::{ChannelError, NetEvent};
    use shared::{Direction, PlayerSnapshot, Position, STEP};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct MemoryChannel {
        inbound: VecDeque<NetEvent>,
        sent: Vec<Packet>,
        closed: bool,
    }

    impl Channel for MemoryChannel {
        fn send(&mut self, packet: Packet) -> Result<(), ChannelError> {
            if self.closed {
                return Err(ChannelError::Closed);
            }
            self.sent.push(packet);
            Ok(())
        }

        fn try_recv(&mut self) -> Option<NetEvent> {
            self.inbound.pop_front()
        }
    }

    fn open_channel() -> MemoryChannel {
        let mut channel = MemoryChannel::default();
        channel.inbound.push_back(NetEvent::Opened {
            id: PeerId::from("p1"),
        });
        channel
    }

    fn game_with(obstacles: Vec<Rect>, config: GameConfig) -> Game<MemoryChannel> {
        let local = LocalPlayer::new(
            Position::new(100.0, 100.0),
            Position::new(100.0, 100.0),
            Rect::new(0.0, 0.0, 32.0, 32.0),
        );
        let world = World::new(ObstacleField::from_rects(obstacles).unwrap(), local);
        let mut game = Game::new(world, config, Some(open_channel()));
        game.start();
        game.pump_network();
        game
    }

    fn sent(game: &mut Game<MemoryChannel>) -> Vec<Packet> {
        game.channel.as_mut().map(|c| c.sent.clone()).unwrap_or_default()
    }

    #[test]
    fn test_loop_states() {
        let world = World::new(ObstacleField::empty(), LocalPlayer::spawned());
        let mut game: Game<MemoryChannel> = Game::new(world, GameConfig::default(), None);
        assert_eq!(game.state(), LoopState::Loading);

        game.input_mut().key_down(Direction::Up);
        assert_eq!(game.update(), FrameReport::default());

        game.start();
        assert!(game.is_running());
        assert!(game.update().committed);

        game.stop();
        assert_eq!(game.state(), LoopState::Stopped);
        assert!(!game.input().is_held(Direction::Up));
        assert_eq!(game.update(), FrameReport::default());
    }

    #[test]
    fn test_idle_frame_attempts_nothing() {
        let mut game = game_with(vec![], GameConfig::default());
        let camera = game.world().camera;

        let report = game.update();
        assert!(!report.committed);
        assert!(!report.published);
        assert_eq!(game.world().camera, camera);
        assert!(sent(&mut game).is_empty());
    }

    #[test]
    fn test_committed_moves_publish_once_each() {
        let mut game = game_with(vec![], GameConfig::default());
        game.input_mut().key_down(Direction::Right);

        for _ in 0..3 {
            let report = game.update();
            assert!(report.committed && report.published);
        }
        game.input_mut().key_up(Direction::Right);
        game.update();
        game.update();

        let packets = sent(&mut game);
        assert_eq!(packets.len(), 4);
        match packets.last() {
            Some(Packet::Snapshot(snapshot)) => {
                assert!(!snapshot.moving);
                assert_eq!(snapshot.id, PeerId::from("p1"));
                assert_eq!(snapshot.position, Position::new(100.0 + 3.0 * STEP, 100.0));
                assert_eq!(snapshot.facing, Direction::Right);
            }
            other => panic!("Unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_blocked_move_keeps_movables_in_place() {
        let mut game = game_with(
            vec![Rect::new(100.0, 130.0, 32.0, 32.0)],
            GameConfig::default(),
        );
        let before = game.world().movables();

        game.input_mut().key_down(Direction::Down);
        let report = game.update();

        assert!(!report.committed);
        assert_eq!(game.world().movables(), before);
        assert_eq!(
            game.world().local.animator.phase(),
            Phase::Moving(Direction::Down)
        );
        assert_eq!(game.world().local.animator.frame(), 0);
    }

    #[test]
    fn test_free_move_shifts_every_movable() {
        let mut game = game_with(
            vec![Rect::new(400.0, 400.0, 32.0, 32.0)],
            GameConfig::default(),
        );
        let mut channel_events = VecDeque::new();
        channel_events.push_back(NetEvent::Snapshot(PlayerSnapshot {
            id: PeerId::from("p2"),
            position: Position::new(300.0, 300.0),
            facing: Direction::Up,
            moving: false,
        }));
        if let Some(channel) = game.channel.as_mut() {
            channel.inbound.extend(channel_events);
        }
        game.pump_network();

        let before = game.world().movables();
        let screen = game.world().local.screen_position();
        game.input_mut().key_down(Direction::Left);
        assert!(game.update().committed);

        let after = game.world().movables();
        assert_eq!(before.len(), after.len());
        for ((kind_a, a), (kind_b, b)) in before.iter().zip(after.iter()) {
            assert_eq!(kind_a, kind_b);
            assert_eq!(b.origin(), a.origin().offset(Position::new(STEP, 0.0)));
        }
        assert_eq!(game.world().local.screen_position(), screen);
    }

    fn game_with_remote_ahead(policy: RemoteCollision) -> Game<MemoryChannel> {
        let mut game = game_with(
            vec![],
            GameConfig {
                remote_collision: policy,
            },
        );
        // Remote footprint sits 2 units right of the local footprint
        let remote_position = Position::new(
            134.0 - shared::PLAYER_FOOTPRINT.x,
            100.0 - shared::PLAYER_FOOTPRINT.y,
        );
        if let Some(channel) = game.channel.as_mut() {
            channel.inbound.push_back(NetEvent::Snapshot(PlayerSnapshot {
                id: PeerId::from("p2"),
                position: remote_position,
                facing: Direction::Left,
                moving: false,
            }));
        }
        game.pump_network();
        game.input_mut().key_down(Direction::Right);
        game
    }

    #[test]
    fn test_remote_players_block_when_configured() {
        let mut game = game_with_remote_ahead(RemoteCollision::Block);
        assert!(!game.update().committed);
    }

    #[test]
    fn test_remote_players_pass_through_when_configured() {
        let mut game = game_with_remote_ahead(RemoteCollision::PassThrough);
        assert!(game.update().committed);
    }

    #[test]
    fn test_can_walk_away_from_a_remote_on_the_spawn_point() {
        for direction in Direction::ALL {
            let world = World::new(ObstacleField::empty(), LocalPlayer::spawned());
            let mut game = Game::new(world, GameConfig::default(), Some(open_channel()));
            game.start();
            if let Some(channel) = game.channel.as_mut() {
                channel.inbound.push_back(NetEvent::Snapshot(PlayerSnapshot::spawned(
                    PeerId::from("p2"),
                )));
            }
            game.pump_network();
            assert_eq!(game.world().remotes.len(), 1);

            game.input_mut().key_down(direction);
            assert!(game.update().committed, "stuck moving {:?}", direction);
        }
    }

    #[test]
    fn test_remote_blocks_again_once_apart() {
        let mut game = game_with_remote_ahead(RemoteCollision::Block);
        game.input_mut().key_up(Direction::Right);
        game.input_mut().key_down(Direction::Left);
        assert!(game.update().committed);

        // Walking back stops short of the remote
        game.input_mut().key_up(Direction::Left);
        game.input_mut().key_down(Direction::Right);
        assert!(game.update().committed);
        assert!(!game.update().committed);
    }

    #[test]
    fn test_send_failure_does_not_stop_the_loop() {
        let mut game = game_with(vec![], GameConfig::default());
        if let Some(channel) = game.channel.as_mut() {
            channel.closed = true;
        }
        game.input_mut().key_down(Direction::Up);

        let report = game.update();
        assert!(report.committed);
        assert!(!report.published);
        assert!(game.is_running());
        assert!(game.update().committed);
    }

    #[test]
    fn test_closed_channel_keeps_local_play() {
        let mut game = game_with(vec![], GameConfig::default());
        if let Some(channel) = game.channel.as_mut() {
            channel.inbound.push_back(NetEvent::Snapshot(PlayerSnapshot::spawned(
                PeerId::from("p2"),
            )));
            channel.inbound.push_back(NetEvent::Closed);
        }
        game.pump_network();
        assert!(game.world().remotes.is_empty());

        game.input_mut().key_down(Direction::Down);
        let report = game.update();
        assert!(report.committed);
        assert!(!report.published);
    }

    #[derive(Default)]
    struct CountingSurface {
        frames: usize,
        images: usize,
    }

    impl PaintSurface for CountingSurface {
        type Image = ();

        fn clear(&mut self) {
            self.frames += 1;
        }

        fn draw_image(&mut self, _image: &(), _cell: crate::rendering::StripCell, _dest: Rect) {
            self.images += 1;
        }

        fn fill_rect(&mut self, _rect: Rect, _color: macroquad::color::Color) {}
    }

    #[test]
    fn test_step_drains_events_then_draws() {
        let world = World::new(ObstacleField::empty(), LocalPlayer::spawned());
        let mut game = Game::new(world, GameConfig::default(), Some(open_channel()));
        let renderer = Renderer::new(false);
        let assets = AssetStore::new(());
        let mut surface = CountingSurface::default();

        // Nothing happens while loading
        game.step(&renderer, &mut surface, &assets);
        assert_eq!(surface.frames, 0);
        assert!(!game.sync().is_open());

        game.start();
        game.input_mut().key_down(Direction::Left);
        let report = game.step(&renderer, &mut surface, &assets);

        assert_eq!(surface.frames, 1);
        // Background, local player, foreground
        assert_eq!(surface.images, 3);
        assert!(game.sync().is_open());
        assert!(report.committed && report.published);
    }

    #[test]
    fn test_stop_sends_leave() {
        let mut game = game_with(vec![], GameConfig::default());
        game.stop();
        game.stop();
        assert_eq!(sent(&mut game), vec![Packet::Leave]);
    }

    #[test]
    fn test_stop_on_closed_channel_still_stops() {
        let mut game = game_with(vec![], GameConfig::default());
        if let Some(channel) = game.channel.as_mut() {
            channel.closed = true;
        }
        game.stop();
        assert_eq!(game.state(), LoopState::Stopped);
        assert!(sent(&mut game).is_empty());
    }
}
