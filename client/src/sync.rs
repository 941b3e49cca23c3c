//! Replication of the local player and the set of remote players

use crate::network::NetEvent;
use crate::player::{LocalPlayer, RemotePlayer};
use log::{debug, info, warn};
use shared::{PeerId, PlayerSnapshot, Rect};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Joined,
    Updated,
    Ignored,
}

/// Remote players keyed by id. Iteration order is id order, which fixes the
/// order they are drawn in.
#[derive(Debug, Clone, Default)]
pub struct RemotePlayers {
    players: BTreeMap<PeerId, RemotePlayer>,
}

impl RemotePlayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the proxy on first sight of an id, overwrites it afterwards.
    pub fn apply_snapshot(&mut self, snapshot: PlayerSnapshot) -> SnapshotOutcome {
        match self.players.get_mut(&snapshot.id) {
            Some(player) => {
                player.apply(&snapshot);
                SnapshotOutcome::Updated
            }
            None => {
                info!("Player {} joined at {:?}", snapshot.id, snapshot.position);
                self.players
                    .insert(snapshot.id.clone(), RemotePlayer::from_snapshot(snapshot));
                SnapshotOutcome::Joined
            }
        }
    }

    /// Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: &PeerId) -> bool {
        match self.players.remove(id) {
            Some(_) => {
                info!("Player {} left", id);
                true
            }
            None => {
                debug!("Departure for unknown player {}", id);
                false
            }
        }
    }

    pub fn clear(&mut self) -> usize {
        let count = self.players.len();
        self.players.clear();
        count
    }

    pub fn get(&self, id: &PeerId) -> Option<&RemotePlayer> {
        self.players.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// World-space footprints, for collision tests against the local player.
    pub fn footprints(&self) -> Vec<Rect> {
        self.players.values().map(RemotePlayer::footprint).collect()
    }

    /// Steps the walk cycle of every remote that last reported moving.
    pub fn advance_animations(&mut self) {
        for player in self.players.values_mut() {
            player.animator.advance();
        }
    }
}

/// Tracks the connection state and decides what to publish each frame
#[derive(Debug, Default)]
pub struct Synchronizer {
    open: bool,
    local_id: Option<PeerId>,
    sent_moving: bool,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.local_id.as_ref()
    }

    pub fn handle_event(&mut self, event: NetEvent, remotes: &mut RemotePlayers) {
        match event {
            NetEvent::Opened { id } => {
                info!("Connected to the server as {}", id);
                self.open = true;
                self.local_id = Some(id);
            }
            NetEvent::Snapshot(snapshot) => {
                if Some(&snapshot.id) == self.local_id.as_ref() {
                    return;
                }
                remotes.apply_snapshot(snapshot);
            }
            NetEvent::Left { id } => {
                remotes.remove(&id);
            }
            NetEvent::Rejected { reason } => {
                warn!("Server rejected the session: {}", reason);
                self.open = false;
                self.local_id = None;
            }
            NetEvent::Closed => {
                let dropped = remotes.clear();
                if self.open {
                    warn!(
                        "Connection closed, continuing offline ({} remote players dropped)",
                        dropped
                    );
                }
                self.open = false;
                self.local_id = None;
            }
        }
    }

    /// Snapshot to publish after this frame's movement, if any: one per
    /// committed move, plus a single stop notice when movement ends.
    pub fn outbound(&mut self, local: &LocalPlayer, committed: bool) -> Option<PlayerSnapshot> {
        if !committed && !self.sent_moving {
            return None;
        }
        self.sent_moving = committed;

        match (&self.local_id, self.open) {
            (Some(id), true) => Some(local.snapshot(id.clone(), committed)),
            _ => {
                debug!("Channel not open, dropping local snapshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Phase;
    use shared::{Direction, Position};

    fn snapshot(id: &str, x: f32, y: f32, facing: Direction, moving: bool) -> PlayerSnapshot {
        PlayerSnapshot {
            id: PeerId::from(id),
            position: Position::new(x, y),
            facing,
            moving,
        }
    }

    fn opened(id: &str) -> (Synchronizer, RemotePlayers) {
        let mut sync = Synchronizer::new();
        let mut remotes = RemotePlayers::new();
        sync.handle_event(NetEvent::Opened { id: PeerId::from(id) }, &mut remotes);
        (sync, remotes)
    }

    #[test]
    fn test_first_snapshot_creates_remote() {
        let mut remotes = RemotePlayers::new();
        let outcome = remotes.apply_snapshot(snapshot("p2", 50.0, 50.0, Direction::Down, true));

        assert_eq!(outcome, SnapshotOutcome::Joined);
        assert_eq!(remotes.len(), 1);
        let remote = remotes.get(&PeerId::from("p2")).unwrap();
        assert_eq!(remote.position, Position::new(50.0, 50.0));
        assert_eq!(remote.facing, Direction::Down);
        assert_eq!(remote.animator.phase(), Phase::Moving(Direction::Down));
    }

    #[test]
    fn test_second_snapshot_updates_in_place() {
        let mut remotes = RemotePlayers::new();
        remotes.apply_snapshot(snapshot("p2", 50.0, 50.0, Direction::Down, true));
        let outcome = remotes.apply_snapshot(snapshot("p2", 53.0, 50.0, Direction::Right, false));

        assert_eq!(outcome, SnapshotOutcome::Updated);
        assert_eq!(remotes.len(), 1);
        let remote = remotes.get(&PeerId::from("p2")).unwrap();
        assert_eq!(remote.position, Position::new(53.0, 50.0));
        assert_eq!(remote.facing, Direction::Right);
        assert!(!remote.moving);
    }

    #[test]
    fn test_repeated_snapshot_is_idempotent() {
        let update = snapshot("p3", 10.0, 20.0, Direction::Up, false);

        let mut once = RemotePlayers::new();
        once.apply_snapshot(update.clone());

        let mut twice = RemotePlayers::new();
        twice.apply_snapshot(update.clone());
        twice.apply_snapshot(update);

        assert_eq!(once.len(), twice.len());
        let a = once.get(&PeerId::from("p3")).unwrap();
        let b = twice.get(&PeerId::from("p3")).unwrap();
        assert_eq!(a.position, b.position);
        assert_eq!(a.facing, b.facing);
        assert_eq!(a.moving, b.moving);
        assert_eq!(a.animator.phase(), b.animator.phase());
    }

    #[test]
    fn test_departure_removes_and_unknown_is_noop() {
        let (mut sync, mut remotes) = opened("p1");
        sync.handle_event(
            NetEvent::Snapshot(snapshot("p2", 0.0, 0.0, Direction::Left, false)),
            &mut remotes,
        );

        sync.handle_event(NetEvent::Left { id: PeerId::from("p9") }, &mut remotes);
        assert_eq!(remotes.len(), 1);

        sync.handle_event(NetEvent::Left { id: PeerId::from("p2") }, &mut remotes);
        assert!(remotes.is_empty());

        sync.handle_event(NetEvent::Left { id: PeerId::from("p2") }, &mut remotes);
        assert!(remotes.is_empty());
    }

    #[test]
    fn test_out_of_order_delivery_converges() {
        let mut a = RemotePlayers::new();
        a.apply_snapshot(snapshot("p2", 1.0, 1.0, Direction::Up, true));
        a.apply_snapshot(snapshot("p3", 2.0, 2.0, Direction::Down, true));

        let mut b = RemotePlayers::new();
        b.apply_snapshot(snapshot("p3", 2.0, 2.0, Direction::Down, true));
        b.apply_snapshot(snapshot("p2", 1.0, 1.0, Direction::Up, true));

        let ids_a: Vec<&PeerId> = a.iter().map(|p| &p.id).collect();
        let ids_b: Vec<&PeerId> = b.iter().map(|p| &p.id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_own_snapshot_is_ignored() {
        let (mut sync, mut remotes) = opened("p1");
        sync.handle_event(
            NetEvent::Snapshot(snapshot("p1", 0.0, 0.0, Direction::Left, true)),
            &mut remotes,
        );
        assert!(remotes.is_empty());
    }

    #[test]
    fn test_closed_channel_drops_remotes() {
        let (mut sync, mut remotes) = opened("p1");
        sync.handle_event(
            NetEvent::Snapshot(snapshot("p2", 0.0, 0.0, Direction::Left, false)),
            &mut remotes,
        );
        sync.handle_event(NetEvent::Closed, &mut remotes);

        assert!(!sync.is_open());
        assert!(sync.local_id().is_none());
        assert!(remotes.is_empty());
    }

    #[test]
    fn test_rejection_forgets_local_id() {
        let (mut sync, mut remotes) = opened("p1");
        sync.handle_event(
            NetEvent::Rejected {
                reason: "Server full".to_string(),
            },
            &mut remotes,
        );

        assert!(!sync.is_open());
        assert!(sync.local_id().is_none());
        assert!(sync.outbound(&LocalPlayer::spawned(), true).is_none());
    }

    #[test]
    fn test_outbound_only_on_committed_moves() {
        let (mut sync, _) = opened("p1");
        let local = LocalPlayer::spawned();

        assert!(sync.outbound(&local, false).is_none());

        let sent = sync.outbound(&local, true).unwrap();
        assert_eq!(sent.id, PeerId::from("p1"));
        assert!(sent.moving);
        assert!(sync.outbound(&local, true).is_some());

        // One stop notice, then silence
        let stop = sync.outbound(&local, false).unwrap();
        assert!(!stop.moving);
        assert!(sync.outbound(&local, false).is_none());
        assert!(sync.outbound(&local, false).is_none());
    }

    #[test]
    fn test_outbound_dropped_before_open() {
        let mut sync = Synchronizer::new();
        let local = LocalPlayer::spawned();
        assert!(sync.outbound(&local, true).is_none());
        assert!(sync.local_id().is_none());
    }

    #[test]
    fn test_remote_animations_advance_only_while_moving() {
        let mut remotes = RemotePlayers::new();
        remotes.apply_snapshot(snapshot("p2", 0.0, 0.0, Direction::Left, true));
        remotes.apply_snapshot(snapshot("p3", 0.0, 0.0, Direction::Left, false));

        for _ in 0..crate::animation::DEFAULT_CADENCE {
            remotes.advance_animations();
        }
        assert_eq!(remotes.get(&PeerId::from("p2")).unwrap().animator.frame(), 1);
        assert_eq!(remotes.get(&PeerId::from("p3")).unwrap().animator.frame(), 0);
    }
}
