use log::{debug, info};
use shared::{PeerId, PlayerSnapshot};
use std::collections::{BTreeMap, HashMap};

/// Last known snapshot of every peer, grouped by room
#[derive(Debug, Clone, Default)]
pub struct GameState {
    pub rooms: HashMap<String, BTreeMap<PeerId, PlayerSnapshot>>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a new peer at the spawn point and returns its snapshot.
    pub fn add_player(&mut self, room: &str, client_id: &PeerId) -> PlayerSnapshot {
        let snapshot = PlayerSnapshot::spawned(client_id.clone());

        info!(
            "Added player {} to room {} at ({}, {})",
            client_id, room, snapshot.position.x, snapshot.position.y
        );
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(client_id.clone(), snapshot.clone());
        snapshot
    }

    pub fn remove_player(&mut self, room: &str, client_id: &PeerId) -> bool {
        let Some(players) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = players.remove(client_id).is_some();
        if players.is_empty() {
            self.rooms.remove(room);
        }
        if removed {
            info!("Removed player {} from room {}", client_id, room);
        }
        removed
    }

    /// Stores a client report under the sender's id, whatever id it claims.
    /// Returns the stamped snapshot to relay, or None for unknown peers.
    pub fn apply_snapshot(
        &mut self,
        room: &str,
        client_id: &PeerId,
        mut snapshot: PlayerSnapshot,
    ) -> Option<PlayerSnapshot> {
        let stored = self.rooms.get_mut(room)?.get_mut(client_id)?;
        if snapshot.id != *client_id {
            debug!("Peer {} sent a snapshot claiming {}", client_id, snapshot.id);
        }
        snapshot.id = client_id.clone();
        *stored = snapshot.clone();
        Some(snapshot)
    }

    /// Snapshots of everyone in `room`, optionally leaving one peer out.
    pub fn room_snapshots(&self, room: &str, exclude: Option<&PeerId>) -> Vec<PlayerSnapshot> {
        self.rooms
            .get(room)
            .map(|players| {
                players
                    .values()
                    .filter(|snapshot| Some(&snapshot.id) != exclude)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn player_count(&self) -> usize {
        self.rooms.values().map(BTreeMap::len).sum()
    }
}
