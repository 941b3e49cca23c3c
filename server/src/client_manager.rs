//! Connected peer registry for the relay server
//!
//! Tracks which address belongs to which peer, which room each peer joined,
//! and when each peer was last heard from. Capacity is enforced here.

use log::info;
use shared::PeerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected peer
#[derive(Debug, Clone)]
pub struct Client {
    /// Server-assigned id, `p1`, `p2`, ...
    pub id: PeerId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Room the peer joined
    pub room: String,
    /// Last time we received any packet from this peer
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: PeerId, addr: SocketAddr, room: String) -> Self {
        Self {
            id,
            addr,
            room,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// True if nothing arrived from this peer within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Every connected peer, indexed by id
pub struct ClientManager {
    clients: HashMap<PeerId, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    /// Ids start at `p1` and are never reused.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a peer in `room`. Returns None when the server is full.
    pub fn add_client(&mut self, addr: SocketAddr, room: &str) -> Option<PeerId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = PeerId::new(format!("p{}", self.next_client_id));
        self.next_client_id += 1;

        info!("Client {} connected from {} (room {})", client_id, addr, room);
        self.clients.insert(
            client_id.clone(),
            Client::new(client_id.clone(), addr, room.to_string()),
        );

        Some(client_id)
    }

    /// Removes a peer and hands back its record, if it was still connected.
    pub fn remove_client(&mut self, client_id: &PeerId) -> Option<Client> {
        let client = self.clients.remove(client_id)?;
        info!("Client {} disconnected", client.id);
        Some(client)
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<PeerId> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| client.id.clone())
    }

    pub fn get(&self, client_id: &PeerId) -> Option<&Client> {
        self.clients.get(client_id)
    }

    /// Refreshes the activity timestamp. Returns false for unknown ids.
    pub fn touch(&mut self, client_id: &PeerId) -> bool {
        match self.clients.get_mut(client_id) {
            Some(client) => {
                client.touch();
                true
            }
            None => false,
        }
    }

    /// Ids and addresses of everyone in `room`, optionally leaving one out.
    pub fn room_addrs(&self, room: &str, exclude: Option<&PeerId>) -> Vec<(PeerId, SocketAddr)> {
        let mut addrs: Vec<(PeerId, SocketAddr)> = self
            .clients
            .values()
            .filter(|client| client.room == room && Some(&client.id) != exclude)
            .map(|client| (client.id.clone(), client.addr))
            .collect();
        addrs.sort_by(|a, b| a.0.cmp(&b.0));
        addrs
    }

    /// Removes and returns every peer silent for longer than `timeout`.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<Client> {
        let timed_out: Vec<PeerId> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(timeout))
            .map(|client| client.id.clone())
            .collect();

        timed_out
            .iter()
            .filter_map(|client_id| self.remove_client(client_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_client_creation() {
        let addr = test_addr();
        let client = Client::new(PeerId::from("p1"), addr, "lobby".to_string());

        assert_eq!(client.id, PeerId::from("p1"));
        assert_eq!(client.addr, addr);
        assert_eq!(client.room, "lobby");
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new(PeerId::from("p1"), test_addr(), "lobby".to_string());

        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));

        client.touch();
        assert!(!client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new(5);
        assert_eq!(manager.max_clients, 5);
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_multiple_clients() {
        let mut manager = ClientManager::new(3);

        let client_id1 = manager.add_client(test_addr(), "lobby").unwrap();
        let client_id2 = manager.add_client(test_addr2(), "lobby").unwrap();

        assert_eq!(client_id1, PeerId::from("p1"));
        assert_eq!(client_id2, PeerId::from("p2"));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);

        assert!(manager.add_client(test_addr(), "lobby").is_some());
        assert!(manager.add_client(test_addr2(), "lobby").is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut manager = ClientManager::new(2);

        let first = manager.add_client(test_addr(), "lobby").unwrap();
        manager.remove_client(&first);
        let second = manager.add_client(test_addr(), "lobby").unwrap();

        assert_ne!(first, second);
        assert_eq!(second, PeerId::from("p2"));
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new(2);
        let client_id = manager.add_client(test_addr(), "garden").unwrap();

        let removed = manager.remove_client(&client_id).unwrap();
        assert_eq!(removed.room, "garden");
        assert!(manager.is_empty());

        assert!(manager.remove_client(&client_id).is_none());
        assert!(manager.remove_client(&PeerId::from("p999")).is_none());
    }

    #[test]
    fn test_find_client_by_addr() {
        let mut manager = ClientManager::new(2);
        let client_id1 = manager.add_client(test_addr(), "lobby").unwrap();
        manager.add_client(test_addr2(), "lobby").unwrap();

        assert_eq!(manager.find_client_by_addr(test_addr()), Some(client_id1));

        let unknown_addr: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(manager.find_client_by_addr(unknown_addr), None);
    }

    #[test]
    fn test_room_addrs_filters_room_and_excluded() {
        let mut manager = ClientManager::new(4);
        let a = manager.add_client(test_addr(), "lobby").unwrap();
        let b = manager.add_client(test_addr2(), "lobby").unwrap();
        manager
            .add_client("127.0.0.1:8082".parse().unwrap(), "garden")
            .unwrap();

        let lobby = manager.room_addrs("lobby", None);
        assert_eq!(lobby.len(), 2);

        let others = manager.room_addrs("lobby", Some(&a));
        assert_eq!(others, vec![(b, test_addr2())]);

        assert!(manager.room_addrs("attic", None).is_empty());
    }

    #[test]
    fn test_check_timeouts() {
        let mut manager = ClientManager::new(2);
        let stale = manager.add_client(test_addr(), "lobby").unwrap();
        let fresh = manager.add_client(test_addr2(), "lobby").unwrap();

        if let Some(client) = manager.clients.get_mut(&stale) {
            client.last_seen = Instant::now() - Duration::from_secs(10);
        }

        let removed = manager.check_timeouts(Duration::from_secs(5));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, stale);
        assert!(manager.get(&fresh).is_some());
        assert!(manager.touch(&fresh));
        assert!(!manager.touch(&stale));
    }
}
