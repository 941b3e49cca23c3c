//! Server network layer handling UDP communications and room relaying

use crate::client_manager::ClientManager;
use crate::game::GameState;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, PeerId, PlayerSnapshot, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: PeerId, room: String },
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        room: String,
        exclude: Option<PeerId>,
    },
}

/// Relay server: joins peers into rooms and forwards their snapshots
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    client_timeout: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
        client_timeout: Duration,
    ) -> Result<Self, BoxError> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game_state: GameState::new(),
            client_timeout,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BoxError> {
        Ok(self.socket.local_addr()?)
    }

    /// Sender for injecting messages into the main loop, e.g. `Shutdown`.
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket {
                        packet,
                        room,
                        exclude,
                    } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.room_addrs(&room, exclude.as_ref())
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.client_timeout;

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(timeout)
                };

                for client in timed_out {
                    info!("Client {} timed out", client.id);
                    let message = ServerMessage::ClientTimeout {
                        client_id: client.id,
                        room: client.room,
                    };
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), BoxError> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, room: &str, exclude: Option<&PeerId>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet,
            room: room.to_string(),
            exclude: exclude.cloned(),
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Drops a peer from the game state and tells its room mates.
    fn player_left(&mut self, client_id: &PeerId, room: &str) {
        self.game_state.remove_player(room, client_id);
        self.broadcast_packet(
            Packet::Left {
                id: client_id.clone(),
            },
            room,
            Some(client_id),
        );
    }

    async fn handle_join(&mut self, client_version: u32, room: String, addr: SocketAddr) {
        info!(
            "Client joining from {} (version: {}, room: {})",
            addr, client_version, room
        );

        if client_version != PROTOCOL_VERSION {
            let reason = format!(
                "Protocol version mismatch: server {}, client {}",
                PROTOCOL_VERSION, client_version
            );
            self.send_packet(Packet::Rejected { reason }, addr);
            return;
        }

        // A re-join from the same address replaces the old session
        let existing = {
            let mut clients = self.clients.write().await;
            clients
                .find_client_by_addr(addr)
                .and_then(|id| clients.remove_client(&id))
        };
        if let Some(existing) = existing {
            info!("Replacing existing client {} from {}", existing.id, addr);
            self.player_left(&existing.id, &existing.room);
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(addr, &room)
        };

        let Some(client_id) = client_id else {
            self.send_packet(
                Packet::Rejected {
                    reason: "Server full".to_string(),
                },
                addr,
            );
            return;
        };

        let spawned = self.game_state.add_player(&room, &client_id);
        self.send_packet(
            Packet::Joined {
                id: client_id.clone(),
            },
            addr,
        );
        for snapshot in self.game_state.room_snapshots(&room, Some(&client_id)) {
            self.send_packet(Packet::Snapshot(snapshot), addr);
        }
        self.broadcast_packet(Packet::Snapshot(spawned), &room, Some(&client_id));
    }

    async fn handle_snapshot(&mut self, snapshot: PlayerSnapshot, addr: SocketAddr) {
        let sender = {
            let mut clients = self.clients.write().await;
            clients.find_client_by_addr(addr).and_then(|id| {
                clients.touch(&id);
                clients.get(&id).map(|client| (id, client.room.clone()))
            })
        };

        let Some((client_id, room)) = sender else {
            debug!("Snapshot from unknown address {}", addr);
            return;
        };

        if let Some(stamped) = self.game_state.apply_snapshot(&room, &client_id, snapshot) {
            self.broadcast_packet(Packet::Snapshot(stamped), &room, Some(&client_id));
        }
    }

    /// Processes incoming packets and updates game state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Join {
                client_version,
                room,
            } => self.handle_join(client_version, room, addr).await,

            Packet::Snapshot(snapshot) => self.handle_snapshot(snapshot, addr).await,

            Packet::Heartbeat => {
                let known = {
                    let mut clients = self.clients.write().await;
                    clients
                        .find_client_by_addr(addr)
                        .map(|id| clients.touch(&id))
                        .unwrap_or(false)
                };
                if known {
                    self.send_packet(Packet::Heartbeat, addr);
                }
            }

            Packet::Leave => {
                let client = {
                    let mut clients = self.clients.write().await;
                    clients
                        .find_client_by_addr(addr)
                        .and_then(|id| clients.remove_client(&id))
                };

                if let Some(client) = client {
                    self.player_left(&client.id, &client.room);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Main server loop
    pub async fn run(&mut self) -> Result<(), BoxError> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut status_interval = interval(Duration::from_secs(60));

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id, room }) => {
                            self.player_left(&client_id, &room);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = status_interval.tick() => {
                    let client_count = {
                        let clients = self.clients.read().await;
                        clients.len()
                    };
                    if client_count > 0 {
                        debug!(
                            "{} clients in {} rooms",
                            client_count,
                            self.game_state.rooms.len()
                        );
                    }
                },
            }
        }

        Ok(())
    }
}
