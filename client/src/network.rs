//! UDP connection to the relay, run on its own thread

use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    Packet, PeerId, PlayerSnapshot, CONNECTION_TIMEOUT_MS, HEARTBEAT_INTERVAL_MS,
    PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What the game loop learns from the connection, drained between frames.
#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    Opened { id: PeerId },
    Snapshot(PlayerSnapshot),
    Left { id: PeerId },
    Rejected { reason: String },
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("network channel is closed")]
    Closed,
}

/// The game loop's view of the connection.
pub trait Channel {
    fn send(&mut self, packet: Packet) -> Result<(), ChannelError>;
    fn try_recv(&mut self) -> Option<NetEvent>;
}

pub struct NetworkHandle {
    outbound: mpsc::UnboundedSender<Packet>,
    inbound: mpsc::UnboundedReceiver<NetEvent>,
    thread: Option<JoinHandle<()>>,
}

impl NetworkHandle {
    /// Starts the connection thread. Joining happens in the background;
    /// `NetEvent::Opened` reports when the server accepted us.
    pub fn spawn(server: &str, room: &str, fake_ping_ms: u64) -> Result<Self, BoxError> {
        let server_addr: SocketAddr = server.parse()?;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let connection = Connection::new(server_addr, room.to_string(), fake_ping_ms);

        let thread = std::thread::Builder::new()
            .name("network".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Failed to start network runtime: {}", e);
                        let _ = inbound_tx.send(NetEvent::Closed);
                        return;
                    }
                };
                runtime.block_on(connection.run(outbound_rx, inbound_tx));
            })?;

        Ok(Self {
            outbound,
            inbound,
            thread: Some(thread),
        })
    }

    /// Closes the outbound side and waits for the connection thread to
    /// finish. A still-joined connection says goodbye on its way out.
    pub fn shutdown(self) {
        let Self { outbound, thread, .. } = self;
        drop(outbound);
        if let Some(thread) = thread {
            if thread.join().is_err() {
                error!("Network thread panicked");
            }
        }
    }
}

impl Channel for NetworkHandle {
    fn send(&mut self, packet: Packet) -> Result<(), ChannelError> {
        self.outbound.send(packet).map_err(|_| ChannelError::Closed)
    }

    fn try_recv(&mut self) -> Option<NetEvent> {
        self.inbound.try_recv().ok()
    }
}

struct Connection {
    server_addr: SocketAddr,
    room: String,
    fake_ping_ms: u64,
    joined: bool,
    last_seen: Instant,
}

impl Connection {
    fn new(server_addr: SocketAddr, room: String, fake_ping_ms: u64) -> Self {
        Self {
            server_addr,
            room,
            fake_ping_ms,
            joined: false,
            last_seen: Instant::now(),
        }
    }

    fn join_packet(&self) -> Packet {
        Packet::Join {
            client_version: PROTOCOL_VERSION,
            room: self.room.clone(),
        }
    }

    async fn send_packet(&self, socket: &UdpSocket, packet: &Packet) -> Result<(), BoxError> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet) -> Option<NetEvent> {
        match packet {
            Packet::Joined { id } => {
                info!("Joined room {} as {}", self.room, id);
                self.joined = true;
                Some(NetEvent::Opened { id })
            }
            Packet::Snapshot(snapshot) => Some(NetEvent::Snapshot(snapshot)),
            Packet::Left { id } => Some(NetEvent::Left { id }),
            Packet::Rejected { reason } => Some(NetEvent::Rejected { reason }),
            Packet::Heartbeat => None,
            _ => {
                warn!("Unexpected packet type from server");
                None
            }
        }
    }

    async fn run(
        mut self,
        mut outbound: mpsc::UnboundedReceiver<Packet>,
        inbound: mpsc::UnboundedSender<NetEvent>,
    ) {
        let socket = match UdpSocket::bind("0.0.0.0:0").await {
            Ok(socket) => socket,
            Err(e) => {
                error!("Failed to bind client socket: {}", e);
                let _ = inbound.send(NetEvent::Closed);
                return;
            }
        };

        info!("Connecting to {} (room {})...", self.server_addr, self.room);
        if let Err(e) = self.send_packet(&socket, &self.join_packet()).await {
            error!("Error sending join: {}", e);
        }

        let timeout = Duration::from_millis(CONNECTION_TIMEOUT_MS);
        let mut heartbeat = interval(Duration::from_millis(HEARTBEAT_INTERVAL_MS));
        let mut buffer = [0u8; 2048];

        // Skip the first tick since it fires immediately
        heartbeat.tick().await;

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, addr)) if addr == self.server_addr => {
                            match deserialize::<Packet>(&buffer[..len]) {
                                Ok(packet) => {
                                    self.last_seen = Instant::now();
                                    let rejected = matches!(packet, Packet::Rejected { .. });
                                    if let Some(event) = self.handle_packet(packet) {
                                        if inbound.send(event).is_err() {
                                            break;
                                        }
                                    }
                                    if rejected {
                                        break;
                                    }
                                }
                                Err(e) => warn!("Failed to deserialize packet: {}", e),
                            }
                        }
                        Ok((_, addr)) => debug!("Ignoring datagram from {}", addr),
                        Err(e) => {
                            error!("Error receiving packet: {}", e);
                            sleep(Duration::from_millis(10)).await;
                        }
                    }
                },

                packet = outbound.recv() => {
                    match packet {
                        Some(Packet::Leave) | None => {
                            if self.joined {
                                if let Err(e) = self.send_packet(&socket, &Packet::Leave).await {
                                    error!("Error sending leave: {}", e);
                                }
                            }
                            break;
                        }
                        Some(packet) if !self.joined => {
                            debug!("Not joined yet, dropping {:?}", packet);
                        }
                        Some(packet) => {
                            if let Err(e) = self.send_packet(&socket, &packet).await {
                                error!("Error sending packet: {}", e);
                            }
                        }
                    }
                },

                _ = heartbeat.tick() => {
                    if self.last_seen.elapsed() > timeout {
                        warn!("No word from the server for {:?}", timeout);
                        break;
                    }
                    let packet = if self.joined { Packet::Heartbeat } else { self.join_packet() };
                    if let Err(e) = self.send_packet(&socket, &packet).await {
                        error!("Error sending heartbeat: {}", e);
                    }
                },
            }
        }

        info!("Connection to {} closed", self.server_addr);
        let _ = inbound.send(NetEvent::Closed);
    }
}
