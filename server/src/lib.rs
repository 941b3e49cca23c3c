//! # Lobby Relay Server Library
//!
//! A small UDP relay for the shared lobby. The server does not simulate
//! anything: clients move themselves and report snapshots, and the server
//! forwards each snapshot to everyone else in the same room.
//!
//! ## Core Responsibilities
//!
//! ### Room Membership
//! Each client joins one named room. The server assigns it a peer id
//! (`p1`, `p2`, ...), sends it the last known snapshot of every room mate,
//! and announces the newcomer at the spawn point.
//!
//! ### Snapshot Relay
//! Incoming snapshots are stamped with the sender's id, whatever id they
//! claim, stored as that peer's last known state, and relayed to the rest of
//! the room.
//!
//! ### Departure
//! An explicit leave or a missed heartbeat window removes the peer and
//! broadcasts `Left` to its room.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Peer registry: id assignment, address lookup, capacity limit, room
//! membership and timeout sweeps.
//!
//! ### Game Module (`game`)
//! Last known snapshot per peer, grouped by room.
//!
//! ### Network Module (`network`)
//! UDP socket, packet handling and the async tasks around it.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // Bind to an address, allow 32 peers, drop peers silent for 5 seconds
//!     let mut server = Server::new("127.0.0.1:8080", 32, Duration::from_secs(5)).await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! The server runs these internal async tasks:
//! - **Network Receiver**: Continuously listens for incoming packets
//! - **Network Sender**: Processes outgoing packets and room broadcasts
//! - **Timeout Checker**: Removes peers that stopped sending heartbeats
//! - **Main Loop**: Applies packets to the registry and queues replies

pub mod client_manager;
pub mod game;
pub mod network;
