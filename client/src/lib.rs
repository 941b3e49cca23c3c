//! # Lobby Client Library
//!
//! Client side of the shared lobby: a top-down scene where each player walks
//! around with the keyboard and sees everyone else in the same room.
//!
//! ## Architecture Overview
//!
//! The local player always stays in the middle of the screen. Walking moves
//! the camera instead, so the background, the foreground overlay, the
//! obstacles and every remote player scroll the opposite way. Obstacles are
//! static world rectangles; only their screen placement changes.
//!
//! A move is committed only when the player's footprint, shifted by one step,
//! overlaps nothing. Each committed move is published to the relay server as a
//! snapshot, and snapshots from other players update their on-screen proxies.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The per-frame loop and the world it drives:
//! - Loading, running and stopped states
//! - Network event draining between frames
//! - Animation selection, movement resolution and publishing
//!
//! ### Input Module (`input`)
//! Keyboard sampling with edge detection:
//! - ZQSD, WASD and arrow bindings
//! - Active direction and held-key tracking
//!
//! ### Movement Module (`movement`)
//! The camera and the collision-checked step.
//!
//! ### Network Module (`network`)
//! UDP connection to the relay on a background thread, exposed to the loop
//! as a non-blocking channel.
//!
//! ### Sync Module (`sync`)
//! Remote player registry and the outbound snapshot policy.
//!
//! ### Rendering Module (`rendering`)
//! Layered drawing in a fixed back-to-front order, plus the HUD.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::game::{Game, GameConfig, World};
//! use client::network::NetworkHandle;
//! use client::obstacles::{Layout, ObstacleField, DEFAULT_LAYOUT};
//! use client::player::LocalPlayer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let obstacles = ObstacleField::build(&Layout::from_json(DEFAULT_LAYOUT)?)?;
//! let network = NetworkHandle::spawn("127.0.0.1:8080", "lobby", 0)?;
//! let world = World::new(obstacles, LocalPlayer::spawned());
//!
//! let mut game = Game::new(world, GameConfig::default(), Some(network));
//! game.start();
//! // Each frame: poll input into game.input_mut(), then game.step(...)
//! # Ok(())
//! # }
//! ```

pub mod animation;
pub mod assets;
pub mod game;
pub mod input;
pub mod movement;
pub mod network;
pub mod obstacles;
pub mod player;
pub mod rendering;
pub mod sync;
