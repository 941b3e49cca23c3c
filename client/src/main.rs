use clap::Parser;
use client::assets::load_assets;
use client::game::{Game, GameConfig, World};
use client::input::InputManager;
use client::movement::RemoteCollision;
use client::network::{BoxError, NetworkHandle};
use client::obstacles::{Layout, ObstacleField, DEFAULT_LAYOUT};
use client::player::LocalPlayer;
use client::rendering::{draw_hud, HudInfo, MacroquadSurface, Renderer};
use log::{error, info, warn};
use macroquad::prelude::*;
use shared::{CANVAS_HEIGHT, CANVAS_WIDTH};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Room to join on the server
    #[arg(short = 'r', long, default_value = "lobby")]
    room: String,

    /// Directory holding the sprite images
    #[arg(short = 'a', long, default_value = "client/assets")]
    assets: PathBuf,

    /// Collision layout JSON file (the built-in lobby layout if omitted)
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Whether remote players block the local player
    #[arg(long, value_enum, default_value_t = RemoteCollision::Block)]
    remote_collision: RemoteCollision,

    /// Tint obstacle rectangles so they are visible
    #[arg(long)]
    show_obstacles: bool,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Lobby".to_string(),
        window_width: CANVAS_WIDTH as i32,
        window_height: CANVAS_HEIGHT as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    if let Err(e) = run(Args::parse()).await {
        error!("Client failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), BoxError> {
    info!("Starting client...");

    let layout = match &args.layout {
        Some(path) => Layout::load(path)?,
        None => Layout::from_json(DEFAULT_LAYOUT)?,
    };
    let obstacles = ObstacleField::build(&layout)?;

    info!("Connecting to: {} (room {})", args.server, args.room);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    let network = match NetworkHandle::spawn(&args.server, &args.room, args.fake_ping) {
        Ok(network) => Some(network),
        Err(e) => {
            warn!("Network unavailable ({}), playing offline", e);
            None
        }
    };

    let assets = load_assets(&args.assets).await;
    let renderer = Renderer::new(args.show_obstacles);
    let mut surface = MacroquadSurface;
    let mut input = InputManager::default();

    let config = GameConfig {
        remote_collision: args.remote_collision,
    };
    let mut game = Game::new(World::new(obstacles, LocalPlayer::spawned()), config, network);

    prevent_quit();
    game.start();
    info!("Controls: ZQSD, WASD or arrows to move, Escape to quit");

    while game.is_running() {
        if is_key_pressed(KeyCode::Escape) || is_quit_requested() {
            game.stop();
            break;
        }

        input.poll(game.input_mut());
        game.step(&renderer, &mut surface, &assets);

        draw_hud(&HudInfo {
            local_id: game
                .sync()
                .local_id()
                .filter(|_| game.sync().is_open())
                .map(|id| id.to_string()),
            room: args.room.clone(),
            player_count: game.world().remotes.len() + 1,
        });

        next_frame().await;
    }

    input.detach(game.input_mut());
    if let Some(network) = game.take_channel() {
        network.shutdown();
    }
    info!("Client stopped");
    Ok(())
}
