use std::sync::Arc;

use anyhow::{Context, Result};
use cubopolis_client::config::ClientConfig;
use cubopolis_client::headless::HeadlessView;
use cubopolis_client::net::session::{self, Session, SessionHandle};
use cubopolis_client::net::transport::TcpConnector;
use cubopolis_client::player::LocalPlayer;
use cubopolis_client::router::EventRouter;
use cubopolis_engine::world::position::ChunkPos;
use cubopolis_engine::world::WorldStore;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ClientConfig::from_args(&args).context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::info!("Cubopolis client");
    match ClientConfig::config_path(&args)? {
        Some(path) => tracing::info!("Loaded config from {}", path.display()),
        None => tracing::info!("No config file given, using defaults"),
    }
    tracing::info!(
        "Server {}, chunk size {}, depth {}, view radius {}",
        config.server_addr,
        config.chunk_size,
        config.depth(),
        config.view_radius
    );

    let connector = TcpConnector::new(&config.server_addr)?;

    // ── Local world mirror and the collaborators that feed it ──────────
    let world = Arc::new(WorldStore::with_depth(config.chunk_size, config.depth()));
    let (handle, mailbox) = session::channel();
    let player = Arc::new(LocalPlayer::new(Arc::clone(&world), handle.clone()));

    let visible = square_around(ChunkPos { y: 0, x: 0 }, config.view_radius as i64);
    let view = HeadlessView::new(Arc::clone(&world), handle.clone(), visible.clone());
    let router = EventRouter::new(Arc::clone(&world), Arc::clone(&player), Box::new(view));
    let session = Session::new(connector, mailbox, router, config.backoff());

    // Sent as soon as the first connection opens.
    handle.request_subscription(visible);

    tokio::spawn(console(handle, player));

    tokio::select! {
        _ = session.run() => {
            tracing::info!("Session ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down...");
        }
    }

    tracing::info!(
        "Exiting with {} chunks and {} remote players cached",
        world.chunk_count(),
        world.player_count()
    );
    Ok(())
}

/// Every chunk within `radius` of `center`, row by row.
fn square_around(center: ChunkPos, radius: i64) -> Vec<ChunkPos> {
    let mut chunks = Vec::new();
    for y in center.y - radius..=center.y + radius {
        for x in center.x - radius..=center.x + radius {
            chunks.push(ChunkPos { y, x });
        }
    }
    chunks
}

/// Line-oriented control from stdin. Plain lines are chat; `/step dy dx`,
/// `/tool n` and `/act dy dx` drive the local player.
async fn console(handle: SessionHandle, player: Arc<LocalPlayer>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(command) = line.strip_prefix('/') else {
            handle.request_send_text(line);
            continue;
        };

        let mut parts = command.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        let numbers: Vec<i64> = parts.filter_map(|p| p.parse().ok()).collect();
        match (verb, numbers.as_slice()) {
            ("step", &[dy, dx]) => {
                if !player.step(dy, dx, false) {
                    tracing::info!("Can't step there");
                }
            }
            ("tool", &[slot]) => {
                let selected = u8::try_from(slot).is_ok_and(|slot| player.select_tool(slot));
                if !selected {
                    tracing::info!("No tool in slot {}", slot);
                }
            }
            ("act", &[dy, dx]) => match player.act(dy, dx) {
                Some((pos, _)) => tracing::debug!("Requested change at {:?}", pos),
                None => tracing::info!("That chunk is not live"),
            },
            _ => tracing::info!("Unknown command: {}", line),
        }
    }
}
