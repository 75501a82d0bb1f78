//! Single dispatch point for inbound events.
//!
//! Each decoded frame becomes a WorldStore mutation followed by a
//! notification, applied strictly in arrival order.

use std::sync::Arc;

use cubopolis_engine::world::position::ChunkPos;
use cubopolis_engine::world::WorldStore;

use crate::net::wire::Event;
use crate::observer::WorldObserver;
use crate::player::LocalPlayer;

pub struct EventRouter {
    world: Arc<WorldStore>,
    player: Arc<LocalPlayer>,
    observer: Box<dyn WorldObserver>,
}

impl EventRouter {
    pub fn new(world: Arc<WorldStore>, player: Arc<LocalPlayer>, observer: Box<dyn WorldObserver>) -> Self {
        Self {
            world,
            player,
            observer,
        }
    }

    pub fn dispatch(&mut self, event: Event) {
        match event {
            Event::CellSet { pos, block } => {
                // Stale pushes for chunks we no longer hold are dropped.
                if !self.world.has_chunk(pos.chunk) {
                    tracing::debug!(
                        "Dropping cell update for non-resident chunk ({}, {})",
                        pos.chunk.y, pos.chunk.x
                    );
                    return;
                }
                if self.world.set_cell(pos, block) {
                    self.observer.cell_updated(pos);
                } else {
                    tracing::debug!("Dropping out-of-bounds cell update {:?}", pos);
                }
            }
            Event::ChunkSnapshot { chunk, snapshot } => {
                tracing::debug!(
                    "Chunk ({}, {}) arrived with {} cells",
                    chunk.y, chunk.x, snapshot.len()
                );
                self.world.set_chunk(chunk, &snapshot);
                self.observer.chunk_updated(chunk);
            }
            Event::Text(text) => self.observer.text_received(&text),
            Event::PlayerMoved { id, pos } if id.is_local() => {
                let settled = self.player.set_position(pos);
                self.observer.local_player_moved(settled);
            }
            Event::PlayerMoved { id, pos } => {
                let previous = self.world.player_moved(id, pos);
                if let Some(previous) = previous.filter(|p| *p != pos) {
                    self.observer.cell_updated(previous);
                }
                self.observer.cell_updated(pos);
            }
            Event::PlayerLeft(id) => match self.world.remove_player(id) {
                Some(pos) => self.observer.cell_updated(pos),
                None => tracing::debug!("Player {} left without a known position", id),
            },
        }
    }

    pub fn now_online(&mut self) {
        tracing::info!("Now online");
        self.observer.now_online();
    }

    /// Nothing is live without a connection.
    pub fn now_offline(&mut self) {
        tracing::info!("Now offline");
        self.world.set_live_chunks(Vec::<ChunkPos>::new());
        self.observer.now_offline();
    }

    pub fn subscription_changed(&mut self, chunks: &[ChunkPos]) {
        self.world.set_live_chunks(chunks.iter().copied());
        self.observer.chunk_subscription_changed(chunks);
    }
}
