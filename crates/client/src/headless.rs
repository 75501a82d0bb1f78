//! A view with no screen: it logs what a renderer would redraw and keeps the
//! visible chunks fresh across reconnects.

use std::sync::Arc;

use cubopolis_engine::world::position::{ChunkPos, Position};
use cubopolis_engine::world::WorldStore;

use crate::net::session::SessionHandle;
use crate::observer::WorldObserver;

pub struct HeadlessView {
    world: Arc<WorldStore>,
    handle: SessionHandle,
    visible: Vec<ChunkPos>,
}

impl HeadlessView {
    pub fn new(world: Arc<WorldStore>, handle: SessionHandle, visible: Vec<ChunkPos>) -> Self {
        Self {
            world,
            handle,
            visible,
        }
    }
}

impl WorldObserver for HeadlessView {
    /// Anything shown before the connection opened may be stale.
    fn now_online(&mut self) {
        for &chunk in &self.visible {
            self.world.mark_pending(chunk);
            self.handle.request_chunk_reload(chunk);
        }
        tracing::info!("Requested {} chunk snapshots", self.visible.len());
    }

    fn now_offline(&mut self) {
        tracing::info!("Offline, {} chunks cached", self.world.chunk_count());
    }

    fn chunk_subscription_changed(&mut self, chunks: &[ChunkPos]) {
        tracing::info!("Live chunks: {:?}", chunks);
    }

    fn chunk_updated(&mut self, chunk: ChunkPos) {
        let cells = self
            .world
            .get_chunk(&chunk)
            .map(|c| c.to_snapshot().len())
            .unwrap_or(0);
        tracing::info!("Chunk ({}, {}) redrawn, {} solid cells", chunk.y, chunk.x, cells);
    }

    fn cell_updated(&mut self, pos: Position) {
        let block = self.world.get_cell(pos);
        let players = self.world.players_at(pos);
        tracing::debug!(
            "Cell {:?} now {} with {} players",
            pos,
            block.as_ref().map(|b| b.as_str()).unwrap_or("empty"),
            players.len()
        );
    }

    fn text_received(&mut self, text: &str) {
        tracing::info!("[chat] {}", text);
    }

    fn local_player_moved(&mut self, pos: Position) {
        tracing::info!(
            "Local player at chunk ({}, {}) cell ({}, {}, {})",
            pos.chunk.y, pos.chunk.x, pos.y, pos.x, pos.z
        );
    }
}
