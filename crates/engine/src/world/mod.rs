pub mod block;
pub mod chunk;
pub mod players;
pub mod position;
pub mod snapshot;

use std::collections::HashSet;
use std::sync::RwLock;

use block::Block;
use chunk::Chunk;
use dashmap::{DashMap, DashSet};
use players::{PlayerId, PlayerIndex};
use position::{ChunkPos, LocalCell, Position};
use snapshot::ChunkSnapshot;

/// The local mirror of the world. Lock-sharded by chunk.
///
/// All methods take `&self`: `DashMap` gives per-shard interior mutability
/// for chunk data, and the live set and player index sit behind brief
/// `RwLock`s (no awaits while held).
pub struct WorldStore {
    chunk_size: usize,
    depth: usize,
    chunks: DashMap<ChunkPos, Chunk>,
    /// Chunks requested for reload that have not arrived yet.
    pending: DashSet<ChunkPos>,
    live: RwLock<HashSet<ChunkPos>>,
    players: RwLock<PlayerIndex>,
}

impl WorldStore {
    /// A store whose chunks are `chunk_size` wide and `chunk_size + 1` deep.
    pub fn new(chunk_size: usize) -> Self {
        Self::with_depth(chunk_size, chunk_size + 1)
    }

    pub fn with_depth(chunk_size: usize, depth: usize) -> Self {
        assert!(chunk_size > 0 && depth > 0, "chunk dimensions must be non-zero");
        Self {
            chunk_size,
            depth,
            chunks: DashMap::new(),
            pending: DashSet::new(),
            live: RwLock::new(HashSet::new()),
            players: RwLock::new(PlayerIndex::new()),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Normalize `y`/`x` into chunk bounds, carrying into the chunk index.
    pub fn clamp_coordinates(&self, pos: Position) -> Position {
        pos.normalized(self.chunk_size)
    }

    // ── Chunks ──────────────────────────────────────────────────────────

    /// Install a chunk, replacing any previous version wholesale.
    pub fn set_chunk(&self, pos: ChunkPos, snapshot: &ChunkSnapshot) {
        let (chunk, dropped) = Chunk::from_snapshot(snapshot, self.chunk_size, self.depth);
        if dropped > 0 {
            tracing::warn!(
                "Chunk ({}, {}): dropped {} cells outside {}x{}x{}",
                pos.y, pos.x, dropped, self.chunk_size, self.chunk_size, self.depth
            );
        }
        self.chunks.insert(pos, chunk);
        self.pending.remove(&pos);
    }

    pub fn get_chunk(&self, pos: &ChunkPos) -> Option<dashmap::mapref::one::Ref<'_, ChunkPos, Chunk>> {
        self.chunks.get(pos)
    }

    pub fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    /// Note that a snapshot for `pos` has been requested.
    pub fn mark_pending(&self, pos: ChunkPos) {
        if !self.has_chunk(pos) {
            self.pending.insert(pos);
        }
    }

    pub fn has_or_pending_chunk(&self, pos: ChunkPos) -> bool {
        self.has_chunk(pos) || self.pending.contains(&pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Drop every chunk not in `keep`, along with pending marks and any
    /// players standing in dropped chunks. Returns the evicted players.
    pub fn retain_chunks(&self, keep: &[ChunkPos]) -> Vec<(PlayerId, Position)> {
        let keep: HashSet<ChunkPos> = keep.iter().copied().collect();
        self.chunks.retain(|pos, _| keep.contains(pos));
        self.pending.retain(|pos| keep.contains(pos));
        self.players
            .write()
            .expect("player index poisoned")
            .retain_chunks(|pos| keep.contains(&pos))
    }

    // ── Cells ───────────────────────────────────────────────────────────

    /// Read a cell. Empty, out of bounds and non-resident all read as `None`.
    pub fn get_cell(&self, pos: Position) -> Option<Block> {
        self.chunks
            .get(&pos.chunk)
            .and_then(|chunk| chunk.get(pos.local()).cloned())
    }

    /// Write a cell of a resident chunk. Returns `false` when the chunk is not
    /// held locally or the cell is outside it.
    pub fn set_cell(&self, pos: Position, block: Option<Block>) -> bool {
        match self.chunks.get_mut(&pos.chunk) {
            Some(mut chunk) => chunk.set(pos.local(), block),
            None => false,
        }
    }

    /// Height of solid ground at or below `pos.z`: scan down while empty,
    /// stopping at the first solid cell or at 0.
    pub fn floor(&self, pos: Position) -> u32 {
        let Some(chunk) = self.chunks.get(&pos.chunk) else {
            return 0;
        };
        // Everything at or above `depth` is empty.
        let mut z = pos.z.min(self.depth as u32 - 1);
        while z > 0 && chunk.get(LocalCell::new(pos.y, pos.x, z)).is_none() {
            z -= 1;
        }
        z
    }

    /// Resting height for a standing entity: the first empty slot above the
    /// solid stack found by [`floor`](Self::floor).
    pub fn ceiling(&self, pos: Position) -> u32 {
        let mut z = self.floor(pos);
        let Some(chunk) = self.chunks.get(&pos.chunk) else {
            return z;
        };
        while chunk.get(LocalCell::new(pos.y, pos.x, z)).is_some() {
            z += 1;
        }
        z
    }

    /// One above the highest non-empty cell of a column.
    pub fn column_height(&self, chunk: ChunkPos, y: i64, x: i64) -> u32 {
        self.chunks
            .get(&chunk)
            .map_or(0, |c| c.column_height(y, x))
    }

    // ── Live chunks ─────────────────────────────────────────────────────

    /// Replace the set of chunks the server is streaming.
    pub fn set_live_chunks(&self, chunks: impl IntoIterator<Item = ChunkPos>) {
        let next: HashSet<ChunkPos> = chunks.into_iter().collect();
        *self.live.write().expect("live set poisoned") = next;
    }

    pub fn is_live_chunk(&self, pos: ChunkPos) -> bool {
        self.live.read().expect("live set poisoned").contains(&pos)
    }

    /// Live chunks, sorted.
    pub fn live_chunks(&self) -> Vec<ChunkPos> {
        let mut chunks: Vec<ChunkPos> = self
            .live
            .read()
            .expect("live set poisoned")
            .iter()
            .copied()
            .collect();
        chunks.sort();
        chunks
    }

    // ── Players ─────────────────────────────────────────────────────────

    /// Record a remote player's move. Returns where it was before.
    pub fn player_moved(&self, id: PlayerId, pos: Position) -> Option<Position> {
        self.players
            .write()
            .expect("player index poisoned")
            .moved(id, pos)
    }

    /// Forget a remote player. Returns its last known position, or `None` if
    /// the id was never seen.
    pub fn remove_player(&self, id: PlayerId) -> Option<Position> {
        self.players
            .write()
            .expect("player index poisoned")
            .remove(id)
    }

    pub fn player_position(&self, id: PlayerId) -> Option<Position> {
        self.players
            .read()
            .expect("player index poisoned")
            .position(id)
    }

    pub fn players_at(&self, pos: Position) -> Vec<PlayerId> {
        self.players.read().expect("player index poisoned").at(pos)
    }

    pub fn player_count(&self) -> usize {
        self.players.read().expect("player index poisoned").len()
    }

    /// Number of occupied cells in the player index.
    pub fn occupied_cell_count(&self) -> usize {
        self.players
            .read()
            .expect("player index poisoned")
            .bucket_count()
    }
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new(16)
    }
}
