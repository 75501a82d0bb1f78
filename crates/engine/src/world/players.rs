//! Remote player positions, indexed both ways.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::position::{ChunkPos, Position};

/// Server-assigned player identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// The id the server uses when it moves the local player.
    pub const LOCAL: PlayerId = PlayerId(0);

    pub const fn is_local(self) -> bool {
        self.0 == Self::LOCAL.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `id -> position` and `position -> ids`, kept mutually consistent.
///
/// Every id in `by_id` appears in exactly one bucket of `by_cell`, and no
/// bucket is ever left empty.
#[derive(Debug, Default)]
pub struct PlayerIndex {
    by_id: HashMap<PlayerId, Position>,
    by_cell: HashMap<Position, HashSet<PlayerId>>,
}

impl PlayerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move (or introduce) a player. Returns the previous position.
    pub fn moved(&mut self, id: PlayerId, pos: Position) -> Option<Position> {
        let previous = self.by_id.insert(id, pos);
        if let Some(old) = previous {
            self.unbucket(id, old);
        }
        self.by_cell.entry(pos).or_default().insert(id);
        previous
    }

    /// Forget a player. Returns its last known position.
    pub fn remove(&mut self, id: PlayerId) -> Option<Position> {
        let pos = self.by_id.remove(&id)?;
        self.unbucket(id, pos);
        Some(pos)
    }

    fn unbucket(&mut self, id: PlayerId, pos: Position) {
        if let Some(bucket) = self.by_cell.get_mut(&pos) {
            bucket.remove(&id);
            if bucket.is_empty() {
                self.by_cell.remove(&pos);
            }
        }
    }

    pub fn position(&self, id: PlayerId) -> Option<Position> {
        self.by_id.get(&id).copied()
    }

    /// Ids standing on a cell, sorted.
    pub fn at(&self, pos: Position) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .by_cell
            .get(&pos)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Remove every player whose chunk fails `keep`. Returns who was removed
    /// and where they were.
    pub fn retain_chunks(&mut self, keep: impl Fn(ChunkPos) -> bool) -> Vec<(PlayerId, Position)> {
        let evicted: Vec<(PlayerId, Position)> = self
            .by_id
            .iter()
            .filter(|(_, pos)| !keep(pos.chunk))
            .map(|(id, pos)| (*id, *pos))
            .collect();
        for (id, _) in &evicted {
            self.remove(*id);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Number of occupied cells.
    pub fn bucket_count(&self) -> usize {
        self.by_cell.len()
    }
}
