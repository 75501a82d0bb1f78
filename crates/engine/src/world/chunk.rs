use super::block::Block;
use super::position::LocalCell;
use super::snapshot::ChunkSnapshot;

/// A `size x size x depth` block of cells.
///
/// Stored as a flat array in YXZ order so a column scan (floor, ceiling)
/// walks contiguous memory. Chunks are always built whole; there is no
/// partially constructed state.
#[derive(Debug, Clone)]
pub struct Chunk {
    size: usize,
    depth: usize,
    cells: Box<[Option<Block>]>,
}

impl Chunk {
    pub fn new(size: usize, depth: usize) -> Self {
        Self {
            size,
            depth,
            cells: vec![None; size * size * depth].into_boxed_slice(),
        }
    }

    /// Build a chunk from a snapshot. Cells outside the chunk bounds are
    /// dropped; the count of dropped cells is returned alongside.
    pub fn from_snapshot(snapshot: &ChunkSnapshot, size: usize, depth: usize) -> (Self, usize) {
        let mut chunk = Self::new(size, depth);
        let mut dropped = 0;
        for (cell, block) in snapshot.cells() {
            if !chunk.set(*cell, Some(block.clone())) {
                dropped += 1;
            }
        }
        (chunk, dropped)
    }

    #[inline]
    fn index(&self, cell: LocalCell) -> Option<usize> {
        let in_bounds = (0..self.size as i64).contains(&cell.y)
            && (0..self.size as i64).contains(&cell.x)
            && (cell.z as usize) < self.depth;
        in_bounds.then(|| {
            (cell.y as usize) * self.size * self.depth
                + (cell.x as usize) * self.depth
                + cell.z as usize
        })
    }

    /// Read a cell. Out-of-bounds reads are empty.
    #[inline]
    pub fn get(&self, cell: LocalCell) -> Option<&Block> {
        self.index(cell).and_then(|i| self.cells[i].as_ref())
    }

    /// Write a cell. Returns `false` (and writes nothing) when out of bounds.
    #[inline]
    pub fn set(&mut self, cell: LocalCell, block: Option<Block>) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.cells[i] = block;
                true
            }
            None => false,
        }
    }

    /// One above the highest non-empty cell of a column, or 0.
    pub fn column_height(&self, y: i64, x: i64) -> u32 {
        (0..self.depth as u32)
            .rev()
            .find(|&z| self.get(LocalCell::new(y, x, z)).is_some())
            .map_or(0, |z| z + 1)
    }

    /// Every non-empty cell, in YXZ order.
    pub fn to_snapshot(&self) -> ChunkSnapshot {
        let mut snapshot = ChunkSnapshot::default();
        for y in 0..self.size as i64 {
            for x in 0..self.size as i64 {
                for z in 0..self.depth as u32 {
                    let cell = LocalCell::new(y, x, z);
                    if let Some(block) = self.get(cell) {
                        snapshot.push(cell, block.clone());
                    }
                }
            }
        }
        snapshot
    }
}
