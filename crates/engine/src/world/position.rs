/// Chunk address: a horizontal tile of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub y: i64,
    pub x: i64,
}

impl ChunkPos {
    pub const fn new(y: i64, x: i64) -> Self {
        Self { y, x }
    }
}

/// A cell position: chunk, stack height and in-chunk row/column.
///
/// `y` and `x` are only meaningful inside `[0, chunk_size)`; anything built
/// from movement arithmetic should go through [`Position::normalized`]
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub chunk: ChunkPos,
    pub z: u32,
    pub y: i64,
    pub x: i64,
}

impl Position {
    pub const fn new(chunk_y: i64, chunk_x: i64, z: u32, y: i64, x: i64) -> Self {
        Self {
            chunk: ChunkPos::new(chunk_y, chunk_x),
            z,
            y,
            x,
        }
    }

    /// Carry any surplus or deficit of `y`/`x` into the chunk index so both
    /// land in `[0, chunk_size)`. Lossless: the absolute cell is unchanged,
    /// except that a chunk index past the `i64` range saturates.
    pub const fn normalized(self, chunk_size: usize) -> Self {
        let size = chunk_size as i64;
        Self {
            chunk: ChunkPos {
                y: self.chunk.y.saturating_add(self.y.div_euclid(size)),
                x: self.chunk.x.saturating_add(self.x.div_euclid(size)),
            },
            z: self.z,
            y: self.y.rem_euclid(size),
            x: self.x.rem_euclid(size),
        }
    }

    /// Same position shifted by a row/column delta, normalized. Deltas past
    /// the `i64` range saturate.
    pub const fn offset(self, dy: i64, dx: i64, chunk_size: usize) -> Self {
        Self {
            y: self.y.saturating_add(dy),
            x: self.x.saturating_add(dx),
            ..self
        }
        .normalized(chunk_size)
    }

    pub const fn with_z(self, z: u32) -> Self {
        Self { z, ..self }
    }

    /// Absolute `(row, column)` in world cells.
    pub const fn world_yx(&self, chunk_size: usize) -> (i64, i64) {
        let size = chunk_size as i64;
        (self.chunk.y * size + self.y, self.chunk.x * size + self.x)
    }

    pub(crate) const fn local(&self) -> LocalCell {
        LocalCell {
            y: self.y,
            x: self.x,
            z: self.z,
        }
    }
}

/// Cell position local to a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalCell {
    pub y: i64,
    pub x: i64,
    pub z: u32,
}

impl LocalCell {
    pub const fn new(y: i64, x: i64, z: u32) -> Self {
        Self { y, x, z }
    }
}
