//! Packed chunk snapshots.
//!
//! A snapshot travels as a single token. Cell values are written in row,
//! column, stack order with three delimiters:
//!
//! - `,` ends a stack entry (advance z)
//! - `|` ends a column (advance x, z restarts at 0)
//! - `#` ends a row (advance y, x and z restart at 0)
//!
//! The final value carries no delimiter. Empty entries (and the legacy `"0"`
//! marker) are holes.

use std::collections::BTreeMap;

use super::block::Block;
use super::position::LocalCell;

/// The non-empty cells of one chunk, independent of chunk dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSnapshot {
    cells: Vec<(LocalCell, Block)>,
}

impl ChunkSnapshot {
    pub fn push(&mut self, cell: LocalCell, block: Block) {
        self.cells.push((cell, block));
    }

    pub fn cells(&self) -> &[(LocalCell, Block)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Parse a packed snapshot. Never fails: anything between delimiters is
    /// a value, and an unterminated trailing buffer is the last cell.
    pub fn unpack(packed: &str) -> Self {
        let mut snapshot = Self::default();
        let (mut y, mut x, mut z) = (0i64, 0i64, 0u32);
        let mut buf = String::new();

        let mut flush = |buf: &mut String, y: i64, x: i64, z: u32| {
            if let Some(block) = Block::from_token(buf.as_str()) {
                snapshot.cells.push((LocalCell::new(y, x, z), block));
            }
            buf.clear();
        };

        for c in packed.chars() {
            match c {
                ',' => {
                    flush(&mut buf, y, x, z);
                    z += 1;
                }
                '|' => {
                    flush(&mut buf, y, x, z);
                    x += 1;
                    z = 0;
                }
                '#' => {
                    flush(&mut buf, y, x, z);
                    y += 1;
                    x = 0;
                    z = 0;
                }
                c => buf.push(c),
            }
        }
        flush(&mut buf, y, x, z);
        snapshot
    }

    /// Pack into the delimiter grammar. Cells with negative row/column
    /// cannot be addressed and are skipped.
    pub fn pack(&self) -> String {
        let mut grid: BTreeMap<i64, BTreeMap<i64, BTreeMap<u32, &Block>>> = BTreeMap::new();
        for (cell, block) in &self.cells {
            if cell.y < 0 || cell.x < 0 {
                continue;
            }
            grid.entry(cell.y)
                .or_default()
                .entry(cell.x)
                .or_default()
                .insert(cell.z, block);
        }

        let Some(&max_y) = grid.keys().next_back() else {
            return String::new();
        };

        let mut out = String::new();
        for y in 0..=max_y {
            if y > 0 {
                out.push('#');
            }
            let Some(row) = grid.get(&y) else { continue };
            let max_x = row.keys().next_back().copied().unwrap_or(0);
            for x in 0..=max_x {
                if x > 0 {
                    out.push('|');
                }
                let Some(column) = row.get(&x) else { continue };
                let max_z = column.keys().next_back().copied().unwrap_or(0);
                for z in 0..=max_z {
                    if z > 0 {
                        out.push(',');
                    }
                    if let Some(block) = column.get(&z) {
                        out.push_str(block.as_str());
                    }
                }
            }
        }
        out
    }
}
