//! The local player: position, selected tool and the actions built on them.
//!
//! Local actions never mutate the world directly. They validate against the
//! local mirror and send a request; the world changes when the server echoes.

use std::sync::{Arc, Mutex};

use cubopolis_engine::world::block::Block;
use cubopolis_engine::world::position::{ChunkPos, Position};
use cubopolis_engine::world::WorldStore;

use crate::net::session::SessionHandle;

/// What `act` does to the target cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    Build(Block),
    Destroy,
}

struct PlayerState {
    position: Position,
    tool: Tool,
}

/// Uses `std::sync::Mutex` because every operation is brief and never held
/// across an await.
pub struct LocalPlayer {
    world: Arc<WorldStore>,
    session: SessionHandle,
    state: Mutex<PlayerState>,
}

impl LocalPlayer {
    /// Starts at the origin with the first building block selected.
    pub fn new(world: Arc<WorldStore>, session: SessionHandle) -> Self {
        Self {
            world,
            session,
            state: Mutex::new(PlayerState {
                position: Position::new(0, 0, 0, 0, 0),
                tool: Tool::Build(Block::from_token("1").expect("\"1\" is a block token")),
            }),
        }
    }

    pub fn position(&self) -> Position {
        self.state.lock().expect("local player poisoned").position
    }

    pub fn tool(&self) -> Tool {
        self.state.lock().expect("local player poisoned").tool.clone()
    }

    /// Server-forced placement. The player is settled onto the ground below
    /// `pos`; if that changes the height, the server is told. Returns the
    /// settled position.
    pub fn set_position(&self, pos: Position) -> Position {
        let settled = pos.with_z(self.world.ceiling(pos));
        self.state.lock().expect("local player poisoned").position = settled;
        if settled.z != pos.z {
            self.session.request_move_player(settled);
        }
        settled
    }

    /// Walk by a row/column delta. Refuses to enter a chunk that is not held
    /// locally unless `allow_unloaded`.
    pub fn step(&self, dy: i64, dx: i64, allow_unloaded: bool) -> bool {
        let mut state = self.state.lock().expect("local player poisoned");
        let target = state.position.offset(dy, dx, self.world.chunk_size());
        if !allow_unloaded && !self.world.has_chunk(target.chunk) {
            return false;
        }
        self.walk(&mut state, target)
    }

    /// Jump to a cell, normalizing `y`/`x` into the chunk first.
    pub fn move_to(&self, chunk: ChunkPos, y: i64, x: i64) -> bool {
        let mut state = self.state.lock().expect("local player poisoned");
        let target = Position {
            chunk,
            z: state.position.z,
            y,
            x,
        };
        let target = self.world.clamp_coordinates(target);
        self.walk(&mut state, target)
    }

    /// Climb at most one cell; fall any distance.
    fn walk(&self, state: &mut PlayerState, target: Position) -> bool {
        let here = state.position.z;
        let rest = self.world.ceiling(target.with_z(here + 1));
        if rest > here + 1 {
            tracing::debug!("Blocked: {:?} rests at {}, standing at {}", target, rest, here);
            return false;
        }
        state.position = target.with_z(rest);
        self.session.request_move_player(state.position);
        true
    }

    /// 0 selects destroy, 1 to 9 select building with that block. Other
    /// slots are ignored.
    pub fn select_tool(&self, slot: u8) -> bool {
        let tool = match slot {
            0 => Tool::Destroy,
            1..=9 => match Block::new(&slot.to_string()) {
                Ok(block) => Tool::Build(block),
                Err(_) => return false,
            },
            _ => return false,
        };
        self.state.lock().expect("local player poisoned").tool = tool;
        true
    }

    /// Apply the selected tool to the neighbouring column at `(dy, dx)`.
    ///
    /// Only cells in live chunks can be changed. Building fills the empty cell
    /// at foot level minus one if there is one, else foot level. Destroying
    /// clears foot level if solid, else the cell below. Returns the request
    /// that was sent.
    pub fn act(&self, dy: i64, dx: i64) -> Option<(Position, Option<Block>)> {
        let state = self.state.lock().expect("local player poisoned");
        let target = state.position.offset(dy, dx, self.world.chunk_size());
        if !self.world.is_live_chunk(target.chunk) {
            tracing::debug!("Not acting on non-live chunk ({}, {})", target.chunk.y, target.chunk.x);
            return None;
        }

        let z = target.z;
        let below = z.checked_sub(1);
        let (cell, block) = match &state.tool {
            Tool::Build(block) => {
                let at = match below {
                    Some(b) if self.world.get_cell(target.with_z(b)).is_none() => b,
                    _ => z,
                };
                (target.with_z(at), Some(block.clone()))
            }
            Tool::Destroy => {
                let at = if self.world.get_cell(target).is_some() {
                    z
                } else {
                    below.unwrap_or(z)
                };
                (target.with_z(at), None)
            }
        };
        self.session.request_set_cell(cell, block.clone());
        Some((cell, block))
    }
}
