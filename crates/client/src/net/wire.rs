//! Line protocol codec.
//!
//! One frame per line: space-separated ASCII tokens, newline-terminated, no
//! length prefix. The first token is a one-letter tag.
//!
//! | tag | direction | fields |
//! |-----|-----------|--------|
//! | `l` | out  | `cy cx` pairs |
//! | `w` | both | `cy cx z y x [value]` |
//! | `t` | both | free text to end of line |
//! | `m` | both | `cy cx z y x`, plus `player_id` inbound |
//! | `r` | out  | `cy cx` |
//! | `r` | in   | `cy cx [packed]` |
//! | `x` | in   | `player_id` |

use std::fmt::Write as _;
use std::str::FromStr;

use cubopolis_engine::world::block::Block;
use cubopolis_engine::world::players::PlayerId;
use cubopolis_engine::world::position::{ChunkPos, Position};
use cubopolis_engine::world::snapshot::ChunkSnapshot;
use thiserror::Error;

/// Client-to-server frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the subscription with exactly these chunks.
    Listen(Vec<ChunkPos>),
    /// Set (or clear, with `None`) a cell.
    SetCell { pos: Position, block: Option<Block> },
    Text(String),
    /// Move the local player.
    Move(Position),
    /// Ask for a full snapshot of a chunk.
    Reload(ChunkPos),
}

/// Server-to-client frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CellSet { pos: Position, block: Option<Block> },
    Text(String),
    PlayerMoved { id: PlayerId, pos: Position },
    ChunkSnapshot { chunk: ChunkPos, snapshot: ChunkSnapshot },
    PlayerLeft(PlayerId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,
    #[error("unknown tag {0:?}")]
    UnknownTag(String),
    #[error("tag {0:?} is only sent by clients")]
    Outbound(&'static str),
    #[error("tag {tag:?} expects {expected} fields, got {actual}")]
    Arity {
        tag: &'static str,
        expected: &'static str,
        actual: usize,
    },
    #[error("field {field} of {tag:?} is not a valid number: {value:?}")]
    BadNumber {
        tag: &'static str,
        field: &'static str,
        value: String,
    },
}

// ── Encoding ────────────────────────────────────────────────────────────

/// Encode a command as a single newline-terminated line.
pub fn encode(command: &Command) -> String {
    let mut line = String::new();
    match command {
        Command::Listen(chunks) => {
            line.push('l');
            for chunk in chunks {
                let _ = write!(line, " {} {}", chunk.y, chunk.x);
            }
        }
        Command::SetCell { pos, block } => {
            line.push('w');
            push_position(&mut line, pos);
            // An empty value is sent by leaving the token off.
            if let Some(block) = block {
                let _ = write!(line, " {}", block);
            }
        }
        Command::Text(text) => {
            line.push_str("t ");
            line.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }));
        }
        Command::Move(pos) => {
            line.push('m');
            push_position(&mut line, pos);
        }
        Command::Reload(chunk) => {
            let _ = write!(line, "r {} {}", chunk.y, chunk.x);
        }
    }
    line.push('\n');
    line
}

fn push_position(line: &mut String, pos: &Position) {
    let _ = write!(
        line,
        " {} {} {} {} {}",
        pos.chunk.y, pos.chunk.x, pos.z, pos.y, pos.x
    );
}

// ── Decoding ────────────────────────────────────────────────────────────

/// Decode one inbound line. Trailing whitespace (including the newline) is
/// ignored.
pub fn decode(line: &str) -> Result<Event, DecodeError> {
    let line = line.trim_end();
    let mut tokens = line.split_ascii_whitespace();
    let tag = tokens.next().ok_or(DecodeError::Empty)?;
    let fields: Vec<&str> = tokens.collect();

    match tag {
        "w" => {
            let tag = "w";
            if !(5..=6).contains(&fields.len()) {
                return Err(arity(tag, "5 or 6", fields.len()));
            }
            let pos = parse_position(tag, &fields)?;
            let block = fields.get(5).and_then(|v| Block::from_token(v));
            Ok(Event::CellSet { pos, block })
        }
        "t" => {
            // Free text keeps its inner spacing, so slice rather than re-join.
            match line.strip_prefix("t ") {
                Some(text) if !text.is_empty() => Ok(Event::Text(text.to_owned())),
                _ => Err(arity("t", "at least 1", 0)),
            }
        }
        "m" => {
            let tag = "m";
            if fields.len() != 6 {
                return Err(arity(tag, "6", fields.len()));
            }
            let pos = parse_position(tag, &fields)?;
            let id = PlayerId(parse(tag, "player_id", fields[5])?);
            Ok(Event::PlayerMoved { id, pos })
        }
        "r" => {
            let tag = "r";
            if !(2..=3).contains(&fields.len()) {
                return Err(arity(tag, "2 or 3", fields.len()));
            }
            let chunk = ChunkPos::new(
                parse(tag, "chunk_y", fields[0])?,
                parse(tag, "chunk_x", fields[1])?,
            );
            let snapshot = fields
                .get(2)
                .map(|packed| ChunkSnapshot::unpack(packed))
                .unwrap_or_default();
            Ok(Event::ChunkSnapshot { chunk, snapshot })
        }
        "x" => {
            if fields.len() != 1 {
                return Err(arity("x", "1", fields.len()));
            }
            Ok(Event::PlayerLeft(PlayerId(parse("x", "player_id", fields[0])?)))
        }
        "l" => Err(DecodeError::Outbound("l")),
        other => Err(DecodeError::UnknownTag(other.to_owned())),
    }
}

fn parse_position(tag: &'static str, fields: &[&str]) -> Result<Position, DecodeError> {
    Ok(Position::new(
        parse(tag, "chunk_y", fields[0])?,
        parse(tag, "chunk_x", fields[1])?,
        parse(tag, "z", fields[2])?,
        parse(tag, "y", fields[3])?,
        parse(tag, "x", fields[4])?,
    ))
}

fn parse<T: FromStr>(tag: &'static str, field: &'static str, value: &str) -> Result<T, DecodeError> {
    value.parse().map_err(|_| DecodeError::BadNumber {
        tag,
        field,
        value: value.to_owned(),
    })
}

fn arity(tag: &'static str, expected: &'static str, actual: usize) -> DecodeError {
    DecodeError::Arity {
        tag,
        expected,
        actual,
    }
}
