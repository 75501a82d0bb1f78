use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Opaque block token. The engine stores these without interpreting them.
///
/// There is no "air" block: an empty cell is `None`. Both the empty string
/// and the legacy `"0"` marker decode to empty, so a `Block` is never either.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Block(Arc<str>);

/// Characters that would break the line protocol or the snapshot grammar.
const RESERVED: [char; 3] = ['#', '|', ','];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("block token is empty")]
    Empty,
    #[error("block token {0:?} contains whitespace or a reserved delimiter")]
    Reserved(String),
}

impl Block {
    /// Validate a token for local use (e.g. a build action).
    pub fn new(token: &str) -> Result<Self, BlockError> {
        if token.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c)) {
            return Err(BlockError::Reserved(token.to_owned()));
        }
        Self::from_token(token).ok_or(BlockError::Empty)
    }

    /// Ingest a token that has already been split out of a frame.
    /// Empty and `"0"` normalize to no block.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "" | "0" => None,
            t => Some(Self(Arc::from(t))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
