//! Notifications the router delivers to the presentation side.

use cubopolis_engine::world::position::{ChunkPos, Position};

/// The rendering/console collaborator driven by [`EventRouter`].
///
/// Every method has an empty default so an implementation only needs the
/// notifications it cares about. Calls arrive in the order the triggering
/// frames were received.
///
/// [`EventRouter`]: crate::router::EventRouter
pub trait WorldObserver: Send + 'static {
    /// A connection opened. Whatever was on screen may be stale; this is the
    /// moment to re-request snapshots of visible chunks.
    fn now_online(&mut self) {}

    /// The connection dropped. The live set has already been cleared.
    fn now_offline(&mut self) {}

    /// The server is now streaming exactly `chunks`.
    fn chunk_subscription_changed(&mut self, _chunks: &[ChunkPos]) {}

    /// A chunk was installed or replaced wholesale.
    fn chunk_updated(&mut self, _chunk: ChunkPos) {}

    /// A cell changed, or a remote player entered or left it.
    fn cell_updated(&mut self, _pos: Position) {}

    fn text_received(&mut self, _text: &str) {}

    /// The server moved the local player; recenter the view on `pos`.
    fn local_player_moved(&mut self, _pos: Position) {}
}
