//! Game-agnostic chunked voxel store.
//!
//! The engine holds opaque block tokens in dense chunks addressed by
//! `(chunk_y, chunk_x)`, plus the set of chunks the server is streaming and
//! an index of remote player positions. It knows nothing about the network.

pub mod world;
