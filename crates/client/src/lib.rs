//! Client side of a shared, server-authoritative voxel world.
//!
//! - `net`: line codec, transport and the reconnecting session
//! - `router`: applies decoded events to the local world mirror
//! - `player`: the local player's movement and building
//! - `observer`/`headless`: notifications for whatever presents the world

pub mod config;
pub mod headless;
pub mod net;
pub mod observer;
pub mod player;
pub mod router;
