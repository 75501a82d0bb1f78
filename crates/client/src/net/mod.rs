pub mod session;
pub mod transport;
pub mod wire;
