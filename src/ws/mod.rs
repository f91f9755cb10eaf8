//! WebSocket layer: upgrade handling, session loop, message envelope.
//!
//! The endpoint at `/ws` pushes an `order-update` event to each client
//! on that client's own cadence.

pub mod connection;
pub mod handler;
pub mod messages;
