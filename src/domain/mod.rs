//! Domain layer: connection identity and the synthetic order events.

pub mod connection_id;
pub mod order_update;

pub use connection_id::ConnectionId;
pub use order_update::OrderUpdate;
