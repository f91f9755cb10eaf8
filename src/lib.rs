//! # pos-server
//!
//! Point-of-sale demo server. It advertises itself on the local network
//! over multicast DNS and pushes synthetic `order-update` events to every
//! connected WebSocket client on a fixed cadence.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler (ws/)          REST Handlers (api/)
//!     │
//!     ├── SessionBroadcaster (broadcast/)
//!     │       └── ConnectionRegistry: ConnectionId → EmitterHandle
//!     │
//!     ├── Server lifecycle (server)
//!     │
//!     └── Advertiser (discovery/) ── mdns-sd
//! ```
//!
//! Every session's emitter is cancelled exactly once: by the client
//! disconnecting or by server shutdown, whichever removes it from the
//! registry first.

pub mod api;
pub mod app_state;
pub mod broadcast;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod server;
pub mod ws;
