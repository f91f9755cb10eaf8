//! WebSocket message envelope.

use serde::Serialize;

use crate::domain::OrderUpdate;
use crate::domain::order_update::ORDER_UPDATE_EVENT;

/// Server → client event frame.
///
/// ```json
/// {"event":"order-update","data":{"orderId":417,"status":"preparing","timestamp":"2024-05-01T12:00:05.000Z"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WsMessage {
    /// Event name.
    pub event: String,
    /// Event-specific payload.
    pub data: serde_json::Value,
}

impl WsMessage {
    /// Wraps an order update in an `order-update` event.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the update cannot be serialized.
    pub fn order_update(update: &OrderUpdate) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: ORDER_UPDATE_EVENT.to_string(),
            data: serde_json::to_value(update)?,
        })
    }

    /// Serializes the frame to its JSON text form.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
