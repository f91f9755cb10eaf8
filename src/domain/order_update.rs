//! Synthetic order status events pushed to connected clients.
//!
//! There is no order book behind these: every [`OrderUpdate`] is made up
//! on the spot from a random order number and the current time.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Serialize, Serializer};

/// Exclusive upper bound of generated order numbers.
pub const ORDER_ID_RANGE: u32 = 1000;

/// Status carried by every synthetic update.
pub const PREPARING: &str = "preparing";

/// Wire event name used for order updates.
pub const ORDER_UPDATE_EVENT: &str = "order-update";

/// A single order status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    /// Order number in `0..ORDER_ID_RANGE`.
    pub order_id: u32,
    /// Always [`PREPARING`].
    pub status: &'static str,
    /// Generation time, serialized as ISO-8601 with millisecond precision.
    #[serde(serialize_with = "iso8601_millis")]
    pub timestamp: DateTime<Utc>,
}

impl OrderUpdate {
    /// Builds an update with a random order number stamped with the
    /// current time.
    #[must_use]
    pub fn synthesize() -> Self {
        Self::with_rng(&mut rand::thread_rng())
    }

    /// Same as [`OrderUpdate::synthesize`] but draws from the given RNG.
    pub fn with_rng<R: Rng>(rng: &mut R) -> Self {
        Self {
            order_id: rng.gen_range(0..ORDER_ID_RANGE),
            status: PREPARING,
            timestamp: Utc::now(),
        }
    }
}

fn iso8601_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
