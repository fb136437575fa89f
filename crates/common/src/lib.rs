// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between doge clients and the server.
//! This module defines the real-time endpoint frames and supporting types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent from client to server over the real-time endpoint
/// (WebSocket or the long-poll fallback transport).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "frameType")]
pub enum ClientFrame {
    /// Subscribe to a broker destination
    /// # Fields
    /// * `destination` - Broker destination, e.g. `/topic/alarms`
    Subscribe { destination: String },
    /// Drop a previous subscription
    /// # Fields
    /// * `destination` - The destination to unsubscribe from
    Unsubscribe { destination: String },
    /// Send a payload to a destination
    /// # Fields
    /// * `destination` - `/app/...` routes to an application handler,
    ///   `/queue/...` and `/topic/...` fan out to subscribers
    /// * `body` - Arbitrary JSON payload
    Send { destination: String, body: Value },
}

/// Frames sent from server to client.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "frameType")]
pub enum ServerFrame {
    /// A message fanned out from a broker destination
    Message {
        /// Destination the message was published to
        destination: String,
        /// JSON payload
        body: Value,
    },
    /// Acknowledgment of a subscribe
    Receipt {
        /// The destination that was subscribed
        destination: String,
    },
    /// Error response for rejected or malformed frames
    Error {
        /// Stable error code
        code: String,
        /// Human-readable description
        message: String,
    },
}

/// Alert published to `/topic/alarms` when a photo upload lands.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DogePhotoAlert {
    /// Username of the uploading user
    pub user_id: String,
    /// Identifier of the stored photo
    pub doge_photo_id: String,
}
