//! JSON payloads exchanged with devices over HTTP.

use serde::{Deserialize, Serialize};

use crate::{DeviceId, RoomId};

/// Response to `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    /// Room the device is bound to.
    pub room_id: RoomId,
}

/// Generic acknowledgement, e.g. `{"status":"ok"}` after a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Status word.
    pub status: String,
}

impl StatusResponse {
    /// The `{"status":"ok"}` acknowledgement.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Response to `participants`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParticipantsResponse {
    /// Devices sharing the caller's room, the caller included.
    pub participants: Vec<DeviceId>,
}

/// Body of a `bridge` request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BridgeRequest {
    /// Devices to link; the first one's room survives.
    #[serde(default)]
    pub ids: Vec<DeviceId>,
}

/// Response to a successful `bridge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeResponse {
    /// Always `"linked"`.
    pub status: String,
    /// Room all listed devices now share.
    pub room: RoomId,
}

impl BridgeResponse {
    /// Acknowledge a bridge into `room`.
    pub fn linked(room: RoomId) -> Self {
        Self {
            status: "linked".to_string(),
            room,
        }
    }
}

/// Error body returned with any non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
