//! Device → room bindings.
//!
//! The registry is a plain map; [`ConnectRelay`](crate::server::ConnectRelay)
//! owns it behind a lock and pairs every new binding with a room log.

use connect_types::{DeviceId, RoomId};
use std::collections::HashMap;

/// Maps device identifiers to the room they currently belong to.
#[derive(Debug, Default)]
pub struct Registry {
    bindings: HashMap<DeviceId, RoomId>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Room the device is bound to, or `None` if never seen.
    pub fn room_of(&self, device_id: &DeviceId) -> Option<&RoomId> {
        self.bindings.get(device_id)
    }

    /// Bind a device to a room, overwriting any previous binding.
    ///
    /// Returns the previous room, if any.
    pub fn rebind(&mut self, device_id: DeviceId, room_id: RoomId) -> Option<RoomId> {
        self.bindings.insert(device_id, room_id)
    }

    /// Every device bound to the same room as `device_id`, itself included.
    ///
    /// Sorted; empty if the device is unknown.
    pub fn participants_of(&self, device_id: &DeviceId) -> Vec<DeviceId> {
        let Some(room_id) = self.room_of(device_id) else {
            return Vec::new();
        };

        let mut members: Vec<DeviceId> = self
            .bindings
            .iter()
            .filter(|(_, r)| *r == room_id)
            .map(|(d, _)| d.clone())
            .collect();
        members.sort();
        members
    }

    /// Whether any device is still bound to `room_id`.
    pub fn is_referenced(&self, room_id: &RoomId) -> bool {
        self.bindings.values().any(|r| r == room_id)
    }

    /// Number of known devices.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no device has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
