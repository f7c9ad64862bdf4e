//! Per-room entry logs.
//!
//! Each room owns an append-only log behind its own mutex, so pushes into
//! different rooms never contend. Logs are only created alongside a registry
//! binding; see [`ConnectRelay::init`](crate::server::ConnectRelay::init).

use crate::error::{RelayError, Result};
use connect_types::{Entry, RoomId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

type Log = Arc<Mutex<Vec<Entry>>>;

/// All room logs, keyed by room id.
#[derive(Debug, Default)]
pub struct RoomLogs {
    logs: DashMap<RoomId, Log>,
}

impl RoomLogs {
    /// Create an empty set of logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize an empty log for a new room.
    ///
    /// An existing log for the same id is left untouched.
    pub fn create_log(&self, room_id: RoomId) {
        self.logs.entry(room_id).or_default();
    }

    /// Whether a log exists for `room_id`.
    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.logs.contains_key(room_id)
    }

    fn log(&self, room_id: &RoomId) -> Option<Log> {
        // Clone the Arc so the shard lock is released before the mutex is taken.
        self.logs.get(room_id).map(|log| log.value().clone())
    }

    /// Append an entry at the end of the room's log.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RoomNotFound`] if the room has no log.
    pub fn append(&self, room_id: &RoomId, entry: Entry) -> Result<usize> {
        let log = self.log(room_id).ok_or_else(|| RelayError::RoomNotFound {
            room_id: room_id.clone(),
        })?;

        let mut guard = log.lock();
        guard.push(entry);
        Ok(guard.len())
    }

    /// Snapshot of every entry in the room, in push order.
    ///
    /// Unknown rooms read as empty.
    pub fn read_all(&self, room_id: &RoomId) -> Vec<Entry> {
        self.log(room_id)
            .map(|log| log.lock().clone())
            .unwrap_or_default()
    }

    /// Append all entries of `source` onto `target`, keeping their order.
    ///
    /// No-op when both ids are equal or `source` has no log. Returns the
    /// number of entries copied.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RoomNotFound`] if `target` has no log.
    pub fn merge_into(&self, target: &RoomId, source: &RoomId) -> Result<usize> {
        if target == source {
            return Ok(0);
        }
        let Some(source_log) = self.log(source) else {
            return Ok(0);
        };
        let target_log = self.log(target).ok_or_else(|| RelayError::RoomNotFound {
            room_id: target.clone(),
        })?;

        let moved = source_log.lock().clone();
        let count = moved.len();
        target_log.lock().extend(moved);
        Ok(count)
    }

    /// Drop a room's log. Returns whether a log was removed.
    pub fn remove_log(&self, room_id: &RoomId) -> bool {
        self.logs.remove(room_id).is_some()
    }

    /// Number of rooms with a log.
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// Whether there are no rooms.
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Total entries across all rooms.
    pub fn total_entries(&self) -> usize {
        self.logs.iter().map(|log| log.value().lock().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connect_types::{DeviceId, EntryBody, EntryId};

    fn entry(id: &str) -> Entry {
        Entry::new(EntryId::new(id), DeviceId::new("dev"), EntryBody::text(id))
    }

    fn ids(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn appends_read_back_in_order() {
        let logs = RoomLogs::new();
        let room = RoomId::new("r1");
        logs.create_log(room.clone());

        for i in 0..5 {
            logs.append(&room, entry(&format!("e{i}"))).unwrap();
        }

        assert_eq!(ids(&logs.read_all(&room)), vec!["e0", "e1", "e2", "e3", "e4"]);
    }

    #[test]
    fn append_to_unknown_room_fails() {
        let logs = RoomLogs::new();
        let err = logs.append(&RoomId::new("nope"), entry("e")).unwrap_err();
        assert!(matches!(err, RelayError::RoomNotFound { .. }));
    }

    #[test]
    fn unknown_room_reads_empty() {
        let logs = RoomLogs::new();
        assert!(logs.read_all(&RoomId::new("nope")).is_empty());
    }

    #[test]
    fn create_log_keeps_existing_entries() {
        let logs = RoomLogs::new();
        let room = RoomId::new("r1");
        logs.create_log(room.clone());
        logs.append(&room, entry("e1")).unwrap();

        logs.create_log(room.clone());
        assert_eq!(logs.read_all(&room).len(), 1);
    }

    #[test]
    fn merge_appends_source_after_target() {
        let logs = RoomLogs::new();
        let (base, other) = (RoomId::new("base"), RoomId::new("other"));
        logs.create_log(base.clone());
        logs.create_log(other.clone());
        logs.append(&base, entry("b1")).unwrap();
        logs.append(&other, entry("o1")).unwrap();
        logs.append(&other, entry("o2")).unwrap();

        assert_eq!(logs.merge_into(&base, &other).unwrap(), 2);
        assert_eq!(ids(&logs.read_all(&base)), vec!["b1", "o1", "o2"]);
        // Source is copied, not drained.
        assert_eq!(ids(&logs.read_all(&other)), vec!["o1", "o2"]);
    }

    #[test]
    fn merge_with_self_or_missing_source_is_noop() {
        let logs = RoomLogs::new();
        let base = RoomId::new("base");
        logs.create_log(base.clone());
        logs.append(&base, entry("b1")).unwrap();

        assert_eq!(logs.merge_into(&base, &base).unwrap(), 0);
        assert_eq!(logs.merge_into(&base, &RoomId::new("ghost")).unwrap(), 0);
        assert_eq!(ids(&logs.read_all(&base)), vec!["b1"]);
    }

    #[test]
    fn remove_log_drops_room() {
        let logs = RoomLogs::new();
        let room = RoomId::new("r1");
        logs.create_log(room.clone());
        logs.append(&room, entry("e1")).unwrap();
        assert_eq!(logs.total_entries(), 1);

        assert!(logs.remove_log(&room));
        assert!(!logs.remove_log(&room));
        assert!(logs.is_empty());
        assert_eq!(logs.total_entries(), 0);
    }
}
