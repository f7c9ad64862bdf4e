//! Main ConnectRelay coordination.
//!
//! ConnectRelay owns the registry, the room logs and the id generator, and
//! implements the external operations: init, push, poll, participants and
//! bridge.
//!
//! ## Locking
//!
//! The registry sits behind one `RwLock`; every room log has its own mutex.
//! Push and poll hold the registry read lock while they resolve the room and
//! touch its log, so they never see a device half-way through a rebind.
//! First-sight init and bridge take the write lock for their whole critical
//! section, which makes a bridge atomic to pushers, pollers and other
//! bridges. No I/O happens while either lock is held.

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::registry::Registry;
use crate::rooms::RoomLogs;
use connect_types::{DeviceId, Entry, EntryBody, IdGenerator, RoomId, UuidIdGenerator};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Message returned when a bridge lists fewer than two devices.
pub const BRIDGE_TOO_FEW_DEVICES: &str = "Need min 2 nodes";

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total init requests handled.
    pub inits_total: AtomicU64,
    /// Total rooms created on first sight of a device.
    pub rooms_created_total: AtomicU64,
    /// Total entries appended.
    pub pushes_total: AtomicU64,
    /// Total file entries appended.
    pub files_total: AtomicU64,
    /// Total uploaded file bytes accepted.
    pub bytes_received: AtomicU64,
    /// Total poll requests handled.
    pub polls_total: AtomicU64,
    /// Total successful bridges.
    pub bridges_total: AtomicU64,
    /// Total room logs merged into another room.
    pub rooms_merged_total: AtomicU64,
    /// Total orphaned room logs dropped after a bridge.
    pub rooms_collected_total: AtomicU64,
    /// Total rejected or failed requests.
    pub errors_total: AtomicU64,
}

/// Main relay hub.
pub struct ConnectRelay {
    config: Config,
    ids: Arc<dyn IdGenerator>,
    registry: RwLock<Registry>,
    rooms: RoomLogs,
    metrics: RelayMetrics,
    started_at: Instant,
}

impl std::fmt::Debug for ConnectRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRelay")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("devices", &self.total_devices())
            .field("rooms", &self.total_rooms())
            .finish_non_exhaustive()
    }
}

impl ConnectRelay {
    /// Create a relay generating ids from random UUIDs.
    pub fn new(config: Config) -> Self {
        Self::with_id_generator(config, Arc::new(UuidIdGenerator))
    }

    /// Create a relay with a custom id generator.
    pub fn with_id_generator(config: Config, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            config,
            ids,
            registry: RwLock::new(Registry::new()),
            rooms: RoomLogs::new(),
            metrics: RelayMetrics::default(),
            started_at: Instant::now(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the id generator.
    pub fn ids(&self) -> &Arc<dyn IdGenerator> {
        &self.ids
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Room of `device_id`, creating one on first sight.
    ///
    /// The room's log is created before the binding becomes visible, so a
    /// bound room always has a log. Idempotent.
    pub fn init(&self, device_id: &DeviceId) -> RoomId {
        self.metrics.inits_total.fetch_add(1, Ordering::Relaxed);

        if let Some(room_id) = self.registry.read().room_of(device_id) {
            return room_id.clone();
        }

        let mut registry = self.registry.write();
        // Another request may have registered the device in between.
        if let Some(room_id) = registry.room_of(device_id) {
            return room_id.clone();
        }

        let room_id = self.fresh_room_id();
        self.rooms.create_log(room_id.clone());
        registry.rebind(device_id.clone(), room_id.clone());
        self.metrics.rooms_created_total.fetch_add(1, Ordering::Relaxed);

        tracing::info!("Created room {:?} for device {:?}", room_id, device_id);
        room_id
    }

    /// Generate a room id not used by any live room.
    fn fresh_room_id(&self) -> RoomId {
        let len = self.config.ids.room_id_len;
        loop {
            let candidate = self.ids.room_id(len);
            if !self.rooms.contains(&candidate) {
                return candidate;
            }
            tracing::debug!("Room id {:?} already in use, regenerating", candidate);
        }
    }

    /// Room `device_id` is bound to, or `None` if never seen.
    pub fn room_of(&self, device_id: &DeviceId) -> Option<RoomId> {
        self.registry.read().room_of(device_id).cloned()
    }

    /// Devices sharing a room with `device_id`, itself included.
    pub fn participants(&self, device_id: &DeviceId) -> Vec<DeviceId> {
        self.registry.read().participants_of(device_id)
    }

    /// Append an entry from `device_id` to its room.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DeviceNotFound`] if the device never called init.
    pub fn push(&self, device_id: &DeviceId, body: EntryBody) -> Result<Entry> {
        let registry = self.registry.read();
        let Some(room_id) = registry.room_of(device_id) else {
            self.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Push from unknown device {:?}", device_id);
            return Err(RelayError::DeviceNotFound {
                device_id: device_id.clone(),
            });
        };

        let entry = Entry::new(
            self.ids.entry_id(self.config.ids.entry_id_len),
            device_id.clone(),
            body,
        );
        let len = self.rooms.append(room_id, entry.clone())?;

        self.metrics.pushes_total.fetch_add(1, Ordering::Relaxed);
        if entry.is_file() {
            self.metrics.files_total.fetch_add(1, Ordering::Relaxed);
        }

        tracing::debug!(
            "Appended {:?} from {:?} to room {:?} (entries: {})",
            entry.id,
            device_id,
            room_id,
            len
        );
        Ok(entry)
    }

    /// Full history of the device's room. Unknown devices read as empty.
    pub fn poll(&self, device_id: &DeviceId) -> Vec<Entry> {
        self.metrics.polls_total.fetch_add(1, Ordering::Relaxed);

        let registry = self.registry.read();
        match registry.room_of(device_id) {
            Some(room_id) => self.rooms.read_all(room_id),
            None => Vec::new(),
        }
    }

    /// Link every listed device into the first device's room.
    ///
    /// Each distinct room involved is merged into the surviving room once,
    /// source entries landing after the ones already there. Devices never
    /// seen before are skipped. Rooms left without any device are dropped.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Validation`] if fewer than two devices are listed.
    /// - [`RelayError::DeviceNotFound`] if the first device is unknown.
    ///
    /// State is untouched in both cases.
    pub fn bridge(&self, devices: &[DeviceId]) -> Result<RoomId> {
        let Some(first) = devices.first().filter(|_| devices.len() >= 2) else {
            self.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Rejected bridge of {} device(s)", devices.len());
            return Err(RelayError::Validation {
                reason: BRIDGE_TOO_FEW_DEVICES.to_string(),
            });
        };

        let mut registry = self.registry.write();
        let Some(base) = registry.room_of(first).cloned() else {
            self.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Rejected bridge: base device {:?} unknown", first);
            return Err(RelayError::DeviceNotFound {
                device_id: first.clone(),
            });
        };

        let mut merged: HashSet<RoomId> = HashSet::new();
        let mut rebound = 0usize;
        for device_id in devices {
            let Some(old) = registry.room_of(device_id).cloned() else {
                tracing::debug!("Bridge skipping unknown device {:?}", device_id);
                continue;
            };
            if old == base {
                continue;
            }

            // A source room kept alive by an unlisted device is copied, not
            // moved. Merging it again in a later bridge copies its history
            // again.
            if merged.insert(old.clone()) {
                let moved = self.rooms.merge_into(&base, &old)?;
                tracing::debug!("Merged {} entries from {:?} into {:?}", moved, old, base);
            }
            registry.rebind(device_id.clone(), base.clone());
            rebound += 1;
        }

        let mut collected = 0u64;
        for room_id in &merged {
            if !registry.is_referenced(room_id) && self.rooms.remove_log(room_id) {
                collected += 1;
            }
        }

        self.metrics.bridges_total.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .rooms_merged_total
            .fetch_add(merged.len() as u64, Ordering::Relaxed);
        self.metrics
            .rooms_collected_total
            .fetch_add(collected, Ordering::Relaxed);

        tracing::info!(
            "Bridged {} device(s) into {:?} (rebound: {}, rooms merged: {}, dropped: {})",
            devices.len(),
            base,
            rebound,
            merged.len(),
            collected
        );
        Ok(base)
    }

    /// Time since this relay was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Number of devices ever registered.
    pub fn total_devices(&self) -> usize {
        self.registry.read().len()
    }

    /// Number of live rooms.
    pub fn total_rooms(&self) -> usize {
        self.rooms.len()
    }

    /// Number of entries across all live rooms.
    pub fn total_entries(&self) -> usize {
        self.rooms.total_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connect_types::SequentialIdGenerator;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    fn test_relay() -> ConnectRelay {
        ConnectRelay::with_id_generator(Config::default(), Arc::new(SequentialIdGenerator::default()))
    }

    fn dev(id: &str) -> DeviceId {
        DeviceId::new(id)
    }

    fn contents(entries: &[Entry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match &e.body {
                EntryBody::Text { content } => content.clone().unwrap_or_default(),
                EntryBody::File { name, .. } => name.clone(),
            })
            .collect()
    }

    /// Replays a fixed list of tokens, then falls back to a counter.
    struct ScriptedIds {
        script: Mutex<VecDeque<&'static str>>,
        fallback: SequentialIdGenerator,
    }

    impl IdGenerator for ScriptedIds {
        fn token(&self, len: usize) -> String {
            match self.script.lock().pop_front() {
                Some(token) => token.to_string(),
                None => self.fallback.token(len),
            }
        }
    }

    #[test]
    fn init_is_idempotent() {
        let relay = test_relay();
        let room = relay.init(&dev("a"));

        assert_eq!(room.as_str().len(), 8);
        assert_eq!(relay.init(&dev("a")), room);
        assert_eq!(relay.room_of(&dev("a")), Some(room));
        assert_eq!(relay.total_rooms(), 1);
    }

    #[test]
    fn init_gives_new_devices_distinct_rooms() {
        let relay = test_relay();
        let rooms: HashSet<RoomId> = (0..50).map(|i| relay.init(&dev(&format!("d{i}")))).collect();
        assert_eq!(rooms.len(), 50);
        assert_eq!(relay.total_rooms(), 50);
    }

    #[test]
    fn init_regenerates_colliding_room_ids() {
        let ids = ScriptedIds {
            script: Mutex::new(VecDeque::from(["aaaa0000", "aaaa0000", "bbbb0000"])),
            fallback: SequentialIdGenerator::default(),
        };
        let relay = ConnectRelay::with_id_generator(Config::default(), Arc::new(ids));

        assert_eq!(relay.init(&dev("a")).as_str(), "aaaa0000");
        assert_eq!(relay.init(&dev("b")).as_str(), "bbbb0000");
    }

    #[test]
    fn unknown_device_has_no_room() {
        let relay = test_relay();
        assert_eq!(relay.room_of(&dev("ghost")), None);
        assert!(relay.participants(&dev("ghost")).is_empty());
        assert!(relay.poll(&dev("ghost")).is_empty());
    }

    #[test]
    fn push_from_unknown_device_fails() {
        let relay = test_relay();
        let err = relay.push(&dev("ghost"), EntryBody::text("hi")).unwrap_err();
        assert!(matches!(err, RelayError::DeviceNotFound { .. }));
        assert_eq!(relay.metrics().errors_total.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn pushes_are_polled_in_order() {
        let relay = test_relay();
        relay.init(&dev("a"));

        for i in 0..10 {
            relay.push(&dev("a"), EntryBody::text(format!("m{i}"))).unwrap();
        }

        let entries = relay.poll(&dev("a"));
        assert_eq!(entries.len(), 10);
        assert_eq!(contents(&entries)[0], "m0");
        assert_eq!(contents(&entries)[9], "m9");
        assert!(entries.iter().all(|e| e.from == dev("a")));
        assert!(entries.iter().all(|e| e.id.as_str().len() == 6));
    }

    #[test]
    fn file_entries_keep_reference_and_name() {
        let relay = test_relay();
        relay.init(&dev("a"));

        let entry = relay
            .push(&dev("a"), EntryBody::file("1a2b_report.pdf", "report.pdf"))
            .unwrap();
        assert!(entry.is_file());
        assert_eq!(relay.poll(&dev("a")), vec![entry]);
        assert_eq!(relay.metrics().files_total.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn participants_include_self() {
        let relay = test_relay();
        relay.init(&dev("a"));
        assert_eq!(relay.participants(&dev("a")), vec![dev("a")]);
    }

    #[test]
    fn bridge_merges_histories_base_first() {
        let relay = test_relay();
        relay.init(&dev("a"));
        relay.init(&dev("b"));
        relay.push(&dev("a"), EntryBody::text("e1")).unwrap();
        relay.push(&dev("b"), EntryBody::text("e2")).unwrap();
        let base = relay.room_of(&dev("a")).unwrap();

        let room = relay.bridge(&[dev("a"), dev("b")]).unwrap();

        assert_eq!(room, base);
        assert_eq!(relay.room_of(&dev("b")), Some(base));
        assert_eq!(contents(&relay.poll(&dev("a"))), vec!["e1", "e2"]);
        assert_eq!(relay.poll(&dev("a")), relay.poll(&dev("b")));
        assert_eq!(relay.participants(&dev("b")), vec![dev("a"), dev("b")]);
    }

    #[test]
    fn bridge_is_idempotent() {
        let relay = test_relay();
        relay.init(&dev("a"));
        relay.init(&dev("b"));
        relay.push(&dev("a"), EntryBody::text("e1")).unwrap();
        relay.push(&dev("b"), EntryBody::text("e2")).unwrap();

        let first = relay.bridge(&[dev("a"), dev("b")]).unwrap();
        let second = relay.bridge(&[dev("a"), dev("b")]).unwrap();

        assert_eq!(first, second);
        assert_eq!(contents(&relay.poll(&dev("b"))), vec!["e1", "e2"]);
    }

    #[test]
    fn bridge_needs_two_devices() {
        let relay = test_relay();
        let room = relay.init(&dev("a"));
        relay.push(&dev("a"), EntryBody::text("e1")).unwrap();

        for devices in [vec![], vec![dev("a")]] {
            let err = relay.bridge(&devices).unwrap_err();
            assert!(matches!(err, RelayError::Validation { .. }));
            assert_eq!(err.to_string(), BRIDGE_TOO_FEW_DEVICES);
        }

        assert_eq!(relay.room_of(&dev("a")), Some(room));
        assert_eq!(relay.poll(&dev("a")).len(), 1);
        assert_eq!(relay.total_rooms(), 1);
    }

    #[test]
    fn bridge_rejects_unknown_base_device() {
        let relay = test_relay();
        let room_b = relay.init(&dev("b"));

        let err = relay.bridge(&[dev("ghost"), dev("b")]).unwrap_err();

        assert!(matches!(err, RelayError::DeviceNotFound { .. }));
        assert_eq!(relay.room_of(&dev("b")), Some(room_b));
        assert_eq!(relay.room_of(&dev("ghost")), None);
    }

    #[test]
    fn bridge_skips_unknown_devices() {
        let relay = test_relay();
        let base = relay.init(&dev("a"));
        relay.init(&dev("b"));

        let room = relay.bridge(&[dev("a"), dev("ghost"), dev("b")]).unwrap();

        assert_eq!(room, base);
        assert_eq!(relay.room_of(&dev("ghost")), None);
        assert_eq!(relay.room_of(&dev("b")), Some(base));
    }

    #[test]
    fn bridge_merges_shared_source_room_once() {
        let relay = test_relay();
        relay.init(&dev("a"));
        relay.init(&dev("b"));
        relay.init(&dev("c"));
        relay.push(&dev("b"), EntryBody::text("from-b")).unwrap();
        relay.bridge(&[dev("b"), dev("c")]).unwrap();

        relay.bridge(&[dev("a"), dev("b"), dev("c")]).unwrap();

        assert_eq!(contents(&relay.poll(&dev("a"))), vec!["from-b"]);
        assert_eq!(relay.participants(&dev("a")).len(), 3);
        assert_eq!(relay.total_rooms(), 1);
    }

    #[test]
    fn bridge_drops_orphaned_rooms_only() {
        let relay = test_relay();
        relay.init(&dev("a"));
        let room_b = relay.init(&dev("b"));
        relay.init(&dev("c"));
        relay.push(&dev("c"), EntryBody::text("c1")).unwrap();
        // c joins b's room, then a pulls only b across.
        relay.bridge(&[dev("b"), dev("c")]).unwrap();
        assert_eq!(relay.total_rooms(), 2);

        relay.bridge(&[dev("a"), dev("b")]).unwrap();

        // c still lives in b's old room, so it is kept.
        assert_eq!(relay.room_of(&dev("c")), Some(room_b));
        assert_eq!(contents(&relay.poll(&dev("c"))), vec!["c1"]);
        assert_eq!(contents(&relay.poll(&dev("a"))), vec!["c1"]);
        assert_eq!(relay.total_rooms(), 2);
        assert_eq!(relay.metrics().rooms_collected_total.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn remerging_a_kept_room_copies_its_history_again() {
        let relay = test_relay();
        relay.init(&dev("a"));
        relay.init(&dev("b"));
        relay.init(&dev("c"));
        relay.push(&dev("c"), EntryBody::text("c1")).unwrap();
        relay.bridge(&[dev("b"), dev("c")]).unwrap();

        // b's room survives because c still uses it.
        relay.bridge(&[dev("a"), dev("b")]).unwrap();
        assert_eq!(contents(&relay.poll(&dev("a"))), vec!["c1"]);

        // Pulling c across merges that room a second time.
        relay.bridge(&[dev("a"), dev("c")]).unwrap();
        assert_eq!(contents(&relay.poll(&dev("a"))), vec!["c1", "c1"]);
        assert_eq!(relay.participants(&dev("a")).len(), 3);
        assert_eq!(relay.total_rooms(), 1);
    }

    #[test]
    fn concurrent_pushes_lose_nothing() {
        const N: usize = 500;
        let relay = test_relay();
        relay.init(&dev("a"));
        relay.init(&dev("b"));
        relay.bridge(&[dev("a"), dev("b")]).unwrap();

        std::thread::scope(|s| {
            for name in ["a", "b"] {
                let relay = &relay;
                s.spawn(move || {
                    for i in 0..N {
                        relay.push(&dev(name), EntryBody::text(format!("{name}-{i}"))).unwrap();
                    }
                });
            }
        });

        let entries = relay.poll(&dev("a"));
        assert_eq!(entries.len(), 2 * N);
        let unique: HashSet<String> = contents(&entries).into_iter().collect();
        assert_eq!(unique.len(), 2 * N);

        // Each sender's entries stay in the order they were pushed.
        for name in ["a", "b"] {
            let own: Vec<String> = entries
                .iter()
                .filter(|e| e.from == dev(name))
                .map(|e| contents(std::slice::from_ref(e)).remove(0))
                .collect();
            let expected: Vec<String> = (0..N).map(|i| format!("{name}-{i}")).collect();
            assert_eq!(own, expected);
        }
    }

    #[test]
    fn bridge_during_pushes_keeps_every_entry_once() {
        const N: usize = 300;
        let relay = test_relay();
        relay.init(&dev("a"));
        relay.init(&dev("b"));

        std::thread::scope(|s| {
            for name in ["a", "b"] {
                let relay = &relay;
                s.spawn(move || {
                    for i in 0..N {
                        relay.push(&dev(name), EntryBody::text(format!("{name}-{i}"))).unwrap();
                    }
                });
            }
            let relay = &relay;
            s.spawn(move || {
                relay.bridge(&[dev("a"), dev("b")]).unwrap();
            });
        });

        let entries = relay.poll(&dev("b"));
        let all = contents(&entries);
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), 2 * N);
        assert_eq!(unique.len(), 2 * N);
        assert_eq!(relay.total_rooms(), 1);
    }
}
