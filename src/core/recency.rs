// Remembers which commands were run most recently
//
// Every run gets a fresh counter from an ever-increasing sequence. The palette
// sorts by that counter, so the highest number is the most recent command.
// Only `capacity` commands are remembered; the least recently used one falls
// out first.

use crate::config::Settings;
use crate::db::{
    Database, SerializedEntry, SerializedRecency, MRU_CACHE_KEY, MRU_COUNTER_KEY, PALETTE_SCOPE,
};
use crate::error::Result;
use lru::LruCache;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

// Counters start here and restart here after a clear
const FIRST_COUNTER: u64 = 1;

/// One remembered command and its usage counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecencyEntry {
    pub command_id: String,
    pub counter: u64,
}

struct RecencyState {
    cache: LruCache<String, u64>,
    capacity: usize,
    counter: u64,
}

impl RecencyState {
    fn trim(&mut self) -> usize {
        let mut evicted = 0;
        while self.cache.len() > self.capacity {
            if self.cache.pop_lru().is_none() {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    // Hands out the current counter. Once the sequence runs out the history
    // starts over, the same as after a clear.
    fn next_counter(&mut self) -> u64 {
        match self.counter.checked_add(1) {
            Some(next) => std::mem::replace(&mut self.counter, next),
            None => {
                tracing::warn!("command history counter exhausted, starting over");
                self.cache.clear();
                self.counter = FIRST_COUNTER + 1;
                FIRST_COUNTER
            }
        }
    }

    // Oldest first, which is the order a reader re-inserts them in
    fn serialize(&self) -> Result<(String, String)> {
        let entries = self
            .cache
            .iter()
            .rev()
            .map(|(key, value)| SerializedEntry {
                key: key.clone(),
                value: *value,
            })
            .collect();

        let payload = serde_json::to_string(&SerializedRecency {
            uses_lru: true,
            entries,
        })?;

        Ok((payload, self.counter.to_string()))
    }
}

/// Bounded, persisted most-recently-used command history
///
/// There is one store per process. Build it once with [`RecencyStore::load`]
/// and hand out `Arc<RecencyStore>` clones; every holder sees every push
/// immediately.
pub struct RecencyStore {
    db: Arc<Database>,
    state: Mutex<RecencyState>,
    // Serialises mutations together with their database write
    write_lock: tokio::sync::Mutex<()>,
}

impl RecencyStore {
    /// Load the store from the database
    ///
    /// Corrupt or missing history is logged and treated as empty.
    ///
    /// # Arguments
    /// * `db` - Database holding the `palette` state scope
    /// * `capacity` - How many commands to remember; 0 disables history
    pub async fn load(db: Arc<Database>, capacity: usize) -> Result<Self> {
        let raw_cache = db.get_state(PALETTE_SCOPE, MRU_CACHE_KEY).await?;
        let raw_counter = db.get_state(PALETTE_SCOPE, MRU_COUNTER_KEY).await?;

        let mut cache = LruCache::unbounded();
        let mut highest = 0;

        if let Some(raw) = raw_cache {
            match serde_json::from_str::<SerializedRecency>(&raw) {
                Ok(serialized) => {
                    for entry in serialized.into_recency_order() {
                        highest = highest.max(entry.value);
                        cache.put(entry.key, entry.value);
                    }
                }
                Err(err) => {
                    tracing::warn!("invalid command history, starting empty: {err}");
                }
            }
        }

        // No counter left above the newest entry
        if highest == u64::MAX {
            tracing::warn!("command history counter exhausted, starting empty");
            cache.clear();
            highest = 0;
        }

        let stored_counter = match raw_counter {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid command history counter");
                FIRST_COUNTER
            }),
            None => FIRST_COUNTER,
        };

        let mut state = RecencyState {
            cache,
            capacity,
            // Never hand out a counter that's already in use
            counter: stored_counter.max(highest.saturating_add(1)),
        };
        let evicted = state.trim();
        if evicted > 0 {
            tracing::debug!(evicted, capacity, "trimmed loaded command history");
        }

        Ok(Self {
            db,
            state: Mutex::new(state),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Record a use of `command_id`
    ///
    /// The command becomes the most recent entry and gets a counter higher
    /// than any handed out before. Persistence failures are logged; the
    /// in-memory history stays authoritative.
    pub async fn push(&self, command_id: &str) {
        let _guard = self.write_lock.lock().await;

        let payload = {
            let mut state = self.lock_state();
            let counter = state.next_counter();
            state.cache.put(command_id.to_string(), counter);
            state.trim();
            state.serialize()
        };

        if let Err(err) = self.persist(payload).await {
            tracing::warn!(command_id, "failed to save command history: {err}");
        }
    }

    /// Counter of `command_id`, if it is remembered
    ///
    /// Looking a command up doesn't count as using it.
    pub fn peek(&self, command_id: &str) -> Option<u64> {
        self.lock_state().cache.peek(command_id).copied()
    }

    /// Change how many commands are remembered
    ///
    /// Shrinking drops the least recently used entries. Setting the same
    /// capacity again is a no-op.
    pub async fn set_capacity(&self, capacity: usize) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let payload = {
            let mut state = self.lock_state();
            if state.capacity == capacity {
                return Ok(());
            }
            state.capacity = capacity;
            let evicted = state.trim();
            tracing::info!(capacity, evicted, "command history capacity changed");
            state.serialize()
        };

        self.persist(payload).await
    }

    /// Forget every command and restart the counter
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let payload = {
            let mut state = self.lock_state();
            state.cache.clear();
            state.counter = FIRST_COUNTER;
            state.serialize()
        };
        tracing::info!("command history cleared");

        self.persist(payload).await
    }

    /// Remembered commands, most recent first
    pub fn entries(&self) -> Vec<RecencyEntry> {
        self.lock_state()
            .cache
            .iter()
            .map(|(command_id, counter)| RecencyEntry {
                command_id: command_id.clone(),
                counter: *counter,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock_state().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock_state().capacity
    }

    fn lock_state(&self) -> MutexGuard<'_, RecencyState> {
        // The state is plain data, a panic elsewhere can't leave it half-written
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn persist(&self, payload: Result<(String, String)>) -> Result<()> {
        let (cache, counter) = payload?;
        self.db
            .set_states(
                PALETTE_SCOPE,
                &[(MRU_CACHE_KEY, cache), (MRU_COUNTER_KEY, counter)],
            )
            .await
    }
}

/// Keep the store's capacity in line with the configured history length
///
/// Runs until the settings sender is dropped.
pub fn spawn_capacity_sync(
    store: Arc<RecencyStore>,
    mut settings: watch::Receiver<Settings>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while settings.changed().await.is_ok() {
            let length = settings.borrow_and_update().history_length;
            if let Err(err) = store.set_capacity(length).await {
                tracing::warn!(length, "failed to resize command history: {err}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn empty_store(capacity: usize) -> (RecencyStore, Arc<Database>) {
        let db = Arc::new(Database::new_test().await.unwrap());
        let store = RecencyStore::load(Arc::clone(&db), capacity).await.unwrap();
        (store, db)
    }

    fn ids(store: &RecencyStore) -> Vec<String> {
        store.entries().into_iter().map(|e| e.command_id).collect()
    }

    #[tokio::test]
    async fn test_push_then_peek() {
        let (store, _db) = empty_store(50).await;

        store.push("editor.format").await;
        let first = store.peek("editor.format").unwrap();

        store.push("file.save").await;
        store.push("editor.format").await;
        let second = store.peek("editor.format").unwrap();

        assert!(second > first);
        assert!(second > store.peek("file.save").unwrap());
        // Re-push moves, never duplicates
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_peek_does_not_touch() {
        let (store, _db) = empty_store(2).await;

        store.push("a").await;
        store.push("b").await;

        // Peeking "a" must not save it from eviction
        assert_eq!(store.peek("a"), Some(1));
        assert_eq!(store.peek("a"), Some(1));
        store.push("c").await;

        assert_eq!(store.peek("a"), None);
        assert_eq!(ids(&store), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_eviction_removes_smallest_counter() {
        let (store, _db) = empty_store(3).await;
        let sequence = ["a", "b", "c", "a", "d", "b", "e", "a", "f", "c", "c", "g"];

        for id in sequence {
            let before = store.entries();
            store.push(id).await;
            let after = store.entries();
            assert!(store.len() <= 3);

            let evicted: Vec<&RecencyEntry> = before
                .iter()
                .filter(|entry| !after.iter().any(|e| e.command_id == entry.command_id))
                .collect();
            if let Some(gone) = evicted.first() {
                let smallest = before.iter().map(|e| e.counter).min().unwrap();
                assert_eq!(gone.counter, smallest);
            }
        }
    }

    #[tokio::test]
    async fn test_counters_never_reused_after_eviction() {
        let (store, _db) = empty_store(1).await;

        store.push("a").await;
        store.push("b").await;
        store.push("a").await;

        assert_eq!(store.peek("a"), Some(3));
    }

    #[tokio::test]
    async fn test_shrink_keeps_most_recent() {
        let (store, _db) = empty_store(50).await;
        for id in ["a", "b", "c", "d", "e"] {
            store.push(id).await;
        }

        store.set_capacity(2).await.unwrap();

        assert_eq!(store.capacity(), 2);
        assert_eq!(ids(&store), vec!["e", "d"]);
        assert_eq!(store.peek("c"), None);
        assert_eq!(store.peek("e"), Some(5));
    }

    #[tokio::test]
    async fn test_zero_capacity_disables_history() {
        let (store, _db) = empty_store(50).await;
        store.push("a").await;

        store.set_capacity(0).await.unwrap();
        assert!(store.is_empty());

        store.push("b").await;
        assert_eq!(store.peek("b"), None);
        assert!(store.is_empty());

        // Counters keep moving so nothing is reused once history comes back
        store.set_capacity(10).await.unwrap();
        store.push("c").await;
        assert_eq!(store.peek("c"), Some(3));
    }

    #[tokio::test]
    async fn test_clear_restarts_counter() {
        let (store, db) = empty_store(50).await;
        store.push("a").await;
        store.push("b").await;

        store.clear().await.unwrap();
        assert!(store.is_empty());

        store.push("c").await;
        assert_eq!(store.peek("c"), Some(1));

        let reloaded = RecencyStore::load(db, 50).await.unwrap();
        assert_eq!(reloaded.entries().len(), 1);
        assert_eq!(reloaded.peek("c"), Some(1));
    }

    #[tokio::test]
    async fn test_reload_preserves_order_and_counter() {
        let (store, db) = empty_store(50).await;
        for id in ["a", "b", "c", "a"] {
            store.push(id).await;
        }

        let reloaded = RecencyStore::load(db, 50).await.unwrap();
        assert_eq!(reloaded.entries(), store.entries());

        reloaded.push("d").await;
        assert_eq!(reloaded.peek("d"), Some(5));
    }

    #[tokio::test]
    async fn test_legacy_and_lru_payloads_load_the_same() {
        let legacy_db = Arc::new(Database::new_test().await.unwrap());
        legacy_db
            .set_states(
                PALETTE_SCOPE,
                &[
                    (
                        MRU_CACHE_KEY,
                        r#"{"entries":[{"key":"c","value":7},{"key":"a","value":2},{"key":"b","value":4}]}"#
                            .to_string(),
                    ),
                    (MRU_COUNTER_KEY, "8".to_string()),
                ],
            )
            .await
            .unwrap();

        let lru_db = Arc::new(Database::new_test().await.unwrap());
        lru_db
            .set_states(
                PALETTE_SCOPE,
                &[
                    (
                        MRU_CACHE_KEY,
                        r#"{"usesLRU":true,"entries":[{"key":"a","value":2},{"key":"b","value":4},{"key":"c","value":7}]}"#
                            .to_string(),
                    ),
                    (MRU_COUNTER_KEY, "8".to_string()),
                ],
            )
            .await
            .unwrap();

        let legacy = RecencyStore::load(legacy_db, 3).await.unwrap();
        let ordered = RecencyStore::load(lru_db, 3).await.unwrap();
        assert_eq!(legacy.entries(), ordered.entries());

        // Same eviction victim afterwards
        legacy.push("d").await;
        ordered.push("d").await;
        assert_eq!(legacy.entries(), ordered.entries());
        assert_eq!(legacy.peek("a"), None);
        assert_eq!(legacy.peek("d"), Some(8));
    }

    #[tokio::test]
    async fn test_corrupt_history_starts_empty() {
        let db = Arc::new(Database::new_test().await.unwrap());
        db.set_states(
            PALETTE_SCOPE,
            &[
                (MRU_CACHE_KEY, "{not json".to_string()),
                (MRU_COUNTER_KEY, "eleven".to_string()),
            ],
        )
        .await
        .unwrap();

        let store = RecencyStore::load(db, 50).await.unwrap();
        assert!(store.is_empty());

        store.push("a").await;
        assert_eq!(store.peek("a"), Some(1));
    }

    #[tokio::test]
    async fn test_missing_counter_stays_above_entries() {
        let db = Arc::new(Database::new_test().await.unwrap());
        db.set_state(
            PALETTE_SCOPE,
            MRU_CACHE_KEY,
            r#"{"usesLRU":true,"entries":[{"key":"a","value":41}]}"#.to_string(),
        )
        .await
        .unwrap();

        let store = RecencyStore::load(db, 50).await.unwrap();
        store.push("b").await;
        assert_eq!(store.peek("b"), Some(42));
    }

    #[tokio::test]
    async fn test_maxed_out_entry_counter_is_corrupt() {
        let db = Arc::new(Database::new_test().await.unwrap());
        db.set_state(
            PALETTE_SCOPE,
            MRU_CACHE_KEY,
            format!(r#"{{"usesLRU":true,"entries":[{{"key":"a","value":{}}}]}}"#, u64::MAX),
        )
        .await
        .unwrap();

        let store = RecencyStore::load(db, 50).await.unwrap();
        assert!(store.is_empty());

        store.push("b").await;
        assert_eq!(store.peek("a"), None);
        assert_eq!(store.peek("b"), Some(1));
    }

    #[tokio::test]
    async fn test_maxed_out_stored_counter_starts_over() {
        let db = Arc::new(Database::new_test().await.unwrap());
        db.set_states(
            PALETTE_SCOPE,
            &[
                (
                    MRU_CACHE_KEY,
                    r#"{"usesLRU":true,"entries":[{"key":"a","value":3}]}"#.to_string(),
                ),
                (MRU_COUNTER_KEY, u64::MAX.to_string()),
            ],
        )
        .await
        .unwrap();

        let store = RecencyStore::load(db, 50).await.unwrap();
        assert_eq!(store.peek("a"), Some(3));

        store.push("b").await;
        assert_eq!(ids(&store), vec!["b"]);
        assert_eq!(store.peek("b"), Some(1));

        store.push("c").await;
        assert_eq!(store.peek("c"), Some(2));
    }

    #[tokio::test]
    async fn test_load_truncates_to_capacity() {
        let (store, db) = empty_store(50).await;
        for id in ["a", "b", "c", "d"] {
            store.push(id).await;
        }

        let reloaded = RecencyStore::load(db, 2).await.unwrap();
        assert_eq!(ids(&reloaded), vec!["d", "c"]);
    }

    #[tokio::test]
    async fn test_capacity_follows_settings() {
        let db = Arc::new(Database::new_test().await.unwrap());
        let store = Arc::new(RecencyStore::load(db, 50).await.unwrap());
        for id in ["a", "b", "c"] {
            store.push(id).await;
        }

        let (tx, rx) = watch::channel(Settings::default());
        let task = spawn_capacity_sync(Arc::clone(&store), rx);

        tx.send_modify(|settings| settings.history_length = 1);
        drop(tx);
        task.await.unwrap();

        assert_eq!(store.capacity(), 1);
        assert_eq!(ids(&store), vec!["c"]);
    }
}
