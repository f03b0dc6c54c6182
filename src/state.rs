use crate::error::StoreError;
use crate::storage::{AchievementSet, MemoryStorage, Snapshot, Storage};
use crate::types::{AchievementRecord, GameState};
use std::collections::BTreeSet;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error};

/// Outcome of a transaction body: write the new row, or leave it alone.
/// Either way the body hands back a value to the caller.
#[derive(Debug)]
pub enum Txn<T> {
    Commit(GameState, T),
    Abort(T),
}

/// Owner of the game row and the achievement set.
///
/// Writers are serialised by a mutex per resource; readers go through watch
/// channels, which always hold the last committed value.
pub struct StateStore {
    row: Mutex<Option<GameState>>,
    achievements: Mutex<AchievementSet>,
    storage: Box<dyn Storage>,
    state_tx: watch::Sender<GameState>,
    achievements_tx: watch::Sender<BTreeSet<String>>,
}

impl StateStore {
    pub fn open(storage: impl Storage) -> Result<Self, StoreError> {
        let snapshot = storage.load()?;
        Ok(Self::from_snapshot(snapshot, Box::new(storage)))
    }

    /// Fresh non-durable store.
    pub fn in_memory() -> Self {
        Self::with_state(GameState::default())
    }

    /// Non-durable store seeded with `state`.
    pub fn with_state(state: GameState) -> Self {
        let snapshot = Snapshot {
            state: Some(state),
            achievements: AchievementSet::new(),
        };
        Self::from_snapshot(snapshot, Box::new(MemoryStorage::new()))
    }

    fn from_snapshot(snapshot: Snapshot, storage: Box<dyn Storage>) -> Self {
        let initial = snapshot.state.clone().unwrap_or_default();
        let ids: BTreeSet<String> = snapshot.achievements.keys().cloned().collect();

        let (state_tx, _) = watch::channel(initial);
        let (achievements_tx, _) = watch::channel(ids);

        Self {
            row: Mutex::new(snapshot.state),
            achievements: Mutex::new(snapshot.achievements),
            storage,
            state_tx,
            achievements_tx,
        }
    }

    /// The stored row, or `None` if it was never written.
    pub async fn get(&self) -> Option<GameState> {
        self.row.lock().await.clone()
    }

    /// Last committed row (defaults if none). Does not wait for writers.
    pub fn snapshot(&self) -> GameState {
        self.state_tx.borrow().clone()
    }

    /// Create the row with defaults if it does not exist yet.
    pub async fn get_or_create(&self) -> Result<GameState, StoreError> {
        self.run_exclusive(|current| current).await
    }

    /// Replace the row wholesale.
    pub async fn put(&self, state: GameState) -> Result<(), StoreError> {
        self.transact(move |_| Txn::Commit(state, ())).await
    }

    /// Read current-or-default, apply `f`, persist, and return the result,
    /// all while holding the writer lock.
    pub async fn run_exclusive<F>(&self, f: F) -> Result<GameState, StoreError>
    where
        F: FnOnce(GameState) -> GameState,
    {
        self.transact(|current| {
            let next = f(current.clone());
            Txn::Commit(next.clone(), next)
        })
        .await
    }

    /// Like [`run_exclusive`](Self::run_exclusive), but `f` may return
    /// `None` to abort without writing.
    pub async fn update_if<F>(&self, f: F) -> Result<Option<GameState>, StoreError>
    where
        F: FnOnce(&GameState) -> Option<GameState>,
    {
        self.transact(|current| match f(current) {
            Some(next) => Txn::Commit(next.clone(), Some(next)),
            None => Txn::Abort(None),
        })
        .await
    }

    /// The single write path for the row.
    ///
    /// If persisting fails, neither the in-memory row nor any observer sees
    /// the new value. Commits that change nothing are skipped.
    pub async fn transact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&GameState) -> Txn<T>,
    {
        let mut row = self.row.lock().await;
        let current = row.clone().unwrap_or_default();

        match f(&current) {
            Txn::Abort(out) => Ok(out),
            Txn::Commit(next, out) => {
                if row.as_ref() == Some(&next) {
                    return Ok(out);
                }

                if let Err(e) = self.storage.save_state(&next) {
                    error!("State commit failed: {}", e);
                    return Err(e);
                }

                debug!(
                    "Commit: points={} taps={} crypto={}",
                    next.points, next.total_taps, next.crypto_amount
                );
                *row = Some(next.clone());
                self.state_tx.send_replace(next);
                Ok(out)
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.state_tx.subscribe()
    }

    /// Stream of committed rows, starting with the current one.
    pub fn observe(&self) -> WatchStream<GameState> {
        WatchStream::new(self.state_tx.subscribe())
    }

    /// Record an unlock unless the id is already present.
    ///
    /// Returns true if this call created the record.
    pub async fn achievements_insert_if_absent(
        &self,
        id: &str,
        unlocked_at_epoch_ms: i64,
    ) -> Result<bool, StoreError> {
        let mut unlocked = self.achievements.lock().await;
        if unlocked.contains_key(id) {
            return Ok(false);
        }

        let mut next = unlocked.clone();
        next.insert(id.to_string(), unlocked_at_epoch_ms);
        self.storage.save_achievements(&next)?;

        *unlocked = next;
        self.achievements_tx
            .send_replace(unlocked.keys().cloned().collect());
        Ok(true)
    }

    /// Unlocked ids as of the last insert.
    pub fn unlocked_ids(&self) -> BTreeSet<String> {
        self.achievements_tx.borrow().clone()
    }

    /// All unlock records, oldest first.
    pub async fn achievement_records(&self) -> Vec<AchievementRecord> {
        let unlocked = self.achievements.lock().await;
        let mut records: Vec<AchievementRecord> = unlocked
            .iter()
            .map(|(id, at)| AchievementRecord {
                id: id.clone(),
                unlocked_at_epoch_ms: *at,
            })
            .collect();
        records.sort_by(|a, b| {
            a.unlocked_at_epoch_ms
                .cmp(&b.unlocked_at_epoch_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    pub fn subscribe_achievements(&self) -> watch::Receiver<BTreeSet<String>> {
        self.achievements_tx.subscribe()
    }

    pub fn achievements_observe(&self) -> WatchStream<BTreeSet<String>> {
        WatchStream::new(self.achievements_tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonFileStorage;
    use futures_util::StreamExt;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_row_absent_until_first_commit() {
        let store = StateStore::open(MemoryStorage::new()).unwrap();
        assert!(store.get().await.is_none());

        let created = store.get_or_create().await.unwrap();
        assert_eq!(created, GameState::default());
        assert_eq!(store.get().await, Some(GameState::default()));
    }

    #[tokio::test]
    async fn test_run_exclusive_commits_and_notifies() {
        let store = StateStore::in_memory();
        let mut rx = store.subscribe();

        let next = store
            .run_exclusive(|mut s| {
                s.points += 10;
                s
            })
            .await
            .unwrap();

        assert_eq!(next.points, 10);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().points, 10);
        assert_eq!(store.snapshot().points, 10);
    }

    #[tokio::test]
    async fn test_update_if_abort_writes_nothing() {
        let store = StateStore::in_memory();
        let mut rx = store.subscribe();

        let result = store.update_if(|_| None).await.unwrap();

        assert!(result.is_none());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_row_untouched() {
        let storage = MemoryStorage::with_state(GameState {
            points: 5,
            ..GameState::default()
        });
        storage.fail_next_writes(1);
        let store = StateStore::open(storage).unwrap();
        let mut rx = store.subscribe();

        let result = store
            .run_exclusive(|mut s| {
                s.points = 500;
                s
            })
            .await;

        assert!(matches!(result, Err(StoreError::Io(_))));
        assert_eq!(store.get().await.unwrap().points, 5);
        assert_eq!(store.snapshot().points, 5);
        assert!(!rx.has_changed().unwrap());

        // The failure is not sticky.
        let retried = store
            .run_exclusive(|mut s| {
                s.points = 500;
                s
            })
            .await
            .unwrap();
        assert_eq!(retried.points, 500);
    }

    #[tokio::test]
    async fn test_observe_yields_current_then_commits() {
        let store = Arc::new(StateStore::in_memory());
        let mut stream = store.observe();

        assert_eq!(stream.next().await.unwrap().points, 0);

        store
            .run_exclusive(|mut s| {
                s.points = 7;
                s
            })
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().points, 7);
    }

    #[tokio::test]
    async fn test_achievement_insert_is_idempotent() {
        let store = StateStore::in_memory();

        assert!(store.achievements_insert_if_absent("first_tap", 100).await.unwrap());
        assert!(!store.achievements_insert_if_absent("first_tap", 200).await.unwrap());

        let records = store.achievement_records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].unlocked_at_epoch_ms, 100);
        assert!(store.unlocked_ids().contains("first_tap"));
    }

    #[tokio::test]
    async fn test_put_replaces_row() {
        let store = StateStore::in_memory();
        let replacement = GameState {
            points: 9,
            prestige_level: 2,
            ..GameState::default()
        };

        store.put(replacement.clone()).await.unwrap();

        assert_eq!(store.get().await, Some(replacement));
    }

    #[tokio::test]
    async fn test_achievement_stream_only_grows() {
        let store = StateStore::in_memory();
        let mut ids = store.achievements_observe();

        assert!(ids.next().await.unwrap().is_empty());
        store.achievements_insert_if_absent("taps_100", 1).await.unwrap();
        store.achievements_insert_if_absent("first_tap", 1).await.unwrap();

        let latest = ids.next().await.unwrap();
        assert!(latest.contains("taps_100"));
        assert!(latest.contains("first_tap"));
    }

    #[tokio::test]
    async fn test_file_backed_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = StateStore::open(JsonFileStorage::open(dir.path()).unwrap()).unwrap();
            store
                .run_exclusive(|mut s| {
                    s.points = 77;
                    s
                })
                .await
                .unwrap();
            store.achievements_insert_if_absent("points_1k", 5).await.unwrap();
        }

        let store = StateStore::open(JsonFileStorage::open(dir.path()).unwrap()).unwrap();
        assert_eq!(store.get().await.unwrap().points, 77);
        assert!(store.unlocked_ids().contains("points_1k"));
    }
}
