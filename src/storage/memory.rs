use super::{AchievementSet, Snapshot, Storage};
use crate::error::StoreError;
use crate::types::GameState;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};

/// Non-durable backend. Tests can ask it to fail upcoming writes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    initial: Snapshot,
    failing_writes: AtomicU32,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing row, as if it had been saved earlier.
    pub fn with_state(state: GameState) -> Self {
        Self {
            initial: Snapshot {
                state: Some(state),
                achievements: AchievementSet::new(),
            },
            failing_writes: AtomicU32::new(0),
        }
    }

    /// Make the next `count` writes fail with an I/O error.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), StoreError> {
        let should_fail = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure").into());
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(self.initial.clone())
    }

    fn save_state(&self, _state: &GameState) -> Result<(), StoreError> {
        self.check_write()
    }

    fn save_achievements(&self, _achievements: &AchievementSet) -> Result<(), StoreError> {
        self.check_write()
    }
}
