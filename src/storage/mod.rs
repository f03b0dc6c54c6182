// Persistence backends for the state store.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use crate::error::StoreError;
use crate::types::GameState;
use std::collections::BTreeMap;

/// Achievement id → unlock timestamp (epoch ms).
pub type AchievementSet = BTreeMap<String, i64>;

/// Everything a backend hands back on startup.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub state: Option<GameState>,
    pub achievements: AchievementSet,
}

/// Durable storage behind [`crate::state::StateStore`].
///
/// Calls are made while the store holds its writer lock, so a backend never
/// sees two writes of the same kind concurrently. A write that returns an
/// error must leave the previously saved value readable.
pub trait Storage: Send + Sync + 'static {
    fn load(&self) -> Result<Snapshot, StoreError>;
    fn save_state(&self, state: &GameState) -> Result<(), StoreError>;
    fn save_achievements(&self, achievements: &AchievementSet) -> Result<(), StoreError>;
}
