//! Game-state accrual and transaction engine for an idle "tap the goat"
//! clicker: upgrades, passive income loops, offline catch-up, quests,
//! boosts, events, prestige and achievements over a single game row.

pub mod achievements;
pub mod config;
pub mod console;
pub mod cost;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod format;
pub mod offline;
pub mod state;
pub mod storage;
pub mod ticks;
pub mod types;
pub mod yields;

pub use cost::Upgrade;
pub use engine::{GameEngine, PurchaseOutcome};
pub use error::{EngineError, StoreError};
pub use state::StateStore;
pub use types::{AchievementRecord, EventType, GameState, QuestType};
