//! Achievement predicates and the task that unlocks them.
//!
//! The evaluator reads the game-state stream and writes only to the
//! achievement set, so its own writes never wake it up again.

use crate::error::StoreError;
use crate::state::StateStore;
use crate::types::{now_ms, GameState};
use futures_util::StreamExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info};

pub struct Achievement {
    pub id: &'static str,
    pub unlocked: fn(&GameState) -> bool,
}

pub static ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_tap",
        unlocked: |s: &GameState| s.total_taps >= 1,
    },
    Achievement {
        id: "taps_100",
        unlocked: |s: &GameState| s.total_taps >= 100,
    },
    Achievement {
        id: "taps_1k",
        unlocked: |s: &GameState| s.total_taps >= 1_000,
    },
    Achievement {
        id: "taps_10k",
        unlocked: |s: &GameState| s.total_taps >= 10_000,
    },
    Achievement {
        id: "taps_100k",
        unlocked: |s: &GameState| s.total_taps >= 100_000,
    },
    Achievement {
        id: "taps_1m",
        unlocked: |s: &GameState| s.total_taps >= 1_000_000,
    },

    Achievement {
        id: "points_1k",
        unlocked: |s: &GameState| s.points >= 1_000,
    },
    Achievement {
        id: "points_100k",
        unlocked: |s: &GameState| s.points >= 100_000,
    },
    Achievement {
        id: "points_1m",
        unlocked: |s: &GameState| s.points >= 1_000_000,
    },
    Achievement {
        id: "points_10m",
        unlocked: |s: &GameState| s.points >= 10_000_000,
    },
    Achievement {
        id: "points_100m",
        unlocked: |s: &GameState| s.points >= 100_000_000,
    },
    Achievement {
        id: "points_1b",
        unlocked: |s: &GameState| s.points >= 1_000_000_000,
    },

    Achievement {
        id: "tap_power_10",
        unlocked: |s: &GameState| s.tap_power >= 10,
    },
    Achievement {
        id: "tap_power_50",
        unlocked: |s: &GameState| s.tap_power >= 50,
    },
    Achievement {
        id: "tap_power_100",
        unlocked: |s: &GameState| s.tap_power >= 100,
    },
    Achievement {
        id: "tap_power_500",
        unlocked: |s: &GameState| s.tap_power >= 500,
    },

    Achievement {
        id: "auto_clickers_10",
        unlocked: |s: &GameState| s.auto_clickers >= 10,
    },
    Achievement {
        id: "auto_clickers_50",
        unlocked: |s: &GameState| s.auto_clickers >= 50,
    },
    Achievement {
        id: "auto_clickers_100",
        unlocked: |s: &GameState| s.auto_clickers >= 100,
    },
    Achievement {
        id: "auto_clickers_500",
        unlocked: |s: &GameState| s.auto_clickers >= 500,
    },

    Achievement {
        id: "auto_power_5",
        unlocked: |s: &GameState| s.auto_power >= 5,
    },
    Achievement {
        id: "auto_power_25",
        unlocked: |s: &GameState| s.auto_power >= 25,
    },
    Achievement {
        id: "auto_power_100",
        unlocked: |s: &GameState| s.auto_power >= 100,
    },

    Achievement {
        id: "multiplier_5x",
        unlocked: |s: &GameState| s.points_multiplier >= 5,
    },
    Achievement {
        id: "multiplier_10x",
        unlocked: |s: &GameState| s.points_multiplier >= 10,
    },
    Achievement {
        id: "multiplier_50x",
        unlocked: |s: &GameState| s.points_multiplier >= 50,
    },

    Achievement {
        id: "auto_speed_5",
        unlocked: |s: &GameState| s.auto_clicker_speed >= 5,
    },
    Achievement {
        id: "auto_speed_10",
        unlocked: |s: &GameState| s.auto_clicker_speed >= 10,
    },
    Achievement {
        id: "auto_speed_20",
        unlocked: |s: &GameState| s.auto_clicker_speed >= 20,
    },

    Achievement {
        id: "combo_5",
        unlocked: |s: &GameState| s.combo_bonus >= 5,
    },
    Achievement {
        id: "combo_10",
        unlocked: |s: &GameState| s.combo_bonus >= 10,
    },
    Achievement {
        id: "combo_master",
        unlocked: |s: &GameState| s.combo_bonus >= 20,
    },

    Achievement {
        id: "offline_multiplier_5",
        unlocked: |s: &GameState| s.offline_multiplier >= 5,
    },
    Achievement {
        id: "offline_multiplier_10",
        unlocked: |s: &GameState| s.offline_multiplier >= 10,
    },

    Achievement {
        id: "goat_pen_5",
        unlocked: |s: &GameState| s.goat_pen_level >= 5,
    },
    Achievement {
        id: "goat_pen_10",
        unlocked: |s: &GameState| s.goat_pen_level >= 10,
    },
    Achievement {
        id: "goat_pen_20",
        unlocked: |s: &GameState| s.goat_pen_level >= 20,
    },
    Achievement {
        id: "goat_food_5",
        unlocked: |s: &GameState| s.goat_food_level >= 5,
    },
    Achievement {
        id: "goat_food_10",
        unlocked: |s: &GameState| s.goat_food_level >= 10,
    },
    Achievement {
        id: "goat_food_20",
        unlocked: |s: &GameState| s.goat_food_level >= 20,
    },
    Achievement {
        id: "goat_master",
        unlocked: |s: &GameState| s.goat_pen_level >= 10 && s.goat_food_level >= 10,
    },

    Achievement {
        id: "fridge_5",
        unlocked: |s: &GameState| s.fridge_level >= 5,
    },
    Achievement {
        id: "fridge_10",
        unlocked: |s: &GameState| s.fridge_level >= 10,
    },
    Achievement {
        id: "printer_5",
        unlocked: |s: &GameState| s.printer_level >= 5,
    },
    Achievement {
        id: "printer_10",
        unlocked: |s: &GameState| s.printer_level >= 10,
    },
    Achievement {
        id: "scanner_5",
        unlocked: |s: &GameState| s.scanner_level >= 5,
    },
    Achievement {
        id: "scanner_10",
        unlocked: |s: &GameState| s.scanner_level >= 10,
    },
    Achievement {
        id: "printer_3d_5",
        unlocked: |s: &GameState| s.printer3d_level >= 5,
    },
    Achievement {
        id: "printer_3d_10",
        unlocked: |s: &GameState| s.printer3d_level >= 10,
    },
    Achievement {
        id: "room_master",
        unlocked: |s: &GameState| {
            s.fridge_level >= 5
                && s.printer_level >= 5
                && s.scanner_level >= 5
                && s.printer3d_level >= 5
        },
    },

    Achievement {
        id: "mining_power_5",
        unlocked: |s: &GameState| s.mining_power >= 5,
    },
    Achievement {
        id: "mining_power_10",
        unlocked: |s: &GameState| s.mining_power >= 10,
    },
    Achievement {
        id: "mining_power_50",
        unlocked: |s: &GameState| s.mining_power >= 50,
    },
    Achievement {
        id: "crypto_1k",
        unlocked: |s: &GameState| s.crypto_amount >= 1_000,
    },
    Achievement {
        id: "crypto_10k",
        unlocked: |s: &GameState| s.crypto_amount >= 10_000,
    },
    Achievement {
        id: "crypto_100k",
        unlocked: |s: &GameState| s.crypto_amount >= 100_000,
    },
    Achievement {
        id: "crypto_millionaire",
        unlocked: |s: &GameState| s.crypto_amount >= 1_000_000,
    },
    Achievement {
        id: "crypto_sold",
        unlocked: |s: &GameState| s.has_sold_crypto,
    },

    Achievement {
        id: "premium_1",
        unlocked: |s: &GameState| s.premium_upgrade1 >= 1,
    },
    Achievement {
        id: "premium_2",
        unlocked: |s: &GameState| s.premium_upgrade2 >= 1,
    },
    Achievement {
        id: "premium_both",
        unlocked: |s: &GameState| s.premium_upgrade1 >= 1 && s.premium_upgrade2 >= 1,
    },

    Achievement {
        id: "speed_demon",
        unlocked: |s: &GameState| s.auto_clicker_speed >= 10 && s.auto_clickers >= 50,
    },
    Achievement {
        id: "millionaire",
        unlocked: |s: &GameState| s.points >= 1_000_000 && s.total_taps >= 10_000,
    },
    Achievement {
        id: "billionaire",
        unlocked: |s: &GameState| s.points >= 1_000_000_000,
    },
    Achievement {
        id: "perfectionist",
        unlocked: |s: &GameState| {
            s.tap_power >= 10
                && s.auto_clickers >= 10
                && s.auto_power >= 10
                && s.points_multiplier >= 10
        },
    },
    Achievement {
        id: "collector",
        unlocked: |s: &GameState| {
            s.goat_pen_level >= 1
                && s.goat_food_level >= 1
                && s.fridge_level >= 1
                && s.printer_level >= 1
                && s.scanner_level >= 1
                && s.printer3d_level >= 1
                && s.mining_power >= 1
        },
    },
];

/// Ids whose predicate holds for `state`.
pub fn satisfied(state: &GameState) -> impl Iterator<Item = &'static str> + '_ {
    ACHIEVEMENTS
        .iter()
        .filter(move |a| (a.unlocked)(state))
        .map(|a| a.id)
}

/// Satisfied ids that are not yet in `unlocked`.
pub fn pending(state: &GameState, unlocked: &BTreeSet<String>) -> Vec<&'static str> {
    satisfied(state)
        .filter(|id| !unlocked.contains(*id))
        .collect()
}

/// Insert every newly satisfied achievement. Returns the ids this call
/// created.
pub async fn unlock_satisfied(
    store: &StateStore,
    state: &GameState,
    now_ms: i64,
) -> Result<Vec<&'static str>, StoreError> {
    let mut created = Vec::new();
    for id in pending(state, &store.unlocked_ids()) {
        if store.achievements_insert_if_absent(id, now_ms).await? {
            info!("🏆 Achievement unlocked: {}", id);
            created.push(id);
        }
    }
    Ok(created)
}

pub struct AchievementEvaluator {
    store: Arc<StateStore>,
}

impl AchievementEvaluator {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Evaluate committed states until the store goes away.
    ///
    /// The state stream only holds the latest row, so commits that land while
    /// an evaluation is in flight collapse into one. A predicate that held only
    /// in an intermediate row is not unlocked; unlocks follow the row as the
    /// evaluator next sees it.
    pub async fn run(&self) {
        let mut states = self.store.observe();
        info!("🏆 Achievement evaluator started ({} achievements)", ACHIEVEMENTS.len());

        while let Some(state) = states.next().await {
            if let Err(e) = unlock_satisfied(&self.store, &state, now_ms()).await {
                error!("Achievement unlock failed: {}", e);
            }
        }
    }
}
