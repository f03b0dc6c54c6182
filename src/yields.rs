//! Yield calculation for taps and the three passive income sources.
//!
//! All functions here are pure: they read a snapshot and a timestamp and
//! return what should be credited. Committing is the engine's job.

use crate::types::{EventType, GameState, QuestType};
use serde::{Deserialize, Serialize};

/// Taps closer together than this keep the combo alive.
pub const COMBO_WINDOW_MS: i64 = 2_000;
pub const MAX_COMBO_MULTIPLIER: u64 = 10;

pub const ROOM_PERIOD_MS: u64 = 2_000;
pub const MINING_PERIOD_MS: u64 = 1_000;
pub const AUTO_BASE_PERIOD_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapYield {
    pub points: u64,
    pub combo_multiplier: u64,
    /// Progress to add to the active quest, if it counts taps or points.
    pub quest_delta: u64,
}

/// Passive income sources, each driven by its own schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickSource {
    AutoClicker,
    EquipmentRoom,
    Mining,
}

impl TickSource {
    pub fn name(self) -> &'static str {
        match self {
            TickSource::AutoClicker => "auto",
            TickSource::EquipmentRoom => "room",
            TickSource::Mining => "mining",
        }
    }
}

/// What a single tick credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickYield {
    pub points: u64,
    pub crypto: u64,
}

pub fn combo_multiplier(state: &GameState, now_ms: i64) -> u64 {
    let since_last = now_ms - state.last_tap_time;
    if state.last_tap_time > 0 && since_last < COMBO_WINDOW_MS {
        (u64::from(state.combo_bonus) + 1).min(MAX_COMBO_MULTIPLIER)
    } else {
        1
    }
}

/// Points earned by one tap at `now_ms`.
///
/// Terms are applied in a fixed order; the two fractional bonuses floor
/// their intermediate results.
pub fn tap_yield(state: &GameState, now_ms: i64) -> TapYield {
    // Pen adds 20% and food 15% per level, floored in exact integer math.
    let base = scale_floor(
        u64::from(state.tap_power),
        5 + u128::from(state.goat_pen_level),
        5,
    );
    let after_multiplier = base.saturating_mul(u64::from(state.points_multiplier));
    let after_food = scale_floor(
        after_multiplier,
        100 + 15 * u128::from(state.goat_food_level),
        100,
    );

    let combo = combo_multiplier(state, now_ms);
    let points = after_food
        .saturating_mul(combo)
        .saturating_mul(state.active_boost(now_ms))
        .saturating_mul(state.event_multiplier(now_ms));

    let quest_delta = match state.active_quest_type {
        QuestType::Taps => 1,
        QuestType::Points => points,
        QuestType::Upgrades | QuestType::None => 0,
    };

    TapYield {
        points,
        combo_multiplier: combo,
        quest_delta,
    }
}

/// `floor(value * num / den)`, saturating at `u64::MAX`.
fn scale_floor(value: u64, num: u128, den: u128) -> u64 {
    u64::try_from(u128::from(value) * num / den).unwrap_or(u64::MAX)
}

/// Income from one tick of `source` at `now_ms`.
pub fn tick_yield(state: &GameState, now_ms: i64, source: TickSource) -> TickYield {
    let boost = state.active_boost(now_ms);
    let event = state.event_multiplier(now_ms);

    match source {
        TickSource::AutoClicker => TickYield {
            points: u64::from(state.auto_clickers)
                .saturating_mul(u64::from(state.auto_power))
                .saturating_mul(u64::from(state.points_multiplier))
                .saturating_mul(boost)
                .saturating_mul(event),
            crypto: 0,
        },
        TickSource::EquipmentRoom => {
            let per_tick = u64::from(state.fridge_level) * 10
                + u64::from(state.printer_level) * 15
                + u64::from(state.scanner_level) * 20
                + u64::from(state.printer3d_level) * 50;
            TickYield {
                points: per_tick.saturating_mul(boost).saturating_mul(event),
                crypto: 0,
            }
        }
        // Mining is not affected by point multipliers or boosts.
        TickSource::Mining => TickYield {
            points: 0,
            crypto: u64::from(state.mining_power),
        },
    }
}

/// Period of the auto-clicker schedule for the current speed level.
pub fn auto_period_ms(state: &GameState, base_ms: u64) -> u64 {
    (base_ms / u64::from(state.auto_clicker_speed.max(1))).max(1)
}

/// Clear a boost or event whose window has closed.
///
/// Returns true if anything was cleared. Callers run this inside the same
/// commit as the yield it gates.
pub fn expire_lapsed(state: &mut GameState, now_ms: i64) -> bool {
    let mut changed = false;

    let boost_set = state.boost_multiplier != 1 || state.boost_end_time != 0;
    if boost_set && now_ms >= state.boost_end_time {
        state.boost_multiplier = 1;
        state.boost_end_time = 0;
        changed = true;
    }

    if state.active_event_type != EventType::None && now_ms >= state.active_event_end_time {
        state.active_event_type = EventType::None;
        state.active_event_end_time = 0;
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> GameState {
        GameState::default()
    }

    #[test]
    fn test_fresh_tap_is_one_point() {
        let y = tap_yield(&plain(), 1_000);
        assert_eq!(y.points, 1);
        assert_eq!(y.combo_multiplier, 1);
        assert_eq!(y.quest_delta, 0);
    }

    #[test]
    fn test_tap_terms_apply_in_order() {
        let state = GameState {
            tap_power: 3,
            goat_pen_level: 1,   // floor(3 * 1.2) = 3
            points_multiplier: 2, // 6
            goat_food_level: 2,  // floor(6 * 1.3) = 7
            ..plain()
        };
        assert_eq!(tap_yield(&state, 1_000).points, 7);
    }

    #[test]
    fn test_fractional_bonuses_floor_exactly() {
        let food = GameState {
            tap_power: 100,
            goat_pen_level: 0,
            points_multiplier: 1,
            goat_food_level: 1,
            ..plain()
        };
        assert_eq!(tap_yield(&food, 1_000).points, 115);

        let pen = GameState {
            tap_power: 5,
            goat_pen_level: 1,
            points_multiplier: 1,
            goat_food_level: 0,
            ..plain()
        };
        assert_eq!(tap_yield(&pen, 1_000).points, 6);
    }

    #[test]
    fn test_tap_saturates_instead_of_wrapping() {
        let state = GameState {
            tap_power: u32::MAX,
            goat_pen_level: u32::MAX,
            points_multiplier: u32::MAX,
            goat_food_level: u32::MAX,
            ..plain()
        };
        assert_eq!(tap_yield(&state, 1_000).points, u64::MAX);
    }

    #[test]
    fn test_combo_needs_previous_tap_inside_window() {
        let mut state = GameState {
            combo_bonus: 2,
            ..plain()
        };
        assert_eq!(combo_multiplier(&state, 1_000), 1);

        state.last_tap_time = 1_000;
        assert_eq!(combo_multiplier(&state, 1_500), 3);
        assert_eq!(combo_multiplier(&state, 3_000), 1);
    }

    #[test]
    fn test_combo_is_capped() {
        let state = GameState {
            combo_bonus: 40,
            last_tap_time: 1_000,
            ..plain()
        };
        assert_eq!(combo_multiplier(&state, 1_001), MAX_COMBO_MULTIPLIER);
    }

    #[test]
    fn test_boost_and_double_day_stack() {
        let state = GameState {
            boost_multiplier: 3,
            boost_end_time: 10_000,
            active_event_type: EventType::DoubleDay,
            active_event_end_time: 10_000,
            ..plain()
        };
        assert_eq!(tap_yield(&state, 5_000).points, 6);
        assert_eq!(tap_yield(&state, 10_000).points, 1);
    }

    #[test]
    fn test_quest_delta_follows_quest_type() {
        let mut state = GameState {
            tap_power: 5,
            active_quest_type: QuestType::Points,
            ..plain()
        };
        assert_eq!(tap_yield(&state, 1).quest_delta, 5);

        state.active_quest_type = QuestType::Taps;
        assert_eq!(tap_yield(&state, 1).quest_delta, 1);
    }

    #[test]
    fn test_tick_sources() {
        let state = GameState {
            auto_clickers: 2,
            auto_power: 3,
            points_multiplier: 4,
            fridge_level: 1,
            printer_level: 1,
            scanner_level: 1,
            printer3d_level: 1,
            mining_power: 7,
            boost_multiplier: 2,
            boost_end_time: 100,
            ..plain()
        };

        assert_eq!(tick_yield(&state, 0, TickSource::AutoClicker).points, 48);
        assert_eq!(tick_yield(&state, 0, TickSource::EquipmentRoom).points, 190);
        assert_eq!(
            tick_yield(&state, 0, TickSource::Mining),
            TickYield {
                points: 0,
                crypto: 7
            }
        );
    }

    #[test]
    fn test_auto_period_tracks_speed() {
        let mut state = plain();
        assert_eq!(auto_period_ms(&state, 1_000), 1_000);
        state.auto_clicker_speed = 4;
        assert_eq!(auto_period_ms(&state, 1_000), 250);
        state.auto_clicker_speed = 5_000;
        assert_eq!(auto_period_ms(&state, 1_000), 1);
    }

    #[test]
    fn test_expire_lapsed() {
        let mut state = GameState {
            boost_multiplier: 5,
            boost_end_time: 100,
            active_event_type: EventType::DoubleDay,
            active_event_end_time: 200,
            ..plain()
        };

        assert!(!expire_lapsed(&mut state, 50));
        assert!(expire_lapsed(&mut state, 150));
        assert_eq!(state.boost_multiplier, 1);
        assert_eq!(state.boost_end_time, 0);
        assert_eq!(state.active_event_type, EventType::DoubleDay);

        assert!(expire_lapsed(&mut state, 200));
        assert_eq!(state.active_event_type, EventType::None);
        assert!(!expire_lapsed(&mut state, 300));
    }
}
