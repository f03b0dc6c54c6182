use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The single live game row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub points: u64,

    // Upgrade levels
    pub tap_power: u32,
    pub auto_clickers: u32,
    pub auto_power: u32,
    pub points_multiplier: u32,
    pub auto_clicker_speed: u32,
    pub combo_bonus: u32,
    pub offline_multiplier: u32,
    pub premium_upgrade1: u32,
    pub premium_upgrade2: u32,

    // Goat, room equipment and mining rig
    pub goat_pen_level: u32,
    pub goat_food_level: u32,
    pub fridge_level: u32,
    pub printer_level: u32,
    pub scanner_level: u32,
    pub printer3d_level: u32,
    pub mining_power: u32,

    pub total_taps: u64,

    pub crypto_amount: u64,
    pub has_sold_crypto: bool,

    pub last_seen_epoch_ms: i64,
    pub last_tap_time: i64,
    pub last_mining_time: i64,

    pub prestige_level: u32,
    pub prestige_points: u64,

    pub boost_multiplier: u32,
    pub boost_end_time: i64,

    pub active_quest_type: QuestType,
    pub active_quest_progress: u64,
    pub active_quest_target: u64,
    pub active_quest_reward: u64,
    pub last_quest_reset_time: i64,

    pub active_event_type: EventType,
    pub active_event_end_time: i64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            points: 0,
            tap_power: 1,
            auto_clickers: 0,
            auto_power: 1,
            points_multiplier: 1,
            auto_clicker_speed: 1,
            combo_bonus: 0,
            offline_multiplier: 1,
            premium_upgrade1: 0,
            premium_upgrade2: 0,
            goat_pen_level: 0,
            goat_food_level: 0,
            fridge_level: 0,
            printer_level: 0,
            scanner_level: 0,
            printer3d_level: 0,
            mining_power: 0,
            total_taps: 0,
            crypto_amount: 0,
            has_sold_crypto: false,
            last_seen_epoch_ms: 0,
            last_tap_time: 0,
            last_mining_time: 0,
            prestige_level: 0,
            prestige_points: 0,
            boost_multiplier: 1,
            boost_end_time: 0,
            active_quest_type: QuestType::None,
            active_quest_progress: 0,
            active_quest_target: 0,
            active_quest_reward: 0,
            last_quest_reset_time: 0,
            active_event_type: EventType::None,
            active_event_end_time: 0,
        }
    }
}

impl GameState {
    /// Boost multiplier in effect at `now_ms`.
    pub fn active_boost(&self, now_ms: i64) -> u64 {
        if now_ms < self.boost_end_time {
            u64::from(self.boost_multiplier.max(1))
        } else {
            1
        }
    }

    /// Global event multiplier in effect at `now_ms`.
    pub fn event_multiplier(&self, now_ms: i64) -> u64 {
        if self.active_event_type == EventType::DoubleDay && now_ms < self.active_event_end_time {
            2
        } else {
            1
        }
    }

    pub fn has_active_quest(&self) -> bool {
        self.active_quest_type != QuestType::None
    }

    pub fn clear_quest(&mut self) {
        self.active_quest_type = QuestType::None;
        self.active_quest_progress = 0;
        self.active_quest_target = 0;
        self.active_quest_reward = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestType {
    #[default]
    None,
    Taps,
    Points,
    Upgrades,
}

impl QuestType {
    pub const ROLLABLE: [QuestType; 3] = [QuestType::Taps, QuestType::Points, QuestType::Upgrades];

    /// Fixed (target, reward) pair for each quest kind.
    pub fn target_and_reward(self) -> (u64, u64) {
        match self {
            QuestType::Taps => (100, 1_000),
            QuestType::Points => (10_000, 5_000),
            QuestType::Upgrades => (5, 2_000),
            QuestType::None => (0, 0),
        }
    }
}

impl fmt::Display for QuestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuestType::None => "none",
            QuestType::Taps => "taps",
            QuestType::Points => "points",
            QuestType::Upgrades => "upgrades",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[default]
    None,
    DoubleDay,
    FreeUpgrades,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::None => "none",
            EventType::DoubleDay => "double_day",
            EventType::FreeUpgrades => "free_upgrades",
        };
        f.write_str(name)
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "double_day" => Ok(EventType::DoubleDay),
            "free_upgrades" => Ok(EventType::FreeUpgrades),
            other => Err(format!("unknown event type: {}", other)),
        }
    }
}

/// An unlocked achievement. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub id: String,
    pub unlocked_at_epoch_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fresh_game() {
        let state = GameState::default();
        assert_eq!(state.tap_power, 1);
        assert_eq!(state.auto_power, 1);
        assert_eq!(state.points_multiplier, 1);
        assert_eq!(state.auto_clicker_speed, 1);
        assert_eq!(state.offline_multiplier, 1);
        assert_eq!(state.boost_multiplier, 1);
        assert!(!state.has_active_quest());
    }

    #[test]
    fn test_boost_and_event_windows() {
        let state = GameState {
            boost_multiplier: 3,
            boost_end_time: 10_000,
            active_event_type: EventType::DoubleDay,
            active_event_end_time: 5_000,
            ..GameState::default()
        };

        assert_eq!(state.active_boost(9_999), 3);
        assert_eq!(state.active_boost(10_000), 1);
        assert_eq!(state.event_multiplier(4_999), 2);
        assert_eq!(state.event_multiplier(5_000), 1);
    }

    #[test]
    fn test_free_upgrades_event_does_not_double() {
        let state = GameState {
            active_event_type: EventType::FreeUpgrades,
            active_event_end_time: i64::MAX,
            ..GameState::default()
        };
        assert_eq!(state.event_multiplier(0), 1);
    }

    #[test]
    fn test_old_snapshot_fills_missing_fields() {
        let state: GameState = serde_json::from_str(r#"{"points": 42, "tap_power": 3}"#).unwrap();
        assert_eq!(state.points, 42);
        assert_eq!(state.tap_power, 3);
        assert_eq!(state.boost_multiplier, 1);
        assert_eq!(state.active_quest_type, QuestType::None);
    }

    #[test]
    fn test_event_type_parse() {
        assert_eq!("double-day".parse::<EventType>().unwrap(), EventType::DoubleDay);
        assert_eq!("FREE_UPGRADES".parse::<EventType>().unwrap(), EventType::FreeUpgrades);
        assert!("triple".parse::<EventType>().is_err());
    }
}
