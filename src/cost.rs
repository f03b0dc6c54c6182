//! Upgrade price curves.
//!
//! Every curve is linear up to a per-upgrade threshold and compounds by 15%
//! per level after it. Prices are always computed from the level stored in
//! the row being mutated, never from a cached value.

use crate::types::GameState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const COMPOUND_RATE: f64 = 1.15;

/// Linear-then-compounding price curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostCurve {
    pub base: u64,
    pub step: u64,
    pub threshold: u32,
}

impl CostCurve {
    pub const fn new(base: u64, step: u64, threshold: u32) -> Self {
        Self {
            base,
            step,
            threshold,
        }
    }

    /// Price of buying the next level when currently at `level`.
    pub fn cost(&self, level: u32) -> u64 {
        if level < self.threshold {
            return self.base + self.step * u64::from(level);
        }

        let linear_part = self.base + self.step * u64::from(self.threshold);
        let exponent = i32::try_from(level - self.threshold).unwrap_or(i32::MAX);
        let price = linear_part as f64 * COMPOUND_RATE.powi(exponent);
        // `as` saturates at u64::MAX for huge or infinite values.
        price as u64
    }
}

/// Everything that can be bought with points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upgrade {
    TapPower,
    AutoClicker,
    AutoPower,
    PointsMultiplier,
    AutoClickerSpeed,
    ComboBonus,
    OfflineMultiplier,
    PremiumUpgrade1,
    PremiumUpgrade2,
    GoatPen,
    GoatFood,
    Fridge,
    Printer,
    Scanner,
    Printer3d,
    MiningPower,
}

impl Upgrade {
    pub const ALL: [Upgrade; 16] = [
        Upgrade::TapPower,
        Upgrade::AutoClicker,
        Upgrade::AutoPower,
        Upgrade::PointsMultiplier,
        Upgrade::AutoClickerSpeed,
        Upgrade::ComboBonus,
        Upgrade::OfflineMultiplier,
        Upgrade::PremiumUpgrade1,
        Upgrade::PremiumUpgrade2,
        Upgrade::GoatPen,
        Upgrade::GoatFood,
        Upgrade::Fridge,
        Upgrade::Printer,
        Upgrade::Scanner,
        Upgrade::Printer3d,
        Upgrade::MiningPower,
    ];

    pub fn curve(self) -> CostCurve {
        match self {
            Upgrade::TapPower => CostCurve::new(10, 5, 25),
            Upgrade::AutoClicker => CostCurve::new(50, 25, 25),
            Upgrade::AutoPower => CostCurve::new(20, 10, 25),
            Upgrade::PointsMultiplier => CostCurve::new(200, 150, 20),
            Upgrade::AutoClickerSpeed => CostCurve::new(300, 200, 20),
            Upgrade::ComboBonus => CostCurve::new(250, 150, 20),
            Upgrade::OfflineMultiplier => CostCurve::new(400, 250, 20),
            Upgrade::PremiumUpgrade1 | Upgrade::PremiumUpgrade2 => CostCurve::new(1_000, 500, 15),
            Upgrade::GoatPen => CostCurve::new(100, 50, 30),
            Upgrade::GoatFood => CostCurve::new(150, 75, 30),
            Upgrade::Fridge => CostCurve::new(300, 150, 25),
            Upgrade::Printer => CostCurve::new(400, 200, 25),
            Upgrade::Scanner => CostCurve::new(500, 250, 25),
            Upgrade::Printer3d => CostCurve::new(800, 400, 20),
            Upgrade::MiningPower => CostCurve::new(600, 300, 25),
        }
    }

    /// Price of the next level at `level`.
    pub fn cost(self, level: u32) -> u64 {
        self.curve().cost(level)
    }

    /// Current level of this upgrade in `state`.
    pub fn level(self, state: &GameState) -> u32 {
        *self.level_ref(state)
    }

    /// Price of the next level given the levels in `state`.
    pub fn cost_for(self, state: &GameState) -> u64 {
        self.cost(self.level(state))
    }

    /// Raise the level by one.
    pub fn apply(self, state: &mut GameState) {
        let level = self.level_mut(state);
        *level = level.saturating_add(1);
    }

    fn level_ref(self, state: &GameState) -> &u32 {
        match self {
            Upgrade::TapPower => &state.tap_power,
            Upgrade::AutoClicker => &state.auto_clickers,
            Upgrade::AutoPower => &state.auto_power,
            Upgrade::PointsMultiplier => &state.points_multiplier,
            Upgrade::AutoClickerSpeed => &state.auto_clicker_speed,
            Upgrade::ComboBonus => &state.combo_bonus,
            Upgrade::OfflineMultiplier => &state.offline_multiplier,
            Upgrade::PremiumUpgrade1 => &state.premium_upgrade1,
            Upgrade::PremiumUpgrade2 => &state.premium_upgrade2,
            Upgrade::GoatPen => &state.goat_pen_level,
            Upgrade::GoatFood => &state.goat_food_level,
            Upgrade::Fridge => &state.fridge_level,
            Upgrade::Printer => &state.printer_level,
            Upgrade::Scanner => &state.scanner_level,
            Upgrade::Printer3d => &state.printer3d_level,
            Upgrade::MiningPower => &state.mining_power,
        }
    }

    fn level_mut(self, state: &mut GameState) -> &mut u32 {
        match self {
            Upgrade::TapPower => &mut state.tap_power,
            Upgrade::AutoClicker => &mut state.auto_clickers,
            Upgrade::AutoPower => &mut state.auto_power,
            Upgrade::PointsMultiplier => &mut state.points_multiplier,
            Upgrade::AutoClickerSpeed => &mut state.auto_clicker_speed,
            Upgrade::ComboBonus => &mut state.combo_bonus,
            Upgrade::OfflineMultiplier => &mut state.offline_multiplier,
            Upgrade::PremiumUpgrade1 => &mut state.premium_upgrade1,
            Upgrade::PremiumUpgrade2 => &mut state.premium_upgrade2,
            Upgrade::GoatPen => &mut state.goat_pen_level,
            Upgrade::GoatFood => &mut state.goat_food_level,
            Upgrade::Fridge => &mut state.fridge_level,
            Upgrade::Printer => &mut state.printer_level,
            Upgrade::Scanner => &mut state.scanner_level,
            Upgrade::Printer3d => &mut state.printer3d_level,
            Upgrade::MiningPower => &mut state.mining_power,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Upgrade::TapPower => "tap_power",
            Upgrade::AutoClicker => "auto_clicker",
            Upgrade::AutoPower => "auto_power",
            Upgrade::PointsMultiplier => "points_multiplier",
            Upgrade::AutoClickerSpeed => "auto_clicker_speed",
            Upgrade::ComboBonus => "combo_bonus",
            Upgrade::OfflineMultiplier => "offline_multiplier",
            Upgrade::PremiumUpgrade1 => "premium_upgrade1",
            Upgrade::PremiumUpgrade2 => "premium_upgrade2",
            Upgrade::GoatPen => "goat_pen",
            Upgrade::GoatFood => "goat_food",
            Upgrade::Fridge => "fridge",
            Upgrade::Printer => "printer",
            Upgrade::Scanner => "scanner",
            Upgrade::Printer3d => "printer3d",
            Upgrade::MiningPower => "mining_power",
        }
    }
}

impl fmt::Display for Upgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Upgrade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace('-', "_");
        Upgrade::ALL
            .into_iter()
            .find(|u| u.name() == wanted)
            .ok_or_else(|| format!("unknown upgrade: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_linear_segment() {
        assert_eq!(Upgrade::TapPower.cost(1), 15);
        assert_eq!(Upgrade::TapPower.cost(24), 130);
        assert_eq!(Upgrade::AutoClicker.cost(0), 50);
        assert_eq!(Upgrade::MiningPower.cost(2), 1_200);
    }

    #[test]
    fn test_compounding_segment() {
        // At the threshold the compounding factor is 1.
        assert_eq!(Upgrade::TapPower.cost(25), 135);
        assert_eq!(Upgrade::TapPower.cost(26), 155);
        assert_eq!(Upgrade::TapPower.cost(27), 178);
    }

    #[test]
    fn test_huge_levels_saturate() {
        assert_eq!(Upgrade::Printer3d.cost(u32::MAX), u64::MAX);
    }

    #[test]
    fn test_apply_raises_only_target_level() {
        let mut state = GameState::default();
        Upgrade::GoatFood.apply(&mut state);
        assert_eq!(state.goat_food_level, 1);
        assert_eq!(
            state,
            GameState {
                goat_food_level: 1,
                ..GameState::default()
            }
        );
    }

    #[test]
    fn test_parse_names() {
        for upgrade in Upgrade::ALL {
            assert_eq!(upgrade.name().parse::<Upgrade>().unwrap(), upgrade);
        }
        assert_eq!("goat-pen".parse::<Upgrade>().unwrap(), Upgrade::GoatPen);
        assert!("rocket".parse::<Upgrade>().is_err());
    }

    proptest! {
        #[test]
        fn cost_is_positive_and_strictly_increasing(idx in 0usize..16, level in 0u32..200) {
            let upgrade = Upgrade::ALL[idx];
            let here = upgrade.cost(level);
            let next = upgrade.cost(level + 1);
            prop_assert!(here > 0);
            prop_assert!(next > here);
        }
    }
}
