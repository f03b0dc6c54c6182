//! Offline catch-up applied when the game comes back to the foreground.

use crate::engine::GameEngine;
use crate::error::EngineError;
use crate::state::Txn;
use crate::types::GameState;
use tracing::info;

/// Default ceiling on credited absence: 8 hours.
pub const DEFAULT_OFFLINE_CAP_SECS: u64 = 8 * 60 * 60;

/// Points owed for the time between `last_seen_epoch_ms` and `now_ms`.
///
/// Zero on first run (no stamp yet) or if the clock went backwards.
pub fn offline_gain(state: &GameState, now_ms: i64, cap_secs: u64) -> u64 {
    if state.last_seen_epoch_ms <= 0 {
        return 0;
    }
    let elapsed_secs = u64::try_from((now_ms - state.last_seen_epoch_ms) / 1_000).unwrap_or(0);
    let effective = elapsed_secs.min(cap_secs);

    effective
        .saturating_mul(u64::from(state.auto_clickers))
        .saturating_mul(u64::from(state.auto_power))
        .saturating_mul(u64::from(state.offline_multiplier))
}

impl GameEngine {
    /// Resume: credit capped offline income and stamp `now_ms`.
    ///
    /// Returns the points credited.
    pub async fn on_foreground(&self, now_ms: i64, cap_secs: u64) -> Result<u64, EngineError> {
        let gained = self
            .store()
            .transact(|current| {
                let gain = offline_gain(current, now_ms, cap_secs);
                let next = GameState {
                    points: current.points.saturating_add(gain),
                    last_seen_epoch_ms: current.last_seen_epoch_ms.max(now_ms),
                    ..current.clone()
                };
                Txn::Commit(next, gain)
            })
            .await?;

        if gained > 0 {
            info!("💤 Offline income: +{} points", gained);
        }
        Ok(gained)
    }

    /// Background: only stamp `now_ms`; income is granted on the next resume.
    pub async fn on_background(&self, now_ms: i64) -> Result<(), EngineError> {
        self.unconditional_mutate(|current| GameState {
            last_seen_epoch_ms: current.last_seen_epoch_ms.max(now_ms),
            ..current
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateStore;
    use std::sync::Arc;

    const T: i64 = 1_700_000_000_000;

    fn idle_farm() -> GameState {
        GameState {
            auto_clickers: 2,
            auto_power: 3,
            offline_multiplier: 1,
            last_seen_epoch_ms: T,
            ..GameState::default()
        }
    }

    #[test]
    fn test_gain_is_capped() {
        let now = T + 100_000 * 1_000;
        assert_eq!(offline_gain(&idle_farm(), now, 28_800), 172_800);
    }

    #[test]
    fn test_gain_below_cap() {
        let now = T + 60 * 1_000 + 999;
        assert_eq!(offline_gain(&idle_farm(), now, DEFAULT_OFFLINE_CAP_SECS), 360);
    }

    #[test]
    fn test_clock_going_backwards_grants_nothing() {
        assert_eq!(offline_gain(&idle_farm(), T - 5_000, DEFAULT_OFFLINE_CAP_SECS), 0);
    }

    #[tokio::test]
    async fn test_first_run_only_stamps() {
        let engine = GameEngine::new(Arc::new(StateStore::with_state(GameState {
            auto_clickers: 10,
            ..GameState::default()
        })));

        assert_eq!(engine.on_foreground(T, DEFAULT_OFFLINE_CAP_SECS).await.unwrap(), 0);
        let state = engine.store().snapshot();
        assert_eq!(state.points, 0);
        assert_eq!(state.last_seen_epoch_ms, T);
    }

    #[tokio::test]
    async fn test_background_then_foreground() {
        let engine = GameEngine::new(Arc::new(StateStore::with_state(idle_farm())));

        engine.on_background(T + 10_000).await.unwrap();
        let state = engine.store().snapshot();
        assert_eq!(state.points, 0);
        assert_eq!(state.last_seen_epoch_ms, T + 10_000);

        let gained = engine.on_foreground(T + 20_000, DEFAULT_OFFLINE_CAP_SECS).await.unwrap();
        assert_eq!(gained, 10 * 6);
        let state = engine.store().snapshot();
        assert_eq!(state.points, 60);
        assert_eq!(state.last_seen_epoch_ms, T + 20_000);
    }
}
