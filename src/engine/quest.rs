use super::GameEngine;
use crate::error::EngineError;
use crate::state::Txn;
use crate::types::{GameState, QuestType};
use rand::Rng;
use tracing::info;

/// Add `delta` to the active quest if it is of kind `kind`.
///
/// A quest that reaches its target pays its reward into `points` and is
/// cleared. Returns the reward paid, if any.
pub(crate) fn advance_quest(state: &mut GameState, kind: QuestType, delta: u64) -> Option<u64> {
    if kind == QuestType::None
        || state.active_quest_type != kind
        || state.active_quest_target == 0
        || delta == 0
    {
        return None;
    }

    let progress = state.active_quest_progress.saturating_add(delta);
    if progress >= state.active_quest_target {
        let reward = state.active_quest_reward;
        state.points = state.points.saturating_add(reward);
        state.clear_quest();
        Some(reward)
    } else {
        state.active_quest_progress = progress;
        None
    }
}

impl GameEngine {
    /// Roll a new quest uniformly among the three kinds.
    ///
    /// No-op (returns `None`) while another quest is active.
    pub async fn generate_quest(&self, now_ms: i64) -> Result<Option<QuestType>, EngineError> {
        let idx = rand::thread_rng().gen_range(0..QuestType::ROLLABLE.len());
        self.generate_quest_of(QuestType::ROLLABLE[idx], now_ms).await
    }

    /// Start a quest of a given kind, unless one is already active.
    pub async fn generate_quest_of(
        &self,
        kind: QuestType,
        now_ms: i64,
    ) -> Result<Option<QuestType>, EngineError> {
        if kind == QuestType::None {
            return Err(EngineError::InvalidArgument("cannot start an empty quest".into()));
        }

        let started = self
            .store()
            .transact(|current| {
                if current.has_active_quest() {
                    return Txn::Abort(None);
                }
                let (target, reward) = kind.target_and_reward();
                let next = GameState {
                    active_quest_type: kind,
                    active_quest_progress: 0,
                    active_quest_target: target,
                    active_quest_reward: reward,
                    last_quest_reset_time: now_ms,
                    ..current.clone()
                };
                Txn::Commit(next, Some(kind))
            })
            .await?;

        if let Some(kind) = started {
            let (target, reward) = kind.target_and_reward();
            info!("📜 New quest: {} (target {}, reward {})", kind, target, reward);
        }
        Ok(started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateStore;
    use std::sync::Arc;

    fn with_quest(kind: QuestType, progress: u64) -> GameState {
        let (target, reward) = kind.target_and_reward();
        GameState {
            active_quest_type: kind,
            active_quest_progress: progress,
            active_quest_target: target,
            active_quest_reward: reward,
            ..GameState::default()
        }
    }

    #[test]
    fn test_advance_only_matching_kind() {
        let mut state = with_quest(QuestType::Taps, 0);
        assert_eq!(advance_quest(&mut state, QuestType::Points, 50), None);
        assert_eq!(state.active_quest_progress, 0);

        assert_eq!(advance_quest(&mut state, QuestType::Taps, 1), None);
        assert_eq!(state.active_quest_progress, 1);
    }

    #[test]
    fn test_completion_pays_and_clears() {
        let mut state = with_quest(QuestType::Upgrades, 4);
        state.points = 10;

        assert_eq!(advance_quest(&mut state, QuestType::Upgrades, 1), Some(2_000));
        assert_eq!(state.points, 2_010);
        assert!(!state.has_active_quest());
        assert_eq!(state.active_quest_target, 0);
    }

    #[test]
    fn test_overshoot_still_completes() {
        let mut state = with_quest(QuestType::Points, 9_990);
        assert_eq!(advance_quest(&mut state, QuestType::Points, 500), Some(5_000));
        assert_eq!(state.points, 5_000);
    }

    #[tokio::test]
    async fn test_generate_assigns_fixed_pair() {
        let engine = GameEngine::new(Arc::new(StateStore::in_memory()));

        let kind = engine.generate_quest(1_234).await.unwrap().unwrap();
        let state = engine.store().snapshot();

        assert_eq!(state.active_quest_type, kind);
        assert_eq!(
            (state.active_quest_target, state.active_quest_reward),
            kind.target_and_reward()
        );
        assert_eq!(state.active_quest_progress, 0);
        assert_eq!(state.last_quest_reset_time, 1_234);
    }

    #[tokio::test]
    async fn test_generate_is_noop_while_active() {
        let engine = GameEngine::new(Arc::new(StateStore::with_state(with_quest(
            QuestType::Taps,
            40,
        ))));

        assert_eq!(engine.generate_quest(5).await.unwrap(), None);
        let state = engine.store().snapshot();
        assert_eq!(state.active_quest_type, QuestType::Taps);
        assert_eq!(state.active_quest_progress, 40);
    }
}
