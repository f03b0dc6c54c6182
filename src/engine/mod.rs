//! Transaction engine.
//!
//! Every operation here is one read-compute-write inside
//! [`StateStore::transact`], so concurrent callers are serialised and no
//! update is computed from a stale read.

pub mod quest;

pub(crate) use quest::advance_quest;

use crate::cost::Upgrade;
use crate::error::EngineError;
use crate::state::{StateStore, Txn};
use crate::types::{EventType, GameState, QuestType};
use crate::yields::{self, TapYield, TickSource, TickYield};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Points needed for one prestige point.
pub const PRESTIGE_THRESHOLD: u64 = 1_000_000;

/// Points paid per crypto unit sold.
pub const CRYPTO_PRICE: u64 = 100;

const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased { cost: u64 },
    InsufficientFunds { cost: u64, balance: u64 },
    /// The update did not deduct exactly the price; nothing was written.
    Rejected { cost: u64 },
}

impl PurchaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PurchaseOutcome::Purchased { .. })
    }
}

#[derive(Clone)]
pub struct GameEngine {
    store: Arc<StateStore>,
}

impl GameEngine {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// One player tap at `now_ms`.
    pub async fn tap(&self, now_ms: i64) -> Result<TapYield, EngineError> {
        let gained = self
            .store
            .transact(|current| {
                let mut next = current.clone();
                yields::expire_lapsed(&mut next, now_ms);

                let gain = yields::tap_yield(&next, now_ms);
                next.points = next.points.saturating_add(gain.points);
                let kind = next.active_quest_type;
                advance_quest(&mut next, kind, gain.quest_delta);

                next.total_taps = next.total_taps.saturating_add(1);
                next.last_tap_time = next.last_tap_time.max(now_ms);
                Txn::Commit(next, gain)
            })
            .await?;

        debug!("Tap: +{} (combo x{})", gained.points, gained.combo_multiplier);
        Ok(gained)
    }

    /// Buy the next level of `upgrade`, priced from the row being updated.
    pub async fn purchase(&self, upgrade: Upgrade) -> Result<PurchaseOutcome, EngineError> {
        let outcome = self
            .purchase_with_computed_cost(
                |state| upgrade.cost_for(state),
                |mut state| {
                    upgrade.apply(&mut state);
                    state
                },
            )
            .await?;

        match outcome {
            PurchaseOutcome::Purchased { cost } => {
                info!("🛒 Bought {} for {}", upgrade, cost);
            }
            PurchaseOutcome::InsufficientFunds { cost, balance } => {
                warn!("Cannot buy {}: costs {}, have {}", upgrade, cost, balance);
            }
            PurchaseOutcome::Rejected { cost } => {
                warn!("Purchase of {} rejected (cost {})", upgrade, cost);
            }
        }
        Ok(outcome)
    }

    pub async fn purchase_with_fixed_cost<A>(
        &self,
        cost: u64,
        apply: A,
    ) -> Result<PurchaseOutcome, EngineError>
    where
        A: FnOnce(GameState) -> GameState,
    {
        self.purchase_with_computed_cost(move |_| cost, apply).await
    }

    /// Generic guarded purchase.
    ///
    /// `cost_fn` prices against the current row inside the transaction. The
    /// engine deducts the price, then `apply_fn` applies the effect; it must
    /// leave `points` alone. Any commit whose points do not equal
    /// `before - cost` is refused. An active "upgrades" quest advances by
    /// one in the same commit.
    pub async fn purchase_with_computed_cost<C, A>(
        &self,
        cost_fn: C,
        apply_fn: A,
    ) -> Result<PurchaseOutcome, EngineError>
    where
        C: FnOnce(&GameState) -> u64,
        A: FnOnce(GameState) -> GameState,
    {
        let outcome = self
            .store
            .transact(|current| {
                let cost = cost_fn(current);
                if cost == 0 {
                    return Txn::Abort(PurchaseOutcome::Rejected { cost });
                }
                if current.points < cost {
                    return Txn::Abort(PurchaseOutcome::InsufficientFunds {
                        cost,
                        balance: current.points,
                    });
                }

                let mut paid = current.clone();
                paid.points -= cost;
                let mut next = apply_fn(paid);
                if next.points != current.points - cost {
                    return Txn::Abort(PurchaseOutcome::Rejected { cost });
                }

                advance_quest(&mut next, QuestType::Upgrades, 1);
                Txn::Commit(next, PurchaseOutcome::Purchased { cost })
            })
            .await?;
        Ok(outcome)
    }

    /// Apply `update_fn` and commit whatever it returns.
    pub async fn unconditional_mutate<F>(&self, update_fn: F) -> Result<GameState, EngineError>
    where
        F: FnOnce(GameState) -> GameState,
    {
        Ok(self.store.run_exclusive(update_fn).await?)
    }

    /// Convert all crypto to points. Returns points credited (0 if there was
    /// nothing to sell).
    pub async fn sell_crypto(&self, now_ms: i64) -> Result<u64, EngineError> {
        let credited = self
            .store
            .transact(|current| {
                if current.crypto_amount == 0 {
                    return Txn::Abort(0);
                }
                let mut next = current.clone();
                let gain = next
                    .crypto_amount
                    .saturating_mul(CRYPTO_PRICE)
                    .saturating_mul(next.event_multiplier(now_ms));
                yields::expire_lapsed(&mut next, now_ms);
                next.points = next.points.saturating_add(gain);
                next.crypto_amount = 0;
                next.has_sold_crypto = true;
                Txn::Commit(next, gain)
            })
            .await?;

        if credited > 0 {
            info!("💱 Sold crypto for {} points", credited);
        }
        Ok(credited)
    }

    /// Trade points for prestige points and reset progression.
    ///
    /// Returns the prestige points earned, or `None` below the threshold.
    pub async fn prestige(&self) -> Result<Option<u64>, EngineError> {
        let earned = self
            .store
            .transact(|current| {
                if current.points < PRESTIGE_THRESHOLD {
                    return Txn::Abort(None);
                }
                let earned = current.points / PRESTIGE_THRESHOLD;
                Txn::Commit(prestige_reset(current, earned), Some(earned))
            })
            .await?;

        match earned {
            Some(n) => info!("⭐ Prestige! +{} prestige points", n),
            None => warn!("Prestige needs at least {} points", PRESTIGE_THRESHOLD),
        }
        Ok(earned)
    }

    /// Spend banked prestige points. False if the balance is too low.
    pub async fn spend_prestige_points(&self, amount: u64) -> Result<bool, EngineError> {
        let spent = self
            .store
            .transact(|current| {
                if amount == 0 || current.prestige_points < amount {
                    return Txn::Abort(false);
                }
                let next = GameState {
                    prestige_points: current.prestige_points - amount,
                    ..current.clone()
                };
                Txn::Commit(next, true)
            })
            .await?;
        Ok(spent)
    }

    pub async fn activate_boost(
        &self,
        multiplier: u32,
        duration_minutes: u32,
        now_ms: i64,
    ) -> Result<GameState, EngineError> {
        if multiplier < 1 {
            return Err(EngineError::InvalidArgument(
                "boost multiplier must be at least 1".into(),
            ));
        }

        let end = now_ms.saturating_add(i64::from(duration_minutes) * MS_PER_MINUTE);
        let state = self
            .unconditional_mutate(|current| GameState {
                boost_multiplier: multiplier,
                boost_end_time: end,
                ..current
            })
            .await?;
        info!("🚀 Boost x{} for {} min", multiplier, duration_minutes);
        Ok(state)
    }

    pub async fn start_event(
        &self,
        event: EventType,
        duration_minutes: u32,
        now_ms: i64,
    ) -> Result<GameState, EngineError> {
        if event == EventType::None {
            return Err(EngineError::InvalidArgument("cannot start an empty event".into()));
        }

        let end = now_ms.saturating_add(i64::from(duration_minutes) * MS_PER_MINUTE);
        let state = self
            .unconditional_mutate(|current| GameState {
                active_event_type: event,
                active_event_end_time: end,
                ..current
            })
            .await?;
        info!("🎉 Event {} for {} min", event, duration_minutes);
        Ok(state)
    }

    /// One tick of a passive income source.
    pub async fn tick(&self, source: TickSource, now_ms: i64) -> Result<TickYield, EngineError> {
        let gained = self
            .store
            .transact(|current| {
                let mut next = current.clone();
                yields::expire_lapsed(&mut next, now_ms);

                let gain = yields::tick_yield(&next, now_ms, source);
                next.points = next.points.saturating_add(gain.points);
                if gain.crypto > 0 {
                    next.crypto_amount = next.crypto_amount.saturating_add(gain.crypto);
                    next.last_mining_time = next.last_mining_time.max(now_ms);
                }
                Txn::Commit(next, gain)
            })
            .await?;
        Ok(gained)
    }
}

/// Progression reset kept by prestige: only the last-seen stamp, the
/// prestige currency, and the active quest/event survive.
fn prestige_reset(current: &GameState, earned: u64) -> GameState {
    GameState {
        last_seen_epoch_ms: current.last_seen_epoch_ms,
        prestige_level: current.prestige_level.saturating_add(1),
        prestige_points: current.prestige_points.saturating_add(earned),
        active_quest_type: current.active_quest_type,
        active_quest_progress: current.active_quest_progress,
        active_quest_target: current.active_quest_target,
        active_quest_reward: current.active_quest_reward,
        last_quest_reset_time: current.last_quest_reset_time,
        active_event_type: current.active_event_type,
        active_event_end_time: current.active_event_end_time,
        ..GameState::default()
    }
}
