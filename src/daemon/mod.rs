use crate::achievements::AchievementEvaluator;
use crate::config::Config;
use crate::console::{run_console, ConsoleExit};
use crate::engine::GameEngine;
use crate::state::StateStore;
use crate::storage::JsonFileStorage;
use crate::ticks::TickDrivers;
use crate::types::now_ms;
use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::future::{self, Future};
use std::sync::Arc;
use tracing::{error, info};

pub struct ClickerDaemon {
    config: Config,
    engine: GameEngine,
    drivers: TickDrivers,
}

impl ClickerDaemon {
    pub fn new(config: Config) -> Result<Self> {
        let storage = JsonFileStorage::open(&config.data_dir)
            .context("Failed to open game data directory")?;
        let store = Arc::new(StateStore::open(storage).context("Failed to load saved game")?);
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<StateStore>) -> Self {
        let engine = GameEngine::new(store);
        let drivers = TickDrivers::new(engine.clone(), config.schedule());
        Self {
            config,
            engine,
            drivers,
        }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    /// Resume the game: create the row, credit offline income and make sure
    /// a quest is running.
    pub async fn resume(&self) -> Result<()> {
        self.engine.store().get_or_create().await?;

        let gained = self
            .engine
            .on_foreground(now_ms(), self.config.offline.cap_secs)
            .await?;
        info!("✓ Offline reconciliation done (+{} points)", gained);

        if !self.engine.store().snapshot().has_active_quest() {
            self.engine.generate_quest(now_ms()).await?;
        }
        Ok(())
    }

    /// Run until the console quits or Ctrl-C, then stamp the background time.
    pub async fn run(self) -> Result<()> {
        self.resume().await?;

        // Spawn achievement evaluator
        let evaluator = AchievementEvaluator::new(self.engine.store().clone());
        let evaluator_task = tokio::spawn(async move {
            evaluator.run().await;
        });

        // Spawn quest keeper
        let keeper_engine = self.engine.clone();
        let keeper_task = tokio::spawn(async move {
            Self::quest_keeper_loop(keeper_engine).await;
        });

        self.drivers.start_all();
        info!("✓ Income loops started");

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
        };
        wait_for_exit(run_console(self.engine.clone()), shutdown).await;

        self.drivers.stop_all();
        evaluator_task.abort();
        keeper_task.abort();

        self.engine.on_background(now_ms()).await?;
        info!("💾 Game saved");
        Ok(())
    }

    /// Roll a new quest whenever the active one completes.
    async fn quest_keeper_loop(engine: GameEngine) {
        let mut states = engine.store().observe();

        while let Some(state) = states.next().await {
            if state.has_active_quest() {
                continue;
            }
            if let Err(e) = engine.generate_quest(now_ms()).await {
                error!("Quest generation failed: {}", e);
            }
        }
    }
}

/// Resolve on `quit` or on `shutdown`. A closed console (EOF on stdin) keeps
/// the game running until `shutdown` fires.
async fn wait_for_exit<C, S>(console: C, shutdown: S)
where
    C: Future<Output = ConsoleExit>,
    S: Future<Output = ()>,
{
    let console = async {
        if console.await == ConsoleExit::InputClosed {
            info!("⌨️  Console detached - running until Ctrl-C");
            future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = console => {
            info!("👋 Console closed");
        }
        _ = shutdown => {
            info!("👋 Shutdown requested");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GameState, QuestType};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_closed_console_waits_for_shutdown() {
        let started = tokio::time::Instant::now();

        wait_for_exit(
            future::ready(ConsoleExit::InputClosed),
            tokio::time::sleep(Duration::from_secs(60)),
        )
        .await;

        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_ends_run_immediately() {
        let started = tokio::time::Instant::now();

        wait_for_exit(
            future::ready(ConsoleExit::Quit),
            tokio::time::sleep(Duration::from_secs(60)),
        )
        .await;

        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_resume_creates_row_and_quest() {
        let store = Arc::new(StateStore::open(crate::storage::MemoryStorage::new()).unwrap());
        let daemon = ClickerDaemon::with_store(Config::default(), store.clone());

        daemon.resume().await.unwrap();

        let state = store.get().await.unwrap();
        assert!(state.has_active_quest());
        assert!(state.last_seen_epoch_ms > 0);
    }

    #[tokio::test]
    async fn test_quest_keeper_rolls_after_completion() {
        let store = Arc::new(StateStore::with_state(GameState {
            active_quest_type: QuestType::Taps,
            active_quest_progress: 99,
            active_quest_target: 100,
            active_quest_reward: 1_000,
            ..GameState::default()
        }));
        let engine = GameEngine::new(store.clone());
        let keeper = tokio::spawn(ClickerDaemon::quest_keeper_loop(engine.clone()));

        engine.tap(now_ms()).await.unwrap();

        let mut rx = store.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !rx.borrow_and_update().has_active_quest() {
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        let state = store.snapshot();
        assert!(state.points >= 1_000);
        assert_eq!(state.active_quest_progress, 0);
        keeper.abort();
    }
}
