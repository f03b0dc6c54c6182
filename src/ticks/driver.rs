use crate::engine::GameEngine;
use crate::types::now_ms;
use crate::yields::{self, TickSource, AUTO_BASE_PERIOD_MS, MINING_PERIOD_MS, ROOM_PERIOD_MS};
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

/// Periods for the three passive income loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    /// Auto-clicker period at speed level 1; divided by the speed level.
    pub auto_base_ms: u64,
    pub room_ms: u64,
    pub mining_ms: u64,
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self {
            auto_base_ms: AUTO_BASE_PERIOD_MS,
            room_ms: ROOM_PERIOD_MS,
            mining_ms: MINING_PERIOD_MS,
        }
    }
}

#[derive(Default)]
struct Handles {
    auto: Option<JoinHandle<()>>,
    room: Option<JoinHandle<()>>,
    mining: Option<JoinHandle<()>>,
}

/// Owns the background income loops. Each loop goes through the engine, so
/// none of them needs to know about the others.
pub struct TickDrivers {
    engine: GameEngine,
    schedule: TickSchedule,
    handles: Mutex<Handles>,
}

impl TickDrivers {
    pub fn new(engine: GameEngine, schedule: TickSchedule) -> Self {
        Self {
            engine,
            schedule,
            handles: Mutex::new(Handles::default()),
        }
    }

    /// Start every loop that is not already running.
    pub fn start_all(&self) {
        self.start(TickSource::AutoClicker);
        self.start(TickSource::EquipmentRoom);
        self.start(TickSource::Mining);
    }

    /// Start the loop for `source` unless it is already running.
    ///
    /// Returns true if a new task was spawned.
    pub fn start(&self, source: TickSource) -> bool {
        let mut handles = match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let slot = match source {
            TickSource::AutoClicker => &mut handles.auto,
            TickSource::EquipmentRoom => &mut handles.room,
            TickSource::Mining => &mut handles.mining,
        };
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let engine = self.engine.clone();
        let schedule = self.schedule;
        *slot = Some(tokio::spawn(async move {
            match source {
                TickSource::AutoClicker => auto_loop(engine, schedule.auto_base_ms).await,
                TickSource::EquipmentRoom => fixed_loop(engine, source, schedule.room_ms).await,
                TickSource::Mining => fixed_loop(engine, source, schedule.mining_ms).await,
            }
        }));
        true
    }

    pub fn is_running(&self, source: TickSource) -> bool {
        let handles = match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let slot = match source {
            TickSource::AutoClicker => &handles.auto,
            TickSource::EquipmentRoom => &handles.room,
            TickSource::Mining => &handles.mining,
        };
        slot.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop_all(&self) {
        let mut handles = match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for handle in [
            handles.auto.take(),
            handles.room.take(),
            handles.mining.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
        info!("⏹️  Tick drivers stopped");
    }
}

impl Drop for TickDrivers {
    fn drop(&mut self) {
        let handles = match self.handles.get_mut() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        };
        for handle in [&handles.auto, &handles.room, &handles.mining]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

/// Auto-clicker loop. The sleep after each tick is derived from the speed
/// level in the row just committed, so a speed purchase applies on the next
/// tick without a restart.
async fn auto_loop(engine: GameEngine, base_ms: u64) {
    info!("🤖 Auto-clicker loop started (base period {}ms)", base_ms);

    loop {
        match engine.tick(TickSource::AutoClicker, now_ms()).await {
            Ok(gain) if gain.points > 0 => debug!("Auto tick: +{}", gain.points),
            Ok(_) => {}
            Err(e) => error!("Auto tick failed: {}", e),
        }

        let period = yields::auto_period_ms(&engine.store().snapshot(), base_ms);
        sleep(Duration::from_millis(period)).await;
    }
}

async fn fixed_loop(engine: GameEngine, source: TickSource, period_ms: u64) {
    let mut ticker = interval(Duration::from_millis(period_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval fires immediately; income starts one
    // period after startup.
    ticker.tick().await;

    info!("⏱️  {} loop started (tick every {}ms)", source.name(), period_ms);

    loop {
        ticker.tick().await;

        match engine.tick(source, now_ms()).await {
            Ok(gain) if gain.points > 0 || gain.crypto > 0 => debug!(
                "{} tick: +{} points, +{} crypto",
                source.name(),
                gain.points,
                gain.crypto
            ),
            Ok(_) => {}
            Err(e) => error!("{} tick failed: {}", source.name(), e),
        }
    }
}
