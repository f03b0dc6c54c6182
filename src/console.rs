// Line-oriented command surface on stdin. Each line is parsed with clap and
// dispatched to the engine.

use crate::cost::Upgrade;
use crate::engine::{GameEngine, PurchaseOutcome};
use crate::error::EngineError;
use crate::format::{format_compact, format_short};
use crate::types::{now_ms, EventType, GameState};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "goat-clicker", no_binary_name = true, disable_version_flag = true)]
struct CommandLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Tap the goat
    Tap {
        #[arg(default_value_t = 1)]
        times: u32,
    },
    /// Buy one level of an upgrade
    Buy { upgrade: Upgrade },
    /// Sell all crypto for points
    Sell,
    /// Reset progress for prestige points
    Prestige,
    /// Spend banked prestige points
    SpendPrestige { amount: u64 },
    /// Activate a temporary multiplier
    Boost { multiplier: u32, minutes: u32 },
    /// Start a global event (double-day, free-upgrades)
    Event { kind: EventType, minutes: u32 },
    /// Roll a quest if none is active
    Quest,
    /// Show next price of every upgrade
    Costs,
    /// Show the current state
    Status,
    /// List unlocked achievements
    Achievements,
    /// Leave the game
    Quit,
}

pub enum Reply {
    Text(String),
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Command>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    CommandLine::try_parse_from(words).map(|c| Some(c.command))
}

pub async fn execute(engine: &GameEngine, command: Command) -> Result<Reply, EngineError> {
    let now = now_ms();
    let text = match command {
        Command::Tap { times } => {
            let mut total = 0u64;
            for _ in 0..times {
                total = total.saturating_add(engine.tap(now_ms()).await?.points);
            }
            format!("+{} points", format_short(total))
        }
        Command::Buy { upgrade } => match engine.purchase(upgrade).await? {
            PurchaseOutcome::Purchased { cost } => {
                format!("Bought {} for {}", upgrade, format_short(cost))
            }
            PurchaseOutcome::InsufficientFunds { cost, balance } => format!(
                "Not enough points for {}: need {}, have {}",
                upgrade,
                format_short(cost),
                format_short(balance)
            ),
            PurchaseOutcome::Rejected { .. } => format!("Purchase of {} was rejected", upgrade),
        },
        Command::Sell => match engine.sell_crypto(now).await? {
            0 => "No crypto to sell".to_string(),
            gained => format!("Sold crypto for {} points", format_short(gained)),
        },
        Command::Prestige => match engine.prestige().await? {
            Some(earned) => format!("Prestige! +{} prestige points", earned),
            None => "Prestige needs at least 1M points".to_string(),
        },
        Command::SpendPrestige { amount } => {
            if engine.spend_prestige_points(amount).await? {
                format!("Spent {} prestige points", amount)
            } else {
                "Not enough prestige points".to_string()
            }
        }
        Command::Boost {
            multiplier,
            minutes,
        } => {
            engine.activate_boost(multiplier, minutes, now).await?;
            format!("Boost x{} active for {} min", multiplier, minutes)
        }
        Command::Event { kind, minutes } => {
            engine.start_event(kind, minutes, now).await?;
            format!("Event {} running for {} min", kind, minutes)
        }
        Command::Quest => match engine.generate_quest(now).await? {
            Some(kind) => format!("New quest: {}", kind),
            None => "A quest is already active".to_string(),
        },
        Command::Costs => render_costs(&engine.store().snapshot()),
        Command::Status => render_status(&engine.store().snapshot(), now),
        Command::Achievements => {
            let records = engine.store().achievement_records().await;
            if records.is_empty() {
                "No achievements yet".to_string()
            } else {
                records
                    .iter()
                    .map(|r| r.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }
        Command::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

pub fn render_status(state: &GameState, now: i64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Points: {} ({})  Taps: {}  Crypto: {}",
        format_short(state.points),
        state.points,
        format_short(state.total_taps),
        format_compact(state.crypto_amount)
    );
    let _ = writeln!(
        out,
        "Tap power {}  Auto {}x{}  Multiplier x{}  Speed {}  Combo {}  Offline x{}",
        state.tap_power,
        state.auto_clickers,
        state.auto_power,
        state.points_multiplier,
        state.auto_clicker_speed,
        state.combo_bonus,
        state.offline_multiplier
    );
    let _ = writeln!(
        out,
        "Goat pen {}  Food {}  Fridge {}  Printer {}  Scanner {}  3D printer {}  Mining {}",
        state.goat_pen_level,
        state.goat_food_level,
        state.fridge_level,
        state.printer_level,
        state.scanner_level,
        state.printer3d_level,
        state.mining_power
    );
    let _ = writeln!(
        out,
        "Prestige level {} ({} points banked)",
        state.prestige_level, state.prestige_points
    );
    if state.active_boost(now) > 1 {
        let secs_left = (state.boost_end_time - now) / 1_000;
        let _ = writeln!(out, "Boost x{} ({}s left)", state.boost_multiplier, secs_left);
    }
    if state.active_event_type != EventType::None && now < state.active_event_end_time {
        let secs_left = (state.active_event_end_time - now) / 1_000;
        let _ = writeln!(out, "Event {} ({}s left)", state.active_event_type, secs_left);
    }
    if state.has_active_quest() {
        let _ = writeln!(
            out,
            "Quest {}: {}/{} (reward {})",
            state.active_quest_type,
            state.active_quest_progress,
            state.active_quest_target,
            format_short(state.active_quest_reward)
        );
    }
    out.trim_end().to_string()
}

pub fn render_costs(state: &GameState) -> String {
    Upgrade::ALL
        .iter()
        .map(|u| {
            format!(
                "{:<20} level {:>4}  next {}",
                u.name(),
                u.level(state),
                format_short(u.cost_for(state))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// How the console loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The player typed `quit`.
    Quit,
    /// Input reached end of file or failed to read.
    InputClosed,
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run_console(engine: GameEngine) -> ConsoleExit {
    run_console_from(engine, BufReader::new(tokio::io::stdin())).await
}

pub async fn run_console_from<R>(engine: GameEngine, input: R) -> ConsoleExit
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    info!("⌨️  Console ready - type `help` for commands");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Console input closed");
                return ConsoleExit::InputClosed;
            }
            Err(e) => {
                warn!("Failed to read console input: {}", e);
                return ConsoleExit::InputClosed;
            }
        };

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match execute(&engine, command).await {
            Ok(Reply::Text(text)) => println!("{}", text),
            Ok(Reply::Quit) => return ConsoleExit::Quit,
            Err(e) => println!("Error: {}", e),
        }
    }
}
