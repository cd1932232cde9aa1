//! FruitMatch: match-three fruit puzzle in the terminal.

mod app;
mod board;
mod bomb;
mod cascade;
mod game;
mod input;
mod progress;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use game::GameSession;
use progress::FileProgressStore;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Options derived from CLI that affect the game session.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub max_cascade_passes: u32,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.clone())?;

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "theme not loaded; using One Dark");
        theme::Theme::default()
    });
    let config = GameConfig {
        seed: args.seed,
        max_cascade_passes: args.max_cascade_passes,
        no_animation: args.no_animation,
    };
    let store = match &args.save_dir {
        Some(dir) => FileProgressStore::new(dir),
        None => FileProgressStore::from_env(),
    };
    tracing::debug!(dir = %store.dir().display(), "progress store");

    let player = args.player.clone().unwrap_or_else(default_player);
    let session = GameSession::new(player.trim(), Box::new(store), &config)
        .with_context(|| format!("loading progress for {player}"))?;
    let mut app = App::new(session, config, theme);
    app.run()?;
    Ok(())
}

/// `$USER`, or "player" when unset.
fn default_player() -> String {
    std::env::var("USER")
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "player".to_string())
}

/// Log to a file; the terminal belongs to the TUI. Level comes from `RUST_LOG` (default info).
fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| progress::config_dir().join("fruitmatch.log"));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

/// Match-three fruit puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "fruitmatch",
    version,
    about = "Match-three fruit puzzle in the terminal. Swap neighbouring tiles to line up three or more.",
    long_about = "FruitMatch is a terminal match-three puzzle.\n\n\
        Swap two neighbouring tiles to line up three or more of the same fruit. Matches \
        vanish, tiles fall and refill, and chains keep scoring. Reach the level target \
        before your moves run out. Bombs blow up a random 3x3 area and recharge every ten levels.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor   Space     Select / swap\n  \
        b              Bomb          s         Shuffle board\n  \
        r              Reset progress          Enter     Continue after a level\n  \
        q / Ctrl-C     Quit\n\n\
        Progress (level, coins, bombs) is saved per player when a level is completed."
)]
pub struct Args {
    /// Player name; progress is saved under this name. Defaults to $USER.
    #[arg(short, long, value_name = "NAME")]
    pub player: Option<String>,

    /// Directory for save files. Defaults to $XDG_CONFIG_HOME/fruitmatch/saves.
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,

    /// Seed for board generation and refills (reproducible games).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Stop a chain reaction after this many clear/refill passes.
    #[arg(long, default_value_t = cascade::DEFAULT_MAX_PASSES, value_name = "N")]
    pub max_cascade_passes: u32,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the tile reveal animation after clears.
    #[arg(long)]
    pub no_animation: bool,

    /// Log file. Defaults to fruitmatch.log in the config directory.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
