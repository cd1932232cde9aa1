//! Persist player progress (level, coins, bombs) per player name.
//!
//! Files live under the XDG config dir (or ~/.config) in `fruitmatch/saves/<player>.json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bomb charges a new profile starts with, and what a recharge restores.
pub const MAX_BOMBS: u32 = 3;

/// Highest level a save may hold; larger values are clamped on load.
pub const MAX_LEVEL: u32 = 1_000_000;

/// The only state that survives between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub coins: u32,
    #[serde(default = "default_bombs")]
    pub bombs: u32,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            level: default_level(),
            coins: 0,
            bombs: default_bombs(),
        }
    }
}

impl PlayerProfile {
    /// Clamp values a hand-edited save could get wrong.
    pub fn sanitized(mut self) -> Self {
        self.level = self.level.clamp(1, MAX_LEVEL);
        self.bombs = self.bombs.min(MAX_BOMBS);
        self
    }
}

fn default_level() -> u32 {
    1
}

fn default_bombs() -> u32 {
    MAX_BOMBS
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("progress io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt progress file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value persistence for player profiles.
pub trait ProgressStore {
    /// `Ok(None)` when nothing was saved for this player.
    fn load(&self, player: &str) -> Result<Option<PlayerProfile>, ProgressError>;
    fn save(&mut self, player: &str, profile: &PlayerProfile) -> Result<(), ProgressError>;
    fn clear(&mut self, player: &str) -> Result<(), ProgressError>;
}

/// One JSON file per player in a directory.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$XDG_CONFIG_HOME/fruitmatch/saves`, falling back to `~/.config/fruitmatch/saves`.
    pub fn from_env() -> Self {
        Self::new(config_dir().join("saves"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, player: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(player)))
    }
}

impl ProgressStore for FileProgressStore {
    fn load(&self, player: &str) -> Result<Option<PlayerProfile>, ProgressError> {
        let path = self.path_for(player);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ProgressError::Io { path, source }),
        };
        let profile: PlayerProfile = serde_json::from_slice(&bytes)
            .map_err(|source| ProgressError::Corrupt { path: path.clone(), source })?;
        tracing::debug!(player, path = %path.display(), "loaded progress");
        Ok(Some(profile.sanitized()))
    }

    fn save(&mut self, player: &str, profile: &PlayerProfile) -> Result<(), ProgressError> {
        let path = self.path_for(player);
        fs::create_dir_all(&self.dir).map_err(|source| ProgressError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let json = serde_json::to_string_pretty(profile)
            .map_err(|source| ProgressError::Corrupt { path: path.clone(), source })?;
        atomic_write(&path, json.as_bytes())
            .map_err(|source| ProgressError::Io { path: path.clone(), source })?;
        tracing::info!(player, level = profile.level, coins = profile.coins, bombs = profile.bombs, "saved progress");
        Ok(())
    }

    fn clear(&mut self, player: &str) -> Result<(), ProgressError> {
        let path = self.path_for(player);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(player, "cleared progress");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ProgressError::Io { path, source }),
        }
    }
}

/// In-memory store; nothing touches disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryProgressStore {
    profiles: HashMap<String, PlayerProfile>,
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self, player: &str) -> Result<Option<PlayerProfile>, ProgressError> {
        Ok(self.profiles.get(player).copied())
    }

    fn save(&mut self, player: &str, profile: &PlayerProfile) -> Result<(), ProgressError> {
        self.profiles.insert(player.to_string(), *profile);
        Ok(())
    }

    fn clear(&mut self, player: &str) -> Result<(), ProgressError> {
        self.profiles.remove(player);
        Ok(())
    }
}

/// Base config directory for the game (XDG config or ~/.config, then `fruitmatch`).
pub fn config_dir() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("fruitmatch")
}

/// Player names are display names; keep only characters safe in a file name.
fn file_stem(player: &str) -> String {
    let stem: String = player
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "player".to_string() } else { stem }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    if fs::rename(&tmp, path).is_err() {
        fs::copy(&tmp, path)?;
        let _ = fs::remove_file(&tmp);
    }
    Ok(())
}
