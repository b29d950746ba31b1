//! Environment configuration
//!
//! Reads `TAVLA_DATA_DIR`, `TAVLA_LOG_LEVEL`, `TAVLA_TARGET_SCORE` and
//! `TAVLA_GAME_TYPE`, after loading a `.env` file if one is present.
//! Unset or unparsable values fall back to defaults.

use crate::scoring::GameType;
use crate::storage::{Storage, StorageError};
use log::LevelFilter;
use std::path::PathBuf;

pub const DEFAULT_TARGET_SCORE: u32 = 11;
pub const MAX_TARGET_SCORE: u32 = 99;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Overrides the OS-standard data directory
    pub data_dir: Option<PathBuf>,
    pub log_level: LevelFilter,
    /// Pre-filled target on the new match form
    pub target_score: u32,
    pub game_type: GameType,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: None,
            log_level: LevelFilter::Info,
            target_score: DEFAULT_TARGET_SCORE,
            game_type: GameType::Modern,
        }
    }
}

impl Config {
    /// Load `.env` (if any), then read the process environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Config {
            data_dir: read("TAVLA_DATA_DIR").map(PathBuf::from),
            log_level: read("TAVLA_LOG_LEVEL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_level),
            target_score: read("TAVLA_TARGET_SCORE")
                .and_then(|v| v.parse::<u32>().ok())
                .map(clamp_target)
                .unwrap_or(defaults.target_score),
            game_type: read("TAVLA_GAME_TYPE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.game_type),
        }
    }

    /// Directory holding the database and log file.
    pub fn data_dir(&self) -> Result<PathBuf, StorageError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Storage::data_dir(),
        }
    }
}

/// Keep a target score within 1..=99.
pub fn clamp_target(target: u32) -> u32 {
    target.clamp(1, MAX_TARGET_SCORE)
}
