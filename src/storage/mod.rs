#![allow(dead_code)]
//! Persistent storage using SQLite (rusqlite)
//!
//! This module provides:
//! - OS-standard data directory location (via `directories` crate)
//! - SQLite database with schema versioning and in-place migrations
//! - The player registry
//! - Match and round bookkeeping, including recalculation on undo
//! - The denormalized per-player counter table
//! - Report assembly for the statistics screens

mod matches;
mod player_stats;
mod players;
mod reports;

pub use reports::{MatchReport, PlayerReport};

use crate::model::{Match, MatchId, PlayerId, Round};
use crate::scoring::{multiplier_from_score, ParseError, WinType};
use directories::ProjectDirs;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};

/// Current schema version. Bump this when making schema changes.
/// Version history:
/// - v1: players, matches, rounds and player_stats
/// - v2: matches.target_score
const SCHEMA_VERSION: u32 = 2;

/// Database file name inside the data directory.
pub const DB_FILE: &str = "tavla.db";

/// Format of every stored timestamp (local time).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Target score given to matches migrated from v1.
const LEGACY_TARGET_SCORE: u32 = 11;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("could not determine data directory")]
    NoDataDirectory,
    #[error("failed to create data directory: {0}")]
    CreateDirFailed(std::io::Error),
    #[error("database schema version {found} is newer than supported version {supported}")]
    FutureSchemaVersion { found: u32, supported: u32 },
    #[error("migration from v{from} to v{to} failed: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },
    #[error("a player named {0:?} already exists")]
    DuplicatePlayer(String),
    #[error("player name must not be empty")]
    InvalidPlayerName,
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),
    #[error("a match needs two different players")]
    SamePlayers(PlayerId),
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("player {player_id} does not play in match {match_id}")]
    WinnerNotInMatch { match_id: MatchId, player_id: PlayerId },
    #[error("invalid cube multiplier {0}")]
    InvalidMultiplier(u32),
}

/// The main storage handle for the scoreboard.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create the database in `data_dir`, creating the directory
    /// if needed.
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir).map_err(StorageError::CreateDirFailed)?;

        let db_path = data_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;
        let storage = Storage::with_connection(conn)?;
        log::info!("opened database at {}", db_path.display());
        Ok(storage)
    }

    /// Open an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Storage::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let storage = Storage { conn };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Get the OS-standard data directory.
    ///
    /// - Linux: `$XDG_DATA_HOME/tavla/` or `~/.local/share/tavla/`
    /// - macOS: `~/Library/Application Support/tavla/`
    pub fn data_dir() -> Result<PathBuf, StorageError> {
        ProjectDirs::from("", "", "tavla")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(StorageError::NoDataDirectory)
    }

    // Private helper methods

    fn initialize_schema(&self) -> Result<(), StorageError> {
        let mut current_version = self.get_schema_version()?;

        if current_version == 0 {
            // Fresh database: lay down v1, then migrate like any old file
            self.create_schema_v1()?;
            current_version = 1;
        }

        if current_version < SCHEMA_VERSION {
            self.migrate_schema(current_version)?;
        } else if current_version > SCHEMA_VERSION {
            return Err(StorageError::FutureSchemaVersion {
                found: current_version,
                supported: SCHEMA_VERSION,
            });
        }

        Ok(())
    }

    fn get_schema_version(&self) -> Result<u32, StorageError> {
        let table_exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='meta'",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        let version: u32 = self
            .conn
            .query_row("SELECT schema_version FROM meta LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        Ok(version)
    }

    fn create_schema_v1(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE meta (
                schema_version INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE players (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            -- winner_id stays NULL until the match is finished
            CREATE TABLE matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player1_id INTEGER NOT NULL REFERENCES players (id),
                player2_id INTEGER NOT NULL REFERENCES players (id),
                player1_score INTEGER NOT NULL DEFAULT 0,
                player2_score INTEGER NOT NULL DEFAULT 0,
                game_type TEXT NOT NULL,
                total_rounds INTEGER NOT NULL DEFAULT 0,
                player1_rounds_won INTEGER NOT NULL DEFAULT 0,
                player2_rounds_won INTEGER NOT NULL DEFAULT 0,
                winner_id INTEGER REFERENCES players (id),
                date TEXT NOT NULL
            );

            -- No multiplier column: it is recovered from score on read
            CREATE TABLE rounds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id INTEGER NOT NULL REFERENCES matches (id) ON DELETE CASCADE,
                round_number INTEGER NOT NULL,
                winner_id INTEGER NOT NULL REFERENCES players (id),
                win_type TEXT NOT NULL,
                is_double INTEGER NOT NULL DEFAULT 0,
                score INTEGER NOT NULL,
                date TEXT NOT NULL
            );

            CREATE INDEX idx_rounds_match ON rounds (match_id);

            CREATE TABLE player_stats (
                player_id INTEGER PRIMARY KEY REFERENCES players (id),
                total_matches INTEGER NOT NULL DEFAULT 0,
                matches_won INTEGER NOT NULL DEFAULT 0,
                total_rounds INTEGER NOT NULL DEFAULT 0,
                rounds_won INTEGER NOT NULL DEFAULT 0,
                single_wins INTEGER NOT NULL DEFAULT 0,
                mars_wins INTEGER NOT NULL DEFAULT 0,
                backgammon_wins INTEGER NOT NULL DEFAULT 0,
                double_single_wins INTEGER NOT NULL DEFAULT 0,
                double_mars_wins INTEGER NOT NULL DEFAULT 0,
                double_backgammon_wins INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )?;

        self.conn.execute(
            "INSERT INTO meta (schema_version, created_at) VALUES (?1, ?2)",
            params![1, now_timestamp()],
        )?;

        Ok(())
    }

    fn migrate_schema(&self, from_version: u32) -> Result<(), StorageError> {
        let mut current_version = from_version;

        while current_version < SCHEMA_VERSION {
            match current_version {
                1 => {
                    self.migrate_v1_to_v2()?;
                    current_version = 2;
                }
                _ => {
                    return Err(StorageError::MigrationFailed {
                        from: current_version,
                        to: SCHEMA_VERSION,
                        reason: format!("no migration path from version {}", current_version),
                    });
                }
            }
        }

        self.conn.execute(
            "UPDATE meta SET schema_version = ?1",
            params![SCHEMA_VERSION],
        )?;
        log::debug!("schema migrated from v{} to v{}", from_version, SCHEMA_VERSION);

        Ok(())
    }

    /// Migrate from schema v1 to v2: remember each match's target score
    fn migrate_v1_to_v2(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(&format!(
                "ALTER TABLE matches ADD COLUMN target_score INTEGER NOT NULL DEFAULT {};",
                LEGACY_TARGET_SCORE
            ))
            .map_err(|e| StorageError::MigrationFailed {
                from: 1,
                to: 2,
                reason: e.to_string(),
            })
    }
}

/// Current local time in the stored format.
pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = ParseError>,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) const MATCH_COLUMNS: &str = "id, player1_id, player2_id, player1_score, player2_score, \
     game_type, target_score, total_rounds, player1_rounds_won, player2_rounds_won, winner_id, date";

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<Match> {
    Ok(Match {
        id: row.get(0)?,
        player1_id: row.get(1)?,
        player2_id: row.get(2)?,
        player1_score: row.get(3)?,
        player2_score: row.get(4)?,
        game_type: parse_column(row, 5)?,
        target_score: row.get(6)?,
        total_rounds: row.get(7)?,
        player1_rounds_won: row.get(8)?,
        player2_rounds_won: row.get(9)?,
        winner_id: row.get(10)?,
        date: row.get(11)?,
    })
}

pub(crate) const ROUND_COLUMNS: &str =
    "id, match_id, round_number, winner_id, win_type, is_double, score, date";

fn round_from_row(row: &Row<'_>) -> rusqlite::Result<Round> {
    let win_type: WinType = parse_column(row, 4)?;
    let is_double: bool = row.get(5)?;
    let score: u32 = row.get(6)?;
    Ok(Round {
        id: row.get(0)?,
        match_id: row.get(1)?,
        round_number: row.get(2)?,
        winner_id: row.get(3)?,
        win_type,
        is_double,
        double_value: multiplier_from_score(win_type, is_double, score),
        score,
        date: row.get(7)?,
    })
}
