//! Denormalized per-player counters
//!
//! These rows are a fast path only. Undo does not reverse them; the
//! raw-round aggregators in `crate::stats` are the source of truth.

use super::{Storage, StorageError};
use crate::model::{Match, PlayerId, PlayerStats, Round};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

const STATS_COLUMNS: &str = "player_id, total_matches, matches_won, total_rounds, rounds_won, \
     single_wins, mars_wins, backgammon_wins, double_single_wins, double_mars_wins, \
     double_backgammon_wins";

impl Storage {
    /// Cached counters for a player; `None` if they have no row.
    pub fn player_stats(&self, player_id: PlayerId) -> Result<Option<PlayerStats>, StorageError> {
        find(&self.conn, player_id)
    }

    /// Recompute every counter row from match and round history.
    ///
    /// Uses the same counting rules as the incremental path. Never run
    /// implicitly; this is a maintenance operation.
    pub fn rebuild_player_stats(&self) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;

        let mut table: HashMap<PlayerId, PlayerStats> = HashMap::new();
        for player in self.all_players()? {
            table.insert(player.id, PlayerStats::new(player.id));
        }

        for game in super::matches::all(&tx)? {
            for side_id in [game.player1_id, game.player2_id] {
                let stats = table
                    .entry(side_id)
                    .or_insert_with(|| PlayerStats::new(side_id));
                stats.total_matches += 1;
                if game.winner_id == Some(side_id) {
                    stats.matches_won += 1;
                }
            }
            for round in super::matches::rounds_of(&tx, game.id)? {
                record_round(&mut table, &game, &round);
            }
        }

        tx.execute("DELETE FROM player_stats", [])?;
        for stats in table.values() {
            save(&tx, stats)?;
        }
        tx.commit()?;

        log::info!("rebuilt player stats for {} players", table.len());
        Ok(())
    }
}

fn record_round(
    table: &mut HashMap<PlayerId, PlayerStats>,
    game: &Match,
    round: &Round,
) {
    let category = round.category();
    for side_id in [game.player1_id, game.player2_id] {
        table
            .entry(side_id)
            .or_insert_with(|| PlayerStats::new(side_id))
            .record_round(round.winner_id == side_id, category);
    }
}

fn stats_from_row(row: &Row<'_>) -> rusqlite::Result<PlayerStats> {
    Ok(PlayerStats {
        player_id: row.get(0)?,
        total_matches: row.get(1)?,
        matches_won: row.get(2)?,
        total_rounds: row.get(3)?,
        rounds_won: row.get(4)?,
        single_wins: row.get(5)?,
        mars_wins: row.get(6)?,
        backgammon_wins: row.get(7)?,
        double_single_wins: row.get(8)?,
        double_mars_wins: row.get(9)?,
        double_backgammon_wins: row.get(10)?,
    })
}

pub(super) fn find(conn: &Connection, player_id: PlayerId) -> Result<Option<PlayerStats>, StorageError> {
    let stats = conn
        .query_row(
            &format!("SELECT {} FROM player_stats WHERE player_id = ?1", STATS_COLUMNS),
            params![player_id],
            stats_from_row,
        )
        .optional()?;
    Ok(stats)
}

/// Create a zeroed row if the player has none.
pub(super) fn ensure_row(conn: &Connection, player_id: PlayerId) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR IGNORE INTO player_stats (player_id) VALUES (?1)",
        params![player_id],
    )?;
    Ok(())
}

/// Read, modify and write back one player's row.
pub(super) fn update<F>(conn: &Connection, player_id: PlayerId, f: F) -> Result<(), StorageError>
where
    F: FnOnce(&mut PlayerStats),
{
    let mut stats = find(conn, player_id)?.unwrap_or_else(|| PlayerStats::new(player_id));
    f(&mut stats);
    save(conn, &stats)
}

fn save(conn: &Connection, stats: &PlayerStats) -> Result<(), StorageError> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO player_stats ({}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            STATS_COLUMNS
        ),
        params![
            stats.player_id,
            stats.total_matches,
            stats.matches_won,
            stats.total_rounds,
            stats.rounds_won,
            stats.single_wins,
            stats.mars_wins,
            stats.backgammon_wins,
            stats.double_single_wins,
            stats.double_mars_wins,
            stats.double_backgammon_wins
        ],
    )?;
    Ok(())
}

/// Zero every counter, keeping the rows.
pub(super) fn reset_all(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE player_stats SET total_matches = 0, matches_won = 0, total_rounds = 0, \
         rounds_won = 0, single_wins = 0, mars_wins = 0, backgammon_wins = 0, \
         double_single_wins = 0, double_mars_wins = 0, double_backgammon_wins = 0",
        [],
    )?;
    Ok(())
}
