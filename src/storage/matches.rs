//! Match and round bookkeeping
//!
//! Adding a round applies it incrementally to the parent match. Removing
//! one replays every remaining round from scratch, so the match totals
//! always agree with its round set whichever round was removed.

use super::{
    match_from_row, now_timestamp, player_stats, players, round_from_row, Storage,
    StorageError, MATCH_COLUMNS, ROUND_COLUMNS,
};
use crate::model::{Match, MatchId, MatchTotals, PlayerId, Round, RoundId, Side};
use crate::scoring::{combined_win_type, is_valid_multiplier, round_score, GameType, WinType};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

impl Storage {
    /// Start a new match with zeroed totals. Counts the match for both
    /// players.
    pub fn start_match(
        &self,
        player1_id: PlayerId,
        player2_id: PlayerId,
        game_type: GameType,
        target_score: u32,
    ) -> Result<MatchId, StorageError> {
        if player1_id == player2_id {
            return Err(StorageError::SamePlayers(player1_id));
        }

        let tx = self.conn.unchecked_transaction()?;
        let player1 = players::require(&tx, player1_id)?;
        let player2 = players::require(&tx, player2_id)?;

        tx.execute(
            "INSERT INTO matches (player1_id, player2_id, game_type, target_score, date) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                player1_id,
                player2_id,
                game_type.as_str(),
                target_score,
                now_timestamp()
            ],
        )?;
        let match_id = tx.last_insert_rowid();

        for id in [player1_id, player2_id] {
            player_stats::update(&tx, id, |s| s.total_matches += 1)?;
        }
        tx.commit()?;

        log::info!(
            "match {} started: {} vs {} ({}, to {})",
            match_id,
            player1.name,
            player2.name,
            game_type,
            target_score
        );
        Ok(match_id)
    }

    /// Record a round and credit it to the winner.
    ///
    /// `double_value` is only looked at when `is_double` is set. Returns
    /// the new round's id for a later undo.
    pub fn add_round(
        &self,
        match_id: MatchId,
        winner_id: PlayerId,
        win_type: WinType,
        is_double: bool,
        double_value: u32,
    ) -> Result<RoundId, StorageError> {
        if is_double && !is_valid_multiplier(double_value) {
            return Err(StorageError::InvalidMultiplier(double_value));
        }

        let tx = self.conn.unchecked_transaction()?;
        let game = require(&tx, match_id)?;
        let side = game
            .side_of(winner_id)
            .ok_or(StorageError::WinnerNotInMatch {
                match_id,
                player_id: winner_id,
            })?;

        let score = round_score(win_type, is_double, double_value);
        let round_number = game.total_rounds + 1;
        tx.execute(
            "INSERT INTO rounds (match_id, round_number, winner_id, win_type, is_double, score, date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                match_id,
                round_number,
                winner_id,
                win_type.as_str(),
                is_double,
                score,
                now_timestamp()
            ],
        )?;
        let round_id = tx.last_insert_rowid();

        let sql = match side {
            Side::One => {
                "UPDATE matches SET player1_score = player1_score + ?1, \
                 player1_rounds_won = player1_rounds_won + 1, total_rounds = total_rounds + 1 \
                 WHERE id = ?2"
            }
            Side::Two => {
                "UPDATE matches SET player2_score = player2_score + ?1, \
                 player2_rounds_won = player2_rounds_won + 1, total_rounds = total_rounds + 1 \
                 WHERE id = ?2"
            }
        };
        tx.execute(sql, params![score, match_id])?;

        let category = combined_win_type(win_type, is_double, double_value).category();
        for id in [game.player1_id, game.player2_id] {
            player_stats::update(&tx, id, |s| s.record_round(id == winner_id, category))?;
        }
        tx.commit()?;

        log::debug!(
            "match {} round {}: player {} won {} for {} points",
            match_id,
            round_number,
            winner_id,
            category,
            score
        );
        Ok(round_id)
    }

    /// Settle the winner of a match. Idempotent: a finished match keeps
    /// its winner and nothing is counted twice.
    ///
    /// The higher score wins; player 1 takes a tie.
    pub fn finish_match(&self, match_id: MatchId) -> Result<PlayerId, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let game = require(&tx, match_id)?;
        if let Some(winner_id) = game.winner_id {
            return Ok(winner_id);
        }

        let winner_id = game.player_id(game.leader());
        tx.execute(
            "UPDATE matches SET winner_id = ?1 WHERE id = ?2",
            params![winner_id, match_id],
        )?;
        player_stats::update(&tx, winner_id, |s| s.matches_won += 1)?;
        tx.commit()?;

        log::info!(
            "match {} finished {}-{}, winner {}",
            match_id,
            game.player1_score,
            game.player2_score,
            winner_id
        );
        Ok(winner_id)
    }

    /// Remove a round and rebuild its match's totals.
    ///
    /// Returns false if the round does not exist. Storage failures are
    /// logged and also reported as false.
    pub fn delete_round(&self, round_id: RoundId) -> bool {
        match self.try_delete_round(round_id) {
            Ok(deleted) => deleted,
            Err(e) => {
                log::warn!("failed to delete round {}: {}", round_id, e);
                false
            }
        }
    }

    /// Like [`Storage::delete_round`] but with the error kept.
    pub fn try_delete_round(&self, round_id: RoundId) -> Result<bool, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let match_id: Option<MatchId> = tx
            .query_row(
                "SELECT match_id FROM rounds WHERE id = ?1",
                params![round_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(match_id) = match_id else {
            return Ok(false);
        };

        if tx.execute("DELETE FROM rounds WHERE id = ?1", params![round_id])? == 0 {
            return Ok(false);
        }
        let game = recalculate(&tx, match_id)?;
        tx.commit()?;

        log::debug!(
            "round {} removed from match {}, now {}-{} after {} rounds",
            round_id,
            match_id,
            game.player1_score,
            game.player2_score,
            game.total_rounds
        );
        Ok(true)
    }

    /// Replay a match's rounds and overwrite its totals. Idempotent.
    pub fn recalculate_match(&self, match_id: MatchId) -> Result<Match, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let game = recalculate(&tx, match_id)?;
        tx.commit()?;
        Ok(game)
    }

    pub fn match_by_id(&self, match_id: MatchId) -> Result<Option<Match>, StorageError> {
        find(&self.conn, match_id)
    }

    /// All matches, newest first.
    pub fn all_matches(&self) -> Result<Vec<Match>, StorageError> {
        all(&self.conn)
    }

    /// Matches a player took part in, newest first.
    pub fn player_matches(&self, player_id: PlayerId) -> Result<Vec<Match>, StorageError> {
        query_matches(
            &self.conn,
            "WHERE player1_id = ?1 OR player2_id = ?1",
            params![player_id],
        )
    }

    /// Matches between two players, in either slot order, newest first.
    pub fn matches_between(
        &self,
        player_a: PlayerId,
        player_b: PlayerId,
    ) -> Result<Vec<Match>, StorageError> {
        query_matches(
            &self.conn,
            "WHERE (player1_id = ?1 AND player2_id = ?2) OR (player1_id = ?2 AND player2_id = ?1)",
            params![player_a, player_b],
        )
    }

    /// Rounds of a match in the order they were played.
    pub fn match_rounds(&self, match_id: MatchId) -> Result<Vec<Round>, StorageError> {
        rounds_of(&self.conn, match_id)
    }

    pub fn round_by_id(&self, round_id: RoundId) -> Result<Option<Round>, StorageError> {
        let round = self
            .conn
            .query_row(
                &format!("SELECT {} FROM rounds WHERE id = ?1", ROUND_COLUMNS),
                params![round_id],
                round_from_row,
            )
            .optional()?;
        Ok(round)
    }

    /// Delete a match with its rounds. Player counters are left alone.
    pub fn delete_match(&self, match_id: MatchId) -> Result<bool, StorageError> {
        Ok(self.delete_matches(&[match_id])? > 0)
    }

    /// Delete several matches with their rounds; returns how many went.
    pub fn delete_matches(&self, match_ids: &[MatchId]) -> Result<usize, StorageError> {
        if match_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; match_ids.len()].join(", ");
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!("DELETE FROM rounds WHERE match_id IN ({})", placeholders),
            params_from_iter(match_ids),
        )?;
        let deleted = tx.execute(
            &format!("DELETE FROM matches WHERE id IN ({})", placeholders),
            params_from_iter(match_ids),
        )?;
        tx.commit()?;

        log::info!("deleted {} matches", deleted);
        Ok(deleted)
    }

    /// Delete every match and round. Player counters are left alone.
    pub fn delete_all_matches(&self) -> Result<usize, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = clear_matches(&tx)?;
        tx.commit()?;

        log::info!("deleted all {} matches", deleted);
        Ok(deleted)
    }

    /// Delete all match history and zero every player's counters.
    /// Players themselves are kept.
    pub fn reset_all_data(&self) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        clear_matches(&tx)?;
        player_stats::reset_all(&tx)?;
        tx.commit()?;

        log::warn!("all match data reset");
        Ok(())
    }
}

fn clear_matches(conn: &Connection) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM rounds", [])?;
    Ok(conn.execute("DELETE FROM matches", [])?)
}

/// Replay the remaining rounds and write the totals back.
fn recalculate(conn: &Connection, match_id: MatchId) -> Result<Match, StorageError> {
    let mut game = require(conn, match_id)?;
    let rounds = rounds_of(conn, match_id)?;
    let totals = MatchTotals::replay(&game, &rounds);

    conn.execute(
        "UPDATE matches SET player1_score = ?1, player2_score = ?2, total_rounds = ?3, \
         player1_rounds_won = ?4, player2_rounds_won = ?5 WHERE id = ?6",
        params![
            totals.player1_score,
            totals.player2_score,
            totals.total_rounds,
            totals.player1_rounds_won,
            totals.player2_rounds_won,
            match_id
        ],
    )?;

    game.player1_score = totals.player1_score;
    game.player2_score = totals.player2_score;
    game.total_rounds = totals.total_rounds;
    game.player1_rounds_won = totals.player1_rounds_won;
    game.player2_rounds_won = totals.player2_rounds_won;
    Ok(game)
}

fn find(conn: &Connection, match_id: MatchId) -> Result<Option<Match>, StorageError> {
    let game = conn
        .query_row(
            &format!("SELECT {} FROM matches WHERE id = ?1", MATCH_COLUMNS),
            params![match_id],
            match_from_row,
        )
        .optional()?;
    Ok(game)
}

pub(super) fn require(conn: &Connection, match_id: MatchId) -> Result<Match, StorageError> {
    find(conn, match_id)?.ok_or(StorageError::MatchNotFound(match_id))
}

pub(super) fn all(conn: &Connection) -> Result<Vec<Match>, StorageError> {
    query_matches(conn, "", [])
}

fn query_matches<P: rusqlite::Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<Match>, StorageError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM matches {} ORDER BY date DESC, id DESC",
        MATCH_COLUMNS, filter
    ))?;
    let rows = stmt.query_map(params, match_from_row)?;

    let mut matches = Vec::new();
    for row in rows {
        matches.push(row?);
    }
    Ok(matches)
}

pub(super) fn rounds_of(conn: &Connection, match_id: MatchId) -> Result<Vec<Round>, StorageError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM rounds WHERE match_id = ?1 ORDER BY round_number, id",
        ROUND_COLUMNS
    ))?;
    let rows = stmt.query_map(params![match_id], round_from_row)?;

    let mut rounds = Vec::new();
    for row in rows {
        rounds.push(row?);
    }
    Ok(rounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Player;

    fn setup() -> (Storage, Player, Player) {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.add_player("Ali").unwrap();
        let b = storage.add_player("Veli").unwrap();
        (storage, a, b)
    }

    fn assert_consistent(storage: &Storage, match_id: MatchId) {
        let game = storage.match_by_id(match_id).unwrap().unwrap();
        let rounds = storage.match_rounds(match_id).unwrap();
        assert_eq!(game.total_rounds, game.player1_rounds_won + game.player2_rounds_won);
        assert!(game.is_consistent_with(&rounds), "match {:?} vs rounds {:?}", game, rounds);
    }

    #[test]
    fn test_start_match() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Traditional, 7).unwrap();

        let game = storage.match_by_id(id).unwrap().unwrap();
        assert_eq!(game.player1_id, a.id);
        assert_eq!(game.player2_id, b.id);
        assert_eq!(game.game_type, GameType::Traditional);
        assert_eq!(game.target_score, 7);
        assert_eq!((game.player1_score, game.player2_score, game.total_rounds), (0, 0, 0));
        assert_eq!(game.winner_id, None);

        assert_eq!(storage.player_stats(a.id).unwrap().unwrap().total_matches, 1);
        assert_eq!(storage.player_stats(b.id).unwrap().unwrap().total_matches, 1);
    }

    #[test]
    fn test_start_match_unknown_player() {
        let (storage, a, _) = setup();
        assert!(matches!(
            storage.start_match(a.id, 99, GameType::Modern, 11),
            Err(StorageError::PlayerNotFound(99))
        ));
        assert!(matches!(
            storage.start_match(a.id, a.id, GameType::Modern, 11),
            Err(StorageError::SamePlayers(_))
        ));
        assert!(storage.all_matches().unwrap().is_empty());
        assert_eq!(storage.player_stats(a.id).unwrap().unwrap().total_matches, 0);
    }

    #[test]
    fn test_scenario_add_and_undo() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();

        let first = storage.add_round(id, a.id, WinType::Single, false, 1).unwrap();
        let game = storage.match_by_id(id).unwrap().unwrap();
        assert_eq!(storage.round_by_id(first).unwrap().unwrap().score, 1);
        assert_eq!(game.player1_score, 1);
        assert_eq!(game.total_rounds, 1);
        assert_eq!(game.player1_rounds_won, 1);

        storage.add_round(id, b.id, WinType::Mars, true, 2).unwrap();
        let game = storage.match_by_id(id).unwrap().unwrap();
        assert_eq!(game.player2_score, 4);
        assert_eq!(game.player2_rounds_won, 1);
        assert_eq!(game.total_rounds, 2);
        assert_consistent(&storage, id);

        assert!(storage.delete_round(first));
        let game = storage.match_by_id(id).unwrap().unwrap();
        assert_eq!(game.player1_score, 0);
        assert_eq!(game.player1_rounds_won, 0);
        assert_eq!(game.player2_score, 4);
        assert_eq!(game.total_rounds, 1);
        assert_consistent(&storage, id);
    }

    #[test]
    fn test_round_multiplier_recovered_on_read() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        let round_id = storage.add_round(id, b.id, WinType::Backgammon, true, 8).unwrap();

        let round = storage.round_by_id(round_id).unwrap().unwrap();
        assert_eq!(round.score, 24);
        assert_eq!(round.double_value, 8);
        assert!(round.is_double);
        assert_eq!(round.round_number, 1);
        assert_eq!(round.combined_win_type().to_string(), "8B");
    }

    #[test]
    fn test_undouble_round_ignores_cube_value() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        let round_id = storage.add_round(id, a.id, WinType::Mars, false, 4).unwrap();

        let round = storage.round_by_id(round_id).unwrap().unwrap();
        assert_eq!(round.score, 2);
        assert_eq!(round.double_value, 1);
    }

    #[test]
    fn test_add_round_rejections() {
        let (storage, a, b) = setup();
        let outsider = storage.add_player("Cem").unwrap();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();

        assert!(matches!(
            storage.add_round(99, a.id, WinType::Single, false, 1),
            Err(StorageError::MatchNotFound(99))
        ));
        assert!(matches!(
            storage.add_round(id, outsider.id, WinType::Single, false, 1),
            Err(StorageError::WinnerNotInMatch { .. })
        ));
        assert!(matches!(
            storage.add_round(id, a.id, WinType::Single, true, 3),
            Err(StorageError::InvalidMultiplier(3))
        ));
        assert!(storage.match_rounds(id).unwrap().is_empty());
        assert_consistent(&storage, id);
    }

    #[test]
    fn test_player_stats_updated_by_rounds() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        storage.add_round(id, a.id, WinType::Single, false, 1).unwrap();
        storage.add_round(id, a.id, WinType::Mars, true, 2).unwrap();
        storage.add_round(id, a.id, WinType::Backgammon, true, 4).unwrap();

        let stats = storage.player_stats(a.id).unwrap().unwrap();
        assert_eq!(stats.total_rounds, 3);
        assert_eq!(stats.rounds_won, 3);
        assert_eq!(stats.single_wins, 1);
        assert_eq!(stats.double_mars_wins, 1);
        // ×4 rounds have no counter column
        assert_eq!(stats.backgammon_wins + stats.double_backgammon_wins, 0);

        let loser = storage.player_stats(b.id).unwrap().unwrap();
        assert_eq!(loser.total_rounds, 3);
        assert_eq!(loser.rounds_won, 0);
    }

    #[test]
    fn test_finish_match_is_idempotent() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        storage.add_round(id, b.id, WinType::Backgammon, false, 1).unwrap();

        assert_eq!(storage.finish_match(id).unwrap(), b.id);
        assert_eq!(storage.finish_match(id).unwrap(), b.id);
        assert_eq!(storage.player_stats(b.id).unwrap().unwrap().matches_won, 1);
        assert_eq!(storage.player_stats(a.id).unwrap().unwrap().matches_won, 0);

        // A later round cannot change the settled winner
        storage.add_round(id, a.id, WinType::Mars, true, 4).unwrap();
        assert_eq!(storage.finish_match(id).unwrap(), b.id);
    }

    #[test]
    fn test_finish_tie_goes_to_player1() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        storage.add_round(id, a.id, WinType::Mars, false, 1).unwrap();
        storage.add_round(id, b.id, WinType::Mars, false, 1).unwrap();
        assert_eq!(storage.finish_match(id).unwrap(), a.id);
    }

    #[test]
    fn test_delete_missing_round() {
        let (storage, _, _) = setup();
        assert!(!storage.delete_round(12345));
        assert!(!storage.try_delete_round(12345).unwrap());
    }

    #[test]
    fn test_delete_middle_round_keeps_numbers() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        storage.add_round(id, a.id, WinType::Single, false, 1).unwrap();
        let middle = storage.add_round(id, b.id, WinType::Mars, false, 1).unwrap();
        storage.add_round(id, a.id, WinType::Backgammon, false, 1).unwrap();

        assert!(storage.delete_round(middle));
        let numbers: Vec<u32> = storage
            .match_rounds(id)
            .unwrap()
            .iter()
            .map(|r| r.round_number)
            .collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_consistent(&storage, id);

        let game = storage.match_by_id(id).unwrap().unwrap();
        assert_eq!(game.player1_score, 4);
        assert_eq!(game.player2_score, 0);
    }

    #[test]
    fn test_recalculate_is_idempotent() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        storage.add_round(id, a.id, WinType::Mars, true, 2).unwrap();
        storage.add_round(id, b.id, WinType::Single, false, 1).unwrap();

        // Corrupt the totals, then repair them twice
        storage
            .conn
            .execute("UPDATE matches SET player1_score = 99, total_rounds = 7", [])
            .unwrap();
        let once = storage.recalculate_match(id).unwrap();
        let twice = storage.recalculate_match(id).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.player1_score, 4);
        assert_eq!(once.total_rounds, 2);
        assert_consistent(&storage, id);

        assert!(matches!(
            storage.recalculate_match(404),
            Err(StorageError::MatchNotFound(404))
        ));
    }

    #[test]
    fn test_match_queries() {
        let (storage, a, b) = setup();
        let c = storage.add_player("Cem").unwrap();
        let first = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        let second = storage.start_match(b.id, a.id, GameType::Modern, 5).unwrap();
        let third = storage.start_match(a.id, c.id, GameType::Traditional, 11).unwrap();

        let all: Vec<MatchId> = storage.all_matches().unwrap().iter().map(|m| m.id).collect();
        assert_eq!(all, vec![third, second, first]);

        let between: Vec<MatchId> = storage
            .matches_between(a.id, b.id)
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(between, vec![second, first]);
        assert_eq!(storage.matches_between(b.id, a.id).unwrap().len(), 2);

        assert_eq!(storage.player_matches(c.id).unwrap().len(), 1);
        assert_eq!(storage.player_matches(a.id).unwrap().len(), 3);
        assert_eq!(storage.match_by_id(999).unwrap(), None);
    }

    #[test]
    fn test_delete_matches() {
        let (storage, a, b) = setup();
        let first = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        let second = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        let round = storage.add_round(first, a.id, WinType::Single, false, 1).unwrap();

        assert!(storage.delete_match(first).unwrap());
        assert!(!storage.delete_match(first).unwrap());
        assert_eq!(storage.round_by_id(round).unwrap(), None);
        assert_eq!(storage.delete_matches(&[]).unwrap(), 0);
        assert_eq!(storage.delete_matches(&[second, 77]).unwrap(), 1);
        assert!(storage.all_matches().unwrap().is_empty());

        // Counters are not reversed
        assert_eq!(storage.player_stats(a.id).unwrap().unwrap().total_matches, 2);
    }

    #[test]
    fn test_delete_all_and_reset() {
        let (storage, a, b) = setup();
        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        storage.add_round(id, a.id, WinType::Single, false, 1).unwrap();
        storage.start_match(b.id, a.id, GameType::Modern, 11).unwrap();

        assert_eq!(storage.delete_all_matches().unwrap(), 2);
        assert_eq!(storage.player_stats(a.id).unwrap().unwrap().total_matches, 2);

        let id = storage.start_match(a.id, b.id, GameType::Modern, 11).unwrap();
        storage.add_round(id, b.id, WinType::Mars, false, 1).unwrap();
        storage.reset_all_data().unwrap();

        assert!(storage.all_matches().unwrap().is_empty());
        assert_eq!(storage.all_players().unwrap().len(), 2);
        assert_eq!(
            storage.player_stats(b.id).unwrap().unwrap(),
            crate::model::PlayerStats::new(b.id)
        );
    }
}
