//! Report assembly: load history and hand it to the aggregators

use super::{matches, players, player_stats, Storage, StorageError};
use crate::model::{Match, MatchId, Player, PlayerId, PlayerStats, Round};
use crate::stats::{
    compute_head_to_head, compute_player_summary, compute_round_stats, HeadToHeadStats,
    PlayerSummary, RoundStats,
};

/// Everything the player statistics screen shows.
#[derive(Debug, Clone)]
pub struct PlayerReport {
    pub player: Player,
    /// Counter-table row; may drift after undo
    pub cached: PlayerStats,
    /// Newest first
    pub matches: Vec<Match>,
    pub summary: PlayerSummary,
    pub rounds: RoundStats,
}

/// One match with its rounds and each side's breakdown.
#[derive(Debug, Clone)]
pub struct MatchReport {
    pub game: Match,
    pub player1: Player,
    pub player2: Player,
    pub rounds: Vec<Round>,
    pub player1_stats: RoundStats,
    pub player2_stats: RoundStats,
}

impl Storage {
    pub fn player_report(&self, player_id: PlayerId) -> Result<PlayerReport, StorageError> {
        let player = players::require(&self.conn, player_id)?;
        let cached = player_stats::find(&self.conn, player_id)?
            .unwrap_or_else(|| PlayerStats::new(player_id));
        let matches = self.player_matches(player_id)?;
        let rounds = rounds_of_all(self, &matches)?;

        Ok(PlayerReport {
            summary: compute_player_summary(player_id, &matches, &rounds),
            rounds: compute_round_stats(&rounds, player_id),
            player,
            cached,
            matches,
        })
    }

    /// Head-to-head record of two players, labelled in argument order.
    pub fn head_to_head(
        &self,
        player1_id: PlayerId,
        player2_id: PlayerId,
    ) -> Result<HeadToHeadStats, StorageError> {
        players::require(&self.conn, player1_id)?;
        players::require(&self.conn, player2_id)?;

        let matches = self.matches_between(player1_id, player2_id)?;
        let rounds = rounds_of_all(self, &matches)?;
        Ok(compute_head_to_head(player1_id, player2_id, &matches, &rounds))
    }

    pub fn match_report(&self, match_id: MatchId) -> Result<MatchReport, StorageError> {
        let game = matches::require(&self.conn, match_id)?;
        let rounds = self.match_rounds(match_id)?;

        Ok(MatchReport {
            player1: players::require(&self.conn, game.player1_id)?,
            player2: players::require(&self.conn, game.player2_id)?,
            player1_stats: compute_round_stats(&rounds, game.player1_id),
            player2_stats: compute_round_stats(&rounds, game.player2_id),
            rounds,
            game,
        })
    }
}

fn rounds_of_all(storage: &Storage, games: &[Match]) -> Result<Vec<Round>, StorageError> {
    let mut rounds = Vec::new();
    for game in games {
        rounds.extend(storage.match_rounds(game.id)?);
    }
    Ok(rounds)
}
