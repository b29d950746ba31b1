//! Statistics over raw round history
//!
//! This module provides:
//! - Per-player round statistics by category code and summary bucket
//! - Match and round win tallies with win rates
//! - Head-to-head comparison between two players
//!
//! Everything here is recomputed from `Match` and `Round` records on
//! demand. Unlike the counter table in storage, these figures are exact
//! after an undo and keep multipliers above 2 apart.

use crate::model::{percentage, Match, MatchId, PlayerId, Round};
use crate::scoring::{Category, CategoryCode, CategoryCounts};
use std::collections::{BTreeMap, HashSet};

/// Wins of one player, classified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub total_wins: u32,
    pub total_points: u32,
    /// Exact codes ("T", "2M", "8B"), in display order
    pub by_code: BTreeMap<CategoryCode, u32>,
    pub points_by_code: BTreeMap<CategoryCode, u32>,
    /// Nine-way split, with every ×4-or-more win in one bucket per type
    pub counts: CategoryCounts,
    pub points: CategoryCounts,
}

impl RoundStats {
    pub fn count(&self, category: Category) -> u32 {
        self.counts.get(category)
    }

    pub fn points_for(&self, category: Category) -> u32 {
        self.points.get(category)
    }

    /// Share of wins in a bucket, as a percentage.
    pub fn share(&self, category: Category) -> f64 {
        percentage(self.count(category), self.total_wins)
    }

    fn add(&mut self, round: &Round) {
        let code = round.combined_win_type();
        let category = code.category();

        self.total_wins += 1;
        self.total_points += round.score;
        *self.by_code.entry(code).or_insert(0) += 1;
        *self.points_by_code.entry(code).or_insert(0) += round.score;
        self.counts.add(category, 1);
        self.points.add(category, round.score);
    }
}

/// Classify every round in `rounds` won by `player_id`.
pub fn compute_round_stats(rounds: &[Round], player_id: PlayerId) -> RoundStats {
    let mut stats = RoundStats::default();
    for round in rounds.iter().filter(|r| r.winner_id == player_id) {
        stats.add(round);
    }
    stats
}

/// Win/loss tallies for one player, from history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerSummary {
    pub matches_played: u32,
    pub matches_won: u32,
    pub rounds_played: u32,
    pub rounds_won: u32,
}

impl PlayerSummary {
    pub fn match_win_rate(&self) -> f64 {
        percentage(self.matches_won, self.matches_played)
    }

    pub fn round_win_rate(&self) -> f64 {
        percentage(self.rounds_won, self.rounds_played)
    }
}

/// Tally matches involving `player_id` and the rounds played in them.
pub fn compute_player_summary(
    player_id: PlayerId,
    matches: &[Match],
    rounds: &[Round],
) -> PlayerSummary {
    let played: HashSet<MatchId> = matches
        .iter()
        .filter(|m| m.involves(player_id))
        .map(|m| m.id)
        .collect();

    let mut summary = PlayerSummary {
        matches_played: played.len() as u32,
        matches_won: matches
            .iter()
            .filter(|m| played.contains(&m.id) && m.winner_id == Some(player_id))
            .count() as u32,
        ..Default::default()
    };

    for round in rounds.iter().filter(|r| played.contains(&r.match_id)) {
        summary.rounds_played += 1;
        if round.winner_id == player_id {
            summary.rounds_won += 1;
        }
    }
    summary
}

/// Comparison of two players over the matches they played each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadToHeadStats {
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    pub total_matches: u32,
    pub player1_wins: u32,
    pub player2_wins: u32,
    pub total_rounds: u32,
    pub player1: RoundStats,
    pub player2: RoundStats,
}

impl HeadToHeadStats {
    /// Matches between the two that have no winner yet.
    pub fn unfinished(&self) -> u32 {
        self.total_matches
            .saturating_sub(self.player1_wins)
            .saturating_sub(self.player2_wins)
    }
}

/// Build the head-to-head record for a pair of players.
///
/// `matches` and `rounds` may hold unrelated records; only matches with
/// the two players in either slot order are used. The result is labelled
/// by argument order, not by slot. A player paired with themselves has
/// no shared matches.
pub fn compute_head_to_head(
    player1_id: PlayerId,
    player2_id: PlayerId,
    matches: &[Match],
    rounds: &[Round],
) -> HeadToHeadStats {
    if player1_id == player2_id {
        return HeadToHeadStats {
            player1_id,
            player2_id,
            ..Default::default()
        };
    }

    let shared: Vec<&Match> = matches
        .iter()
        .filter(|m| m.involves(player1_id) && m.involves(player2_id))
        .collect();
    let ids: HashSet<MatchId> = shared.iter().map(|m| m.id).collect();
    let shared_rounds: Vec<Round> = rounds
        .iter()
        .filter(|r| ids.contains(&r.match_id))
        .cloned()
        .collect();

    HeadToHeadStats {
        player1_id,
        player2_id,
        total_matches: shared.len() as u32,
        player1_wins: shared
            .iter()
            .filter(|m| m.winner_id == Some(player1_id))
            .count() as u32,
        player2_wins: shared
            .iter()
            .filter(|m| m.winner_id == Some(player2_id))
            .count() as u32,
        total_rounds: shared_rounds.len() as u32,
        player1: compute_round_stats(&shared_rounds, player1_id),
        player2: compute_round_stats(&shared_rounds, player2_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{round_score, GameType, WinType};

    fn game(id: MatchId, p1: PlayerId, p2: PlayerId, winner: Option<PlayerId>) -> Match {
        Match {
            id,
            player1_id: p1,
            player2_id: p2,
            player1_score: 0,
            player2_score: 0,
            game_type: GameType::Modern,
            target_score: 11,
            total_rounds: 0,
            player1_rounds_won: 0,
            player2_rounds_won: 0,
            winner_id: winner,
            date: "2024-05-01 20:00:00".to_string(),
        }
    }

    fn round(match_id: MatchId, winner_id: PlayerId, win_type: WinType, multiplier: u32) -> Round {
        let is_double = multiplier > 1;
        Round {
            id: 0,
            match_id,
            round_number: 1,
            winner_id,
            win_type,
            is_double,
            double_value: multiplier,
            score: round_score(win_type, is_double, multiplier),
            date: "2024-05-01 20:00:00".to_string(),
        }
    }

    fn code(s: &str) -> CategoryCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_round_stats_buckets() {
        let rounds = vec![
            round(1, 1, WinType::Single, 1),
            round(1, 1, WinType::Single, 1),
            round(1, 1, WinType::Mars, 2),
            round(1, 1, WinType::Mars, 4),
            round(1, 1, WinType::Mars, 16),
            round(1, 2, WinType::Backgammon, 1),
        ];
        let stats = compute_round_stats(&rounds, 1);

        assert_eq!(stats.total_wins, 5);
        assert_eq!(stats.total_points, 1 + 1 + 4 + 8 + 32);
        assert_eq!(stats.count(Category::Single), 2);
        assert_eq!(stats.count(Category::DoubleMars), 1);
        // ×4 and ×16 share a bucket but keep their own codes
        assert_eq!(stats.count(Category::QuadMars), 2);
        assert_eq!(stats.points_for(Category::QuadMars), 40);
        assert_eq!(stats.by_code.get(&code("4M")), Some(&1));
        assert_eq!(stats.by_code.get(&code("16M")), Some(&1));
        assert_eq!(stats.count(Category::Backgammon), 0);
        assert_eq!(stats.counts.total(), stats.total_wins);
    }

    #[test]
    fn test_codes_in_display_order() {
        let rounds = vec![
            round(1, 1, WinType::Mars, 1),
            round(1, 1, WinType::Single, 2),
            round(1, 1, WinType::Backgammon, 4),
            round(1, 1, WinType::Single, 1),
            round(1, 1, WinType::Mars, 2),
        ];
        let stats = compute_round_stats(&rounds, 1);
        let codes: Vec<String> = stats.by_code.keys().map(|c| c.to_string()).collect();
        assert_eq!(codes, vec!["T", "M", "2T", "2M", "4B"]);
    }

    #[test]
    fn test_round_stats_empty() {
        let stats = compute_round_stats(&[], 1);
        assert_eq!(stats, RoundStats::default());
        assert_eq!(stats.share(Category::Single), 0.0);
    }

    #[test]
    fn test_player_summary() {
        let matches = vec![
            game(1, 1, 2, Some(1)),
            game(2, 2, 1, Some(2)),
            game(3, 1, 3, None),
            game(4, 2, 3, Some(3)),
        ];
        let rounds = vec![
            round(1, 1, WinType::Single, 1),
            round(2, 2, WinType::Mars, 1),
            round(2, 1, WinType::Single, 1),
            round(4, 3, WinType::Single, 1),
        ];
        let summary = compute_player_summary(1, &matches, &rounds);
        assert_eq!(summary.matches_played, 3);
        assert_eq!(summary.matches_won, 1);
        assert_eq!(summary.rounds_played, 3);
        assert_eq!(summary.rounds_won, 2);
        assert!((summary.round_win_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_head_to_head() {
        let matches = vec![
            game(1, 1, 2, Some(1)),
            game(2, 2, 1, Some(1)),
            game(3, 2, 1, None),
            game(4, 1, 3, Some(3)),
        ];
        let rounds = vec![
            round(1, 1, WinType::Mars, 2),
            round(2, 2, WinType::Backgammon, 1),
            round(2, 1, WinType::Single, 8),
            round(4, 1, WinType::Backgammon, 1),
        ];

        let h2h = compute_head_to_head(1, 2, &matches, &rounds);
        assert_eq!(h2h.total_matches, 3);
        assert_eq!(h2h.player1_wins, 2);
        assert_eq!(h2h.player2_wins, 0);
        assert_eq!(h2h.unfinished(), 1);
        assert_eq!(h2h.total_rounds, 3);

        assert_eq!(h2h.player1.total_wins, 2);
        assert_eq!(h2h.player1.count(Category::DoubleMars), 1);
        assert_eq!(h2h.player1.count(Category::QuadSingle), 1);
        // The round against player 3 is excluded
        assert_eq!(h2h.player1.count(Category::Backgammon), 0);
        assert_eq!(h2h.player2.points_for(Category::Backgammon), 3);
    }

    #[test]
    fn test_head_to_head_symmetric() {
        let matches = vec![game(1, 1, 2, Some(2)), game(2, 2, 1, Some(1))];
        let rounds = vec![
            round(1, 2, WinType::Mars, 1),
            round(2, 1, WinType::Single, 2),
        ];

        let forward = compute_head_to_head(1, 2, &matches, &rounds);
        let backward = compute_head_to_head(2, 1, &matches, &rounds);
        assert_eq!(forward.total_matches, backward.total_matches);
        assert_eq!(forward.player1_wins, backward.player2_wins);
        assert_eq!(forward.player1, backward.player2);
        assert_eq!(forward.player2, backward.player1);
    }
    #[test]
    fn test_head_to_head_same_player_is_empty() {
        let matches = vec![game(1, 1, 2, Some(1)), game(2, 2, 1, None)];
        let rounds = vec![round(1, 1, WinType::Single, 1)];

        let h2h = compute_head_to_head(1, 1, &matches, &rounds);
        assert_eq!(h2h.player1_id, 1);
        assert_eq!(h2h.player2_id, 1);
        assert_eq!(h2h.total_matches, 0);
        assert_eq!(h2h.total_rounds, 0);
        assert_eq!(h2h.unfinished(), 0);
    }
}
