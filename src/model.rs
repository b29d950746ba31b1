//! Records stored by the scoreboard: players, matches, rounds and the
//! per-player counter row.

use crate::scoring::{combined_win_type, Category, CategoryCode, GameType, WinType};
use std::fmt;

pub type PlayerId = i64;
pub type MatchId = i64;
pub type RoundId = i64;

/// Which slot of a match a player occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::One => f.write_str("1"),
            Side::Two => f.write_str("2"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// One scoring session between two players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: MatchId,
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    pub player1_score: u32,
    pub player2_score: u32,
    pub game_type: GameType,
    pub target_score: u32,
    pub total_rounds: u32,
    pub player1_rounds_won: u32,
    pub player2_rounds_won: u32,
    /// Unset until the match is finished
    pub winner_id: Option<PlayerId>,
    /// `YYYY-MM-DD HH:MM:SS`, local time
    pub date: String,
}

impl Match {
    pub fn player_id(&self, side: Side) -> PlayerId {
        match side {
            Side::One => self.player1_id,
            Side::Two => self.player2_id,
        }
    }

    /// Slot occupied by `player_id`, if they play in this match.
    pub fn side_of(&self, player_id: PlayerId) -> Option<Side> {
        if player_id == self.player1_id {
            Some(Side::One)
        } else if player_id == self.player2_id {
            Some(Side::Two)
        } else {
            None
        }
    }

    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.side_of(player_id).is_some()
    }

    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::One => self.player1_score,
            Side::Two => self.player2_score,
        }
    }

    pub fn rounds_won(&self, side: Side) -> u32 {
        match side {
            Side::One => self.player1_rounds_won,
            Side::Two => self.player2_rounds_won,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winner_id.is_some()
    }

    /// Side ahead on points; player 1 on a tie.
    pub fn leader(&self) -> Side {
        if self.player2_score > self.player1_score {
            Side::Two
        } else {
            Side::One
        }
    }

    /// Side that has reached `target`, if any.
    pub fn threshold_winner(&self, target: u32) -> Option<Side> {
        if self.player1_score >= target || self.player2_score >= target {
            Some(self.leader())
        } else {
            None
        }
    }

    /// Check the stored totals agree with a set of rounds from this match.
    pub fn is_consistent_with(&self, rounds: &[Round]) -> bool {
        let totals = MatchTotals::replay(self, rounds);
        self.total_rounds == self.player1_rounds_won + self.player2_rounds_won
            && totals.player1_score == self.player1_score
            && totals.player2_score == self.player2_score
            && totals.player1_rounds_won == self.player1_rounds_won
            && totals.player2_rounds_won == self.player2_rounds_won
            && totals.total_rounds == self.total_rounds
    }
}

/// Aggregate fields of a match derived from its rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchTotals {
    pub player1_score: u32,
    pub player2_score: u32,
    pub total_rounds: u32,
    pub player1_rounds_won: u32,
    pub player2_rounds_won: u32,
}

impl MatchTotals {
    /// Sum scores and round wins by winner.
    ///
    /// Rounds whose winner is in neither slot are skipped entirely.
    pub fn replay(game: &Match, rounds: &[Round]) -> Self {
        let mut totals = MatchTotals::default();
        for round in rounds {
            match game.side_of(round.winner_id) {
                Some(Side::One) => {
                    totals.player1_score += round.score;
                    totals.player1_rounds_won += 1;
                }
                Some(Side::Two) => {
                    totals.player2_score += round.score;
                    totals.player2_rounds_won += 1;
                }
                None => continue,
            }
            totals.total_rounds += 1;
        }
        totals
    }
}

/// One scored exchange within a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub id: RoundId,
    pub match_id: MatchId,
    /// 1-based, assigned at creation and never renumbered
    pub round_number: u32,
    pub winner_id: PlayerId,
    pub win_type: WinType,
    pub is_double: bool,
    pub double_value: u32,
    pub score: u32,
    pub date: String,
}

impl Round {
    /// Canonical category code, e.g. "2M".
    pub fn combined_win_type(&self) -> CategoryCode {
        combined_win_type(self.win_type, self.is_double, self.double_value)
    }

    pub fn category(&self) -> Category {
        self.combined_win_type().category()
    }
}

/// Denormalized per-player counters.
///
/// Best-effort only: undo does not reverse these, and ×4-or-more wins are
/// counted in `rounds_won` without a category column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub total_matches: u32,
    pub matches_won: u32,
    pub total_rounds: u32,
    pub rounds_won: u32,
    pub single_wins: u32,
    pub mars_wins: u32,
    pub backgammon_wins: u32,
    pub double_single_wins: u32,
    pub double_mars_wins: u32,
    pub double_backgammon_wins: u32,
}

impl PlayerStats {
    pub fn new(player_id: PlayerId) -> Self {
        PlayerStats {
            player_id,
            ..Default::default()
        }
    }

    /// Counter for one of the six tracked categories.
    pub fn category_count(&self, category: Category) -> Option<u32> {
        match category {
            Category::Single => Some(self.single_wins),
            Category::Mars => Some(self.mars_wins),
            Category::Backgammon => Some(self.backgammon_wins),
            Category::DoubleSingle => Some(self.double_single_wins),
            Category::DoubleMars => Some(self.double_mars_wins),
            Category::DoubleBackgammon => Some(self.double_backgammon_wins),
            _ => None,
        }
    }

    /// Count one round this player took part in.
    ///
    /// Only the winner's category counter moves, and only for the six
    /// tracked categories.
    pub fn record_round(&mut self, won: bool, category: Category) {
        self.total_rounds += 1;
        if !won {
            return;
        }
        self.rounds_won += 1;
        match category {
            Category::Single => self.single_wins += 1,
            Category::Mars => self.mars_wins += 1,
            Category::Backgammon => self.backgammon_wins += 1,
            Category::DoubleSingle => self.double_single_wins += 1,
            Category::DoubleMars => self.double_mars_wins += 1,
            Category::DoubleBackgammon => self.double_backgammon_wins += 1,
            _ => {}
        }
    }

    /// Percentage of matches won, 0 when none played.
    pub fn match_win_rate(&self) -> f64 {
        percentage(self.matches_won, self.total_matches)
    }

    pub fn round_win_rate(&self) -> f64 {
        percentage(self.rounds_won, self.total_rounds)
    }
}

pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
