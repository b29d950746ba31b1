//! Round classification and score arithmetic
//!
//! This module provides:
//! - Win types (Tekli / Mars / Backgammon) with their fixed base values
//! - Game types (Modern / Traditional) and what each allows
//! - Multiplier and round score calculation
//! - Category codes ("T", "2M", "4B") and the nine-way category split
//! - The doubling cube state machine used during a live match

pub mod category;
pub mod cube;

pub use category::{
    combined_win_type, display_text, sort_codes, Category, CategoryCode, CategoryCounts,
};
pub use cube::{CubeError, CubePosition, DoublingCube};

use std::fmt;
use std::str::FromStr;

/// Highest cube value the scoreboard tracks.
pub const MAX_CUBE_VALUE: u32 = 64;

/// Severity of a round's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WinType {
    Single,
    Mars,
    Backgammon,
}

impl WinType {
    /// All win types, in ascending severity.
    pub const ALL: [WinType; 3] = [WinType::Single, WinType::Mars, WinType::Backgammon];

    /// Points a round of this type is worth before the cube is applied.
    pub fn base_points(&self) -> u32 {
        match self {
            WinType::Single => 1,
            WinType::Mars => 2,
            WinType::Backgammon => 3,
        }
    }

    /// Letter used in category codes.
    pub fn letter(&self) -> char {
        match self {
            WinType::Single => 'T',
            WinType::Mars => 'M',
            WinType::Backgammon => 'B',
        }
    }

    /// Parse a category-code letter.
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'T' => Some(WinType::Single),
            'M' => Some(WinType::Mars),
            'B' => Some(WinType::Backgammon),
            _ => None,
        }
    }

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            WinType::Single => "SINGLE",
            WinType::Mars => "MARS",
            WinType::Backgammon => "BACKGAMMON",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            WinType::Single => "Tekli",
            WinType::Mars => "Mars",
            WinType::Backgammon => "Backgammon",
        }
    }
}

impl fmt::Display for WinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognised stored values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for WinType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLE" => Ok(WinType::Single),
            "MARS" => Ok(WinType::Mars),
            "BACKGAMMON" => Ok(WinType::Backgammon),
            _ => Err(ParseError {
                kind: "win type",
                value: s.to_string(),
            }),
        }
    }
}

/// Rule set a match is played under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GameType {
    /// Doubling cube and Backgammon wins available
    #[default]
    Modern,
    /// Tekli and Mars only, no cube
    Traditional,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Modern => "Modern",
            GameType::Traditional => "Traditional",
        }
    }

    pub fn allows_backgammon(&self) -> bool {
        matches!(self, GameType::Modern)
    }

    pub fn allows_doubling(&self) -> bool {
        matches!(self, GameType::Modern)
    }

    /// Win types a player may be credited with under this rule set.
    pub fn win_types(&self) -> &'static [WinType] {
        match self {
            GameType::Modern => &WinType::ALL,
            GameType::Traditional => &[WinType::Single, WinType::Mars],
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            GameType::Modern => GameType::Traditional,
            GameType::Traditional => GameType::Modern,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "modern" => Ok(GameType::Modern),
            "traditional" | "geleneksel" => Ok(GameType::Traditional),
            _ => Err(ParseError {
                kind: "game type",
                value: s.to_string(),
            }),
        }
    }
}

/// Multiplier actually applied to a round.
///
/// The cube only counts when the round was doubled with a value above 1.
pub fn effective_multiplier(is_double: bool, double_value: u32) -> u32 {
    if is_double && double_value > 1 {
        double_value
    } else {
        1
    }
}

/// Points credited for a round: base value times the multiplier.
pub fn round_score(win_type: WinType, is_double: bool, double_value: u32) -> u32 {
    win_type.base_points() * effective_multiplier(is_double, double_value)
}

/// Cube values are powers of two up to [`MAX_CUBE_VALUE`].
pub fn is_valid_multiplier(value: u32) -> bool {
    value.is_power_of_two() && value <= MAX_CUBE_VALUE
}

/// Recover the multiplier of a stored round from its score.
pub fn multiplier_from_score(win_type: WinType, is_double: bool, score: u32) -> u32 {
    if is_double {
        (score / win_type.base_points()).max(1)
    } else {
        1
    }
}
