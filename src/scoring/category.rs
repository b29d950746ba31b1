//! Category codes and the nine-way category split
//!
//! A category code combines the cube multiplier with the win-type letter:
//! `T`, `M`, `B` for undoubled rounds, `2T`, `4M`, `64B` and so on for
//! doubled ones. Summary views fold every multiplier of 4 and above into
//! one bucket per win type, giving nine [`Category`] values.

use super::{effective_multiplier, ParseError, WinType};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Exact category of a round: multiplier plus win type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryCode {
    pub multiplier: u32,
    pub win_type: WinType,
}

impl CategoryCode {
    pub fn new(win_type: WinType, multiplier: u32) -> Self {
        CategoryCode {
            multiplier: multiplier.max(1),
            win_type,
        }
    }

    /// Readable form, e.g. "2× Mars".
    pub fn display_text(&self) -> String {
        if self.multiplier > 1 {
            format!("{}× {}", self.multiplier, self.win_type.label())
        } else {
            self.win_type.label().to_string()
        }
    }

    /// The summary bucket this code falls into.
    pub fn category(&self) -> Category {
        Category::of(self.win_type, self.multiplier)
    }
}

/// Ascending multiplier, then Tekli, Mars, Backgammon.
impl Ord for CategoryCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.multiplier
            .cmp(&other.multiplier)
            .then(self.win_type.cmp(&other.win_type))
    }
}

impl PartialOrd for CategoryCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiplier > 1 {
            write!(f, "{}{}", self.multiplier, self.win_type.letter())
        } else {
            write!(f, "{}", self.win_type.letter())
        }
    }
}

impl FromStr for CategoryCode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError {
            kind: "category code",
            value: s.to_string(),
        };
        let split = s.find(|c: char| !c.is_ascii_digit()).ok_or_else(err)?;
        let (digits, rest) = s.split_at(split);
        let multiplier = if digits.is_empty() {
            1
        } else {
            digits.parse().map_err(|_| err())?
        };
        let mut letters = rest.chars();
        let win_type = letters.next().and_then(WinType::from_letter).ok_or_else(err)?;
        if letters.next().is_some() || multiplier == 0 {
            return Err(err());
        }
        Ok(CategoryCode::new(win_type, multiplier))
    }
}

/// Category code of a round from its stored fields.
pub fn combined_win_type(win_type: WinType, is_double: bool, double_value: u32) -> CategoryCode {
    CategoryCode::new(win_type, effective_multiplier(is_double, double_value))
}

fn letter_rank(letter: &str) -> usize {
    let mut chars = letter.chars();
    match (chars.next().and_then(WinType::from_letter), chars.next()) {
        (Some(win_type), None) => win_type as usize,
        _ => WinType::ALL.len(),
    }
}

fn sort_key(code: &str) -> (u64, usize, String) {
    let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
    let letter: String = code
        .chars()
        .filter(|c| !c.is_ascii_digit() && *c != '+')
        .collect();
    // Prefixes too long to parse sort after every real multiplier
    let multiplier = if digits.is_empty() {
        1
    } else {
        digits.parse().unwrap_or(u64::MAX)
    };
    (multiplier, letter_rank(&letter), letter)
}

/// Sort category codes for display.
///
/// Codes without a digit prefix count as multiplier 1. Within one
/// multiplier the order is Tekli, Mars, Backgammon; anything unrecognised
/// goes last, alphabetically.
pub fn sort_codes<I, S>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = codes.into_iter().map(|c| c.as_ref().to_string()).collect();
    sorted.sort_by_cached_key(|c| sort_key(c));
    sorted
}

/// Expand a code string back into readable text.
///
/// Unknown letters are passed through untouched, so a bad row still renders.
pub fn display_text(code: &str) -> String {
    let number: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
    let bucket = code.contains('+');
    let letter: String = code
        .chars()
        .filter(|c| !c.is_ascii_digit() && *c != '+')
        .collect();

    let mut chars = letter.chars();
    let type_text = match (chars.next().and_then(WinType::from_letter), chars.next()) {
        (Some(win_type), None) => win_type.label().to_string(),
        _ => letter.clone(),
    };

    match (number.is_empty(), bucket) {
        (true, _) => type_text,
        (false, false) => format!("{}× {}", number, type_text),
        (false, true) => format!("{}+× {}", number, type_text),
    }
}

/// Summary bucket: plain, ×2, or ×4-or-more, crossed with the win type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Single,
    Mars,
    Backgammon,
    DoubleSingle,
    DoubleMars,
    DoubleBackgammon,
    QuadSingle,
    QuadMars,
    QuadBackgammon,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 9] = [
        Category::Single,
        Category::Mars,
        Category::Backgammon,
        Category::DoubleSingle,
        Category::DoubleMars,
        Category::DoubleBackgammon,
        Category::QuadSingle,
        Category::QuadMars,
        Category::QuadBackgammon,
    ];

    /// Classify a win type and applied multiplier.
    pub fn of(win_type: WinType, multiplier: u32) -> Self {
        match (multiplier, win_type) {
            (0 | 1, WinType::Single) => Category::Single,
            (0 | 1, WinType::Mars) => Category::Mars,
            (0 | 1, WinType::Backgammon) => Category::Backgammon,
            (2, WinType::Single) => Category::DoubleSingle,
            (2, WinType::Mars) => Category::DoubleMars,
            (2, WinType::Backgammon) => Category::DoubleBackgammon,
            (_, WinType::Single) => Category::QuadSingle,
            (_, WinType::Mars) => Category::QuadMars,
            (_, WinType::Backgammon) => Category::QuadBackgammon,
        }
    }

    pub fn win_type(&self) -> WinType {
        match self {
            Category::Single | Category::DoubleSingle | Category::QuadSingle => WinType::Single,
            Category::Mars | Category::DoubleMars | Category::QuadMars => WinType::Mars,
            Category::Backgammon | Category::DoubleBackgammon | Category::QuadBackgammon => {
                WinType::Backgammon
            }
        }
    }

    /// Whether this is one of the six buckets the counter table tracks.
    pub fn is_counted_in_cache(&self) -> bool {
        !matches!(
            self,
            Category::QuadSingle | Category::QuadMars | Category::QuadBackgammon
        )
    }

    /// Code for this bucket; the ×4-or-more buckets carry a `+`.
    pub fn code(&self) -> &'static str {
        match self {
            Category::Single => "T",
            Category::Mars => "M",
            Category::Backgammon => "B",
            Category::DoubleSingle => "2T",
            Category::DoubleMars => "2M",
            Category::DoubleBackgammon => "2B",
            Category::QuadSingle => "4+T",
            Category::QuadMars => "4+M",
            Category::QuadBackgammon => "4+B",
        }
    }

    pub fn label(&self) -> String {
        display_text(self.code())
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One tally per [`Category`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts([u32; 9]);

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> u32 {
        self.0[category.index()]
    }

    pub fn add(&mut self, category: Category, amount: u32) {
        self.0[category.index()] += amount;
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Sum over every category of one win type.
    pub fn total_for(&self, win_type: WinType) -> u32 {
        Category::ALL
            .iter()
            .filter(|c| c.win_type() == win_type)
            .map(|c| self.get(*c))
            .sum()
    }

    /// Non-zero entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::ALL
            .iter()
            .map(|c| (*c, self.get(*c)))
            .filter(|(_, n)| *n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_win_type() {
        assert_eq!(combined_win_type(WinType::Mars, true, 4).to_string(), "4M");
        assert_eq!(combined_win_type(WinType::Single, false, 1).to_string(), "T");
        assert_eq!(combined_win_type(WinType::Backgammon, true, 2).to_string(), "2B");
        // A doubled flag with a value of 1 carries no prefix
        assert_eq!(combined_win_type(WinType::Mars, true, 1).to_string(), "M");
    }

    #[test]
    fn test_sort_codes() {
        let sorted = sort_codes(["M", "2T", "4B", "T", "2M"]);
        assert_eq!(sorted, vec!["T", "M", "2T", "2M", "4B"]);
    }

    #[test]
    fn test_sort_codes_large_multipliers() {
        let sorted = sort_codes(["64T", "8M", "16B", "B", "4+T"]);
        assert_eq!(sorted, vec!["B", "4+T", "8M", "16B", "64T"]);
    }

    #[test]
    fn test_sort_codes_oversized_prefix_goes_last() {
        let sorted = sort_codes(["4294967296T", "2T", "T", "99999999999999999999M"]);
        assert_eq!(sorted, vec!["T", "2T", "4294967296T", "99999999999999999999M"]);
    }

    #[test]
    fn test_code_ordering_matches_sort() {
        let mut codes: Vec<CategoryCode> = ["M", "2T", "4B", "T", "2M"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        codes.sort();
        let rendered: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, sort_codes(["M", "2T", "4B", "T", "2M"]));
    }

    #[test]
    fn test_parse_code() {
        let code: CategoryCode = "16B".parse().unwrap();
        assert_eq!(code.multiplier, 16);
        assert_eq!(code.win_type, WinType::Backgammon);
        assert!("".parse::<CategoryCode>().is_err());
        assert!("2".parse::<CategoryCode>().is_err());
        assert!("2X".parse::<CategoryCode>().is_err());
        assert!("0T".parse::<CategoryCode>().is_err());
    }

    #[test]
    fn test_display_text() {
        assert_eq!(display_text("T"), "Tekli");
        assert_eq!(display_text("2M"), "2× Mars");
        assert_eq!(display_text("8B"), "8× Backgammon");
        assert_eq!(display_text("4+T"), "4+× Tekli");
        assert_eq!(display_text("X"), "X");
        let code: CategoryCode = "4M".parse().unwrap();
        assert_eq!(code.display_text(), "4× Mars");
    }

    #[test]
    fn test_category_buckets() {
        assert_eq!(Category::of(WinType::Single, 1), Category::Single);
        assert_eq!(Category::of(WinType::Mars, 2), Category::DoubleMars);
        assert_eq!(Category::of(WinType::Backgammon, 4), Category::QuadBackgammon);
        assert_eq!(Category::of(WinType::Single, 64), Category::QuadSingle);
        assert!(Category::DoubleMars.is_counted_in_cache());
        assert!(!Category::QuadMars.is_counted_in_cache());
    }

    #[test]
    fn test_category_counts() {
        let mut counts = CategoryCounts::new();
        counts.add(Category::Mars, 2);
        counts.add(Category::QuadMars, 1);
        counts.add(Category::Single, 3);
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.total_for(WinType::Mars), 3);
        let entries: Vec<_> = counts.iter().collect();
        assert_eq!(
            entries,
            vec![(Category::Single, 3), (Category::Mars, 2), (Category::QuadMars, 1)]
        );
    }
}
