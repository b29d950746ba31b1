//! Application screen state management
//!
//! Handles transitions between different application screens:
//! - Main menu
//! - New match form
//! - Scoreboard for the live match
//! - Match history and match detail
//! - Player picker, player statistics and head-to-head

use crossterm::event::KeyCode;

use super::session::{MatchSession, SessionError};
use crate::config::{clamp_target, Config};
use crate::model::{Match, Player, PlayerId, Side};
use crate::scoring::{GameType, WinType};
use crate::stats::HeadToHeadStats;
use crate::storage::{MatchReport, PlayerReport, Storage, StorageError};

/// Longest player name the form accepts
pub const MAX_NAME_LEN: usize = 20;

/// Menu option on the main screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    NewMatch,
    History,
    PlayerStats,
    HeadToHead,
    RebuildStats,
    ResetData,
    Quit,
}

impl MenuOption {
    /// Get all menu options in order
    pub fn all() -> &'static [MenuOption] {
        &[
            MenuOption::NewMatch,
            MenuOption::History,
            MenuOption::PlayerStats,
            MenuOption::HeadToHead,
            MenuOption::RebuildStats,
            MenuOption::ResetData,
            MenuOption::Quit,
        ]
    }

    /// Get the display label for this option
    pub fn label(&self) -> &'static str {
        match self {
            MenuOption::NewMatch => "New Match",
            MenuOption::History => "Match History",
            MenuOption::PlayerStats => "Player Stats",
            MenuOption::HeadToHead => "Head to Head",
            MenuOption::RebuildStats => "Rebuild Stats",
            MenuOption::ResetData => "Reset All Data",
            MenuOption::Quit => "Quit",
        }
    }
}

/// Field with focus on the new match form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Player1,
    Player2,
    Target,
    GameType,
}

impl FormField {
    pub fn next(&self) -> Self {
        match self {
            FormField::Player1 => FormField::Player2,
            FormField::Player2 => FormField::Target,
            FormField::Target => FormField::GameType,
            FormField::GameType => FormField::Player1,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            FormField::Player1 => FormField::GameType,
            FormField::Player2 => FormField::Player1,
            FormField::Target => FormField::Player2,
            FormField::GameType => FormField::Target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatchForm {
    pub player1: String,
    pub player2: String,
    pub target: String,
    pub game_type: GameType,
    pub focus: FormField,
    pub error: Option<String>,
}

impl NewMatchForm {
    pub fn new(config: &Config) -> Self {
        NewMatchForm {
            player1: String::new(),
            player2: String::new(),
            target: config.target_score.to_string(),
            game_type: config.game_type,
            focus: FormField::Player1,
            error: None,
        }
    }

    fn push(&mut self, c: char) {
        match self.focus {
            FormField::Player1 if self.player1.chars().count() < MAX_NAME_LEN => self.player1.push(c),
            FormField::Player2 if self.player2.chars().count() < MAX_NAME_LEN => self.player2.push(c),
            FormField::Target if c.is_ascii_digit() && self.target.len() < 2 => self.target.push(c),
            FormField::GameType if c == ' ' => self.game_type = self.game_type.toggled(),
            _ => {}
        }
    }

    fn pop(&mut self) {
        match self.focus {
            FormField::Player1 => {
                self.player1.pop();
            }
            FormField::Player2 => {
                self.player2.pop();
            }
            FormField::Target => {
                self.target.pop();
            }
            FormField::GameType => {}
        }
    }

    /// Target as entered, kept within the allowed range.
    pub fn target_score(&self) -> Option<u32> {
        self.target.parse().ok().map(clamp_target)
    }
}

/// What the player picker is choosing for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickPurpose {
    Stats,
    /// Head-to-head; holds the first pick once made
    HeadToHead { first: Option<Player> },
}

/// A history row with the names resolved
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub game: Match,
    pub player1: String,
    pub player2: String,
}

/// The current application screen
pub enum Screen {
    /// Main menu
    Menu {
        selected: usize,
        confirm_reset: bool,
        /// Outcome of the last maintenance action
        notice: Option<String>,
    },
    /// Entering players and rules for a new match
    NewMatch { form: NewMatchForm },
    /// Scoring the live match
    Scoreboard {
        session: MatchSession,
        /// Side the next key press applies to
        selected: Side,
        status: String,
    },
    /// Past matches, newest first
    History {
        entries: Vec<HistoryEntry>,
        selected: usize,
        confirm_delete: bool,
    },
    /// One match round by round
    MatchDetail { report: MatchReport },
    /// Choosing a player
    PlayerPicker {
        purpose: PickPurpose,
        players: Vec<Player>,
        selected: usize,
    },
    PlayerStats { report: PlayerReport },
    HeadToHead {
        player1: Player,
        player2: Player,
        stats: HeadToHeadStats,
    },
    /// Storage error
    Error { message: String },
}

/// Main application coordinator
pub struct AppCoordinator {
    pub storage: Storage,
    pub config: Config,
    /// Current screen
    pub screen: Screen,
    /// Whether the application should quit
    pub should_quit: bool,
}

impl AppCoordinator {
    /// Create a new app coordinator starting at the menu
    pub fn new(storage: Storage, config: Config) -> Self {
        Self {
            storage,
            config,
            screen: Screen::Menu {
                selected: 0,
                confirm_reset: false,
                notice: None,
            },
            should_quit: false,
        }
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Go back to the main menu
    pub fn go_to_menu(&mut self) {
        self.screen = Screen::Menu {
            selected: 0,
            confirm_reset: false,
            notice: None,
        };
    }

    fn menu_notice(&mut self, message: &str) {
        if let Screen::Menu { notice, .. } = &mut self.screen {
            *notice = Some(message.to_string());
        }
    }

    fn show_error(&mut self, error: impl std::fmt::Display) {
        log::warn!("{}", error);
        self.screen = Screen::Error {
            message: error.to_string(),
        };
    }

    /// Dispatch a key press to the current screen
    pub fn on_key(&mut self, key: KeyCode) {
        match self.screen {
            Screen::Menu { .. } => self.menu_key(key),
            Screen::NewMatch { .. } => self.form_key(key),
            Screen::Scoreboard { .. } => self.scoreboard_key(key),
            Screen::History { .. } => self.history_key(key),
            Screen::MatchDetail { .. } => {
                if matches!(key, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                    self.open_history();
                }
            }
            Screen::PlayerPicker { .. } => self.picker_key(key),
            Screen::PlayerStats { .. } | Screen::HeadToHead { .. } | Screen::Error { .. } => {
                if matches!(key, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                    self.go_to_menu();
                }
            }
        }
    }

    // === Menu ===

    fn menu_key(&mut self, key: KeyCode) {
        let Screen::Menu { selected, confirm_reset, notice } = &mut self.screen else {
            return;
        };
        *notice = None;

        if *confirm_reset {
            *confirm_reset = false;
            if key == KeyCode::Char('y') {
                match self.storage.reset_all_data() {
                    Ok(()) => self.menu_notice("All matches deleted"),
                    Err(e) => self.show_error(e),
                }
            }
            return;
        }

        match key {
            KeyCode::Up if *selected > 0 => *selected -= 1,
            KeyCode::Down if *selected < MenuOption::all().len() - 1 => *selected += 1,
            KeyCode::Enter => {
                let option = MenuOption::all()[*selected];
                self.menu_select(option);
            }
            KeyCode::Esc | KeyCode::Char('q') => self.quit(),
            _ => {}
        }
    }

    fn menu_select(&mut self, option: MenuOption) {
        match option {
            MenuOption::NewMatch => {
                self.screen = Screen::NewMatch {
                    form: NewMatchForm::new(&self.config),
                };
            }
            MenuOption::History => self.open_history(),
            MenuOption::PlayerStats => self.open_picker(PickPurpose::Stats),
            MenuOption::HeadToHead => self.open_picker(PickPurpose::HeadToHead { first: None }),
            MenuOption::RebuildStats => match self.storage.rebuild_player_stats() {
                Ok(()) => self.menu_notice("Player stats rebuilt from match history"),
                Err(e) => self.show_error(e),
            },
            MenuOption::ResetData => {
                if let Screen::Menu { confirm_reset, .. } = &mut self.screen {
                    *confirm_reset = true;
                }
            }
            MenuOption::Quit => self.quit(),
        }
    }

    // === New match form ===

    fn form_key(&mut self, key: KeyCode) {
        let Screen::NewMatch { form } = &mut self.screen else {
            return;
        };

        match key {
            KeyCode::Esc => self.go_to_menu(),
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.previous(),
            KeyCode::Left | KeyCode::Right if form.focus == FormField::GameType => {
                form.game_type = form.game_type.toggled();
            }
            KeyCode::Backspace => form.pop(),
            KeyCode::Char(c) => form.push(c),
            KeyCode::Enter => {
                let form = form.clone();
                self.start_match(form);
            }
            _ => {}
        }
    }

    fn start_match(&mut self, form: NewMatchForm) {
        match self.try_start_match(&form) {
            Ok(session) => {
                self.screen = Screen::Scoreboard {
                    session,
                    selected: Side::One,
                    status: String::new(),
                };
            }
            Err(message) => {
                self.screen = Screen::NewMatch {
                    form: NewMatchForm {
                        error: Some(message),
                        ..form
                    },
                };
            }
        }
    }

    fn try_start_match(&self, form: &NewMatchForm) -> Result<MatchSession, String> {
        let name1 = form.player1.trim();
        let name2 = form.player2.trim();
        if name1.is_empty() || name2.is_empty() {
            return Err("Both player names are required".to_string());
        }
        if name1 == name2 {
            return Err("Players must have different names".to_string());
        }
        let target = form
            .target_score()
            .ok_or_else(|| "Target score must be a number".to_string())?;

        let player1 = self.storage.get_or_create_player(name1).map_err(|e| e.to_string())?;
        let player2 = self.storage.get_or_create_player(name2).map_err(|e| e.to_string())?;
        MatchSession::start(&self.storage, player1, player2, form.game_type, target)
            .map_err(|e| e.to_string())
    }

    // === Scoreboard ===

    fn scoreboard_key(&mut self, key: KeyCode) {
        let Screen::Scoreboard { session, selected, status } = &mut self.screen else {
            return;
        };
        let storage = &self.storage;

        if key == KeyCode::Esc {
            if let Err(e) = session.abandon(storage) {
                *status = e.to_string();
                return;
            }
            self.go_to_menu();
            return;
        }

        let result: Result<String, SessionError> = match key {
            KeyCode::Left | KeyCode::Char('1') => {
                *selected = Side::One;
                Ok(String::new())
            }
            KeyCode::Right | KeyCode::Char('2') => {
                *selected = Side::Two;
                Ok(String::new())
            }
            KeyCode::Tab => {
                *selected = selected.opponent();
                Ok(String::new())
            }
            KeyCode::Char('t') => record(storage, session, *selected, WinType::Single),
            KeyCode::Char('m') => record(storage, session, *selected, WinType::Mars),
            KeyCode::Char('b') => record(storage, session, *selected, WinType::Backgammon),
            KeyCode::Char('d') => session.offer_double(*selected).map(|value| {
                format!("{} offers the cube at {}", session.player(*selected).name, value)
            }),
            KeyCode::Char('a') => session
                .accept_double()
                .map(|side| format!("{} takes the cube", session.player(side).name)),
            KeyCode::Char('r') => session.decline_double(storage).map(|winner| match winner {
                Some(winner_id) => finished_message(session, winner_id),
                None => "Double declined".to_string(),
            }),
            KeyCode::Char('c') => session.cancel_offer().map(|_| "Offer withdrawn".to_string()),
            KeyCode::Char('u') => session.undo(storage).map(|_| "Last round undone".to_string()),
            KeyCode::Char('f') => session
                .finish(storage)
                .map(|winner_id| finished_message(session, winner_id)),
            _ => return,
        };

        *status = match result {
            Ok(message) => message,
            Err(e) => e.to_string(),
        };
    }

    // === History ===

    fn open_history(&mut self) {
        match self.history_entries() {
            Ok(entries) => {
                self.screen = Screen::History {
                    entries,
                    selected: 0,
                    confirm_delete: false,
                };
            }
            Err(e) => self.show_error(e),
        }
    }

    fn history_entries(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        let players = self.storage.all_players()?;
        let name_of = |id| {
            players
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("#{}", id))
        };

        Ok(self
            .storage
            .all_matches()?
            .into_iter()
            .map(|game| HistoryEntry {
                player1: name_of(game.player1_id),
                player2: name_of(game.player2_id),
                game,
            })
            .collect())
    }

    fn history_key(&mut self, key: KeyCode) {
        let Screen::History { entries, selected, confirm_delete } = &mut self.screen else {
            return;
        };
        let current = entries.get(*selected).map(|e| e.game.clone());

        if *confirm_delete {
            *confirm_delete = false;
            if let (KeyCode::Char('y'), Some(game)) = (key, current) {
                match self.storage.delete_match(game.id) {
                    Ok(_) => self.open_history(),
                    Err(e) => self.show_error(e),
                }
            }
            return;
        }

        match key {
            KeyCode::Up if *selected > 0 => *selected -= 1,
            KeyCode::Down if *selected + 1 < entries.len() => *selected += 1,
            KeyCode::Char('d') if current.is_some() => *confirm_delete = true,
            KeyCode::Enter => {
                if let Some(game) = current {
                    match self.storage.match_report(game.id) {
                        Ok(report) => self.screen = Screen::MatchDetail { report },
                        Err(e) => self.show_error(e),
                    }
                }
            }
            KeyCode::Char('c') => {
                if let Some(game) = current.filter(|g| !g.is_finished()) {
                    match MatchSession::resume(&self.storage, game.id) {
                        Ok(session) => {
                            self.screen = Screen::Scoreboard {
                                session,
                                selected: Side::One,
                                status: "Match resumed".to_string(),
                            };
                        }
                        Err(e) => self.show_error(e),
                    }
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => self.go_to_menu(),
            _ => {}
        }
    }

    // === Player picker ===

    fn open_picker(&mut self, purpose: PickPurpose) {
        match self.storage.all_players() {
            Ok(players) => {
                self.screen = Screen::PlayerPicker {
                    purpose,
                    players,
                    selected: 0,
                };
            }
            Err(e) => self.show_error(e),
        }
    }

    fn picker_key(&mut self, key: KeyCode) {
        let Screen::PlayerPicker { purpose, players, selected } = &mut self.screen else {
            return;
        };

        match key {
            KeyCode::Up if *selected > 0 => *selected -= 1,
            KeyCode::Down if *selected + 1 < players.len() => *selected += 1,
            KeyCode::Esc | KeyCode::Char('q') => self.go_to_menu(),
            KeyCode::Enter => {
                let Some(player) = players.get(*selected).cloned() else {
                    return;
                };
                match purpose.clone() {
                    PickPurpose::Stats => self.open_player_stats(player),
                    PickPurpose::HeadToHead { first: None } => {
                        *purpose = PickPurpose::HeadToHead { first: Some(player) };
                    }
                    PickPurpose::HeadToHead { first: Some(first) } => {
                        if first.id != player.id {
                            self.open_head_to_head(first, player);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn open_player_stats(&mut self, player: Player) {
        match self.storage.player_report(player.id) {
            Ok(report) => self.screen = Screen::PlayerStats { report },
            Err(e) => self.show_error(e),
        }
    }

    fn open_head_to_head(&mut self, player1: Player, player2: Player) {
        match self.storage.head_to_head(player1.id, player2.id) {
            Ok(stats) => {
                self.screen = Screen::HeadToHead {
                    player1,
                    player2,
                    stats,
                };
            }
            Err(e) => self.show_error(e),
        }
    }
}

fn record(
    storage: &Storage,
    session: &mut MatchSession,
    side: Side,
    win_type: WinType,
) -> Result<String, SessionError> {
    let winner = session.record_round(storage, side, win_type)?;
    Ok(match winner {
        Some(winner_id) => finished_message(session, winner_id),
        None => format!("{} wins a {} round", session.player(side).name, win_type.label()),
    })
}

fn finished_message(session: &MatchSession, winner_id: PlayerId) -> String {
    let game = session.game();
    let name = game
        .side_of(winner_id)
        .map(|side| session.player(side).name.clone())
        .unwrap_or_default();
    format!(
        "{} wins the match {}-{}",
        name, game.player1_score, game.player2_score
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> AppCoordinator {
        AppCoordinator::new(Storage::open_in_memory().unwrap(), Config::default())
    }

    fn type_text(app: &mut AppCoordinator, text: &str) {
        for c in text.chars() {
            app.on_key(KeyCode::Char(c));
        }
    }

    fn start_match(app: &mut AppCoordinator, p1: &str, p2: &str) {
        app.on_key(KeyCode::Enter); // New Match
        type_text(app, p1);
        app.on_key(KeyCode::Tab);
        type_text(app, p2);
        app.on_key(KeyCode::Enter);
    }

    #[test]
    fn test_menu_navigation() {
        let mut app = coordinator();
        app.on_key(KeyCode::Up);
        app.on_key(KeyCode::Down);
        app.on_key(KeyCode::Down);
        match &app.screen {
            Screen::Menu { selected, .. } => assert_eq!(*selected, 2),
            _ => panic!("expected menu"),
        }
        app.on_key(KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_new_match_form_validation() {
        let mut app = coordinator();
        app.on_key(KeyCode::Enter);
        type_text(&mut app, "Ali");
        app.on_key(KeyCode::Enter);

        match &app.screen {
            Screen::NewMatch { form } => {
                assert!(form.error.is_some());
                assert_eq!(form.player1, "Ali");
                assert_eq!(form.target, "11");
            }
            _ => panic!("expected the form to stay open"),
        }
    }

    #[test]
    fn test_form_toggles_game_type() {
        let mut app = coordinator();
        app.on_key(KeyCode::Enter);
        app.on_key(KeyCode::BackTab);
        app.on_key(KeyCode::Char(' '));
        match &app.screen {
            Screen::NewMatch { form } => {
                assert_eq!(form.focus, FormField::GameType);
                assert_eq!(form.game_type, GameType::Traditional);
            }
            _ => panic!("expected form"),
        }
    }

    #[test]
    fn test_score_and_leave_match() {
        let mut app = coordinator();
        start_match(&mut app, "Ali", "Veli");

        app.on_key(KeyCode::Char('m'));
        app.on_key(KeyCode::Char('2'));
        app.on_key(KeyCode::Char('d'));
        app.on_key(KeyCode::Char('a'));
        app.on_key(KeyCode::Char('t'));

        match &app.screen {
            Screen::Scoreboard { session, .. } => {
                assert_eq!(session.game().player1_score, 2);
                assert_eq!(session.game().player2_score, 2);
            }
            _ => panic!("expected scoreboard"),
        }

        app.on_key(KeyCode::Esc);
        assert!(matches!(app.screen, Screen::Menu { .. }));

        let matches = app.storage.all_matches().unwrap();
        assert_eq!(matches.len(), 1);
        // Leaving with rounds on the board settles the match; a tie goes to player 1
        assert_eq!(matches[0].winner_id, Some(matches[0].player1_id));
    }

    #[test]
    fn test_scoreboard_errors_become_status() {
        let mut app = coordinator();
        start_match(&mut app, "Ali", "Veli");
        app.on_key(KeyCode::Char('u'));

        match &app.screen {
            Screen::Scoreboard { status, .. } => assert_eq!(status, "nothing to undo"),
            _ => panic!("expected scoreboard"),
        }
    }

    #[test]
    fn test_history_delete() {
        let mut app = coordinator();
        start_match(&mut app, "Ali", "Veli");
        app.on_key(KeyCode::Char('t'));
        app.on_key(KeyCode::Esc);

        app.on_key(KeyCode::Down);
        app.on_key(KeyCode::Enter);
        match &app.screen {
            Screen::History { entries, .. } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].player1, "Ali");
            }
            _ => panic!("expected history"),
        }

        app.on_key(KeyCode::Enter);
        assert!(matches!(app.screen, Screen::MatchDetail { .. }));
        app.on_key(KeyCode::Esc);

        app.on_key(KeyCode::Char('d'));
        app.on_key(KeyCode::Char('y'));
        match &app.screen {
            Screen::History { entries, .. } => assert!(entries.is_empty()),
            _ => panic!("expected history"),
        }
    }

    #[test]
    fn test_head_to_head_picker() {
        let mut app = coordinator();
        start_match(&mut app, "Ali", "Veli");
        app.on_key(KeyCode::Char('b'));
        app.on_key(KeyCode::Esc);

        for _ in 0..3 {
            app.on_key(KeyCode::Down);
        }
        app.on_key(KeyCode::Enter);
        app.on_key(KeyCode::Enter); // Ali
        app.on_key(KeyCode::Down);
        app.on_key(KeyCode::Enter); // Veli

        match &app.screen {
            Screen::HeadToHead { player1, player2, stats } => {
                assert_eq!(player1.name, "Ali");
                assert_eq!(player2.name, "Veli");
                assert_eq!(stats.total_matches, 1);
                assert_eq!(stats.player1_wins, 1);
            }
            _ => panic!("expected head to head"),
        }
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let mut app = coordinator();
        start_match(&mut app, "Ali", "Veli");
        app.on_key(KeyCode::Char('t'));
        app.on_key(KeyCode::Esc);

        for _ in 0..5 {
            app.on_key(KeyCode::Down);
        }
        app.on_key(KeyCode::Enter);
        app.on_key(KeyCode::Char('n'));
        assert_eq!(app.storage.all_matches().unwrap().len(), 1);

        app.on_key(KeyCode::Enter);
        app.on_key(KeyCode::Char('y'));
        assert!(app.storage.all_matches().unwrap().is_empty());
        assert_eq!(app.storage.all_players().unwrap().len(), 2);
        match &app.screen {
            Screen::Menu { notice, .. } => assert_eq!(notice.as_deref(), Some("All matches deleted")),
            _ => panic!("expected menu"),
        }
    }

    #[test]
    fn test_rebuild_stats_from_menu() {
        let mut app = coordinator();
        start_match(&mut app, "Ali", "Veli");
        app.on_key(KeyCode::Char('t'));
        app.on_key(KeyCode::Char('t'));
        app.on_key(KeyCode::Char('u'));
        app.on_key(KeyCode::Esc);

        let ali = app.storage.player_by_name("Ali").unwrap().unwrap();
        assert_eq!(app.storage.player_stats(ali.id).unwrap().unwrap().rounds_won, 2);

        for _ in 0..4 {
            app.on_key(KeyCode::Down);
        }
        app.on_key(KeyCode::Enter);

        let stats = app.storage.player_stats(ali.id).unwrap().unwrap();
        assert_eq!(stats.rounds_won, 1);
        assert_eq!(stats.single_wins, 1);
        assert!(matches!(app.screen, Screen::Menu { notice: Some(_), .. }));
    }
}
