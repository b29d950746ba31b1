//! UI rendering using ratatui
//!
//! Supports multiple screens:
//! - Menu: Main menu with options
//! - NewMatch: Player names, target score and rules
//! - Scoreboard: Live match with the doubling cube
//! - History / MatchDetail: Past matches and their rounds
//! - PlayerPicker / PlayerStats / HeadToHead: Statistics
//! - Error: Error message display

use crate::app::session::MatchSession;
use crate::app::{AppCoordinator, FormField, HistoryEntry, MenuOption, NewMatchForm, PickPurpose, Screen};
use crate::model::{Player, Side};
use crate::scoring::{Category, CubePosition, DoublingCube, WinType};
use crate::stats::{HeadToHeadStats, RoundStats};
use crate::storage::{MatchReport, PlayerReport};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// Render the appropriate screen based on app state
pub fn render(frame: &mut Frame, coordinator: &AppCoordinator) {
    match &coordinator.screen {
        Screen::Menu { selected, confirm_reset, notice } => {
            render_menu(frame, *selected, *confirm_reset, notice.as_deref());
        }
        Screen::NewMatch { form } => render_new_match(frame, form),
        Screen::Scoreboard { session, selected, status } => {
            render_scoreboard(frame, session, *selected, status);
        }
        Screen::History { entries, selected, confirm_delete } => {
            render_history(frame, entries, *selected, *confirm_delete);
        }
        Screen::MatchDetail { report } => render_match_detail(frame, report),
        Screen::PlayerPicker { purpose, players, selected } => {
            render_picker(frame, purpose, players, *selected);
        }
        Screen::PlayerStats { report } => render_player_stats(frame, report),
        Screen::HeadToHead { player1, player2, stats } => {
            render_head_to_head(frame, player1, player2, stats);
        }
        Screen::Error { message } => render_error(frame, message),
    }
}

/// Header, body and footer rows shared by the list screens
fn page_layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(6),    // Body
            Constraint::Length(2), // Footer
        ])
        .margin(1)
        .split(area)
}

fn render_header(frame: &mut Frame, area: Rect, title: &str) {
    let header = Paragraph::new(title.to_string())
        .style(Style::default().fg(Color::Cyan).bold())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

fn render_footer(frame: &mut Frame, area: Rect, hint: &str) {
    let footer = Paragraph::new(hint.to_string())
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

fn selectable(label: String, is_selected: bool) -> ListItem<'static> {
    let style = if is_selected {
        Style::default().fg(Color::Yellow).bold()
    } else {
        Style::default().fg(Color::White)
    };
    let prefix = if is_selected { "> " } else { "  " };
    ListItem::new(format!("{}{}", prefix, label)).style(style)
}

/// Render the main menu
fn render_menu(frame: &mut Frame, selected: usize, confirm_reset: bool, notice: Option<&str>) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Logo
            Constraint::Length(1), // Spacer
            Constraint::Min(6),    // Menu options
            Constraint::Length(2), // Footer
        ])
        .margin(2)
        .split(area);

    let logo = r#"
 _____           _
|_   _|_ ___ ___| |__ _
  | |/ _` \ V / | / _` |
  |_|\__,_|\_/|_|\__,_|
"#;
    let logo_widget = Paragraph::new(logo)
        .style(Style::default().fg(Color::Yellow).bold())
        .alignment(Alignment::Center);
    frame.render_widget(logo_widget, layout[0]);

    let items: Vec<ListItem> = MenuOption::all()
        .iter()
        .enumerate()
        .map(|(i, opt)| selectable(opt.label().to_string(), i == selected))
        .collect();
    frame.render_widget(List::new(items).block(Block::default()), layout[2]);

    if confirm_reset {
        let warning = Paragraph::new("Delete every match and zero all stats? y to confirm")
            .style(Style::default().fg(Color::Red).bold())
            .alignment(Alignment::Center);
        frame.render_widget(warning, layout[3]);
    } else if let Some(notice) = notice {
        let notice = Paragraph::new(notice.to_string())
            .style(Style::default().fg(Color::Green))
            .alignment(Alignment::Center);
        frame.render_widget(notice, layout[3]);
    } else {
        render_footer(frame, layout[3], "↑↓ Navigate  Enter Select  Esc Quit");
    }
}

/// Render the new match form
fn render_new_match(frame: &mut Frame, form: &NewMatchForm) {
    let layout = page_layout(frame.area());
    render_header(frame, layout[0], "New Match");

    let field = |label: &str, value: String, field: FormField| {
        let focused = form.focus == field;
        let text = if focused {
            format!("{:<12}[{}]_", label, value)
        } else {
            format!("{:<12}{}", label, value)
        };
        let style = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        };
        Line::styled(text, style)
    };

    let mut lines = vec![
        field("Player 1", form.player1.clone(), FormField::Player1),
        field("Player 2", form.player2.clone(), FormField::Player2),
        field("Target", form.target.clone(), FormField::Target),
        field("Rules", form.game_type.to_string(), FormField::GameType),
        Line::raw(""),
    ];
    let rules = if form.game_type.allows_doubling() {
        "Tekli, Mars and Backgammon with the doubling cube"
    } else {
        "Tekli and Mars only, no doubling"
    };
    lines.push(Line::styled(rules, Style::default().fg(Color::DarkGray)));
    if let Some(error) = &form.error {
        lines.push(Line::raw(""));
        lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(lines).block(Block::default().borders(Borders::ALL)), layout[1]);
    render_footer(frame, layout[2], "Tab Next field  Space/←→ Rules  Enter Start  Esc Back");
}

/// Render the live match
fn render_scoreboard(frame: &mut Frame, session: &MatchSession, selected: Side, status: &str) {
    let area = frame.area();
    let game = session.game();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(7), // Scores
            Constraint::Length(2), // Cube
            Constraint::Length(2), // Status
            Constraint::Min(0),    // Spacer
            Constraint::Length(2), // Footer
        ])
        .margin(1)
        .split(area);

    render_header(
        frame,
        layout[0],
        &format!(
            "{} to {}  ·  round {}",
            game.game_type,
            game.target_score,
            game.total_rounds + 1
        ),
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[1]);

    for side in [Side::One, Side::Two] {
        let column = match side {
            Side::One => columns[0],
            Side::Two => columns[1],
        };
        let is_selected = side == selected;
        let is_winner = session.winner() == Some(side);
        let border = if is_selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut title = format!(" {} ", session.player(side).name);
        if is_winner {
            title.push_str("★ ");
        }

        let lines = vec![
            Line::raw(""),
            Line::styled(
                game.score(side).to_string(),
                Style::default().fg(Color::Magenta).bold(),
            ),
            Line::styled(
                format!("{} rounds won", game.rounds_won(side)),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        let panel = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(title),
            );
        frame.render_widget(panel, column);
    }

    if game.game_type.allows_doubling() {
        let cube = Paragraph::new(format_cube(session.cube(), session))
            .style(Style::default().fg(Color::Cyan))
            .alignment(Alignment::Center);
        frame.render_widget(cube, layout[2]);
    }

    let status_color = if session.is_finished() {
        Color::Green
    } else {
        Color::White
    };
    let status_widget = Paragraph::new(status.to_string())
        .style(Style::default().fg(status_color))
        .alignment(Alignment::Center);
    frame.render_widget(status_widget, layout[3]);

    let hint = if session.is_finished() {
        "Esc Menu".to_string()
    } else {
        let mut keys = vec!["1/2 Side".to_string()];
        for win_type in game.game_type.win_types() {
            keys.push(format!("{} {}", win_type.letter().to_ascii_lowercase(), win_type.label()));
        }
        if game.game_type.allows_doubling() {
            if session.cube().can_offer(selected) {
                keys.push("d Double".to_string());
            }
            if session.cube().pending_offer().is_some() {
                keys.extend(["a Take", "r Drop", "c Cancel"].map(String::from));
            }
        }
        if session.can_undo() {
            keys.push(format!("u Undo ({})", session.rounds_this_session()));
        }
        keys.extend(["f Finish", "Esc Leave"].map(String::from));
        keys.join("  ")
    };
    render_footer(frame, layout[5], &hint);
}

/// Describe the cube, naming whoever holds or offers it.
fn format_cube(cube: &DoublingCube, session: &MatchSession) -> String {
    let name = |side: Side| session.player(side).name.clone();
    match cube.position() {
        CubePosition::Center => format!("Cube in the middle ({})", cube.value()),
        CubePosition::Player1Offer => {
            format!("{} offers {}: take or drop?", name(Side::One), cube.value())
        }
        CubePosition::Player2Offer => {
            format!("{} offers {}: take or drop?", name(Side::Two), cube.value())
        }
        CubePosition::Player1Control => format!("{} holds the cube at {}", name(Side::One), cube.value()),
        CubePosition::Player2Control => format!("{} holds the cube at {}", name(Side::Two), cube.value()),
    }
}

/// Render the match history
fn render_history(frame: &mut Frame, entries: &[HistoryEntry], selected: usize, confirm_delete: bool) {
    let layout = page_layout(frame.area());
    render_header(frame, layout[0], "Match History");

    if entries.is_empty() {
        let empty = Paragraph::new("No matches yet")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, layout[1]);
    } else {
        let items: Vec<ListItem> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let game = &entry.game;
                let state = if game.is_finished() { "" } else { "  (in progress)" };
                let label = format!(
                    "{}  {} {} - {} {}  [{}, to {}]{}",
                    game.date,
                    entry.player1,
                    game.player1_score,
                    game.player2_score,
                    entry.player2,
                    game.game_type,
                    game.target_score,
                    state
                );
                selectable(label, i == selected)
            })
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Matches"));
        frame.render_widget(list, layout[1]);
    }

    if confirm_delete {
        let warning = Paragraph::new("Delete this match and its rounds? y to confirm")
            .style(Style::default().fg(Color::Red).bold())
            .alignment(Alignment::Center);
        frame.render_widget(warning, layout[2]);
    } else {
        render_footer(frame, layout[2], "↑↓ Select  Enter Rounds  c Continue  d Delete  Esc Back");
    }
}

/// Render one match round by round
fn render_match_detail(frame: &mut Frame, report: &MatchReport) {
    let game = &report.game;
    let layout = page_layout(frame.area());
    render_header(
        frame,
        layout[0],
        &format!(
            "{} {} - {} {}",
            report.player1.name, game.player1_score, game.player2_score, report.player2.name
        ),
    );

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(34)])
        .split(layout[1]);

    let items: Vec<ListItem> = report
        .rounds
        .iter()
        .map(|round| {
            let winner = if round.winner_id == report.player1.id {
                &report.player1.name
            } else {
                &report.player2.name
            };
            ListItem::new(format!(
                "{:>3}. {:<16} {:<16} +{}",
                round.round_number,
                winner,
                round.combined_win_type().display_text(),
                round.score
            ))
        })
        .collect();
    let rounds = List::new(items).block(Block::default().borders(Borders::ALL).title("Rounds"));
    frame.render_widget(rounds, body[0]);

    let mut lines = vec![Line::styled(
        report.player1.name.clone(),
        Style::default().fg(Color::Yellow).bold(),
    )];
    lines.extend(code_lines(&report.player1_stats));
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        report.player2.name.clone(),
        Style::default().fg(Color::Yellow).bold(),
    ));
    lines.extend(code_lines(&report.player2_stats));
    let summary = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Wins"));
    frame.render_widget(summary, body[1]);

    render_footer(frame, layout[2], "Esc Back");
}

/// Exact codes with counts and points, e.g. "2× Mars  x1  4 pts".
fn code_lines(stats: &RoundStats) -> Vec<Line<'static>> {
    if stats.by_code.is_empty() {
        return vec![Line::styled("  no wins", Style::default().fg(Color::DarkGray))];
    }
    stats
        .by_code
        .iter()
        .map(|(code, count)| {
            let points = stats.points_by_code.get(code).copied().unwrap_or(0);
            Line::raw(format!("  {:<16} x{:<3} {} pts", code.display_text(), count, points))
        })
        .collect()
}

/// Render the player picker
fn render_picker(frame: &mut Frame, purpose: &PickPurpose, players: &[Player], selected: usize) {
    let layout = page_layout(frame.area());
    let title = match purpose {
        PickPurpose::Stats => "Choose a player".to_string(),
        PickPurpose::HeadToHead { first: None } => "Head to Head: first player".to_string(),
        PickPurpose::HeadToHead { first: Some(first) } => {
            format!("Head to Head: {} vs ...", first.name)
        }
    };
    render_header(frame, layout[0], &title);

    if players.is_empty() {
        let empty = Paragraph::new("No players yet. Start a match to add some.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, layout[1]);
    } else {
        let items: Vec<ListItem> = players
            .iter()
            .enumerate()
            .map(|(i, player)| selectable(player.name.clone(), i == selected))
            .collect();
        frame.render_widget(
            List::new(items).block(Block::default().borders(Borders::ALL).title("Players")),
            layout[1],
        );
    }

    render_footer(frame, layout[2], "↑↓ Select  Enter Choose  Esc Back");
}

/// Render one player's statistics
fn render_player_stats(frame: &mut Frame, report: &PlayerReport) {
    let layout = page_layout(frame.area());
    render_header(frame, layout[0], &report.player.name);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(layout[1]);

    let summary = &report.summary;
    let cached = &report.cached;
    let lines = vec![
        Line::raw(format!(
            "Matches   {} played, {} won ({:.1}%)",
            summary.matches_played,
            summary.matches_won,
            summary.match_win_rate()
        )),
        Line::raw(format!(
            "Rounds    {} played, {} won ({:.1}%)",
            summary.rounds_played,
            summary.rounds_won,
            summary.round_win_rate()
        )),
        Line::raw(format!("Points    {}", report.rounds.total_points)),
        Line::raw(format!(
            "By type   {}",
            WinType::ALL
                .iter()
                .map(|win_type| format!("{} {}", win_type.label(), report.rounds.counts.total_for(*win_type)))
                .collect::<Vec<_>>()
                .join(" · ")
        )),
        Line::raw(""),
        Line::styled("Running totals", Style::default().fg(Color::DarkGray)),
        Line::styled(
            format!(
                "{} matches, {} won · {} rounds, {} won",
                cached.total_matches, cached.matches_won, cached.total_rounds, cached.rounds_won
            ),
            Style::default().fg(Color::DarkGray),
        ),
        Line::styled(
            Category::ALL
                .iter()
                .filter(|category| category.is_counted_in_cache())
                .map(|category| {
                    let count = cached.category_count(*category).unwrap_or(0);
                    format!("{} {}", category.code(), count)
                })
                .collect::<Vec<_>>()
                .join("  "),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Summary")),
        body[0],
    );

    let items = category_items(&report.rounds);
    frame.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title("Wins by type")),
        body[1],
    );

    render_footer(frame, layout[2], "Esc Back");
}

/// One row per category that has at least one win.
fn category_items(stats: &RoundStats) -> Vec<ListItem<'static>> {
    let items: Vec<ListItem> = Category::ALL
        .iter()
        .filter(|category| stats.count(**category) > 0)
        .map(|category| {
            ListItem::new(format!(
                "{:<18} {:>3}  {:>5.1}%  {:>4} pts",
                category.label(),
                stats.count(*category),
                stats.share(*category),
                stats.points_for(*category)
            ))
        })
        .collect();
    if items.is_empty() {
        vec![ListItem::new("no wins").style(Style::default().fg(Color::DarkGray))]
    } else {
        items
    }
}

/// Render the head-to-head comparison
fn render_head_to_head(frame: &mut Frame, player1: &Player, player2: &Player, stats: &HeadToHeadStats) {
    let layout = page_layout(frame.area());
    render_header(
        frame,
        layout[0],
        &format!(
            "{} {} - {} {}",
            player1.name, stats.player1_wins, stats.player2_wins, player2.name
        ),
    );

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(4)])
        .split(layout[1]);

    let overview = Paragraph::new(format!(
        "{} matches ({} unfinished) · {} rounds",
        stats.total_matches,
        stats.unfinished(),
        stats.total_rounds
    ))
    .style(Style::default().fg(Color::White))
    .alignment(Alignment::Center);
    frame.render_widget(overview, body[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(body[1]);

    for (column, player, rounds) in [
        (columns[0], player1, &stats.player1),
        (columns[1], player2, &stats.player2),
    ] {
        let title = format!(
            " {}: {} wins, {} pts ",
            player.name,
            rounds.counts.total(),
            rounds.total_points
        );
        frame.render_widget(
            List::new(category_items(rounds)).block(Block::default().borders(Borders::ALL).title(title)),
            column,
        );
    }

    render_footer(frame, layout[2], "Esc Back");
}

/// Render error screen
fn render_error(frame: &mut Frame, message: &str) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Percentage(40),
        ])
        .margin(2)
        .split(area);

    let error = Paragraph::new(format!("Error: {}", message))
        .style(Style::default().fg(Color::Red))
        .alignment(Alignment::Center);
    frame.render_widget(error, layout[1]);

    let hint = Paragraph::new("Press Esc to go back")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(hint, layout[2]);
}
