//! Tavla - a terminal scorekeeper for backgammon matches
//!
//! Record who won each round and how, let the doubling cube multiply it,
//! and keep every match on disk for statistics later.

mod app;
mod config;
mod logs;
mod model;
mod scoring;
mod stats;
mod storage;
mod tui;

use app::AppCoordinator;
use config::Config;
use crossterm::event::{self, Event, KeyEventKind};
use std::error::Error;
use std::time::Duration;
use storage::Storage;
use tui::Tui;

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::load();
    let data_dir = config.data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    // The terminal is not ours yet, so a logging failure can still be reported
    if let Err(e) = logs::init_logger(&data_dir, config.log_level) {
        eprintln!("tavla: logging disabled: {}", e);
    }

    let storage = Storage::open(&data_dir)?;
    log::info!("tavla started, data in {}", data_dir.display());

    let mut coordinator = AppCoordinator::new(storage, config);

    let mut terminal = Tui::new()?;
    terminal.enter()?;

    let poll_rate = Duration::from_millis(250);

    loop {
        terminal.draw(|frame| tui::render(frame, &coordinator))?;

        if event::poll(poll_rate)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    coordinator.on_key(key.code);
                }
            }
        }

        if coordinator.should_quit {
            break;
        }
    }

    terminal.exit()?;
    log::info!("tavla closed");
    Ok(())
}
