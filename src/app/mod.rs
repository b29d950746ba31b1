//! Application state and core logic

pub mod screen;
pub mod session;

pub use screen::{AppCoordinator, FormField, HistoryEntry, MenuOption, NewMatchForm, PickPurpose, Screen};
