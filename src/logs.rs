//! File logging through log4rs

use log::LevelFilter;
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};
use std::path::{Path, PathBuf};

pub const LOG_FILE: &str = "tavla.log";

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}";

#[derive(Debug, thiserror::Error)]
pub enum LogInitError {
    #[error("cannot open log file: {0}")]
    File(#[from] std::io::Error),
    #[error("invalid logger config: {0}")]
    Config(#[from] log4rs::config::runtime::ConfigErrors),
    #[error("logger already set: {0}")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Log to `tavla.log` in `data_dir`. The terminal belongs to the UI, so
/// nothing goes to stderr.
pub fn init_logger(data_dir: &Path, level: LevelFilter) -> Result<PathBuf, LogInitError> {
    let file_path = data_dir.join(LOG_FILE);

    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(&file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(Root::builder().appender("logfile").build(level))?;

    log4rs::init_config(config)?;
    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_creates_file_in_data_dir() {
        let dir = std::env::temp_dir().join(format!("tavla-logs-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let path = init_logger(&dir, LevelFilter::Info).unwrap();
        assert_eq!(path, dir.join(LOG_FILE));
        assert!(path.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
