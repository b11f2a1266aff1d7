//! File logging for a sheetsort run.
//!
//! Every run writes a fresh `<root>/logs/<file>`. Records are formatted as
//! `<timestamp> <LEVEL> [<target>] <message>`, except the workbook diff
//! lines (target `display`) which are written bare.

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use env_logger::{Builder, Env, Target};
use sheetsort_engine::diff::DISPLAY_TARGET;

pub const LOG_DIR: &str = "logs";

#[derive(Debug)]
pub enum LoggingError {
    Create { path: PathBuf, message: String },
    /// A logger was already installed
    Install(String),
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggingError::Create { path, message } => {
                write!(f, "cannot create log file {}: {}", path.display(), message)
            }
            LoggingError::Install(e) => write!(f, "cannot install logger: {}", e),
        }
    }
}

impl std::error::Error for LoggingError {}

/// `<root>/logs/<file_name>`
pub fn log_file_path(root: &Path, file_name: &str) -> PathBuf {
    root.join(LOG_DIR).join(file_name)
}

/// Install the global logger writing to `<root>/logs/<file_name>`.
/// Level comes from RUST_LOG, defaulting to info.
pub fn init_file_logging(root: &Path, file_name: &str) -> Result<PathBuf, LoggingError> {
    let path = log_file_path(root, file_name);
    let create_error = |e: std::io::Error| LoggingError::Create {
        path: path.clone(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(create_error)?;
    }
    let file = File::create(&path).map_err(create_error)?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            if record.target() == DISPLAY_TARGET {
                writeln!(buf, "{}", record.args())
            } else {
                writeln!(
                    buf,
                    "{} {:<5} [{}] {}",
                    buf.timestamp_millis(),
                    record.level(),
                    record.target(),
                    record.args()
                )
            }
        })
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        assert_eq!(
            log_file_path(Path::new("/srv/sort"), "run.log"),
            PathBuf::from("/srv/sort/logs/run.log")
        );
        assert_eq!(log_file_path(Path::new("."), "a.log"), PathBuf::from("./logs/a.log"));
    }

    #[test]
    fn test_unwritable_root_is_create_error() {
        let dir = tempfile::TempDir::new().unwrap();
        // a file where the logs directory should be
        let root = dir.path().join("root");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(LOG_DIR), "not a dir").unwrap();

        let err = init_file_logging(&root, "run.log").unwrap_err();
        assert!(matches!(err, LoggingError::Create { .. }), "{}", err);
    }
}
