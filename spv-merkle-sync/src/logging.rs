//! Logging setup.
//!
//! Console output goes to stderr. File output goes to `run.log` in the log
//! directory; the previous session's `run.log` is archived under a
//! timestamped name on startup and old archives are pruned.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{LoggingError, LoggingResult};

const ARCHIVE_PREFIX: &str = "merkle-sync.";
const ARCHIVE_SUFFIX: &str = ".log";
const ACTIVE_LOG_NAME: &str = "run.log";
const ARCHIVE_TIME_FORMAT: &str = "%Y-%m-%d.%H%M%S";

/// Keeps the file writer alive. Buffered entries are flushed when dropped.
#[derive(Debug)]
pub struct LoggingGuard {
    _worker_guard: Option<WorkerGuard>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level filter. `None` reads `RUST_LOG`, falling back to INFO.
    pub level: Option<LevelFilter>,
    /// Log to stderr.
    pub console: bool,
    pub file: Option<LogFileConfig>,
}

#[derive(Debug, Clone)]
pub struct LogFileConfig {
    pub log_dir: PathBuf,
    /// Archived logs kept besides `run.log`.
    pub max_files: usize,
}

/// Console-only logging at `level`.
pub fn init_console_logging(level: LevelFilter) -> LoggingResult<LoggingGuard> {
    init_logging(LoggingConfig {
        level: Some(level),
        console: true,
        file: None,
    })
}

/// Install the global tracing subscriber.
///
/// With neither console nor file output nothing is installed and the tracing
/// macros stay no-ops.
///
/// ```no_run
/// use spv_merkle_sync::logging::{init_logging, LogFileConfig, LoggingConfig};
/// use spv_merkle_sync::LevelFilter;
///
/// let _guard = init_logging(LoggingConfig {
///     level: Some(LevelFilter::DEBUG),
///     console: false,
///     file: Some(LogFileConfig {
///         log_dir: "./merkle-sync-storage/logs".into(),
///         max_files: 10,
///     }),
/// })
/// .unwrap();
/// ```
pub fn init_logging(config: LoggingConfig) -> LoggingResult<LoggingGuard> {
    if !config.console && config.file.is_none() {
        return Ok(LoggingGuard {
            _worker_guard: None,
        });
    }

    let filter = match config.level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LevelFilter::INFO.to_string())),
    };

    let (writer, worker_guard) = match &config.file {
        Some(file_config) => {
            let (writer, guard) = LogDirectory::new(file_config).prepare()?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };
    let file_layer = writer.map(|writer| fmt::layer().with_ansi(false).with_writer(writer));
    let console_layer = config.console.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::SubscriberInit(e.to_string()))?;

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
    })
}

/// A log directory holding `run.log` and its archives.
struct LogDirectory<'a> {
    dir: &'a Path,
    max_files: usize,
}

impl<'a> LogDirectory<'a> {
    fn new(config: &'a LogFileConfig) -> Self {
        Self {
            dir: &config.log_dir,
            max_files: config.max_files,
        }
    }

    /// Archive the last session's log, prune, and open a fresh `run.log`.
    fn prepare(&self) -> LoggingResult<(NonBlocking, WorkerGuard)> {
        fs::create_dir_all(self.dir)?;
        self.archive_active()?;
        self.prune_archives()?;

        let file = File::create(self.active_path())?;
        Ok(tracing_appender::non_blocking(file))
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(ACTIVE_LOG_NAME)
    }

    /// Rename `run.log` to `merkle-sync.<mtime>.log`, adding a counter on
    /// name clashes.
    fn archive_active(&self) -> LoggingResult<()> {
        let active = self.active_path();
        if !active.exists() {
            return Ok(());
        }

        let stamp =
            modified_at(&active).unwrap_or_else(Local::now).format(ARCHIVE_TIME_FORMAT).to_string();
        let numbered =
            (1..=999).map(|n| format!("{}{}-{}{}", ARCHIVE_PREFIX, stamp, n, ARCHIVE_SUFFIX));
        let target = std::iter::once(format!("{}{}{}", ARCHIVE_PREFIX, stamp, ARCHIVE_SUFFIX))
            .chain(numbered)
            .map(|name| self.dir.join(name))
            .find(|path| !path.exists())
            .ok_or_else(|| {
                LoggingError::RotationFailed(format!("no free archive name for {}", stamp))
            })?;

        fs::rename(&active, &target).map_err(|e| {
            LoggingError::RotationFailed(format!("renaming to {}: {}", target.display(), e))
        })
    }

    /// Delete the oldest archives beyond `max_files`.
    fn prune_archives(&self) -> LoggingResult<()> {
        let entries = fs::read_dir(self.dir).map_err(|e| {
            LoggingError::RotationFailed(format!("cannot list {}: {}", self.dir.display(), e))
        })?;

        let mut archives: Vec<(Option<std::time::SystemTime>, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_str().is_some_and(is_archive_name))
            .map(|entry| (entry.metadata().and_then(|m| m.modified()).ok(), entry.path()))
            .collect();

        if archives.len() <= self.max_files {
            return Ok(());
        }

        archives.sort();
        let excess = archives.len() - self.max_files;
        for (_, path) in archives.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove old log {}: {}", path.display(), e);
            }
        }
        Ok(())
    }
}

fn is_archive_name(name: &str) -> bool {
    name.starts_with(ARCHIVE_PREFIX) && name.ends_with(ARCHIVE_SUFFIX)
}

fn modified_at(path: &Path) -> Option<DateTime<Local>> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    fn archives_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| is_archive_name(name))
            .collect();
        names.sort();
        names
    }

    fn write_archives(dir: &Path, count: u32) {
        for day in 1..=count {
            let path = dir.join(format!("merkle-sync.2026-03-{:02}.080000.log", day));
            let mut file = File::create(path).unwrap();
            writeln!(file, "session {}", day).unwrap();
            drop(file);
            std::thread::sleep(Duration::from_millis(15));
        }
    }

    fn log_dir(dir: &Path, max_files: usize) -> LogFileConfig {
        LogFileConfig {
            log_dir: dir.to_path_buf(),
            max_files,
        }
    }

    #[test]
    fn test_archive_without_active_log_is_noop() {
        let temp = TempDir::new().unwrap();
        let config = log_dir(temp.path(), 5);
        LogDirectory::new(&config).archive_active().unwrap();
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_archive_keeps_contents() {
        let temp = TempDir::new().unwrap();
        let config = log_dir(temp.path(), 5);
        fs::write(temp.path().join(ACTIVE_LOG_NAME), "INFO Queued 2000 merkle blocks\n").unwrap();

        LogDirectory::new(&config).archive_active().unwrap();

        assert!(!temp.path().join(ACTIVE_LOG_NAME).exists());
        let archives = archives_in(temp.path());
        assert_eq!(archives.len(), 1);
        let content = fs::read_to_string(temp.path().join(&archives[0])).unwrap();
        assert!(content.contains("Queued 2000 merkle blocks"));
    }

    #[test]
    fn test_archive_name_clash_gets_counter() {
        let temp = TempDir::new().unwrap();
        let config = log_dir(temp.path(), 5);
        let active = temp.path().join(ACTIVE_LOG_NAME);
        fs::write(&active, "second session").unwrap();

        let stamp = modified_at(&active).unwrap().format(ARCHIVE_TIME_FORMAT).to_string();
        let taken = format!("{}{}{}", ARCHIVE_PREFIX, stamp, ARCHIVE_SUFFIX);
        fs::write(temp.path().join(&taken), "first session").unwrap();

        LogDirectory::new(&config).archive_active().unwrap();

        let archives = archives_in(temp.path());
        assert_eq!(archives.len(), 2);
        assert!(archives.contains(&format!("{}{}-1{}", ARCHIVE_PREFIX, stamp, ARCHIVE_SUFFIX)));
    }

    #[test]
    fn test_prune_keeps_newest() {
        let temp = TempDir::new().unwrap();
        write_archives(temp.path(), 6);
        let config = log_dir(temp.path(), 2);

        LogDirectory::new(&config).prune_archives().unwrap();

        assert_eq!(
            archives_in(temp.path()),
            vec!["merkle-sync.2026-03-05.080000.log", "merkle-sync.2026-03-06.080000.log"]
        );
    }

    #[test]
    fn test_prune_leaves_other_files_alone() {
        let temp = TempDir::new().unwrap();
        write_archives(temp.path(), 3);
        File::create(temp.path().join(ACTIVE_LOG_NAME)).unwrap();
        File::create(temp.path().join("notes.txt")).unwrap();
        File::create(temp.path().join("merkle-sync.bak")).unwrap();
        let config = log_dir(temp.path(), 0);

        LogDirectory::new(&config).prune_archives().unwrap();

        assert!(archives_in(temp.path()).is_empty());
        assert!(temp.path().join(ACTIVE_LOG_NAME).exists());
        assert!(temp.path().join("notes.txt").exists());
        assert!(temp.path().join("merkle-sync.bak").exists());
    }

    #[test]
    fn test_prepare_creates_directory_and_rotates() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("logs");
        fs::create_dir_all(&dir).unwrap();
        write_archives(&dir, 3);
        fs::write(dir.join(ACTIVE_LOG_NAME), "previous session").unwrap();
        let config = log_dir(&dir, 2);

        let (_writer, _guard) = LogDirectory::new(&config).prepare().unwrap();

        assert_eq!(archives_in(&dir).len(), 2);
        assert_eq!(fs::read_to_string(dir.join(ACTIVE_LOG_NAME)).unwrap(), "");
    }

    #[test]
    fn test_prepare_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("logs");
        let config = log_dir(&dir, 2);

        let (_writer, _guard) = LogDirectory::new(&config).prepare().unwrap();

        assert!(dir.join(ACTIVE_LOG_NAME).exists());
    }

    #[test]
    fn test_init_without_outputs_is_noop() {
        let guard = init_logging(LoggingConfig {
            level: Some(LevelFilter::INFO),
            console: false,
            file: None,
        });
        assert!(guard.is_ok());
    }
}
