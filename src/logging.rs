//! Logging for the subfetch application
//!
//! Records go through the `log` facade. Each record is printed to the
//! console by `env_logger` and handed to a background thread that appends it
//! to the log file without blocking the caller.

use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Mutex;

use env_logger::Env;
use log::{LevelFilter, Log, Metadata, Record};

/// Entries written per flush of the file buffer
const FLUSH_BATCH: usize = 10;

/// Asynchronous logger that writes to file without blocking the main thread
pub struct AsyncLogger {
    sender: mpsc::Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<()>>,
}

/// Messages understood by the file thread
pub enum LogMessage {
    Entry(String),
    Shutdown,
}

impl AsyncLogger {
    /// Create a logger appending to the platform log file
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_path(log_file_path()?)
    }

    /// Create a logger appending to `path`
    pub fn with_path(path: PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let log_file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
        let (tx, rx) = mpsc::channel();

        let handle = std::thread::spawn(move || {
            let mut file = std::io::BufWriter::new(log_file);
            let mut pending = 0usize;

            // recv fails once every sender is gone, which ends the thread as well
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Entry(entry) => {
                        let _ = writeln!(file, "{}", entry);
                        pending += 1;
                        if pending >= FLUSH_BATCH {
                            let _ = file.flush();
                            pending = 0;
                        }
                    }
                    LogMessage::Shutdown => break,
                }
            }
            let _ = file.flush();
        });

        Ok(AsyncLogger { sender: tx, handle: Some(handle) })
    }

    /// Queue one formatted entry
    pub fn log(&self, entry: String) {
        let _ = self.sender.send(LogMessage::Entry(entry));
    }

    /// Gracefully shutdown the logger
    pub fn shutdown(mut self) {
        let _ = self.sender.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Where the log file lives
fn log_file_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    #[cfg(windows)]
    {
        let exe_path = std::env::current_exe()?;
        let exe_dir = exe_path.parent().ok_or("Failed to get executable directory")?;
        Ok(exe_dir.join("subfetch_log.txt"))
    }

    #[cfg(not(windows))]
    {
        let app_dir = match xdg::BaseDirectories::new() {
            Ok(xdg_dirs) => xdg_dirs.get_cache_home().join("subfetch"),
            Err(_) => dirs::home_dir().ok_or("Failed to get home directory")?.join(".subfetch"),
        };
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("subfetch.log"))
    }
}

/// Format one record for the log file
pub fn format_entry(record: &Record<'_>) -> String {
    format!(
        "[{} {} {}] {}",
        record.level(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        record.target(),
        record.args()
    )
}

// Global file logger
pub(crate) static LOGGER: Mutex<Option<AsyncLogger>> = Mutex::new(None);

/// Console output plus the file thread
struct AppLogger {
    console: env_logger::Logger,
    file_level: LevelFilter,
}

impl Log for AppLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.console.enabled(metadata) || metadata.level() <= self.file_level
    }

    fn log(&self, record: &Record<'_>) {
        if self.console.matches(record) {
            self.console.log(record);
        }
        if record.level() <= self.file_level {
            if let Ok(guard) = LOGGER.lock() {
                if let Some(logger) = &*guard {
                    logger.log(format_entry(record));
                }
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
    }
}

/// Console filter used when `RUST_LOG` is unset
fn default_console_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initialize the global logging system
///
/// The console shows info and above by default (`RUST_LOG` overrides it,
/// `verbose` raises it to debug); the file always receives info and above,
/// or debug when verbose.
pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let console =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_console_filter(verbose))).build();
    let file_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    match AsyncLogger::new() {
        Ok(file_logger) => {
            let mut guard = LOGGER.lock().map_err(|e| format!("Failed to lock logger: {}", e))?;
            *guard = Some(file_logger);
        }
        Err(e) => eprintln!("Failed to open the log file: {}", e),
    }

    let max_level = console.filter().max(file_level);
    log::set_boxed_logger(Box::new(AppLogger { console, file_level }))?;
    log::set_max_level(max_level);
    Ok(())
}

/// Flush and stop the file thread
pub fn shutdown_logging() {
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(logger) = guard.take() {
            logger.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_console_shows_info_notices_by_default() {
        assert_eq!(default_console_filter(false), "info");
        assert_eq!(default_console_filter(true), "debug");
    }

    #[test]
    fn test_async_logger_writes_entries_on_shutdown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");
        let logger = AsyncLogger::with_path(path.clone()).unwrap();
        logger.log("[INFO now subfetch] first".to_string());
        logger.log("[WARN now subfetch] second".to_string());
        logger.shutdown();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[INFO now subfetch] first\n[WARN now subfetch] second\n");
    }

    #[test]
    fn test_async_logger_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");
        std::fs::write(&path, "earlier\n").unwrap();
        let logger = AsyncLogger::with_path(path.clone()).unwrap();
        logger.log("later".to_string());
        logger.shutdown();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
    }

    #[test]
    fn test_entry_format() {
        let entry = format_entry(
            &Record::builder()
                .level(log::Level::Warn)
                .target("subfetch::search")
                .args(format_args!("Search failed"))
                .build(),
        );
        assert!(entry.starts_with("[WARN "));
        assert!(entry.ends_with(" subfetch::search] Search failed"));
    }
}
