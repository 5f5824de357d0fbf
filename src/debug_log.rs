//! Debug logging for tracing config resolution and stats recomputes.
//!
//! Enable by setting environment variable: SNOWSTATS_DEBUG_LOG=1
//! Logs are written to snowstats-debug.log in the system temp directory.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);
static START_TIME: OnceLock<Instant> = OnceLock::new();
static LOG_FILE: OnceLock<std::sync::Mutex<std::fs::File>> = OnceLock::new();

pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("snowstats-debug.log")
}

/// Initialize debug logging. Call once at startup.
pub fn init() {
    if std::env::var("SNOWSTATS_DEBUG_LOG").is_err() {
        return;
    }

    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path())
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Could not open debug log {}: {e}", log_path().display());
            return;
        }
    };

    START_TIME.get_or_init(Instant::now);
    LOG_FILE.get_or_init(|| std::sync::Mutex::new(file));
    ENABLED.store(true, Ordering::SeqCst);
    log("DEBUG", "init", "Debug logging initialized");
}

/// Check if debug logging is enabled.
#[inline]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Log a debug message with timestamp and thread ID.
pub fn log(category: &str, action: &str, detail: &str) {
    if !is_enabled() {
        return;
    }

    let elapsed = START_TIME
        .get()
        .map(|s| s.elapsed().as_millis())
        .unwrap_or(0);
    let thread_id = std::thread::current().id();

    let msg = format!(
        "[{:>8}ms] [{:?}] [{}] {} - {}\n",
        elapsed, thread_id, category, action, detail
    );

    if let Some(file_mutex) = LOG_FILE.get()
        && let Ok(mut file) = file_mutex.lock()
    {
        let _ = file.write_all(msg.as_bytes());
        let _ = file.flush();
    }
}

/// Log a stats recompute with a lazily built detail string.
#[inline]
pub fn recompute(view: &str, detail: impl FnOnce() -> String) {
    if is_enabled() {
        log("STATS", view, &detail());
    }
}

/// RAII guard that logs elapsed time for a unit of work when dropped.
pub struct LogOnDrop {
    category: &'static str,
    action: String,
    started: Instant,
}

impl LogOnDrop {
    pub fn new(category: &'static str, action: String) -> Self {
        Self {
            category,
            action,
            started: Instant::now(),
        }
    }
}

impl Drop for LogOnDrop {
    fn drop(&mut self) {
        if is_enabled() {
            let detail = format!("done in {}us", self.started.elapsed().as_micros());
            log(self.category, &self.action, &detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_logging_is_silent() {
        // init() is never called in tests, so nothing should be written or panic.
        assert!(!is_enabled());
        log("TEST", "noop", "ignored");
        recompute("week", || panic!("detail must not be built when disabled"));
        let _guard = LogOnDrop::new("TEST", "guard".to_string());
    }
}
