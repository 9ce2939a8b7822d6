//! Diagnostic trace of merge passes and result delivery.
//!
//! Enable by setting environment variable: CHATFOLD_DEBUG_LOG=1
//! Logs are written to /tmp/chatfold-debug.log

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

const LOG_PATH: &str = "/tmp/chatfold-debug.log";

static ENABLED: AtomicBool = AtomicBool::new(false);
static START_TIME: OnceLock<Instant> = OnceLock::new();
static LOG_FILE: OnceLock<std::sync::Mutex<std::fs::File>> = OnceLock::new();

/// Initialize debug logging. Call once at startup.
pub fn init() {
    if std::env::var("CHATFOLD_DEBUG_LOG").is_err() {
        return;
    }

    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(LOG_PATH)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Could not open debug log {LOG_PATH}: {e}");
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

/// RAII guard that logs the elapsed time of a pass when dropped.
pub struct PassTimer {
    name: &'static str,
    started: Instant,
}

impl PassTimer {
    pub fn start(name: &'static str) -> Self {
        if is_enabled() {
            log("PASS", "START", name);
        }
        Self {
            name,
            started: Instant::now(),
        }
    }
}

impl Drop for PassTimer {
    fn drop(&mut self) {
        if is_enabled() {
            let detail = format!("{} in {:?}", self.name, self.started.elapsed());
            log("PASS", "FINISH", &detail);
        }
    }
}
