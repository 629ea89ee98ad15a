use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use anyhow::Context;
use tokio::task;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

/// Keeps the file writer flushing; hold it until the process exits.
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Lower-cased `level` if it is a known level name, `None` otherwise
pub fn normalize_level(level: &str) -> Option<String> {
    let level = level.trim().to_lowercase();
    LEVELS.contains(&level.as_str()).then_some(level)
}

/// Log to a daily file under `log_dir` and to stderr. Stdout belongs to the
/// console table.
pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let (level, invalid) = match normalize_level(level) {
        Some(level) => (level, false),
        None => ("info".to_string(), true),
    };

    let builder = EnvFilter::builder()
        .with_default_directive(level.parse().context("Invalid log level directive")?);

    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| format!("Failed to create log file appender in {}", log_dir.display()))?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Logging was already initialized")?;

    if invalid {
        tracing::warn!("Invalid log level, defaulting to 'info'");
    }

    start_log_cleanup_task(log_dir, prefix.to_string());

    Ok(LoggerGuard(guard))
}

fn start_log_cleanup_task(log_dir: PathBuf, prefix: String) {
    const MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 7);
    const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

    task::spawn(async move {
        loop {
            if let Err(e) = cleanup_old_logs(&log_dir, &prefix, MAX_AGE) {
                tracing::warn!("Failed to delete old log file: {}", e);
            }
            tokio::time::sleep(CLEANUP_INTERVAL).await;
        }
    });
}

/// Remove `<prefix>*.log` files older than `max_age`. Returns how many went.
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.starts_with(prefix) || !file_name.ends_with(".log") {
            continue;
        }

        let modified = fs::metadata(&path)?.modified()?;
        if now.duration_since(modified).unwrap_or_default() > max_age {
            fs::remove_file(&path)?;
            tracing::info!("Old log file deleted: {}", file_name);
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level("DEBUG").as_deref(), Some("debug"));
        assert_eq!(normalize_level(" warn ").as_deref(), Some("warn"));
        assert_eq!(normalize_level("verbose"), None);
    }

    #[test]
    fn test_cleanup_only_touches_matching_files() {
        let dir = std::env::temp_dir().join(format!("hamlog-logs-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("hamlog-frontend.2026-10-01.log"), "old").unwrap();
        fs::write(dir.join("other.2026-10-01.log"), "keep").unwrap();

        // Everything is older than zero seconds
        std::thread::sleep(Duration::from_millis(20));
        let removed = cleanup_old_logs(&dir, "hamlog-frontend", Duration::ZERO).unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.join("hamlog-frontend.2026-10-01.log").exists());
        assert!(dir.join("other.2026-10-01.log").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
