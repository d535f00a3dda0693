// Standard library imports
use std::path::{Path, PathBuf};

// Third party imports
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

/// Cấu hình logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Thư mục chứa file log
    pub log_dir: PathBuf,
    /// Tên file log (được xoay vòng theo ngày)
    pub file_name: String,
    /// Filter mặc định khi không có RUST_LOG
    pub default_filter: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_name: "snipebot.log".to_string(),
            default_filter: "info".to_string(),
        }
    }
}

impl LoggerConfig {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Khởi tạo tracing: stderr có màu + file log xoay vòng hằng ngày.
///
/// Guard trả về phải được giữ tới khi chương trình kết thúc, nếu không các
/// dòng log cuối trong file sẽ bị mất.
pub fn init_logging(config: &LoggerConfig) -> Result<WorkerGuard> {
    ensure_dir(&config.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &config.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(config.filter())
        .with(
            fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(
            fmt::Layer::new()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE),
        )
        .try_init()
        .context("tracing subscriber already initialised")?;

    tracing::info!(
        log_dir = %config.log_dir.display(),
        file = %config.file_name,
        "Logging initialized"
    );
    Ok(guard)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    }
    Ok(())
}

/// Module tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_config_default() {
        let config = LoggerConfig::default();
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.file_name, "snipebot.log");
        assert_eq!(config.default_filter, "info");
    }

    #[test]
    fn test_ensure_dir_creates_nested_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("logs");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Gọi lần hai không lỗi
        ensure_dir(&nested).unwrap();
    }
}
