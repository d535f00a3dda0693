// Public modules
pub mod error;
pub mod logger;
pub mod utils;

// Re-exports
pub use error::{ChainError, ConfigError};
pub use logger::{init_logging, LoggerConfig};
pub use utils::{current_timestamp, current_timestamp_ms, format_duration, format_duration_ms};
