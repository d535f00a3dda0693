use std::time::Duration;

/// Timestamp hiện tại (giây)
pub fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Timestamp hiện tại (milliseconds)
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Chuyển milliseconds thành chuỗi dễ đọc
pub fn format_duration_ms(millis: u64) -> String {
    let seconds = millis / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours % 24, minutes % 60, seconds % 60)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else if seconds > 0 {
        format!("{}s", seconds)
    } else {
        format!("{}ms", millis)
    }
}

pub fn format_duration(duration: Duration) -> String {
    format_duration_ms(duration.as_millis().min(u64::MAX as u128) as u64)
}
