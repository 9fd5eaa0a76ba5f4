//! Human-readable sizes and durations.

use std::time::Duration;

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Formats a byte count with one decimal, e.g. `1.5MB`.
pub fn format_size(bytes: f64) -> String {
    let mut size = bytes.max(0.0);
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", size, UNITS[unit])
}

/// Formats a duration as `42s`, `3m 5s` or `1h 2m`.
pub fn format_time(duration: Duration) -> String {
    let seconds = duration.as_secs();
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m {}s", minutes, seconds % 60);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0.0), "0.0B");
        assert_eq!(format_size(512.0), "512.0B");
        assert_eq!(format_size(1536.0), "1.5KB");
        assert_eq!(format_size(5.0 * 1024.0 * 1024.0), "5.0MB");
        assert_eq!(format_size(3.0 * 1024.0 * 1024.0 * 1024.0), "3.0GB");
        // GB is the largest unit
        assert_eq!(format_size(2048.0 * 1024.0 * 1024.0 * 1024.0), "2048.0GB");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(Duration::from_secs(0)), "0s");
        assert_eq!(format_time(Duration::from_millis(42_900)), "42s");
        assert_eq!(format_time(Duration::from_secs(185)), "3m 5s");
        assert_eq!(format_time(Duration::from_secs(3720)), "1h 2m");
    }
}
