const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Render a byte count with a base-1024 unit and two decimals, e.g. `1.00 KB`.
pub fn humanize_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

/// Render an elapsed duration the way the "last index" report phrases it.
pub fn format_age(secs: i64) -> String {
    if secs < 60 {
        return "just now".to_string();
    }
    let minutes = secs / 60;
    if minutes < 60 {
        return format!("{minutes} minutes ago");
    }
    let hours = minutes / 60;
    if hours < 48 {
        return format!("{hours} hours ago");
    }
    format!("{} days ago", hours / 24)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_units() {
        assert_eq!(humanize_file_size(0), "0.00 B");
        assert_eq!(humanize_file_size(1023), "1023.00 B");
        assert_eq!(humanize_file_size(1024), "1.00 KB");
        assert_eq!(humanize_file_size(1536), "1.50 KB");
        assert_eq!(humanize_file_size(5_000_000), "4.77 MB");
        assert_eq!(humanize_file_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_humanize_caps_at_terabytes() {
        assert_eq!(humanize_file_size(2048 * 1024u64.pow(4)), "2048.00 TB");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(5), "just now");
        assert_eq!(format_age(61), "1 minutes ago");
        assert_eq!(format_age(3 * 3600), "3 hours ago");
        assert_eq!(format_age(72 * 3600), "3 days ago");
    }
}
