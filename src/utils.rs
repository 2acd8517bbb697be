use chrono::{DateTime, Local};
use std::ffi::OsStr;
use std::time::SystemTime;

/// True if `file_name` starts with `prefix`, compared as raw bytes so that
/// non-UTF-8 names still match.
pub fn has_prefix(file_name: &OsStr, prefix: &str) -> bool {
    file_name.as_encoded_bytes().starts_with(prefix.as_bytes())
}

/// Format byte size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes < THRESHOLD {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    format!("{size:.1} {}", UNITS[unit_index])
}

/// Format a modification time in local time
pub fn format_modified(time: SystemTime) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}
