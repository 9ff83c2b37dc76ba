//! Output filenames for transformed images.

use std::path::Path;

use chrono::{Local, NaiveDateTime};

use crate::constants::TIMESTAMP_FORMAT;

/// Current local time as `YYYYmmdd_HHMMSS`.
pub fn timestamp() -> String {
    format_timestamp(&Local::now().naive_local())
}

/// Formats a moment as `YYYYmmdd_HHMMSS`.
pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Builds `{prefix}_{base}_{timestamp}{ext}`, or `{prefix}_{timestamp}.jpg`
/// when there is no original name, using the current local time.
pub fn output_filename(original_name: Option<&str>, prefix: &str) -> String {
    output_filename_with_timestamp(original_name, prefix, &timestamp())
}

/// Same as [`output_filename`] with an explicit timestamp.
pub fn output_filename_with_timestamp(
    original_name: Option<&str>,
    prefix: &str,
    timestamp: &str,
) -> String {
    let Some(name) = original_name.filter(|name| !name.is_empty()) else {
        return format!("{prefix}_{timestamp}.jpg");
    };

    let path = Path::new(name);
    let base = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    format!("{prefix}_{base}_{timestamp}{ext}")
}
