use std::sync::LazyLock;
use std::time::{Duration, Instant};
use unicode_normalization::UnicodeNormalization;

/// Format a `Duration` as a human-readable string with automatic unit scaling.
///
/// Produces output like `1.94ms`, `2.34s`, `150.00µs` using Rust's Debug format.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Log a warning if the elapsed time since `start` exceeds `threshold`.
pub fn log_if_slow(start: Instant, threshold: Duration, label: &str) {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        tracing::warn!(duration = fmt_duration(elapsed), "slow operation: {label}");
    }
}

/// Windows reserves these names regardless of extension.
const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3",
];

/// Reduce an arbitrary client-supplied filename to a flat, ASCII-only name
/// that is safe to join onto an upload directory.
///
/// Accents are decomposed and dropped, path separators become spaces,
/// whitespace runs become `_`, and anything outside `[A-Za-z0-9_.-]` is
/// removed. Leading/trailing dots and underscores are stripped so the result
/// can never be `..` or a hidden file. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    static STRIP_RE: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

    let ascii: String = filename.nfkd().filter(char::is_ascii).collect();
    let flattened = ascii.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let mut cleaned = STRIP_RE
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string();

    let stem = cleaned.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if WINDOWS_DEVICE_NAMES.contains(&stem.as_str()) {
        cleaned.insert(0, '_');
    }
    cleaned
}

/// Returns the lowercased extension if it is one of the accepted photo types.
pub fn allowed_image_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    matches!(ext.as_str(), "png" | "jpg" | "jpeg").then_some(ext)
}
