//! Download progress line.

use super::format_size;

/// Render the progress line for `current` of `total` bytes.
///
/// Unknown or zero totals show the byte count only.
pub fn format_progress(current: u64, total: Option<u64>) -> String {
    match total.filter(|&t| t > 0) {
        Some(t) => {
            let pct = current.saturating_mul(100) / t;
            format!(
                "{} / {} ({}%)",
                format_size(current),
                format_size(t),
                pct.min(100)
            )
        }
        None => format_size(current),
    }
}
