//! Number and text formatting utilities.
//!
//! Shared by the command summaries and the resolver log messages.

use std::time::Duration;

/// Formats a number with comma separators for thousands.
///
/// # Examples
///
/// ```
/// use ip_context_tools::utils::format::format_number;
///
/// assert_eq!(format_number(1234), "1,234");
/// assert_eq!(format_number(1234567), "1,234,567");
/// assert_eq!(format_number(42), "42");
/// ```
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a sleep duration for log output, e.g. `61.25s`.
pub fn format_wait(wait: Duration) -> String {
    format!("{:.2}s", wait.as_secs_f64())
}
