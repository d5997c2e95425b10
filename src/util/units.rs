//! Units parsing and conversion utilities
//!
//! Size strings such as `"128MB"` or `"1.5 gb"` are converted to byte
//! counts using binary (1024-based) multipliers, and byte rates are
//! converted to MB/s for reporting.

use crate::{BenchError, Result};

const MIB: f64 = 1_048_576.0;

/// Parse a human-readable size string into bytes
///
/// Accepts `<number>[<unit>]` with an optional single space before the
/// unit. Units are B, KB, MB, GB and TB (case-insensitive), each a power
/// of 1024. A missing unit means bytes. Fractional bytes are truncated.
///
/// # Examples
/// ```
/// use monkeytest::util::units::parse_size;
///
/// assert_eq!(parse_size("128MB").unwrap(), 134217728);
/// assert_eq!(parse_size("1.5 GB").unwrap(), 1610612736);
/// assert_eq!(parse_size("1000").unwrap(), 1000);
/// ```
pub fn parse_size(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let unrecognized = || BenchError::ConfigError(format!("Unrecognized size format: {:?}", input));

    let number_end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number_part, rest) = trimmed.split_at(number_end);

    if !is_decimal(number_part) {
        return Err(unrecognized());
    }

    let unit_part = rest.strip_prefix(' ').unwrap_or(rest);
    let multiplier: u64 = match unit_part.to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1 << 10,
        "MB" => 1 << 20,
        "GB" => 1 << 30,
        "TB" => 1 << 40,
        _ => return Err(unrecognized()),
    };

    let number: f64 = number_part.parse().map_err(|_| unrecognized())?;
    let bytes = (number * multiplier as f64).trunc();
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(BenchError::ConfigError(format!("Size too large: {:?}", input)));
    }

    Ok(bytes as u64)
}

/// `\d+(\.\d+)?`
fn is_decimal(s: &str) -> bool {
    let mut parts = s.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());

    match parts.next() {
        Some(frac) => all_digits(int_part) && all_digits(frac),
        None => all_digits(int_part),
    }
}

/// Convert a byte count (or bytes per second) to MiB (or MiB/s)
pub fn bytes_to_mb(bytes: f64) -> f64 {
    bytes / MIB
}

/// Round `value` to `ndigits` decimal places
///
/// # Examples
/// ```
/// use monkeytest::util::units::round_to;
///
/// assert_eq!(round_to(3.14159, 2), 3.14);
/// assert_eq!(round_to(127.6, 0), 128.0);
/// ```
pub fn round_to(value: f64, ndigits: i32) -> f64 {
    let factor = 10f64.powi(ndigits);
    (value * factor).round() / factor
}

/// Format bytes into human-readable size with appropriate units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
