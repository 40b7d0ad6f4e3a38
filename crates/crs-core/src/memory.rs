//! Memory size specs, always normalised to megabytes.

use crate::error::ParseError;

pub const MB_PER_GB: u64 = 1024;

/// Parse a memory spec (`4G`, `512M`, `1024`) into megabytes.
///
/// Unit suffixes are case-insensitive. A bare number is already in MB.
pub fn parse_memory_mb(spec: &str) -> Result<u64, ParseError> {
    let normalized = spec.trim().to_ascii_uppercase();

    let (number, multiplier) = if let Some(prefix) = normalized.strip_suffix('G') {
        (prefix, MB_PER_GB)
    } else if let Some(prefix) = normalized.strip_suffix('M') {
        (prefix, 1)
    } else {
        (normalized.as_str(), 1)
    };

    let number = number.trim();
    let value: u64 = number
        .parse()
        .map_err(|_| ParseError::memory(spec, format!("'{number}' is not a whole number")))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| ParseError::memory(spec, "size overflows"))
}

/// Format megabytes with the largest exact unit (`4096` → `4G`, `1536` → `1536M`).
pub fn format_memory(mb: u64) -> String {
    if mb > 0 && mb % MB_PER_GB == 0 {
        format!("{}G", mb / MB_PER_GB)
    } else {
        format!("{mb}M")
    }
}
