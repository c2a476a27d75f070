//! Locale-independent number formatting for the text reports.
//!
//! Fixed-point values round half-up on their shortest decimal
//! representation, so `0.125` prints as `0.13` at two places.

use crate::utils::config::INDENT_CHARS;

const BYTE_UNITS: &[u8] = b"KMGTPE";

/// Byte count scaled by powers of 1024, one decimal place
///
/// # Example
/// ```ignore
/// assert_eq!(human_readable_bytes(752), "752 B");
/// assert_eq!(human_readable_bytes(1536), "1.5 KiB");
/// ```
pub fn human_readable_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes;
    let mut unit = 0;
    let mut shift: i32 = 40;
    while shift >= 0 && bytes > 0x0fff_cccc_cccc_cccc_u64 >> shift {
        value >>= 10;
        unit += 1;
        shift -= 10;
    }

    format!(
        "{} {}iB",
        format_fixed(value as f64 / 1024.0, 1),
        BYTE_UNITS[unit] as char
    )
}

/// Integer with `,` between groups of three digits
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// `value` with exactly `decimals` fractional digits, rounded half-up
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let shortest = format!("{}", value.abs());
    let (int_part, frac_part) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));

    let mut digits: Vec<u8> = int_part.bytes().collect();
    let kept = frac_part.len().min(decimals);
    digits.extend(frac_part.bytes().take(kept));
    digits.extend(std::iter::repeat(b'0').take(decimals - kept));

    let round_up = frac_part
        .as_bytes()
        .get(decimals)
        .map_or(false, |&d| d >= b'5');
    if round_up {
        increment(&mut digits);
    }

    let split = digits.len() - decimals;
    let mut out = String::with_capacity(digits.len() + 2);
    if value.is_sign_negative() && digits.iter().any(|&d| d != b'0') {
        out.push('-');
    }
    out.push_str(std::str::from_utf8(&digits[..split]).unwrap_or("0"));
    if decimals > 0 {
        out.push('.');
        out.push_str(std::str::from_utf8(&digits[split..]).unwrap_or("0"));
    }
    out
}

fn increment(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

/// Tree prefix for a row at `depth`: `   |  |  +--`
pub fn indent(depth: usize) -> String {
    if depth == 0 {
        return String::new();
    }

    let mut out = " ".repeat(INDENT_CHARS);
    for _ in 1..depth {
        out.push('|');
        out.push_str(&" ".repeat(INDENT_CHARS - 1));
    }
    out.push('+');
    out.push_str(&"-".repeat(INDENT_CHARS - 1));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_readable_small_values() {
        assert_eq!(human_readable_bytes(0), "0 B");
        assert_eq!(human_readable_bytes(32), "32 B");
        assert_eq!(human_readable_bytes(1023), "1023 B");
    }

    #[test]
    fn test_human_readable_scaled_values() {
        assert_eq!(human_readable_bytes(1024), "1.0 KiB");
        assert_eq!(human_readable_bytes(1536), "1.5 KiB");
        assert_eq!(human_readable_bytes(1_048_576), "1.0 MiB");
        assert_eq!(human_readable_bytes(1_073_741_824), "1.0 GiB");
    }

    #[test]
    fn test_human_readable_switches_before_full_unit() {
        assert_eq!(human_readable_bytes(1_048_524), "1023.9 KiB");
        assert_eq!(human_readable_bytes(1_048_525), "1.0 MiB");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(752), "752");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_fixed_rounds_half_up() {
        assert_eq!(format_fixed(0.125, 2), "0.13");
        assert_eq!(format_fixed(96.7741935483871, 2), "96.77");
        assert_eq!(format_fixed(99.995, 2), "100.00");
        assert_eq!(format_fixed(100.0, 2), "100.00");
        assert_eq!(format_fixed(0.0, 2), "0.00");
        assert_eq!(format_fixed(0.234375, 1), "0.2");
    }

    #[test]
    fn test_format_fixed_infinity() {
        assert_eq!(format_fixed(f64::INFINITY, 2), "Infinity");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(1), "   +--");
        assert_eq!(indent(3), "   |  |  +--");
    }
}
