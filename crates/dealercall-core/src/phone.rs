//! Phone number validation and formatting
//!
//! All functions work on the digits of the input only; punctuation,
//! spaces and a leading `+` are ignored.

/// Minimum digit count for a dialable number
pub const MIN_DIGITS: usize = 10;
/// Maximum digit count (E.164 limit)
pub const MAX_DIGITS: usize = 15;

/// Strip everything that is not an ASCII digit
pub fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A number is valid when it has between 10 and 15 digits
pub fn validate(raw: &str) -> bool {
    (MIN_DIGITS..=MAX_DIGITS).contains(&digits(raw).len())
}

/// Format a number for display
///
/// - 10 digits: `(XXX) XXX-XXXX`
/// - 11 digits starting with `1`: `+1 (XXX) XXX-XXXX`
/// - anything else is returned unchanged
pub fn format(raw: &str) -> String {
    let d = digits(raw);
    match d.len() {
        10 => format!("({}) {}-{}", &d[0..3], &d[3..6], &d[6..10]),
        11 if d.starts_with('1') => {
            format!("+1 ({}) {}-{}", &d[1..4], &d[4..7], &d[7..11])
        }
        _ => raw.to_string(),
    }
}

/// Normalize a number to E.164 for the provider
///
/// 10-digit numbers are assumed to be North American and get `+1`.
pub fn to_e164(raw: &str) -> String {
    let d = digits(raw);
    if d.len() == 10 {
        format!("+1{}", d)
    } else {
        format!("+{}", d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_digit_bounds() {
        assert!(!validate("555123456")); // 9
        assert!(validate("5551234567")); // 10
        assert!(validate("+44 20 7946 0958")); // 12
        assert!(validate("123456789012345")); // 15
        assert!(!validate("1234567890123456")); // 16
        assert!(!validate(""));
        assert!(!validate("call me"));
    }

    #[test]
    fn test_validate_ignores_punctuation() {
        assert!(validate("(555) 123-4567"));
        assert!(validate("555.123.4567"));
    }

    #[test]
    fn test_format_ten_digits() {
        assert_eq!(format("5551234567"), "(555) 123-4567");
        assert_eq!(format("555-123-4567"), "(555) 123-4567");

        for n in [2_000_000_000u64, 5_551_234_567, 9_999_999_999] {
            let s = n.to_string();
            let out = format(&s);
            assert_eq!(out, format!("({}) {}-{}", &s[0..3], &s[3..6], &s[6..]));
        }
    }

    #[test]
    fn test_format_eleven_digits_with_country_code() {
        assert_eq!(format("15551234567"), "+1 (555) 123-4567");
        assert_eq!(format("+1 555 123 4567"), "+1 (555) 123-4567");
    }

    #[test]
    fn test_format_fallback_returns_input() {
        assert_eq!(format("25551234567"), "25551234567");
        assert_eq!(format("+44 20 7946 0958"), "+44 20 7946 0958");
        assert_eq!(format("12345"), "12345");
    }

    #[test]
    fn test_to_e164() {
        assert_eq!(to_e164("(555) 123-4567"), "+15551234567");
        assert_eq!(to_e164("1-555-123-4567"), "+15551234567");
        assert_eq!(to_e164("+44 20 7946 0958"), "+442079460958");
    }
}
