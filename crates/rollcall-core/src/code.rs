//! Random join codes for groups.

use rand::Rng;

/// Length of generated group codes.
pub const GROUP_CODE_LENGTH: usize = 8;

/// Alphabet used for group codes.
pub const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a code of `length` characters drawn uniformly from `charset`.
///
/// Returns an empty string when `charset` is empty.
#[must_use]
pub fn generate_code(length: usize, charset: &[u8]) -> String {
    if charset.is_empty() {
        return String::new();
    }
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(charset[rng.random_range(0..charset.len())]))
        .collect()
}

/// Generate an eight letter uppercase group code.
#[must_use]
pub fn generate_group_code() -> String {
    generate_code(GROUP_CODE_LENGTH, UPPERCASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_code_is_eight_uppercase_letters() {
        let code = generate_group_code();
        assert_eq!(code.len(), GROUP_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn long_codes_keep_the_requested_length() {
        let code = generate_code(40, b"0123456789");
        assert_eq!(code.len(), 40);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn letters_are_drawn_evenly() {
        let mut counts = [0_u32; 26];
        for _ in 0..100_000 {
            for byte in generate_group_code().bytes() {
                counts[usize::from(byte - b'A')] += 1;
            }
        }
        let min = counts.iter().copied().min().unwrap_or_default();
        let max = counts.iter().copied().max().unwrap_or_default();
        // 800k draws put each letter near 30770.
        assert!(min > 0);
        assert!(f64::from(max) / f64::from(min) < 1.07, "{counts:?}");
    }

    #[test]
    fn empty_charset_yields_empty_code() {
        assert!(generate_code(8, b"").is_empty());
    }
}
