//! Dictionary-size command-line argument parser.
//!
//! Accepts a decimal integer with an optional `K` (×1024) or `M` (×1024²)
//! suffix. Any other non-digit trailing character is dropped rather than
//! treated as a parse failure, and a leading `-` makes the whole value 0.

/// Never fails; malformed input maps to `0`, mirroring the teacher's
/// permissive command-line parsing style.
pub fn parse_size(s: &str) -> usize {
    if s.is_empty() || s.starts_with('-') {
        return 0;
    }
    let last = match s.chars().last() {
        Some(c) => c,
        None => return 0
    };
    let (digits,mult) = if last.is_ascii_digit() {
        (s,1usize)
    } else {
        let prefix_len = s.len() - last.len_utf8();
        let mult = match last {
            'K' | 'k' => 1024,
            'M' | 'm' => 1024 * 1024,
            _ => 1
        };
        (&s[..prefix_len],mult)
    };
    digits.parse::<usize>().map(|v| v.saturating_mul(mult)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_documented_cases() {
        assert_eq!(parse_size("0"),0);
        assert_eq!(parse_size(""),0);
        assert_eq!(parse_size("1K"),1024);
        assert_eq!(parse_size("2M"),2_097_152);
        assert_eq!(parse_size("-5"),0);
        assert_eq!(parse_size("3G"),3);
    }

    #[test]
    fn garbage_input_yields_zero() {
        assert_eq!(parse_size("abc"),0);
        assert_eq!(parse_size("K"),0);
    }
}
