/// Parse goal text the way a numeric text field reports it.
///
/// Leading whitespace and a single sign are accepted, then as many ASCII
/// digits as follow; anything after the digits is ignored ("120 steps" is 120).
/// Text with no leading digits is not an error, it yields 0. Values past the
/// `i64` range saturate.
pub fn parse_goal(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return 0;
    }

    let magnitude = digits.bytes().fold(0i64, |acc, digit| {
        acc.saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'))
    });

    if negative {
        magnitude.saturating_neg()
    } else {
        magnitude
    }
}
