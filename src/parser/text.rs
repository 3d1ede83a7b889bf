/// Parse a non-negative integer, 0 on empty or malformed text.
pub fn safe_u32(text: Option<&str>) -> u32 {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .and_then(|t| t.parse::<u32>().ok())
        .unwrap_or(0)
}

/// Parse a finite float, 0.0 on empty or malformed text.
pub fn safe_f64(text: Option<&str>) -> f64 {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .and_then(|t| t.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Trailing `-`-separated segment of an attribute value, e.g. `1300` in
/// `review-rating-1300`.
pub fn numeric_suffix(attr: &str) -> Option<u32> {
    attr.rsplit('-').next().and_then(|s| s.parse::<u32>().ok())
}

/// Decode backslash escapes as found in JS string literals. Unknown escapes
/// are kept verbatim, including the backslash.
pub fn unescape_backslashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => push_hex_escape(&mut out, &mut chars, 'u', 4),
            Some('x') => push_hex_escape(&mut out, &mut chars, 'x', 2),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn push_hex_escape(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    marker: char,
    width: usize,
) {
    let mut digits = String::with_capacity(width);
    while digits.len() < width {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }

    let decoded = if digits.len() == width {
        u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
    } else {
        None
    };
    match decoded {
        Some(ch) => out.push(ch),
        None => {
            out.push('\\');
            out.push(marker);
            out.push_str(&digits);
        }
    }
}
