//! Full-width to half-width text normalization.

/// Map a full-width digit or separator to its half-width form.
fn half_width(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        '：' => ':',
        '，' => ',',
        '／' => '/',
        '．' => '.',
        _ => c,
    }
}

/// Convert full-width digits and separators only, leaving layout alone.
pub fn normalize_digits(text: &str) -> String {
    text.chars().map(half_width).collect()
}

/// Normalize an email body (or subject) for extraction.
///
/// Digits and `：，／．` become half-width, horizontal whitespace runs
/// (including U+3000) collapse to one space, lines are trimmed and runs of
/// blank lines collapse to one. Letters keep their case.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = false;

    for line in text.lines() {
        let mut collapsed = String::with_capacity(line.len());
        let mut pending_space = false;

        for c in line.chars() {
            if c.is_whitespace() {
                pending_space = true;
                continue;
            }
            if pending_space && !collapsed.is_empty() {
                collapsed.push(' ');
            }
            pending_space = false;
            collapsed.push(half_width(c));
        }

        if collapsed.is_empty() {
            if blank_run || out.is_empty() {
                continue;
            }
            blank_run = true;
        } else {
            blank_run = false;
        }

        out.push_str(&collapsed);
        out.push('\n');
    }

    while out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
