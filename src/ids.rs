use std::mem::take;
use std::sync::LazyLock;

use regex::Regex;

static GAME_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:game/live|analysis/game/live)/(\d+)").unwrap());

/// Numeric game id from a review/live URL, or the value itself when it is
/// already all digits.
pub fn extract_game_id(value: &str) -> Option<String> {
    if let Some(c) = GAME_URL_RE.captures(value) {
        return Some(c[1].to_string());
    }
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        return Some(value.to_string());
    }
    None
}

/// Game ids from CSV text. Reads the `game_id` column when the header has
/// one, otherwise the first column. Blank and unrecognized cells are skipped.
pub fn load_game_ids(csv_text: &str) -> Vec<String> {
    let mut rows = parse_rows(csv_text).into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let col = header
        .iter()
        .position(|h| h.trim() == "game_id")
        .unwrap_or(0);

    rows.filter_map(|row| {
        let cell = row.get(col)?.trim();
        if cell.is_empty() {
            None
        } else {
            extract_game_id(cell)
        }
    })
    .collect()
}

/// Comma-separated rows; double quotes group and `""` escapes. Blank lines dropped.
fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    let mut end_row = |row: &mut Vec<String>, field: &mut String| {
        row.push(take(field));
        if !(row.len() == 1 && row[0].is_empty()) {
            rows.push(take(row));
        } else {
            row.clear();
        }
    };

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_row(&mut row, &mut field);
            }
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        end_row(&mut row, &mut field);
    }
    rows
}
