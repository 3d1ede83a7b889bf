use std::sync::LazyLock;

use regex::Regex;

use super::text::{safe_u32, unescape_backslashes};
use crate::record::GameResult;

static SCRIPT_PGN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)pgn:\s*'(.+?)',").unwrap());
static RESULT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[Result\s+"([^"]+)"\]"#).unwrap());
static WHITE_ELO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[WhiteElo\s+"(\d+)"\]"#).unwrap());
static BLACK_ELO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[BlackElo\s+"(\d+)"\]"#).unwrap());

/// Header fields read from raw PGN text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgnHeaders {
    pub result: Option<GameResult>,
    pub white_rating: u32,
    pub black_rating: u32,
}

pub fn parse_pgn_text(pgn: &str) -> PgnHeaders {
    let tag = |re: &Regex| re.captures(pgn).map(|c| c[1].to_string());

    PgnHeaders {
        result: result_tag(pgn),
        white_rating: safe_u32(tag(&WHITE_ELO_RE).as_deref()),
        black_rating: safe_u32(tag(&BLACK_ELO_RE).as_deref()),
    }
}

/// Result of the PGN embedded in the review page's analysis script
/// (`pgn: '…',`). The literal is JS-escaped, so slashes and escapes are
/// decoded before the tag is matched.
pub fn result_from_markup(markup: &str) -> Option<GameResult> {
    let raw = SCRIPT_PGN_RE.captures(markup)?.get(1)?.as_str();
    let pgn = unescape_backslashes(&raw.replace("\\/", "/"));
    result_tag(&pgn)
}

fn result_tag(pgn: &str) -> Option<GameResult> {
    let caps = RESULT_TAG_RE.captures(pgn)?;
    GameResult::normalize(&caps[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn league_pgn() {
        let pgn = "[Event \"League\"]\n[White \"Alice\"]\n[Black \"Bob\"]\n[Result \"1-0\"]\n[WhiteElo \"1200\"]\n[BlackElo \"1150\"]\n\n1. e4 e5 1-0";
        assert_eq!(
            parse_pgn_text(pgn),
            PgnHeaders {
                result: Some(GameResult::WhiteWins),
                white_rating: 1200,
                black_rating: 1150,
            }
        );
    }

    #[test]
    fn draw_without_elo() {
        let h = parse_pgn_text("[Result \"1/2-1/2\"]\n\n1. e4 e5 1/2-1/2");
        assert_eq!(h.result, Some(GameResult::Draw));
        assert_eq!((h.white_rating, h.black_rating), (0, 0));
    }

    #[test]
    fn unknown_result_and_bad_elo() {
        let h = parse_pgn_text("[Result \"forfeit\"]\n[WhiteElo \"?\"]\n[BlackElo \"99999999999\"]");
        assert_eq!(h, PgnHeaders::default());
    }

    #[test]
    fn escaped_draw_in_script() {
        let html = "<script>window.chesscom = { analysis: { pgn: '[Result \"1\\/2-1\\/2\"]', } };</script>";
        assert_eq!(result_from_markup(html), Some(GameResult::Draw));
    }

    #[test]
    fn escaped_quotes_and_newlines_in_script() {
        let html = r#"<script>analysis: { pgn: '[Event \"Live Chess\"]\n[Result \"*\"]\n\n1. d4 *', ply: 0 }</script>"#;
        assert_eq!(result_from_markup(html), Some(GameResult::Ongoing));
    }

    #[test]
    fn missing_or_unterminated_script_pgn() {
        assert_eq!(result_from_markup("<html></html>"), None);
        assert_eq!(result_from_markup("pgn: '[Result \"1-0\"]'"), None);
    }
}
