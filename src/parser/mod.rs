pub mod dom;
pub mod extract;
pub mod pgn;
pub mod selector;
pub mod text;

use crate::record::GameRecord;
use dom::Document;
use extract::ReviewSelectors;

pub use pgn::parse_pgn_text;

/// Review page markup → document tree → one normalized record. Never fails:
/// anything that cannot be found keeps its zero value.
#[cfg_attr(not(test), allow(dead_code))]
pub fn parse_review_page(markup: &str, game_id: &str) -> GameRecord {
    parse_review_page_with(markup, game_id, ReviewSelectors::builtin())
}

pub fn parse_review_page_with(markup: &str, game_id: &str, selectors: &ReviewSelectors) -> GameRecord {
    let doc = Document::parse(markup);
    extract::extract_all(&doc, markup, game_id, selectors)
}
