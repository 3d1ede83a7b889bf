use tracing::debug;

use super::user_details::SideDetails;
use super::{text_within, ReviewSelectors, Sides};
use crate::parser::dom::Document;
use crate::parser::selector::Selector;

/// Usernames: `userDetails` JSON first, then the player panels.
pub fn resolve(doc: &Document, sel: &ReviewSelectors, details: &Sides<SideDetails>) -> Sides<String> {
    Sides::from_fn(|color| {
        if let Some(name) = details.get(color).username.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        debug!("{} username not in userDetails, reading player panel", color.as_str());
        panel_username(doc, sel.player_panel.get(color), &sel.username).unwrap_or_default()
    })
}

fn panel_username(doc: &Document, panel: &Selector, username: &Selector) -> Option<String> {
    let panel = doc.select_one(panel)?;
    text_within(doc, panel, username).map(|t| t.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract::user_details;

    const PANELS: &str = r#"
        <div data-cy="analysis-player-Top"><a data-test-element="user-tagline-username"> top_user </a></div>
        <div data-cy="analysis-player-Bottom"><span>no username element</span></div>
    "#;

    #[test]
    fn panels_map_top_to_white() {
        let doc = Document::parse(PANELS);
        let names = resolve(&doc, ReviewSelectors::builtin(), &Sides::default());
        assert_eq!(names.white, "top_user");
        assert_eq!(names.black, "");
    }

    #[test]
    fn json_wins_over_panels() {
        let markup = format!(
            "{}{}",
            PANELS,
            r#"<script>userDetails: JSON.parse("{\"white\":{\"username\":\"json_white\"},\"black\":{\"username\":\"\"}}")</script>"#
        );
        let doc = Document::parse(&markup);
        let details = user_details::extract(&markup);
        let names = resolve(&doc, ReviewSelectors::builtin(), &details);
        assert_eq!(names.white, "json_white");
        // Empty JSON username falls through to the (empty) bottom panel.
        assert_eq!(names.black, "");
    }
}
