pub mod accuracy;
pub mod players;
pub mod ratings;
pub mod tallies;
pub mod user_details;

use std::sync::LazyLock;

use serde::Deserialize;
use tracing::debug;

use super::dom::{Document, NodeId};
use super::pgn;
use super::selector::{Selector, SelectorError};
use crate::record::{Category, Color, GameRecord};

static BUILTIN: LazyLock<ReviewSelectors> =
    LazyLock::new(|| ReviewSelectors::new(&SelectorStrings::default()).unwrap());

/// A white/black pair of anything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sides<T> {
    pub white: T,
    pub black: T,
}

impl<T> Sides<T> {
    pub fn from_fn(mut f: impl FnMut(Color) -> T) -> Self {
        Sides {
            white: f(Color::White),
            black: f(Color::Black),
        }
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(Color) -> Result<T, E>) -> Result<Self, E> {
        Ok(Sides {
            white: f(Color::White)?,
            black: f(Color::Black)?,
        })
    }

    pub fn get(&self, color: Color) -> &T {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn get_mut(&mut self, color: Color) -> &mut T {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }
}

/// Raw selector strings for the review page. `{color}` expands to
/// `white`/`black`, `{token}` to the tally category token.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorStrings {
    /// The page's top panel is read as white and the bottom as black. Editor
    /// and custom games can render the other way round.
    pub player_panel_white: String,
    pub player_panel_black: String,
    pub username: String,
    /// Attribute that carries numeric suffixes (`review-rating-1300`).
    pub marker_attr: String,
    pub rating_marker: String,
    pub rating_class: String,
    pub overview_row: String,
    pub overview_title: String,
    pub overview_item: String,
    pub rating_row_label: String,
    pub rating_row_value: String,
    pub accuracy_row_label: String,
    pub accuracy_row_value: String,
    pub accuracy_marker: String,
    pub accuracy_class: String,
    pub value_span: String,
    pub tally: String,
}

impl Default for SelectorStrings {
    fn default() -> Self {
        SelectorStrings {
            player_panel_white: "[data-cy='analysis-player-Top']".into(),
            player_panel_black: "[data-cy='analysis-player-Bottom']".into(),
            username: "[data-test-element='user-tagline-username']".into(),
            marker_attr: "data-cy".into(),
            rating_marker: "[data-cy^='review-rating-']".into(),
            rating_class: "review-rating-{color}".into(),
            overview_row: ".game-overview-row".into(),
            overview_title: ".game-overview-row-title".into(),
            overview_item: ".game-overview-row-item".into(),
            rating_row_label: "Game Rating".into(),
            rating_row_value: ".review-rating-{color} span".into(),
            accuracy_row_label: "Accuracy".into(),
            accuracy_row_value: ".review-accuracy-{color} span, [data-cy*='accuracy-{color}'] span"
                .into(),
            accuracy_marker: "[data-cy^='review-accuracy-'], [data-cy^='game-review-accuracy-']"
                .into(),
            accuracy_class: "review-accuracy-{color}".into(),
            value_span: "span".into(),
            tally: "[data-cy='game-review-tallies-number-{token}-{color}']".into(),
        }
    }
}

fn expand(template: &str, color: Color) -> String {
    template.replace("{color}", color.as_str())
}

/// Compiled form of [`SelectorStrings`].
#[derive(Debug, Clone)]
pub struct ReviewSelectors {
    pub player_panel: Sides<Selector>,
    pub username: Selector,
    pub marker_attr: String,
    pub rating_marker: Selector,
    pub rating_class: Sides<String>,
    pub overview_row: Selector,
    pub overview_title: Selector,
    pub overview_item: Selector,
    pub rating_row_label: String,
    pub rating_row_value: Sides<Selector>,
    pub accuracy_row_label: String,
    pub accuracy_row_value: Sides<Selector>,
    pub accuracy_marker: Selector,
    pub accuracy_class: Sides<String>,
    pub value_span: Selector,
    pub tallies: Vec<(Category, Sides<Selector>)>,
}

impl ReviewSelectors {
    pub fn new(s: &SelectorStrings) -> Result<ReviewSelectors, SelectorError> {
        let per_color = |template: &str| Sides::try_from_fn(|c| Selector::parse(&expand(template, c)));

        let tallies = Category::ALL
            .iter()
            .map(|&category| {
                let template = s.tally.replace("{token}", category.token());
                per_color(&template).map(|sides| (category, sides))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ReviewSelectors {
            player_panel: Sides {
                white: Selector::parse(&s.player_panel_white)?,
                black: Selector::parse(&s.player_panel_black)?,
            },
            username: Selector::parse(&s.username)?,
            marker_attr: s.marker_attr.clone(),
            rating_marker: Selector::parse(&s.rating_marker)?,
            rating_class: Sides::from_fn(|c| expand(&s.rating_class, c)),
            overview_row: Selector::parse(&s.overview_row)?,
            overview_title: Selector::parse(&s.overview_title)?,
            overview_item: Selector::parse(&s.overview_item)?,
            rating_row_label: s.rating_row_label.clone(),
            rating_row_value: per_color(&s.rating_row_value)?,
            accuracy_row_label: s.accuracy_row_label.clone(),
            accuracy_row_value: per_color(&s.accuracy_row_value)?,
            accuracy_marker: Selector::parse(&s.accuracy_marker)?,
            accuracy_class: Sides::from_fn(|c| expand(&s.accuracy_class, c)),
            value_span: Selector::parse(&s.value_span)?,
            tallies,
        })
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn builtin() -> &'static ReviewSelectors {
        &BUILTIN
    }
}

/// Run every field-group strategy over one parsed page.
pub fn extract_all(
    doc: &Document,
    markup: &str,
    game_id: &str,
    sel: &ReviewSelectors,
) -> GameRecord {
    let details = user_details::extract(markup);
    let names = players::resolve(doc, sel, &details);
    let ratings = ratings::resolve(doc, sel, &details);
    let accuracy = accuracy::resolve(doc, sel);
    let tallies = tallies::resolve(doc, sel);
    let result = pgn::result_from_markup(markup);

    debug!(
        game_id,
        white = %names.white,
        black = %names.black,
        result = result.map(|r| r.as_str()).unwrap_or(""),
        "extracted review page"
    );

    GameRecord {
        game_id: game_id.to_string(),
        white_username: names.white,
        black_username: names.black,
        white_rating: ratings.white,
        black_rating: ratings.black,
        white_accuracy: accuracy.white,
        black_accuracy: accuracy.black,
        result,
        tallies,
    }
}

/// First overview row whose title contains `label`.
fn overview_row(doc: &Document, sel: &ReviewSelectors, label: &str) -> Option<NodeId> {
    doc.select(&sel.overview_row).into_iter().find(|&row| {
        doc.select_one_within(row, &sel.overview_title)
            .is_some_and(|title| doc.text(title).contains(label))
    })
}

fn text_within(doc: &Document, scope: NodeId, selector: &Selector) -> Option<String> {
    doc.select_one_within(scope, selector).map(|n| doc.text(n))
}

// ── Tests ──
