use tracing::debug;

use super::user_details::SideDetails;
use super::{overview_row, text_within, ReviewSelectors, Sides};
use crate::parser::dom::Document;
use crate::parser::text::{numeric_suffix, safe_u32};
use crate::record::Color;

/// Ratings in priority order: marker attribute, "Game Rating" overview row,
/// `userDetails.gameRating`. A later source only fills colors still at 0.
pub fn resolve(doc: &Document, sel: &ReviewSelectors, details: &Sides<SideDetails>) -> Sides<u32> {
    let mut ratings = from_marker(doc, sel);

    if ratings.white == 0 || ratings.black == 0 {
        if let Some(row) = overview_row(doc, sel, &sel.rating_row_label) {
            debug!("filling ratings from overview row");
            for color in Color::BOTH {
                let slot = ratings.get_mut(color);
                if *slot == 0 {
                    *slot = safe_u32(text_within(doc, row, sel.rating_row_value.get(color)).as_deref());
                }
            }
        }
    }

    for color in Color::BOTH {
        let slot = ratings.get_mut(color);
        if *slot == 0 {
            *slot = details.get(color).game_rating;
        }
    }

    ratings
}

/// Elements like `data-cy="review-rating-1300"` with a per-color class.
fn from_marker(doc: &Document, sel: &ReviewSelectors) -> Sides<u32> {
    let mut ratings = Sides::default();
    for node in doc.select(&sel.rating_marker) {
        let Some(value) = doc.attr(node, &sel.marker_attr).and_then(numeric_suffix) else {
            continue;
        };
        for color in Color::BOTH {
            let slot = ratings.get_mut(color);
            if *slot == 0 && doc.has_class(node, sel.rating_class.get(color)) {
                *slot = value;
            }
        }
    }
    ratings
}
