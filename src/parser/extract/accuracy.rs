use tracing::debug;

use super::{overview_row, text_within, ReviewSelectors, Sides};
use crate::parser::dom::{Document, NodeId};
use crate::parser::text::{numeric_suffix, safe_f64};
use crate::record::Color;

/// Accuracy: per-color values in the "Accuracy" overview row, then that
/// row's items in document order, then marker attributes anywhere.
pub fn resolve(doc: &Document, sel: &ReviewSelectors) -> Sides<f64> {
    let mut accuracy = Sides::default();

    if let Some(row) = overview_row(doc, sel, &sel.accuracy_row_label) {
        accuracy = Sides::from_fn(|color| {
            safe_f64(text_within(doc, row, sel.accuracy_row_value.get(color)).as_deref())
        });
        if both_zero(&accuracy) {
            if let Some(items) = from_row_items(doc, sel, row) {
                debug!("accuracy read from generic overview items");
                accuracy = items;
            }
        }
    }

    if both_zero(&accuracy) {
        accuracy = from_marker(doc, sel);
    }

    accuracy
}

fn both_zero(acc: &Sides<f64>) -> bool {
    acc.white == 0.0 && acc.black == 0.0
}

/// First item is white, second is black.
fn from_row_items(doc: &Document, sel: &ReviewSelectors, row: NodeId) -> Option<Sides<f64>> {
    let items = doc.select_within(row, &sel.overview_item);
    if items.len() < 2 {
        return None;
    }
    Some(Sides {
        white: safe_f64(Some(&doc.text(items[0]))),
        black: safe_f64(Some(&doc.text(items[1]))),
    })
}

/// Elements whose marker attribute names the color. Without inner numeric
/// text the attribute suffix is read as tenths (`…-739` is 73.9).
fn from_marker(doc: &Document, sel: &ReviewSelectors) -> Sides<f64> {
    let mut accuracy = Sides::default();
    for node in doc.select(&sel.accuracy_marker) {
        let marker = doc.attr(node, &sel.marker_attr).unwrap_or("");
        let span_text = text_within(doc, node, &sel.value_span);
        let mut value = safe_f64(span_text.as_deref());
        if value == 0.0 {
            value = numeric_suffix(marker).map(|n| f64::from(n) / 10.0).unwrap_or(0.0);
        }

        let Some(color) = Color::BOTH.into_iter().find(|&c| {
            marker.contains(c.as_str())
                || doc.classes(node).any(|class| class.contains(sel.accuracy_class.get(c).as_str()))
        }) else {
            continue;
        };
        let slot = accuracy.get_mut(color);
        if *slot == 0.0 {
            *slot = value;
        }
    }
    accuracy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(markup: &str) -> (f64, f64) {
        let acc = resolve(&Document::parse(markup), ReviewSelectors::builtin());
        (acc.white, acc.black)
    }

    #[test]
    fn color_specific_values() {
        let markup = r#"<div class="game-overview-row"><span class="game-overview-row-title">Accuracy</span>
            <div class="game-overview-row-item"><div class="review-accuracy-black"><span>81.5</span></div></div>
            <div class="game-overview-row-item"><div class="review-accuracy-white"><span>76.6</span></div></div>
        </div>"#;
        assert_eq!(run(markup), (76.6, 81.5));
    }

    #[test]
    fn data_cy_values_inside_row() {
        let markup = r#"<div class="game-overview-row"><span class="game-overview-row-title">Accuracy</span>
            <div data-cy="game-review-accuracy-white"><span>64.2</span></div>
        </div>"#;
        assert_eq!(run(markup), (64.2, 0.0));
    }

    #[test]
    fn generic_items_keep_document_order() {
        let markup = r#"<div class="game-overview-row"><span class="game-overview-row-title">Accuracy</span>
            <div class="game-overview-row-item"> 91.2 </div>
            <div class="game-overview-row-item">58</div>
        </div>"#;
        assert_eq!(run(markup), (91.2, 58.0));
    }

    #[test]
    fn single_item_is_not_enough() {
        let markup = r#"<div class="game-overview-row"><span class="game-overview-row-title">Accuracy</span>
            <div class="game-overview-row-item">91.2</div></div>"#;
        assert_eq!(run(markup), (0.0, 0.0));
    }

    #[test]
    fn marker_suffix_in_tenths() {
        let markup = r#"<div data-cy="review-accuracy-white-739"></div>
            <div data-cy="game-review-accuracy-black"><span>87.7</span></div>"#;
        assert_eq!(run(markup), (73.9, 87.7));
    }

    #[test]
    fn marker_color_from_class() {
        let markup = r#"<div data-cy="review-accuracy-455" class="review-accuracy-black-text"></div>"#;
        assert_eq!(run(markup), (0.0, 45.5));
    }

    #[test]
    fn row_values_suppress_marker_scan() {
        let markup = r#"<div class="game-overview-row"><span class="game-overview-row-title">Accuracy</span>
            <div class="review-accuracy-white"><span>70</span></div></div>
            <div data-cy="review-accuracy-black-900"></div>"#;
        assert_eq!(run(markup), (70.0, 0.0));
    }
}
