use super::{ReviewSelectors, Sides};
use crate::parser::dom::Document;
use crate::parser::selector::Selector;
use crate::parser::text::safe_u32;
use crate::record::{Color, Tallies};

pub fn resolve(doc: &Document, sel: &ReviewSelectors) -> Tallies {
    let mut tallies = Tallies::default();
    for (category, selectors) in &sel.tallies {
        for color in Color::BOTH {
            tallies[*category].set(color, count(doc, selectors, color));
        }
    }
    tallies
}

fn count(doc: &Document, selectors: &Sides<Selector>, color: Color) -> u32 {
    let text = doc.select_one(selectors.get(color)).map(|n| doc.text(n));
    safe_u32(text.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Category;

    #[test]
    fn missing_and_malformed_counts_are_zero() {
        let doc = Document::parse(
            r#"<div data-cy="game-review-tallies-number-Miss-white"> 2 </div>
               <div data-cy="game-review-tallies-number-Miss-black">?</div>
               <div data-cy="game-review-tallies-number-GreatFind-black"><span>4</span></div>"#,
        );
        let t = resolve(&doc, ReviewSelectors::builtin());
        assert_eq!(t[Category::Miss].white, 2);
        assert_eq!(t[Category::Miss].black, 0);
        assert_eq!(t[Category::Great].black, 4);
        assert_eq!(t[Category::Blunder], Default::default());
    }
}
