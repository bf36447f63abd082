//! Exchangeability: whether two DOM points denote the same logical position.
//!
//! Two points are exchangeable when the document-order walk from one to the
//! other only enters or leaves inline elements. Crossing a character, a
//! `br`/`img`/`hr`, or any block boundary (including an empty paragraph or
//! the edge of a nested list) makes them different positions.

use coral_rte_dom::{NodeId, TextTree};

use crate::common::PositionMap;
use crate::selection::Point;

/// Exchangeability against an existing map of the editable root.
pub fn is_exchangeable_in<T: TextTree>(tree: &T, map: &PositionMap, a: &Point, b: &Point) -> bool {
    let (Some(first), Some(second)) = (map.gap_of(tree, a), map.gap_of(tree, b)) else {
        return false;
    };
    map.between(first, second)
        .iter()
        .all(|token| token.is_transparent(tree))
}

pub fn is_exchangeable<T: TextTree>(tree: &T, root: NodeId, a: &Point, b: &Point) -> bool {
    is_exchangeable_in(tree, &PositionMap::build(tree, root), a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_rte_dom::{Dom, parse_markup};
    use rstest::rstest;

    fn text(dom: &Dom, content: &str) -> NodeId {
        dom.text_nodes(dom.root())
            .into_iter()
            .find(|&n| dom.text(n) == Some(content))
            .unwrap()
    }

    #[test]
    fn caret_before_bold_matches_wrapped_text_start() {
        let mut dom = parse_markup("<p>abc<b>def</b>ghi</p>").unwrap();
        let abc = text(&dom, "abc");
        let def = text(&dom, "def");
        dom.wrap(def, "span", vec![("class".to_string(), "x".to_string())])
            .unwrap();

        assert!(is_exchangeable(
            &dom,
            dom.root(),
            &Point::new(abc, 3),
            &Point::new(def, 0)
        ));
        assert!(!is_exchangeable(
            &dom,
            dom.root(),
            &Point::new(abc, 2),
            &Point::new(def, 0)
        ));
    }

    #[rstest]
    #[case::br("<p>ab<br>cd</p>")]
    #[case::paragraph("<p>ab</p><p>cd</p>")]
    #[case::empty_paragraph("<p>ab</p><p></p><p>cd</p>")]
    #[case::nested_list("<ul><li>ab<ul><li>cd</li></ul></li></ul>")]
    fn boundaries_that_separate_positions(#[case] markup: &str) {
        let dom = parse_markup(markup).unwrap();
        let ab = text(&dom, "ab");
        let cd = text(&dom, "cd");
        assert!(!is_exchangeable(
            &dom,
            dom.root(),
            &Point::new(ab, 2),
            &Point::new(cd, 0)
        ));
    }

    #[test]
    fn element_and_text_points_at_the_same_gap() {
        let dom = parse_markup("<p><i><b>ab</b></i></p>").unwrap();
        let p = dom.children(dom.root())[0];
        let ab = text(&dom, "ab");
        assert!(is_exchangeable(&dom, dom.root(), &Point::new(p, 0), &Point::new(ab, 0)));
        assert!(is_exchangeable(&dom, dom.root(), &Point::eob(p), &Point::eob(ab)));
        assert!(is_exchangeable(&dom, dom.root(), &Point::new(ab, 1), &Point::new(ab, 1)));
    }

    #[test]
    fn detached_points_are_never_exchangeable() {
        let mut dom = parse_markup("<p>ab</p>").unwrap();
        let ab = text(&dom, "ab");
        let stray = dom.create_text("x");
        assert!(!is_exchangeable(&dom, dom.root(), &Point::new(ab, 0), &Point::new(stray, 0)));
    }
}
