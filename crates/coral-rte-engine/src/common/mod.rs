//! DOM helpers shared by selection, search and commands.

pub mod position;

use coral_rte_dom::{NodeId, TextTree, is_block_tag, is_void_tag};

pub use position::{Bias, PositionMap, Token, TokenKind};

use crate::selection::Point;

/// Number of characters `node` contributes under the char-position model.
///
/// Block boundaries inside the subtree count as one character each run;
/// the edges of the subtree itself do not.
pub fn node_char_count<T: TextTree>(tree: &T, node: NodeId) -> usize {
    if let Some(text) = tree.text(node) {
        return text.chars().count();
    }
    PositionMap::build(tree, node).total_chars()
}

/// Character position of `point` relative to the start of `root`.
pub fn char_offset_for_point<T: TextTree>(tree: &T, root: NodeId, point: &Point) -> Option<usize> {
    PositionMap::build(tree, root).char_pos_of(tree, point)
}

/// Inline elements can be entered or left without moving the caret by a
/// character.
pub fn is_inline_boundary<T: TextTree>(tree: &T, node: NodeId) -> bool {
    tree.tag(node)
        .is_some_and(|tag| !is_block_tag(tag) && !is_void_tag(tag))
}

/// Tag path of `node` below `root`, e.g. `["p", "b", "#text"]`.
pub fn tag_path_below<T: TextTree>(tree: &T, root: NodeId, node: NodeId) -> Vec<String> {
    let depth = tree.tag_path(root).len();
    tree.tag_path(node).into_iter().skip(depth).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_rte_dom::parse_markup;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_follow_the_char_model() {
        let dom = parse_markup("<p>ab<br>c</p><p>d<img src=x></p>").unwrap();
        let [first, second] = dom.children(dom.root()) else {
            panic!("expected two paragraphs");
        };
        assert_eq!(node_char_count(&dom, *first), 4);
        assert_eq!(node_char_count(&dom, *second), 2);
        assert_eq!(node_char_count(&dom, dom.root()), 7);
    }

    #[test]
    fn inline_boundaries_exclude_blocks_and_voids() {
        let dom = parse_markup("<p><b>x</b><br></p>").unwrap();
        let p = dom.children(dom.root())[0];
        let b = dom.children(p)[0];
        let br = dom.children(p)[1];
        assert!(is_inline_boundary(&dom, b));
        assert!(!is_inline_boundary(&dom, p));
        assert!(!is_inline_boundary(&dom, br));
    }

    #[test]
    fn tag_path_is_relative_to_the_root() {
        let dom = parse_markup("<div><p><b>x</b></p></div>").unwrap();
        let div = dom.children(dom.root())[0];
        let text = dom.text_nodes(div)[0];
        assert_eq!(tag_path_below(&dom, div, text), vec!["p", "b", "#text"]);
        let offset = char_offset_for_point(&dom, div, &Point::new(text, 1));
        assert_eq!(offset, Some(1));
    }
}
