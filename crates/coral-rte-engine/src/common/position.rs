//! # Flattened Position Model
//!
//! Selections, bookmarks and searches all need to answer the same question:
//! *where in the text is this (node, offset) pair?* [`PositionMap`] answers it
//! by flattening the editable subtree into a token stream:
//!
//! ```text
//! <p>ab<b>c</b></p><p>d</p>
//!
//! Open(p) TextStart a b Open(b) TextStart c Close(b) Close(p) Open(p) TextStart d Close(p)
//!   0        0     1 1   0        0     1    0        1       0        0     1    0
//! ```
//!
//! The second row is each token's character weight. Characters weigh one,
//! as do `br`, `img` and `hr`. A run of block boundaries between content
//! weighs one in total (a line break); runs at the very start or end of the
//! document weigh nothing.
//!
//! A *gap* is a position between two tokens. Every DOM point maps to exactly
//! one gap, and the character position of a gap is the sum of weights before
//! it. Several gaps can share a character position; whether two of them are
//! interchangeable is decided by the tokens between them (see
//! [`crate::selection::is_exchangeable`]).

use std::collections::HashMap;

use coral_rte_dom::{NodeId, TextTree, is_block_tag, is_character_tag, is_void_tag};

use crate::selection::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Zero-width marker in front of every text node, so empty text nodes
    /// still own a gap.
    TextStart,
    /// The char at this offset of the text node.
    Char(usize),
    Void,
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub node: NodeId,
    pub weight: usize,
}

impl Token {
    /// Tokens that do not separate two positions: inline element edges and
    /// text node starts.
    pub fn is_transparent<T: TextTree>(&self, tree: &T) -> bool {
        match self.kind {
            TokenKind::TextStart => true,
            TokenKind::Open | TokenKind::Close => {
                !tree.tag(self.node).is_some_and(is_block_tag)
            }
            TokenKind::Char(_) | TokenKind::Void => false,
        }
    }
}

/// Which neighbour to prefer when a gap sits between two text nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Prefer the start of the following char.
    Forward,
    /// Prefer the end of the preceding char.
    Backward,
}

#[derive(Debug, Clone)]
pub struct PositionMap {
    root: NodeId,
    tokens: Vec<Token>,
    /// `cum[g]` is the character position of gap `g`; `cum.len() == tokens.len() + 1`.
    cum: Vec<usize>,
    first: HashMap<NodeId, usize>,
    close: HashMap<NodeId, usize>,
}

impl PositionMap {
    pub fn build<T: TextTree>(tree: &T, root: NodeId) -> Self {
        let mut map = Self {
            root,
            tokens: Vec::new(),
            cum: Vec::new(),
            first: HashMap::new(),
            close: HashMap::new(),
        };
        for &child in tree.children(root) {
            map.push_node(tree, child);
        }
        map.assign_weights(tree);
        map
    }

    fn push(&mut self, kind: TokenKind, node: NodeId) {
        self.tokens.push(Token {
            kind,
            node,
            weight: 0,
        });
    }

    fn push_node<T: TextTree>(&mut self, tree: &T, node: NodeId) {
        self.first.insert(node, self.tokens.len());
        if let Some(text) = tree.text(node) {
            self.push(TokenKind::TextStart, node);
            for offset in 0..text.chars().count() {
                self.push(TokenKind::Char(offset), node);
            }
            return;
        }
        if tree.tag(node).is_some_and(is_void_tag) {
            self.push(TokenKind::Void, node);
            return;
        }
        self.push(TokenKind::Open, node);
        for &child in tree.children(node) {
            self.push_node(tree, child);
        }
        self.close.insert(node, self.tokens.len());
        self.push(TokenKind::Close, node);
    }

    fn assign_weights<T: TextTree>(&mut self, tree: &T) {
        let mut seen_content = false;
        let mut in_break = false;
        let mut last_weighted = None;

        for (index, token) in self.tokens.iter_mut().enumerate() {
            let tag = tree.tag(token.node);
            match token.kind {
                TokenKind::Char(_) => {
                    token.weight = 1;
                    seen_content = true;
                    in_break = false;
                }
                TokenKind::Void if tag.is_some_and(is_character_tag) => {
                    token.weight = 1;
                    seen_content = true;
                    in_break = false;
                }
                TokenKind::Open | TokenKind::Close if tag.is_some_and(is_block_tag) => {
                    if !in_break && seen_content {
                        token.weight = 1;
                    }
                    in_break = true;
                }
                _ => {}
            }
            if token.weight > 0 {
                last_weighted = Some(index);
            }
        }

        // A break with nothing after it is not a character
        if let Some(index) = last_weighted
            && matches!(self.tokens[index].kind, TokenKind::Open | TokenKind::Close)
        {
            self.tokens[index].weight = 0;
        }

        self.cum = Vec::with_capacity(self.tokens.len() + 1);
        let mut total = 0;
        self.cum.push(0);
        for token in &self.tokens {
            total += token.weight;
            self.cum.push(total);
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn gap_count(&self) -> usize {
        self.tokens.len() + 1
    }

    pub fn total_chars(&self) -> usize {
        self.cum.last().copied().unwrap_or(0)
    }

    pub fn char_pos(&self, gap: usize) -> usize {
        self.cum[gap.min(self.tokens.len())]
    }

    /// Character position at which `node` starts.
    pub fn node_start(&self, node: NodeId) -> Option<usize> {
        if node == self.root {
            return Some(0);
        }
        self.first.get(&node).map(|&index| self.cum[index])
    }

    /// Gap of a DOM point, or `None` if the point is outside the mapped
    /// subtree or its offset is out of range.
    pub fn gap_of<T: TextTree>(&self, tree: &T, point: &Point) -> Option<usize> {
        let node = point.node;
        if node != self.root && !self.first.contains_key(&node) {
            return None;
        }
        let len = tree.char_len(node);
        let offset = point.offset.unwrap_or(len);
        if offset > len {
            return None;
        }

        if tree.is_text(node) {
            return Some(self.first[&node] + 1 + offset);
        }
        if node == self.root {
            return Some(match tree.children(node).get(offset) {
                Some(child) => self.first[child],
                None => self.tokens.len(),
            });
        }
        if tree.tag(node).is_some_and(is_void_tag) {
            return Some(self.first[&node]);
        }
        match tree.children(node).get(offset) {
            Some(child) => self.first.get(child).copied(),
            None => self.close.get(&node).copied(),
        }
    }

    pub fn char_pos_of<T: TextTree>(&self, tree: &T, point: &Point) -> Option<usize> {
        self.gap_of(tree, point).map(|gap| self.char_pos(gap))
    }

    fn text_point_before(&self, gap: usize) -> Option<Point> {
        let token = self.tokens.get(gap.checked_sub(1)?)?;
        match token.kind {
            TokenKind::Char(offset) => Some(Point::new(token.node, offset + 1)),
            TokenKind::TextStart => Some(Point::new(token.node, 0)),
            _ => None,
        }
    }

    fn char_end_before(&self, gap: usize) -> Option<Point> {
        let token = self.tokens.get(gap.checked_sub(1)?)?;
        match token.kind {
            TokenKind::Char(offset) => Some(Point::new(token.node, offset + 1)),
            _ => None,
        }
    }

    fn text_point_after(&self, gap: usize) -> Option<Point> {
        let token = self.tokens.get(gap)?;
        match token.kind {
            TokenKind::Char(offset) => Some(Point::new(token.node, offset)),
            _ => None,
        }
    }

    fn element_point<T: TextTree>(&self, tree: &T, gap: usize) -> Point {
        let Some(token) = self.tokens.get(gap) else {
            return Point::new(self.root, tree.children(self.root).len());
        };
        match token.kind {
            TokenKind::Close => Point::new(token.node, tree.children(token.node).len()),
            _ => {
                let parent = tree.parent(token.node).unwrap_or(self.root);
                let index = tree.index_in_parent(token.node).unwrap_or(0);
                Point::new(parent, index)
            }
        }
    }

    /// The DOM point for a gap, anchored in a text node whenever one touches it.
    pub fn point_at_gap<T: TextTree>(&self, tree: &T, gap: usize, bias: Bias) -> Point {
        let (first, second) = match bias {
            Bias::Forward => (self.text_point_after(gap), self.text_point_before(gap)),
            Bias::Backward => (self.text_point_before(gap), self.text_point_after(gap)),
        };
        first
            .or(second)
            .unwrap_or_else(|| self.element_point(tree, gap))
    }

    /// All gaps at character position `pos`, or `None` past the end.
    pub fn gaps_at_char(&self, pos: usize) -> Option<std::ops::Range<usize>> {
        let lo = self.cum.partition_point(|&c| c < pos);
        let hi = self.cum.partition_point(|&c| c <= pos);
        (lo < hi).then_some(lo..hi)
    }

    /// Resolve a character position to a DOM point.
    ///
    /// Among the gaps sharing the position, a text-anchored one is preferred:
    /// the first char start for [`Bias::Forward`], the last char end for
    /// [`Bias::Backward`]. A backward point only lands at the start of a
    /// text node when no char ends at `pos`.
    pub fn point_at_char<T: TextTree>(&self, tree: &T, pos: usize, bias: Bias) -> Option<Point> {
        let gaps = self.gaps_at_char(pos)?;
        let found = match bias {
            Bias::Forward => gaps
                .clone()
                .find_map(|gap| self.text_point_after(gap))
                .or_else(|| gaps.clone().find_map(|gap| self.text_point_before(gap))),
            Bias::Backward => gaps
                .clone()
                .rev()
                .find_map(|gap| self.char_end_before(gap))
                .or_else(|| gaps.clone().rev().find_map(|gap| self.text_point_before(gap)))
                .or_else(|| gaps.clone().rev().find_map(|gap| self.text_point_after(gap))),
        };
        Some(found.unwrap_or_else(|| {
            // No text around: prefer a gap just inside an element
            let gap = match bias {
                Bias::Forward => gaps
                    .clone()
                    .find(|&gap| gap > 0 && self.tokens[gap - 1].kind == TokenKind::Open)
                    .unwrap_or(gaps.start),
                Bias::Backward => gaps
                    .clone()
                    .rev()
                    .find(|&gap| self.tokens.get(gap).is_some_and(|t| t.kind == TokenKind::Close))
                    .unwrap_or(gaps.end - 1),
            };
            self.element_point(tree, gap)
        }))
    }

    /// Start of the first char at or after `gap`.
    pub fn next_char_point(&self, gap: usize) -> Option<Point> {
        self.tokens[gap.min(self.tokens.len())..]
            .iter()
            .find_map(|token| match token.kind {
                TokenKind::Char(offset) => Some(Point::new(token.node, offset)),
                _ => None,
            })
    }

    /// End of the last char before `gap`.
    pub fn previous_char_point(&self, gap: usize) -> Option<Point> {
        self.tokens[..gap.min(self.tokens.len())]
            .iter()
            .rev()
            .find_map(|token| match token.kind {
                TokenKind::Char(offset) => Some(Point::new(token.node, offset + 1)),
                _ => None,
            })
    }

    /// Tokens strictly between two gaps, in document order.
    pub fn between(&self, a: usize, b: usize) -> &[Token] {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        &self.tokens[lo.min(self.tokens.len())..hi.min(self.tokens.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_rte_dom::parse_markup;
    use pretty_assertions::assert_eq;

    fn text_node<T: TextTree>(tree: &T, content: &str) -> NodeId {
        tree.text_nodes(tree.root())
            .into_iter()
            .find(|&n| tree.text(n) == Some(content))
            .unwrap()
    }

    #[test]
    fn weights_follow_the_line_model() {
        let dom = parse_markup("<p>ab<b>c</b></p><p>d</p>").unwrap();
        let map = PositionMap::build(&dom, dom.root());
        let weights: Vec<usize> = map.tokens().iter().map(|t| t.weight).collect();
        assert_eq!(weights, vec![0, 0, 1, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0]);
        assert_eq!(map.total_chars(), 5);
    }

    #[test]
    fn br_and_empty_paragraphs() {
        let dom = parse_markup("<p>a<br>b</p><p></p><p>c</p>").unwrap();
        let map = PositionMap::build(&dom, dom.root());
        // a, br, b, one line break, c
        assert_eq!(map.total_chars(), 5);
    }

    #[test]
    fn text_points_map_to_char_positions() {
        let dom = parse_markup("<p>ab<b>cd</b></p><p>ef</p>").unwrap();
        let map = PositionMap::build(&dom, dom.root());
        let cd = text_node(&dom, "cd");
        let ef = text_node(&dom, "ef");
        assert_eq!(map.char_pos_of(&dom, &Point::new(cd, 1)), Some(3));
        assert_eq!(map.char_pos_of(&dom, &Point::new(ef, 0)), Some(5));
        assert_eq!(map.char_pos_of(&dom, &Point::eob(ef)), Some(7));
        assert_eq!(map.char_pos_of(&dom, &Point::new(ef, 3)), None);
    }

    #[test]
    fn element_points_map_to_child_gaps() {
        let dom = parse_markup("<p>ab<b>cd</b></p>").unwrap();
        let map = PositionMap::build(&dom, dom.root());
        let p = dom.children(dom.root())[0];
        assert_eq!(map.char_pos_of(&dom, &Point::new(p, 1)), Some(2));
        assert_eq!(map.char_pos_of(&dom, &Point::eob(p)), Some(4));
        assert_eq!(map.char_pos_of(&dom, &Point::eob(dom.root())), Some(4));
    }

    #[test]
    fn resolving_chars_prefers_text_nodes() {
        let dom = parse_markup("<p>ab<b>cd</b></p>").unwrap();
        let map = PositionMap::build(&dom, dom.root());
        let ab = text_node(&dom, "ab");
        let cd = text_node(&dom, "cd");
        assert_eq!(
            map.point_at_char(&dom, 2, Bias::Forward),
            Some(Point::new(cd, 0))
        );
        assert_eq!(
            map.point_at_char(&dom, 2, Bias::Backward),
            Some(Point::new(ab, 2))
        );
        assert_eq!(map.point_at_char(&dom, 9, Bias::Forward), None);
    }

    #[test]
    fn backward_resolution_stays_before_a_following_link() {
        let dom = parse_markup(r#"<p>ab<a href="/y">cd</a></p>"#).unwrap();
        let map = PositionMap::build(&dom, dom.root());
        let ab = text_node(&dom, "ab");
        assert_eq!(
            map.point_at_char(&dom, 2, Bias::Backward),
            Some(Point::new(ab, 2))
        );
        // Nothing ends at 0, so the text start is used
        assert_eq!(
            map.point_at_char(&dom, 0, Bias::Backward),
            Some(Point::new(ab, 0))
        );
    }
}
