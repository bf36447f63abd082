//! # Selections and Bookmarks
//!
//! A live selection is a [`Range`] of two DOM [`Point`]s stored in the
//! [`EditContext`]. Commands that run across a dialog round trip cannot hold
//! on to it, so they capture a [`Bookmark`] instead:
//!
//! - [`Bookmark::Dom`] keeps the node/offset anchors plus the character span
//!   they covered when captured.
//! - [`Bookmark::Chars`] keeps only the character span, relative to the
//!   flattened text of the editable root.
//!
//! [`select_bookmark`] restores either kind and reports how faithful the
//! restoration was through [`Restored`].

mod definition;
mod exchange;

use coral_rte_dom::{NodeId, TextTree};
use serde::{Deserialize, Serialize};

use crate::common::{Bias, PositionMap};
use crate::context::EditContext;

pub use definition::{SelectionDefinition, UndoAvailability};
pub use exchange::{is_exchangeable, is_exchangeable_in};

/// A DOM position. `offset == None` is the end-of-block sentinel, "after all
/// children" (or after the last char of a text node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub node: NodeId,
    pub offset: Option<usize>,
}

impl Point {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self {
            node,
            offset: Some(offset),
        }
    }

    /// End-of-block point of `node`.
    pub fn eob(node: NodeId) -> Self {
        Self { node, offset: None }
    }

    /// The numeric offset, with EOB resolved against the current tree.
    pub fn resolved_offset<T: TextTree>(&self, tree: &T) -> usize {
        self.offset.unwrap_or_else(|| tree.char_len(self.node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Point,
    pub end: Point,
}

impl Range {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn caret(point: Point) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Character span relative to the editable root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharSpan {
    pub start_pos: usize,
    pub char_cnt: usize,
}

impl CharSpan {
    pub fn new(start_pos: usize, end_pos: usize) -> Self {
        Self {
            start_pos: start_pos.min(end_pos),
            char_cnt: end_pos.abs_diff(start_pos),
        }
    }

    pub fn end_pos(&self) -> usize {
        self.start_pos + self.char_cnt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bookmark {
    Dom {
        start: Point,
        end: Point,
        /// Span covered at capture time, used when the anchors are gone.
        chars: CharSpan,
    },
    Chars(CharSpan),
}

impl Bookmark {
    pub fn chars(&self) -> CharSpan {
        match self {
            Bookmark::Dom { chars, .. } | Bookmark::Chars(chars) => *chars,
        }
    }
}

/// How [`select_bookmark`] placed the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// The recorded anchors (or char span, for char bookmarks) were usable.
    Exact,
    /// The anchor nodes are still attached but the offsets no longer fit,
    /// e.g. after a text node was split. The char span was used instead.
    Equivalent,
    /// An anchor node was removed; the char span was used.
    CharFallback,
    /// Nothing recorded could be resolved; the caret went to the document end.
    DocumentEnd,
}

/// A selection normalized for text processing: both ends sit inside text
/// nodes that carry characters, offsets are explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSelection {
    pub start_node: NodeId,
    pub start_offset: usize,
    pub end_node: NodeId,
    pub end_offset: usize,
}

impl ProcessingSelection {
    pub fn start(&self) -> Point {
        Point::new(self.start_node, self.start_offset)
    }

    pub fn end(&self) -> Point {
        Point::new(self.end_node, self.end_offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start_node == self.end_node && self.start_offset == self.end_offset
    }
}

/// Gaps of the current selection in document order, or `None` if there is
/// no selection or it points outside the editable root.
fn ordered_gaps(ctx: &EditContext, map: &PositionMap) -> Option<(usize, usize, Range)> {
    let range = ctx.selection()?;
    let tree = ctx.document();
    let start = map.gap_of(tree, &range.start)?;
    let end = map.gap_of(tree, &range.end)?;
    if end < start {
        Some((end, start, Range::new(range.end, range.start)))
    } else {
        Some((start, end, range))
    }
}

/// Capture the current selection, caret or range, as a DOM anchored bookmark.
pub fn create_range_bookmark(ctx: &EditContext) -> Option<Bookmark> {
    let map = PositionMap::build(ctx.document(), ctx.root());
    let (start_gap, end_gap, range) = ordered_gaps(ctx, &map)?;
    Some(Bookmark::Dom {
        start: range.start,
        end: range.end,
        chars: CharSpan::new(map.char_pos(start_gap), map.char_pos(end_gap)),
    })
}

/// Normalize the current selection for find/replace style processing.
///
/// The start moves forward to the next character and the end moves back to
/// the previous one, skipping empty text nodes and element boundaries. A
/// caret stays collapsed, anchored in the nearest character bearing text node.
pub fn create_processing_selection(ctx: &EditContext) -> Option<ProcessingSelection> {
    let tree = ctx.document();
    let map = PositionMap::build(tree, ctx.root());
    let (start_gap, end_gap, _) = ordered_gaps(ctx, &map)?;

    let start_pos = map.char_pos(start_gap);
    let end_pos = map.char_pos(end_gap);
    let (start, end) = if start_pos == end_pos {
        let caret = map
            .point_at_char(tree, start_pos, Bias::Forward)
            .unwrap_or_else(|| map.point_at_gap(tree, start_gap, Bias::Forward));
        (caret, caret)
    } else {
        let start = map
            .next_char_point(start_gap)
            .unwrap_or_else(|| map.point_at_gap(tree, start_gap, Bias::Forward));
        let end = map
            .previous_char_point(end_gap)
            .unwrap_or_else(|| map.point_at_gap(tree, end_gap, Bias::Backward));
        (start, end)
    };

    Some(ProcessingSelection {
        start_node: start.node,
        start_offset: start.resolved_offset(tree),
        end_node: end.node,
        end_offset: end.resolved_offset(tree),
    })
}

/// Character bookmark for a processing selection.
pub fn bookmark_from_processing_selection(
    ctx: &EditContext,
    selection: &ProcessingSelection,
) -> Option<Bookmark> {
    let tree = ctx.document();
    let map = PositionMap::build(tree, ctx.root());
    let start = map.char_pos_of(tree, &selection.start())?;
    let end = map.char_pos_of(tree, &selection.end())?;
    Some(Bookmark::Chars(CharSpan::new(start, end)))
}

/// Character position of the first selection boundary in document order.
pub fn get_first_selection_offset(ctx: &EditContext) -> Option<usize> {
    let map = PositionMap::build(ctx.document(), ctx.root());
    ordered_gaps(ctx, &map).map(|(start, _, _)| map.char_pos(start))
}

/// Character position of the last selection boundary in document order.
pub fn get_last_selection_offset(ctx: &EditContext) -> Option<usize> {
    let map = PositionMap::build(ctx.document(), ctx.root());
    ordered_gaps(ctx, &map).map(|(_, end, _)| map.char_pos(end))
}

/// Resolve a char span to a range, preferring text node anchors.
pub fn range_for_chars<T: TextTree>(tree: &T, map: &PositionMap, span: CharSpan) -> Option<Range> {
    let start = map.point_at_char(tree, span.start_pos, Bias::Forward)?;
    if span.char_cnt == 0 {
        return Some(Range::caret(start));
    }
    let end = map.point_at_char(tree, span.end_pos(), Bias::Backward)?;
    Some(Range::new(start, end))
}

/// Restore the live selection from a bookmark.
///
/// Anchors are used when both still resolve inside the editable root. The
/// char span is the fallback, and a caret at the document end is the last
/// resort, so this always leaves a selection in place.
pub fn select_bookmark(ctx: &mut EditContext, bookmark: &Bookmark) -> Restored {
    let map = PositionMap::build(ctx.document(), ctx.root());
    let tree = ctx.document();

    let (range, restored) = match bookmark {
        Bookmark::Dom { start, end, chars } => {
            if map.gap_of(tree, start).is_some() && map.gap_of(tree, end).is_some() {
                (Some(Range::new(*start, *end)), Restored::Exact)
            } else {
                let attached = [start.node, end.node]
                    .into_iter()
                    .all(|node| tree.is_attached(node) && tree.contains(ctx.root(), node));
                let kind = if attached {
                    Restored::Equivalent
                } else {
                    Restored::CharFallback
                };
                (range_for_chars(tree, &map, *chars), kind)
            }
        }
        Bookmark::Chars(chars) => (range_for_chars(tree, &map, *chars), Restored::Exact),
    };

    let (range, restored) = match range {
        Some(range) => (range, restored),
        None => {
            log::warn!(
                "bookmark {:?} no longer resolves, moving the caret to the document end",
                bookmark.chars()
            );
            let end = map
                .point_at_char(tree, map.total_chars(), Bias::Backward)
                .unwrap_or_else(|| Point::eob(ctx.root()));
            (Range::caret(end), Restored::DocumentEnd)
        }
    };
    if restored != Restored::Exact {
        log::debug!("selection restored via {restored:?}");
    }
    ctx.set_selection(Some(range));
    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_rte_dom::{Dom, parse_markup};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn context(markup: &str) -> EditContext {
        EditContext::new(parse_markup(markup).unwrap())
    }

    fn text_node(ctx: &EditContext, content: &str) -> NodeId {
        let tree = ctx.document();
        tree.text_nodes(tree.root())
            .into_iter()
            .find(|&n| tree.text(n) == Some(content))
            .unwrap()
    }

    #[rstest]
    #[case::caret(0, 0)]
    #[case::inside_one_node(1, 2)]
    #[case::across_nodes(2, 4)]
    fn bookmark_round_trip_restores_the_same_range(#[case] from: usize, #[case] to: usize) {
        let mut ctx = context("<p>abc<b>def</b></p>");
        let map = PositionMap::build(ctx.document(), ctx.root());
        let range = range_for_chars(ctx.document(), &map, CharSpan::new(from, to)).unwrap();
        ctx.set_selection(Some(range));

        let bookmark = create_range_bookmark(&ctx).unwrap();
        ctx.set_selection(None);

        assert_eq!(select_bookmark(&mut ctx, &bookmark), Restored::Exact);
        assert_eq!(ctx.selection(), Some(range));
        assert_eq!(bookmark.chars(), CharSpan::new(from, to));
    }

    #[test]
    fn reversed_selection_is_bookmarked_in_document_order() {
        let mut ctx = context("<p>hello</p>");
        let text = text_node(&ctx, "hello");
        ctx.set_selection(Some(Range::new(Point::new(text, 4), Point::new(text, 1))));

        let bookmark = create_range_bookmark(&ctx).unwrap();

        assert_eq!(
            bookmark,
            Bookmark::Dom {
                start: Point::new(text, 1),
                end: Point::new(text, 4),
                chars: CharSpan::new(1, 4),
            }
        );
        assert_eq!(get_first_selection_offset(&ctx), Some(1));
        assert_eq!(get_last_selection_offset(&ctx), Some(4));
    }

    #[test]
    fn split_anchor_falls_back_to_an_equivalent_position() {
        let mut ctx = context("<p>hello world</p>");
        let text = text_node(&ctx, "hello world");
        ctx.set_selection(Some(Range::new(Point::new(text, 6), Point::new(text, 11))));
        let bookmark = create_range_bookmark(&ctx).unwrap();

        let right = ctx.document_mut().split_text(text, 3).unwrap();
        ctx.document_mut().wrap(right, "span", Vec::new()).unwrap();

        assert_eq!(select_bookmark(&mut ctx, &bookmark), Restored::Equivalent);
        assert_eq!(
            ctx.selection(),
            Some(Range::new(Point::new(right, 3), Point::new(right, 8)))
        );
    }

    #[test]
    fn removed_anchor_uses_the_char_span() {
        let mut ctx = context("<p>ab</p><p>cd</p>");
        let cd = text_node(&ctx, "cd");
        ctx.set_selection(Some(Range::caret(Point::new(cd, 1))));
        let bookmark = create_range_bookmark(&ctx).unwrap();

        let paragraph = ctx.document().parent(cd).unwrap();
        let replacement = ctx.document_mut().create_text("xy");
        ctx.document_mut().remove(cd).unwrap();
        ctx.document_mut().append_child(paragraph, replacement).unwrap();

        assert_eq!(select_bookmark(&mut ctx, &bookmark), Restored::CharFallback);
        assert_eq!(ctx.selection(), Some(Range::caret(Point::new(replacement, 1))));
    }

    #[test]
    fn unresolvable_bookmark_goes_to_document_end() {
        let mut ctx = context("<p>abc</p>");
        let abc = text_node(&ctx, "abc");

        let restored = select_bookmark(&mut ctx, &Bookmark::Chars(CharSpan::new(40, 41)));

        assert_eq!(restored, Restored::DocumentEnd);
        assert_eq!(ctx.selection(), Some(Range::caret(Point::new(abc, 3))));
    }

    #[test]
    fn empty_document_end_is_inside_the_root() {
        let mut ctx = EditContext::new(Dom::default());
        let restored = select_bookmark(&mut ctx, &Bookmark::Chars(CharSpan::new(3, 3)));
        assert_eq!(restored, Restored::DocumentEnd);
        assert_eq!(ctx.selection(), Some(Range::caret(Point::new(ctx.root(), 0))));
    }

    #[test]
    fn processing_selection_skips_empty_text_and_boundaries() {
        let mut dom = parse_markup("<p>ab</p><p><b>cd</b></p>").unwrap();
        let first = dom.children(dom.root())[0];
        let empty = dom.create_text("");
        dom.append_child(first, empty).unwrap();
        let mut ctx = EditContext::new(dom);
        let cd = text_node(&ctx, "cd");
        let second = ctx.document().children(ctx.root())[1];

        // From the empty node at the end of the first paragraph to the end of
        // the second one.
        ctx.set_selection(Some(Range::new(Point::new(empty, 0), Point::eob(second))));
        let processing = create_processing_selection(&ctx).unwrap();

        assert_eq!(processing.start(), Point::new(cd, 0));
        assert_eq!(processing.end(), Point::new(cd, 2));
        assert_eq!(
            bookmark_from_processing_selection(&ctx, &processing),
            Some(Bookmark::Chars(CharSpan::new(3, 5)))
        );
    }

    #[test]
    fn processing_caret_stays_collapsed() {
        let mut ctx = context("<p>ab<i>cd</i></p>");
        let p = ctx.document().children(ctx.root())[0];
        let cd = text_node(&ctx, "cd");
        ctx.set_selection(Some(Range::caret(Point::new(p, 1))));

        let processing = create_processing_selection(&ctx).unwrap();

        assert!(processing.is_collapsed());
        assert_eq!(processing.start(), Point::new(cd, 0));
    }

    #[test]
    fn eob_points_resolve_to_the_end_of_the_node() {
        let mut ctx = context("<p>ab</p><p>cd</p>");
        let first = ctx.document().children(ctx.root())[0];
        ctx.set_selection(Some(Range::new(Point::new(first, 0), Point::eob(first))));

        assert_eq!(get_first_selection_offset(&ctx), Some(0));
        assert_eq!(get_last_selection_offset(&ctx), Some(2));
    }
}
