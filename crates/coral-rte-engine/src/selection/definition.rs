use coral_rte_dom::{NodeId, TextTree};

use crate::common::{PositionMap, TokenKind};
use crate::context::EditContext;
use crate::selection::Point;

/// Whether the undo history has steps in either direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UndoAvailability {
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Read-only facts about the current selection, recomputed on every toolbar
/// update so plugins can decide their enabled/selected state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDefinition {
    pub anchor_count: usize,
    pub named_anchor_count: usize,
    /// True for a non-collapsed selection covering at least one character.
    pub is_selection: bool,
    /// The single element the selection covers exactly, if any.
    pub selected_dom: Option<NodeId>,
    /// `a[href]` elements touched by the selection, in document order.
    pub anchors: Vec<NodeId>,
    /// `a[name]` elements touched by the selection, in document order.
    pub named_anchors: Vec<NodeId>,
    pub start_pos: usize,
    pub end_pos: usize,
    pub undo: UndoAvailability,
}

impl SelectionDefinition {
    pub fn compute(ctx: &EditContext) -> Self {
        let tree = ctx.document();
        let root = ctx.root();
        let Some(range) = ctx.selection() else {
            return Self::default();
        };
        let map = PositionMap::build(tree, root);
        let (Some(a), Some(b)) = (map.gap_of(tree, &range.start), map.gap_of(tree, &range.end)) else {
            log::debug!("selection {range:?} is outside the editable root");
            return Self::default();
        };
        let (start_gap, end_gap) = (a.min(b), a.max(b));
        let between = map.between(start_gap, end_gap);

        let mut touched: Vec<NodeId> = Vec::new();
        let mut collect = |node: NodeId| {
            if !touched.contains(&node) {
                touched.push(node);
            }
        };
        for point in [range.start, range.end] {
            for node in ancestors_below(tree, root, &point) {
                collect(node);
            }
        }
        for token in between {
            if token.kind == TokenKind::Open {
                collect(token.node);
            }
        }
        touched.sort_by_key(|&node| map.node_start(node).unwrap_or(0));

        let anchors: Vec<NodeId> = touched
            .iter()
            .copied()
            .filter(|&n| tree.is_tag(n, "a") && tree.attr(n, "href").is_some())
            .collect();
        let named_anchors: Vec<NodeId> = touched
            .iter()
            .copied()
            .filter(|&n| tree.is_tag(n, "a") && tree.attr(n, "name").is_some())
            .collect();

        let selected_dom = match between {
            [only] if only.kind == TokenKind::Void => Some(only.node),
            [first, .., last]
                if first.kind == TokenKind::Open
                    && last.kind == TokenKind::Close
                    && first.node == last.node =>
            {
                Some(first.node)
            }
            _ => None,
        };

        let start_pos = map.char_pos(start_gap);
        let end_pos = map.char_pos(end_gap);
        Self {
            anchor_count: anchors.len(),
            named_anchor_count: named_anchors.len(),
            is_selection: start_pos != end_pos,
            selected_dom,
            anchors,
            named_anchors,
            start_pos,
            end_pos,
            undo: UndoAvailability::default(),
        }
    }
}

/// The point's node and its ancestors, stopping below `root`.
fn ancestors_below<T: TextTree>(tree: &T, root: NodeId, point: &Point) -> Vec<NodeId> {
    std::iter::once(point.node)
        .chain(tree.ancestors(point.node))
        .take_while(|&node| node != root)
        .filter(|&node| !tree.is_text(node))
        .collect()
}
