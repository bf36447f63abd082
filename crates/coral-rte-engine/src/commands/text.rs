use coral_rte_dom::{NodeId, TextTree, is_block_tag};

use super::{CommandValue, EditorCommand, invalid_value, isolate_selection, prune_empty_inline};
use crate::RteError;
use crate::common::{PositionMap, TokenKind};
use crate::context::EditContext;
use crate::selection::{Point, Range, create_processing_selection};

/// `inserttext`: replace the selected characters by plain text.
///
/// The text goes into the first selected text node so it keeps that node's
/// formatting. `br`, `img` and other void elements in the selection are
/// removed with it. A selection spanning more than one block is rejected.
/// The caret ends up right after the inserted text.
pub struct InsertTextCommand;

impl InsertTextCommand {
    /// Void elements inside the selection, and its start point.
    fn scan(ctx: &EditContext, command: &str) -> Result<Option<(Vec<NodeId>, Point)>, RteError> {
        let Some(range) = ctx.selection() else {
            return Ok(None);
        };
        let tree = ctx.document();
        let map = PositionMap::build(tree, ctx.root());
        let (Some(a), Some(b)) = (map.gap_of(tree, &range.start), map.gap_of(tree, &range.end)) else {
            return Ok(None);
        };
        let mut voids = Vec::new();
        for token in map.between(a, b) {
            match token.kind {
                TokenKind::Open | TokenKind::Close if tree.tag(token.node).is_some_and(is_block_tag) => {
                    return Err(RteError::CrossBlockRange(command.to_string()));
                }
                TokenKind::Void => voids.push(token.node),
                _ => {}
            }
        }
        let start = if a <= b { range.start } else { range.end };
        Ok(Some((voids, start)))
    }

    fn remove_voids(ctx: &mut EditContext, voids: &[NodeId]) -> Result<(), RteError> {
        for &void in voids {
            let parent = ctx.document().parent(void);
            ctx.document_mut().remove(void)?;
            if let Some(parent) = parent {
                prune_empty_inline(ctx, parent)?;
            }
        }
        Ok(())
    }

    fn insert_at_caret(ctx: &mut EditContext, text: &str) -> Result<(), RteError> {
        let Some(caret) = create_processing_selection(ctx) else {
            return Ok(());
        };
        let point = caret.start();
        let inserted = text.chars().count();
        let dom = ctx.document_mut();
        let caret = if dom.is_text(point.node) {
            let offset = point.resolved_offset(dom);
            dom.splice_text(point.node, offset, offset, text)?;
            Point::new(point.node, offset + inserted)
        } else {
            let node = dom.create_text(text);
            dom.insert_child(point.node, point.resolved_offset(dom), node)?;
            Point::new(node, inserted)
        };
        ctx.set_selection(Some(Range::caret(caret)));
        Ok(())
    }
}

impl EditorCommand for InsertTextCommand {
    fn ids(&self) -> &'static [&'static str] {
        &["inserttext"]
    }

    fn execute(
        &self,
        ctx: &mut EditContext,
        command: &str,
        value: Option<&CommandValue>,
    ) -> Result<(), RteError> {
        let Some(CommandValue::Text(text)) = value else {
            return Err(invalid_value(command, "text"));
        };
        let (voids, start) = match Self::scan(ctx, command)? {
            Some(scanned) => scanned,
            None => return Self::insert_at_caret(ctx, text),
        };
        let nodes = isolate_selection(ctx)?;
        let Some((&first, rest)) = nodes.split_first() else {
            ctx.set_selection(Some(Range::caret(start)));
            Self::remove_voids(ctx, &voids)?;
            return Self::insert_at_caret(ctx, text);
        };

        ctx.document_mut().set_text(first, text)?;
        for &node in rest {
            let parent = ctx.document().parent(node);
            ctx.document_mut().remove(node)?;
            if let Some(parent) = parent {
                prune_empty_inline(ctx, parent)?;
            }
        }
        Self::remove_voids(ctx, &voids)?;
        let caret = Point::new(first, text.chars().count());
        ctx.set_selection(Some(Range::caret(caret)));
        Ok(())
    }
}
