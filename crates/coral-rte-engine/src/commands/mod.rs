//! # DOM Mutation Commands
//!
//! Commands are the only code that edits the document. Plugins reach them
//! through [`crate::ExecEnv::relay`], which is also where undo snapshots are
//! taken. Each command reads the live selection from the [`EditContext`],
//! mutates the tree and leaves a selection that covers the result.
//!
//! | Id | Value | Effect |
//! |---|---|---|
//! | `modifylink` | [`CommandValue::Link`] | create or edit `<a href>` |
//! | `unlink` | none | unwrap links touching the selection |
//! | `anchor` | [`CommandValue::Anchor`] | create, rename or remove `<a name>` |
//! | `inserttext` | [`CommandValue::Text`] | replace the selection by text |
//! | `spellcheckmark` | [`CommandValue::SpellCheck`] | wrap misspelled words |
//! | `spellcheckclear` | none | remove spell-check markers |

mod link;
mod spellcheck;
mod text;

use coral_rte_dom::{NodeId, TextTree, is_block_tag, is_void_tag};

use crate::RteError;
use crate::common::{PositionMap, TokenKind};
use crate::context::EditContext;
use crate::selection::{Point, Range};

pub use link::{AnchorCommand, AnchorValue, LinkValue, ModifyLinkCommand, UnlinkCommand};
pub use spellcheck::{
    MARKER_CLASS, Misspelling, SpellCheckClearCommand, SpellCheckMarkCommand, markers,
};
pub use text::InsertTextCommand;

/// Payload of a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandValue {
    Link(LinkValue),
    Anchor(AnchorValue),
    Text(String),
    SpellCheck(Vec<Misspelling>),
}

pub trait EditorCommand {
    /// Command ids this implementation answers to.
    fn ids(&self) -> &'static [&'static str];

    fn execute(
        &self,
        ctx: &mut EditContext,
        command: &str,
        value: Option<&CommandValue>,
    ) -> Result<(), RteError>;
}

/// Table of the DOM mutation commands available to plugins.
pub struct CommandRegistry {
    commands: Vec<Box<dyn EditorCommand>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CommandRegistry {
    pub fn empty() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ModifyLinkCommand));
        registry.register(Box::new(UnlinkCommand));
        registry.register(Box::new(AnchorCommand));
        registry.register(Box::new(InsertTextCommand));
        registry.register(Box::new(SpellCheckMarkCommand));
        registry.register(Box::new(SpellCheckClearCommand));
        registry
    }

    /// Add a command; later registrations win for shared ids.
    pub fn register(&mut self, command: Box<dyn EditorCommand>) {
        self.commands.insert(0, command);
    }

    pub fn get(&self, id: &str) -> Option<&dyn EditorCommand> {
        self.commands
            .iter()
            .find(|c| c.ids().contains(&id))
            .map(|c| c.as_ref())
    }

    pub fn supports(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn execute(
        &self,
        ctx: &mut EditContext,
        id: &str,
        value: Option<&CommandValue>,
    ) -> Result<(), RteError> {
        let command = self
            .get(id)
            .ok_or_else(|| RteError::UnknownCommand(id.to_string()))?;
        log::debug!("executing command {id}");
        command.execute(ctx, id, value)
    }
}

fn invalid_value(command: &str, expected: &'static str) -> RteError {
    RteError::InvalidValue {
        command: command.to_string(),
        expected,
    }
}

/// Split text nodes at the selection boundaries so the selected characters
/// are exactly covered by whole text nodes.
///
/// Returns those nodes in document order and moves the selection onto them.
/// A selection without characters yields no nodes and is left untouched.
pub(crate) fn isolate_selection(ctx: &mut EditContext) -> Result<Vec<NodeId>, RteError> {
    let Some(range) = ctx.selection() else {
        return Ok(Vec::new());
    };
    let tree = ctx.document();
    let map = PositionMap::build(tree, ctx.root());
    let (Some(a), Some(b)) = (map.gap_of(tree, &range.start), map.gap_of(tree, &range.end)) else {
        return Ok(Vec::new());
    };

    // (node, first char, one past the last char)
    let mut pieces: Vec<(NodeId, usize, usize)> = Vec::new();
    for token in map.between(a, b) {
        if let TokenKind::Char(offset) = token.kind {
            match pieces.last_mut() {
                Some((node, _, end)) if *node == token.node => *end = offset + 1,
                _ => pieces.push((token.node, offset, offset + 1)),
            }
        }
    }

    let mut nodes = Vec::with_capacity(pieces.len());
    for (node, start, end) in pieces {
        let dom = ctx.document_mut();
        let len = dom.char_len(node);
        if end < len {
            dom.split_text(node, end)?;
        }
        let isolated = if start > 0 {
            dom.split_text(node, start)?
        } else {
            node
        };
        nodes.push(isolated);
    }

    if let (Some(&first), Some(&last)) = (nodes.first(), nodes.last()) {
        let end = Point::new(last, ctx.document().char_len(last));
        ctx.set_selection(Some(Range::new(Point::new(first, 0), end)));
    }
    Ok(nodes)
}

/// Remove `node`'s inline ancestors that became empty, stopping at blocks
/// and the editable root.
pub(crate) fn prune_empty_inline(ctx: &mut EditContext, node: NodeId) -> Result<(), RteError> {
    let root = ctx.root();
    let mut current = Some(node);
    while let Some(candidate) = current {
        let dom = ctx.document();
        let removable = candidate != root
            && dom.tag(candidate).is_some_and(|t| !is_block_tag(t) && !is_void_tag(t))
            && dom.children(candidate).is_empty();
        if !removable {
            break;
        }
        current = dom.parent(candidate);
        ctx.document_mut().remove(candidate)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use coral_rte_dom::{NodeId, TextTree, inner_markup, parse_markup};

    use crate::common::PositionMap;
    use crate::context::EditContext;
    use crate::selection::{CharSpan, range_for_chars};

    /// Context over `markup` with chars `from..to` selected.
    pub fn selected(markup: &str, from: usize, to: usize) -> EditContext {
        let mut ctx = EditContext::new(parse_markup(markup).unwrap());
        let map = PositionMap::build(ctx.document(), ctx.root());
        let range = range_for_chars(ctx.document(), &map, CharSpan::new(from, to)).unwrap();
        ctx.set_selection(Some(range));
        ctx
    }

    pub fn markup(ctx: &EditContext) -> String {
        inner_markup(ctx.document(), ctx.root())
    }

    pub fn selected_text(ctx: &EditContext) -> String {
        let range = ctx.selection().unwrap();
        let tree = ctx.document();
        let map = PositionMap::build(tree, ctx.root());
        let start = map.char_pos_of(tree, &range.start).unwrap();
        let end = map.char_pos_of(tree, &range.end).unwrap();
        let text: Vec<char> = flat_text(tree, ctx.root()).chars().collect();
        text[start.min(end)..start.max(end)].iter().collect()
    }

    fn flat_text<T: TextTree>(tree: &T, root: NodeId) -> String {
        crate::search::SearchableDocument::create(tree, root)
            .text()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn isolate_splits_at_both_ends() {
        let mut ctx = selected("<p>hello <b>bold</b> world</p>", 3, 13);

        let nodes = isolate_selection(&mut ctx).unwrap();

        let texts: Vec<&str> = nodes
            .iter()
            .map(|&n| ctx.document().text(n).unwrap())
            .collect();
        assert_eq!(texts, vec!["lo ", "bold", " wo"]);
        assert_eq!(selected_text(&ctx), "lo bold wo");
        assert_eq!(markup(&ctx), "<p>hello <b>bold</b> world</p>");
    }

    #[test]
    fn isolate_caret_yields_nothing() {
        let mut ctx = selected("<p>hello</p>", 2, 2);
        assert!(isolate_selection(&mut ctx).unwrap().is_empty());
    }

    #[test]
    fn unknown_command_is_an_error() {
        let mut ctx = selected("<p>hello</p>", 0, 1);
        let err = CommandRegistry::with_defaults()
            .execute(&mut ctx, "bold", None)
            .unwrap_err();
        assert!(matches!(err, RteError::UnknownCommand(id) if id == "bold"));
    }

    #[test]
    fn prune_stops_at_blocks() {
        let mut ctx = selected("<p><i><b>x</b></i></p>", 0, 1);
        let x = ctx.document().text_nodes(ctx.root())[0];
        let b = ctx.document().parent(x).unwrap();
        ctx.document_mut().remove(x).unwrap();

        prune_empty_inline(&mut ctx, b).unwrap();

        assert_eq!(markup(&ctx), "<p></p>");
    }
}
