//! Bounded undo/redo history of whole-document snapshots.

use std::collections::VecDeque;

use coral_rte_dom::Dom;

use crate::context::EditContext;
use crate::selection::{Bookmark, create_range_bookmark, select_bookmark};

#[derive(Debug, Clone)]
pub struct Snapshot {
    document: Dom,
    selection: Option<Bookmark>,
}

impl Snapshot {
    pub fn capture(ctx: &EditContext) -> Self {
        Self {
            document: ctx.document().clone(),
            selection: create_range_bookmark(ctx),
        }
    }

    /// Put the snapshot's document and selection back into `ctx`.
    pub fn restore(self, ctx: &mut EditContext) {
        ctx.replace_document(self.document);
        if let Some(bookmark) = self.selection {
            select_bookmark(ctx, &bookmark);
        }
    }
}

#[derive(Debug, Clone)]
pub struct UndoHistory {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    max_steps: usize,
}

impl UndoHistory {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_steps,
        }
    }

    /// Record the state before an edit. Clears the redo stack.
    pub fn record(&mut self, snapshot: Snapshot) {
        if self.max_steps == 0 {
            return;
        }
        self.undo.push_back(snapshot);
        while self.undo.len() > self.max_steps {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Step back. `current` becomes the redo target.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_rte_dom::{TextTree, inner_markup, parse_markup};
    use pretty_assertions::assert_eq;

    fn context(markup: &str) -> EditContext {
        EditContext::new(parse_markup(markup).unwrap())
    }

    fn edit(ctx: &mut EditContext, history: &mut UndoHistory, text: &str) {
        history.record(Snapshot::capture(ctx));
        let node = ctx.document().text_nodes(ctx.root())[0];
        ctx.document_mut().set_text(node, text).unwrap();
    }

    fn markup(ctx: &EditContext) -> String {
        inner_markup(ctx.document(), ctx.root())
    }

    #[test]
    fn undo_and_redo_walk_the_history() {
        let mut ctx = context("<p>one</p>");
        let mut history = UndoHistory::new(10);
        edit(&mut ctx, &mut history, "two");
        edit(&mut ctx, &mut history, "three");

        let previous = history.undo(Snapshot::capture(&ctx)).unwrap();
        previous.restore(&mut ctx);
        assert_eq!(markup(&ctx), "<p>two</p>");

        let next = history.redo(Snapshot::capture(&ctx)).unwrap();
        next.restore(&mut ctx);
        assert_eq!(markup(&ctx), "<p>three</p>");
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn history_is_bounded() {
        let mut ctx = context("<p>0</p>");
        let mut history = UndoHistory::new(2);
        for step in 1..=4 {
            edit(&mut ctx, &mut history, &step.to_string());
        }

        let mut seen = Vec::new();
        while let Some(snapshot) = history.undo(Snapshot::capture(&ctx)) {
            snapshot.restore(&mut ctx);
            seen.push(markup(&ctx));
        }
        assert_eq!(seen, vec!["<p>3</p>", "<p>2</p>"]);
    }

    #[test]
    fn new_edits_drop_the_redo_stack() {
        let mut ctx = context("<p>a</p>");
        let mut history = UndoHistory::new(5);
        edit(&mut ctx, &mut history, "b");
        history.undo(Snapshot::capture(&ctx)).unwrap().restore(&mut ctx);
        assert!(history.can_redo());

        edit(&mut ctx, &mut history, "c");
        assert!(!history.can_redo());
    }

    #[test]
    fn restoring_moves_the_revision_forward() {
        let mut ctx = context("<p>a</p>");
        let mut history = UndoHistory::new(5);
        edit(&mut ctx, &mut history, "b");
        let before = ctx.revision();

        history.undo(Snapshot::capture(&ctx)).unwrap().restore(&mut ctx);

        assert!(ctx.revision() > before);
    }
}
