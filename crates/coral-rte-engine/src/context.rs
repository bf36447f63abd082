use coral_rte_dom::{Dom, NodeId, TextTree};

use crate::selection::Range;

/// The editing surface of one editor instance: the document, the editable
/// root inside it and the live selection.
///
/// The selection is plain data. Hosts push selection changes in through
/// [`crate::EditorKernel::handle_event`]; commands update it after they
/// mutate the tree.
#[derive(Debug, Clone)]
pub struct EditContext {
    pub(crate) document: Dom,
    root: NodeId,
    pub(crate) selection: Option<Range>,
}

impl EditContext {
    /// Edit the whole document below its root element.
    pub fn new(document: Dom) -> Self {
        let root = document.root();
        Self {
            document,
            root,
            selection: None,
        }
    }

    /// Edit only the subtree below `root`.
    pub fn with_root(document: Dom, root: NodeId) -> Self {
        Self {
            document,
            root,
            selection: None,
        }
    }

    pub fn document(&self) -> &Dom {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Dom {
        &mut self.document
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn revision(&self) -> u64 {
        self.document.revision()
    }

    pub fn selection(&self) -> Option<Range> {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Option<Range>) {
        self.selection = selection;
    }

    /// Swap in another document, e.g. an undo snapshot.
    ///
    /// The new document's revision is moved past the current one so indices
    /// built against the old tree are reported stale. The editable root
    /// keeps its id, so `document` must be derived from the current one.
    pub fn replace_document(&mut self, mut document: Dom) {
        document.bump_revision_past(self.document.revision());
        self.document = document;
        self.selection = None;
    }
}
