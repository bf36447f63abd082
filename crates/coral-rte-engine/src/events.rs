//! Events flowing between host, kernel and plugins.

use std::fmt;

use crate::selection::{Range, SelectionDefinition};
use crate::ui::DialogId;

/// Host input the kernel reacts to while active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// The user moved the selection. `None` clears it.
    SelectionChange(Option<Range>),
    KeyUp,
    MouseUp,
    /// The host edited the document directly.
    ContentChanged,
}

/// Named UI events listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiEvent {
    UpdateState,
    DialogShow,
    DialogHide,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEventPayload {
    UpdateState(SelectionDefinition),
    DialogShow(DialogId),
    DialogHide(DialogId),
}

impl UiEventPayload {
    pub fn event(&self) -> UiEvent {
        match self {
            UiEventPayload::UpdateState(_) => UiEvent::UpdateState,
            UiEventPayload::DialogShow(_) => UiEvent::DialogShow,
            UiEventPayload::DialogHide(_) => UiEvent::DialogHide,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) usize);

pub type UiListener = Box<dyn FnMut(&UiEventPayload)>;

/// User-facing messages produced by commands. Hosts decide how to show them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The term does not occur in the document.
    TextNotFound { term: String },
    /// No further match; the next search starts again at the top.
    SearchRestarted { term: String },
    ReplacedCount(usize),
    EmptySearchTerm,
    NoSpellingErrors,
    Alert(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::TextNotFound { term } => write!(f, "The text \"{term}\" was not found."),
            Notice::SearchRestarted { term } => write!(
                f,
                "Reached the end of the document. The next search for \"{term}\" starts from the top."
            ),
            Notice::ReplacedCount(1) => write!(f, "Replaced 1 occurrence."),
            Notice::ReplacedCount(count) => write!(f, "Replaced {count} occurrences."),
            Notice::EmptySearchTerm => write!(f, "Please enter a text to search for."),
            Notice::NoSpellingErrors => write!(f, "No spelling mistakes found."),
            Notice::Alert(message) => write!(f, "{message}"),
        }
    }
}
