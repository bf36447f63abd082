pub mod commands;
pub mod common;
pub mod context;
pub mod error;
pub mod events;
pub mod kernel;
pub mod plugin;
pub mod search;
pub mod selection;
pub mod spellcheck;
pub mod ui;
pub mod undo;

// Re-export key types for easier usage
pub use commands::{AnchorValue, CommandRegistry, CommandValue, EditorCommand, LinkValue, Misspelling};
pub use context::EditContext;
pub use error::RteError;
pub use events::{EditorEvent, ListenerId, Notice, UiEvent, UiEventPayload, UiListener};
pub use kernel::{EditorKernel, KernelState};
pub use plugin::{
    DialogFlow, ExecEnv, FindReplacePlugin, LinkPlugin, Outcome, Plugin, PluginFactory,
    PluginRegistry, SpellCheckerPlugin, UndoPlugin,
};
pub use search::{FindOptions, Match, MatchSegment, SearchError, SearchableDocument, TextRef};
pub use selection::{
    Bookmark, CharSpan, Point, ProcessingSelection, Range, Restored, SelectionDefinition,
    create_processing_selection, create_range_bookmark, is_exchangeable, select_bookmark,
};
pub use ui::{
    DialogHelper, DialogHost, DialogId, DialogResult, DialogSpec, DialogValues,
    HeadlessDialogHost, Toolbar, ToolbarBuilder, ToolbarItem, ToolbarOptions, ToolbarPlacement,
};
pub use undo::{Snapshot, UndoHistory};
