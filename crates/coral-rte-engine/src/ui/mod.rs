//! Toolbar and dialog plumbing between plugins and the host UI.

pub mod dialog;
pub mod toolbar;

pub use dialog::{
    DialogConfigError, DialogHelper, DialogHost, DialogId, DialogRequest, DialogResult, DialogSpec,
    DialogValues, HeadlessDialogHost, ensure_dialog,
};
pub use toolbar::{
    IconRegistry, Toolbar, ToolbarBuilder, ToolbarElement, ToolbarItem, ToolbarOptions,
    ToolbarPlacement,
};
