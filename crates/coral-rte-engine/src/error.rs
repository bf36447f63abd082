use coral_rte_dom::{DomError, MarkupError};

use crate::kernel::KernelState;
use crate::search::SearchError;
use crate::spellcheck::SpellCheckError;
use crate::ui::dialog::DialogConfigError;

#[derive(Debug, thiserror::Error)]
pub enum RteError {
    #[error("no plugin or command handles {0:?}")]
    UnknownCommand(String),
    #[error("command {command:?} needs a {expected} value")]
    InvalidValue {
        command: String,
        expected: &'static str,
    },
    #[error("command {0:?} cannot edit across blocks")]
    CrossBlockRange(String),
    #[error("operation not allowed while the editor is {0:?}")]
    InvalidState(KernelState),
    #[error("the edit context has not been initialized")]
    NoEditContext,
    #[error("no dialog is open")]
    NoDialogOpen,
    #[error("dialog host failed: {0}")]
    DialogHost(String),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error(transparent)]
    DialogConfig(#[from] DialogConfigError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    SpellCheck(#[from] SpellCheckError),
}
