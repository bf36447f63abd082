//! # Dialogs
//!
//! The engine never draws dialogs. [`DialogHelper::create`] turns a plugin's
//! [`DialogConfig`] into a [`DialogSpec`] (the fields to show), and a
//! host-provided [`DialogHost`] instantiates, shows and hides it.
//!
//! Hosts customise plugin dialogs in three layers:
//!
//! 1. `custom_dialog` replaces the dialog outright; everything else is ignored.
//! 2. `additional_fields` inserts fields into the default dialog, each before
//!    a named field or at the end.
//! 3. `disabled_default_fields` removes default fields by name.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use coral_rte_config::{AdditionalField, DialogConfig, DialogDefinition, FieldDefinition};
use uuid::Uuid;

use crate::RteError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DialogConfigError {
    #[error("dialog configuration has neither a custom nor a default dialog")]
    MissingDefaultDialog,
    #[error("dialog {title:?} has no dialog class")]
    MissingDialogClass { title: String },
    #[error("dialog {title:?} has no items")]
    MissingItems { title: String },
}

/// A fully resolved dialog, ready for [`DialogHost::instantiate_dialog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSpec {
    pub dialog_class: String,
    pub title: String,
    pub items: Vec<FieldDefinition>,
}

impl DialogSpec {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.items.iter().find(|f| f.name == name)
    }
}

pub struct DialogHelper;

impl DialogHelper {
    /// Resolve a dialog configuration. Misconfiguration fails here, before
    /// anything is shown.
    pub fn create(config: &DialogConfig) -> Result<DialogSpec, DialogConfigError> {
        if let Some(custom) = &config.custom_dialog {
            return Self::validate(custom);
        }
        let default = config
            .default_dialog
            .as_ref()
            .ok_or(DialogConfigError::MissingDefaultDialog)?;
        let mut spec = Self::validate(default)?;
        Self::remove_disabled_items(&mut spec.items, &config.disabled_default_fields);
        Self::add_additional_items(&mut spec.items, &config.additional_fields);
        Ok(spec)
    }

    fn validate(definition: &DialogDefinition) -> Result<DialogSpec, DialogConfigError> {
        let dialog_class = definition.dialog_class.clone().ok_or_else(|| {
            DialogConfigError::MissingDialogClass {
                title: definition.title.clone(),
            }
        })?;
        let items = definition
            .items
            .clone()
            .ok_or_else(|| DialogConfigError::MissingItems {
                title: definition.title.clone(),
            })?;
        Ok(DialogSpec {
            dialog_class,
            title: definition.title.clone(),
            items,
        })
    }

    /// Insert fields in order, each before its `insert_before` field when
    /// present, otherwise at the end.
    pub fn add_additional_items(items: &mut Vec<FieldDefinition>, additional: &[AdditionalField]) {
        for extra in additional {
            let position = extra
                .insert_before
                .as_ref()
                .and_then(|name| items.iter().position(|f| &f.name == name))
                .unwrap_or(items.len());
            items.insert(position, extra.field.clone());
        }
    }

    pub fn remove_disabled_items(items: &mut Vec<FieldDefinition>, disabled: &[String]) {
        items.retain(|f| !disabled.contains(&f.name));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DialogId(Uuid);

impl DialogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DialogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DialogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dialog-{}", self.0)
    }
}

/// Field values exchanged with a dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogValues(BTreeMap<String, String>);

impl DialogValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_string(), value.to_string());
    }

    /// Value of a field, empty if the dialog did not send it.
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or_default()
    }

    /// Checkbox fields are checked when sent as `true` or `on`.
    pub fn is_checked(&self, name: &str) -> bool {
        matches!(self.get(name), "true" | "on")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// How a dialog was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogResult {
    Applied(DialogValues),
    Cancelled,
}

/// A plugin's request to suspend the editor behind a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogRequest {
    pub dialog: DialogId,
    pub initial: DialogValues,
}

/// Host side of dialog handling.
pub trait DialogHost {
    fn instantiate_dialog(&mut self, spec: &DialogSpec) -> Result<DialogId, RteError>;

    fn show(&mut self, dialog: DialogId, initial: &DialogValues) -> Result<(), RteError>;

    fn hide(&mut self, dialog: DialogId);

    /// Whether a previously instantiated dialog has to be built again, e.g.
    /// because the host tore down its UI.
    fn must_recreate(&self, _dialog: DialogId) -> bool {
        false
    }
}

/// Return the cached dialog, instantiating it when missing or stale.
///
/// `config` is the plugin's dialog configuration; `default` fills its
/// `default_dialog` when the host gave none.
pub fn ensure_dialog(
    host: &mut dyn DialogHost,
    cached: &mut Option<DialogId>,
    config: Option<&DialogConfig>,
    default: DialogDefinition,
) -> Result<DialogId, RteError> {
    if let Some(dialog) = *cached
        && !host.must_recreate(dialog)
    {
        return Ok(dialog);
    }
    let mut config = config.cloned().unwrap_or_default();
    if config.default_dialog.is_none() {
        config.default_dialog = Some(default);
    }
    let spec = DialogHelper::create(&config)?;
    let dialog = host.instantiate_dialog(&spec)?;
    log::debug!("instantiated {} as {dialog}", spec.dialog_class);
    *cached = Some(dialog);
    Ok(dialog)
}

#[derive(Debug, Default)]
struct HeadlessState {
    dialogs: BTreeMap<DialogId, DialogSpec>,
    visible: Option<(DialogId, DialogValues)>,
    stale: HashSet<DialogId>,
    shown: usize,
}

/// A [`DialogHost`] without UI. Clones share state, so a test or CLI can keep
/// a handle while the kernel owns another.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDialogHost {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessDialogHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dialog currently shown and the values it was opened with.
    pub fn visible(&self) -> Option<(DialogId, DialogValues)> {
        self.state.borrow().visible.clone()
    }

    pub fn spec(&self, dialog: DialogId) -> Option<DialogSpec> {
        self.state.borrow().dialogs.get(&dialog).cloned()
    }

    pub fn instantiated(&self) -> usize {
        self.state.borrow().dialogs.len()
    }

    pub fn shown_count(&self) -> usize {
        self.state.borrow().shown
    }

    pub fn mark_stale(&self, dialog: DialogId) {
        self.state.borrow_mut().stale.insert(dialog);
    }
}

impl DialogHost for HeadlessDialogHost {
    fn instantiate_dialog(&mut self, spec: &DialogSpec) -> Result<DialogId, RteError> {
        let dialog = DialogId::new();
        self.state.borrow_mut().dialogs.insert(dialog, spec.clone());
        Ok(dialog)
    }

    fn show(&mut self, dialog: DialogId, initial: &DialogValues) -> Result<(), RteError> {
        let mut state = self.state.borrow_mut();
        if !state.dialogs.contains_key(&dialog) {
            return Err(RteError::DialogHost(format!("unknown {dialog}")));
        }
        state.visible = Some((dialog, initial.clone()));
        state.shown += 1;
        Ok(())
    }

    fn hide(&mut self, dialog: DialogId) {
        let mut state = self.state.borrow_mut();
        if state.visible.as_ref().is_some_and(|(id, _)| *id == dialog) {
            state.visible = None;
        }
    }

    fn must_recreate(&self, dialog: DialogId) -> bool {
        self.state.borrow().stale.contains(&dialog)
    }
}
