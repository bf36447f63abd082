//! # Plugins
//!
//! A plugin owns a set of features (command ids), contributes toolbar
//! buttons for them and turns user commands into DOM mutation commands,
//! optionally by way of a dialog.
//!
//! ## Lifecycle
//!
//! ```text
//! PluginRegistry factory ──→ notify_plugin_config ──→ initialize_ui
//!                                                        │
//!        ┌───────────────────── execute ◄────────────────┘
//!        │                         │
//!        │                 Outcome::OpenDialog ──→ on_dialog_action*
//!        │                         │                      │
//!        └──── update_state ◄── Outcome::Done ◄── on_dialog_result
//! ```
//!
//! Plugins never touch the document directly: they relay DOM commands
//! through [`ExecEnv::relay`], which records the undo step.

mod find_replace;
mod link;
mod spellcheck;
mod undo;

use std::collections::BTreeMap;

use coral_rte_config::{Config, PluginConfig};

use crate::RteError;
use crate::commands::{CommandRegistry, CommandValue};
use crate::context::EditContext;
use crate::events::Notice;
use crate::selection::SelectionDefinition;
use crate::ui::{DialogHost, DialogRequest, DialogResult, DialogValues, Toolbar, ToolbarBuilder};
use crate::undo::{Snapshot, UndoHistory};

pub use find_replace::FindReplacePlugin;
pub use link::LinkPlugin;
pub use spellcheck::SpellCheckerPlugin;
pub use undo::UndoPlugin;

/// What the kernel should do after [`Plugin::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Suspend the editor and show a dialog.
    OpenDialog(DialogRequest),
}

/// Whether a dialog stays open after an in-dialog action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogFlow {
    Continue,
    Close,
}

pub trait Plugin {
    fn id(&self) -> &str;

    /// Command ids this plugin can handle.
    fn features(&self) -> &'static [&'static str];

    /// Defaults merged under the host configuration.
    fn default_config(&self) -> PluginConfig {
        PluginConfig::default()
    }

    /// Receives the merged configuration once, before any other call.
    fn notify_plugin_config(&mut self, config: PluginConfig);

    fn initialize_ui(&mut self, toolbar: &mut ToolbarBuilder);

    fn execute(
        &mut self,
        command: &str,
        value: Option<&CommandValue>,
        env: &mut ExecEnv<'_>,
    ) -> Result<Outcome, RteError>;

    /// Reflect the selection in this plugin's toolbar buttons. Must not
    /// change the document.
    fn update_state(&self, selection: &SelectionDefinition, toolbar: &mut Toolbar);

    fn on_dialog_result(&mut self, _result: DialogResult, _env: &mut ExecEnv<'_>) -> Result<(), RteError> {
        Ok(())
    }

    fn on_dialog_action(
        &mut self,
        action: &str,
        _values: &DialogValues,
        _env: &mut ExecEnv<'_>,
    ) -> Result<DialogFlow, RteError> {
        log::debug!("{} ignores dialog action {action}", self.id());
        Ok(DialogFlow::Continue)
    }
}

/// Everything a plugin may use while handling one kernel call.
pub struct ExecEnv<'a> {
    edit_context: &'a mut EditContext,
    commands: &'a CommandRegistry,
    dialogs: &'a mut dyn DialogHost,
    undo: &'a mut UndoHistory,
    notices: Vec<Notice>,
    snapshot_taken: bool,
}

impl<'a> ExecEnv<'a> {
    pub fn new(
        edit_context: &'a mut EditContext,
        commands: &'a CommandRegistry,
        dialogs: &'a mut dyn DialogHost,
        undo: &'a mut UndoHistory,
    ) -> Self {
        Self {
            edit_context,
            commands,
            dialogs,
            undo,
            notices: Vec::new(),
            snapshot_taken: false,
        }
    }

    pub fn edit_context(&self) -> &EditContext {
        &*self.edit_context
    }

    /// Mutable access for selection changes. Document edits go through
    /// [`relay`](Self::relay).
    pub fn edit_context_mut(&mut self) -> &mut EditContext {
        &mut *self.edit_context
    }

    pub fn dialogs(&mut self) -> &mut dyn DialogHost {
        &mut *self.dialogs
    }

    pub fn selection_definition(&self) -> SelectionDefinition {
        SelectionDefinition::compute(&*self.edit_context)
    }

    /// Run a DOM mutation command.
    ///
    /// The first relayed command that changes the document records an undo
    /// step, so one kernel call is undone as a whole.
    pub fn relay(&mut self, command: &str, value: Option<CommandValue>) -> Result<(), RteError> {
        let before = self.edit_context.revision();
        let snapshot = (!self.snapshot_taken).then(|| Snapshot::capture(&*self.edit_context));
        self.commands
            .execute(&mut *self.edit_context, command, value.as_ref())?;
        if let Some(snapshot) = snapshot
            && self.edit_context.revision() != before
        {
            self.undo.record(snapshot);
            self.snapshot_taken = true;
        }
        Ok(())
    }

    pub fn notify(&mut self, notice: Notice) {
        log::info!("{notice}");
        self.notices.push(notice);
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Restore the previous undo step. Returns false if there is none.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.undo(Snapshot::capture(&*self.edit_context)) else {
            return false;
        };
        previous.restore(&mut *self.edit_context);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.undo.redo(Snapshot::capture(&*self.edit_context)) else {
            return false;
        };
        next.restore(&mut *self.edit_context);
        true
    }

    pub(crate) fn into_notices(self) -> Vec<Notice> {
        self.notices
    }
}

pub type PluginFactory = Box<dyn Fn(&Config) -> Box<dyn Plugin>>;

/// Plugin id → factory table owned by one kernel.
pub struct PluginRegistry {
    factories: BTreeMap<String, PluginFactory>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("links", Box::new(|_| Box::new(LinkPlugin::new())));
        registry.register(
            "findreplace",
            Box::new(|config| Box::new(FindReplacePlugin::new(config.find_replace))),
        );
        registry.register(
            "spellcheck",
            Box::new(|config| Box::new(SpellCheckerPlugin::new(&config.spellcheck))),
        );
        registry.register("undo", Box::new(|_| Box::new(UndoPlugin::new())));
        registry
    }

    /// Register a factory. Registering an id again replaces the factory.
    pub fn register(&mut self, id: &str, factory: PluginFactory) {
        if self.factories.insert(id.to_string(), factory).is_some() {
            log::debug!("plugin {id} re-registered");
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub(crate) fn instantiate(&self, config: &Config) -> Vec<Box<dyn Plugin>> {
        self.factories.values().map(|factory| factory(config)).collect()
    }
}

/// Tooltip from the merged config, falling back to the feature name.
pub(crate) fn tooltip<'a>(config: &'a PluginConfig, feature: &'a str) -> &'a str {
    config
        .tooltips
        .get(feature)
        .map(String::as_str)
        .unwrap_or(feature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::HeadlessDialogHost;
    use coral_rte_dom::parse_markup;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_registry_lists_the_built_in_plugins() {
        let registry = PluginRegistry::with_defaults();
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["findreplace", "links", "spellcheck", "undo"]);
    }

    #[test]
    fn registering_twice_replaces_the_factory() {
        let mut registry = PluginRegistry::empty();
        registry.register("undo", Box::new(|_| Box::new(UndoPlugin::new())));
        registry.register("undo", Box::new(|_| Box::new(LinkPlugin::new())));

        let plugins = registry.instantiate(&Config::default());

        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].id(), "links");
    }

    #[test]
    fn relay_records_one_undo_step_per_env() {
        let mut ctx = crate::commands::test_support::selected("<p>abc</p>", 0, 1);
        let commands = CommandRegistry::with_defaults();
        let mut host = HeadlessDialogHost::new();
        let mut history = UndoHistory::new(10);
        {
            let mut env = ExecEnv::new(&mut ctx, &commands, &mut host, &mut history);
            env.relay("inserttext", Some(CommandValue::Text("x".into())))
                .unwrap();
            env.relay("inserttext", Some(CommandValue::Text("y".into())))
                .unwrap();
            assert!(env.can_undo());
            assert!(env.undo());
            assert!(!env.can_undo());
        }
        let markup = coral_rte_dom::inner_markup(ctx.document(), ctx.root());
        assert_eq!(markup, "<p>abc</p>");
    }

    #[test]
    fn relay_without_changes_records_nothing() {
        let mut ctx = EditContext::new(parse_markup("<p>abc</p>").unwrap());
        let commands = CommandRegistry::with_defaults();
        let mut host = HeadlessDialogHost::new();
        let mut history = UndoHistory::new(10);

        let mut env = ExecEnv::new(&mut ctx, &commands, &mut host, &mut history);
        env.relay("unlink", None).unwrap();

        assert!(!env.can_undo());
    }
}
