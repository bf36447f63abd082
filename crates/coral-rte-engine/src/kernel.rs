//! # Editor Kernel
//!
//! One kernel drives one editable region. It owns the [`EditContext`], the
//! plugins built from a [`PluginRegistry`], the undo history and the toolbar,
//! and it is the only entry point hosts call.
//!
//! ## States
//!
//! ```text
//! Uninitialized ──initialize_event_handling──→ Active ──destroy──→ Destroyed
//!                                              │   ▲
//!                               OpenDialog     │   │  resolve_dialog
//!                                              ▼   │
//!                                            Suspended
//! ```
//!
//! While suspended, host events are ignored and commands are refused. The
//! selection is bookmarked when the dialog opens and restored when it is
//! resolved, before the owning plugin sees the result.

use std::collections::HashMap;

use coral_rte_config::Config;
use coral_rte_dom::{Dom, NodeId, inner_markup};

use crate::RteError;
use crate::commands::{CommandRegistry, CommandValue};
use crate::common::PositionMap;
use crate::context::EditContext;
use crate::events::{EditorEvent, ListenerId, Notice, UiEvent, UiEventPayload, UiListener};
use crate::plugin::{DialogFlow, ExecEnv, Outcome, Plugin, PluginRegistry};
use crate::selection::{
    Bookmark, CharSpan, SelectionDefinition, UndoAvailability, create_range_bookmark,
    range_for_chars, select_bookmark,
};
use crate::ui::{
    DialogHost, DialogId, DialogRequest, DialogResult, DialogValues, IconRegistry, Toolbar,
    ToolbarBuilder, ToolbarOptions,
};
use crate::undo::UndoHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    Uninitialized,
    Active,
    /// A dialog is open.
    Suspended,
    Destroyed,
}

struct PendingDialog {
    plugin: usize,
    dialog: DialogId,
    bookmark: Option<Bookmark>,
}

pub struct EditorKernel {
    state: KernelState,
    config: Config,
    plugins: Vec<Box<dyn Plugin>>,
    /// Command id → index into `plugins`.
    command_owner: HashMap<String, usize>,
    commands: CommandRegistry,
    edit_context: Option<EditContext>,
    dialog_host: Box<dyn DialogHost>,
    pending: Option<PendingDialog>,
    undo: UndoHistory,
    toolbar: Toolbar,
    listeners: Vec<(ListenerId, UiEvent, UiListener)>,
    next_listener: usize,
}

impl EditorKernel {
    /// Instantiate every registered plugin and hand it its configuration,
    /// merged over the plugin's defaults.
    ///
    /// Only enabled features are routed to their plugin.
    pub fn new(registry: &PluginRegistry, config: Config, dialog_host: Box<dyn DialogHost>) -> Self {
        let mut plugins = registry.instantiate(&config);
        let mut command_owner = HashMap::new();
        for (index, plugin) in plugins.iter_mut().enumerate() {
            let merged = config.plugin(plugin.id()).merged_with(&plugin.default_config());
            for &feature in plugin.features() {
                if !merged.is_feature_enabled(feature) {
                    log::debug!("{}#{feature} disabled by configuration", plugin.id());
                    continue;
                }
                if command_owner.insert(feature.to_string(), index).is_some() {
                    log::warn!("command {feature} is provided by more than one plugin");
                }
            }
            plugin.notify_plugin_config(merged);
        }
        let undo = UndoHistory::new(config.undo.max_steps);
        Self {
            state: KernelState::Uninitialized,
            config,
            plugins,
            command_owner,
            commands: CommandRegistry::with_defaults(),
            edit_context: None,
            dialog_host,
            pending: None,
            undo,
            toolbar: Toolbar::default(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn state(&self) -> KernelState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn edit_context(&self) -> Option<&EditContext> {
        self.edit_context.as_ref()
    }

    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    /// Id of the plugin handling `command`, if it is enabled.
    pub fn plugin_for(&self, command: &str) -> Option<&str> {
        self.command_owner
            .get(command)
            .map(|&index| self.plugins[index].id())
    }

    /// Edit the whole of `document`.
    pub fn initialize_edit_context(&mut self, document: Dom) -> Result<(), RteError> {
        self.attach(EditContext::new(document))
    }

    /// Edit only the subtree below `root`.
    pub fn initialize_edit_context_at(&mut self, document: Dom, root: NodeId) -> Result<(), RteError> {
        self.attach(EditContext::with_root(document, root))
    }

    fn attach(&mut self, context: EditContext) -> Result<(), RteError> {
        if self.state != KernelState::Uninitialized {
            return Err(RteError::InvalidState(self.state));
        }
        self.edit_context = Some(context);
        Ok(())
    }

    pub fn initialize_event_handling(&mut self) -> Result<(), RteError> {
        if self.state != KernelState::Uninitialized {
            return Err(RteError::InvalidState(self.state));
        }
        if self.edit_context.is_none() {
            return Err(RteError::NoEditContext);
        }
        self.state = KernelState::Active;
        log::debug!("editor kernel active");
        Ok(())
    }

    fn require_active(&self) -> Result<(), RteError> {
        match self.state {
            KernelState::Active => Ok(()),
            other => Err(RteError::InvalidState(other)),
        }
    }

    /// Run a plugin hook with a fresh [`ExecEnv`], returning its result and
    /// the notices it raised.
    fn run_plugin<T>(
        &mut self,
        index: usize,
        hook: impl FnOnce(&mut dyn Plugin, &mut ExecEnv<'_>) -> Result<T, RteError>,
    ) -> Result<(T, Vec<Notice>), RteError> {
        let context = self.edit_context.as_mut().ok_or(RteError::NoEditContext)?;
        let mut env = ExecEnv::new(context, &self.commands, self.dialog_host.as_mut(), &mut self.undo);
        let result = hook(self.plugins[index].as_mut(), &mut env)?;
        Ok((result, env.into_notices()))
    }

    /// Dispatch a user command to the plugin that owns it.
    ///
    /// Returns the notices to show. A plugin that opens a dialog leaves the
    /// kernel [`Suspended`](KernelState::Suspended) until
    /// [`resolve_dialog`](Self::resolve_dialog).
    pub fn exec_cmd(&mut self, command: &str, value: Option<CommandValue>) -> Result<Vec<Notice>, RteError> {
        self.require_active()?;
        let index = *self
            .command_owner
            .get(command)
            .ok_or_else(|| RteError::UnknownCommand(command.to_string()))?;
        log::debug!("exec {command} on {}", self.plugins[index].id());

        let (outcome, notices) =
            self.run_plugin(index, |plugin, env| plugin.execute(command, value.as_ref(), env))?;
        match outcome {
            Outcome::Done => self.update_toolbar()?,
            Outcome::OpenDialog(request) => self.suspend(index, request)?,
        }
        Ok(notices)
    }

    /// Execute a DOM mutation command directly, bypassing plugins.
    pub fn relay_cmd(&mut self, command: &str, value: Option<CommandValue>) -> Result<(), RteError> {
        self.require_active()?;
        let context = self.edit_context.as_mut().ok_or(RteError::NoEditContext)?;
        ExecEnv::new(context, &self.commands, self.dialog_host.as_mut(), &mut self.undo)
            .relay(command, value)?;
        self.update_toolbar()
    }

    fn suspend(&mut self, plugin: usize, request: DialogRequest) -> Result<(), RteError> {
        let context = self.edit_context.as_ref().ok_or(RteError::NoEditContext)?;
        let bookmark = create_range_bookmark(context);
        self.dialog_host.show(request.dialog, &request.initial)?;
        self.pending = Some(PendingDialog {
            plugin,
            dialog: request.dialog,
            bookmark,
        });
        self.state = KernelState::Suspended;
        log::debug!("suspended for {}", request.dialog);
        self.emit(&UiEventPayload::DialogShow(request.dialog));
        Ok(())
    }

    /// Hide the dialog and resume editing.
    fn resume(&mut self, restore: bool) -> Result<PendingDialog, RteError> {
        let pending = self.pending.take().ok_or(RteError::NoDialogOpen)?;
        self.dialog_host.hide(pending.dialog);
        if restore
            && let (Some(context), Some(bookmark)) = (self.edit_context.as_mut(), &pending.bookmark)
        {
            let restored = select_bookmark(context, bookmark);
            log::debug!("selection restored after dialog: {restored:?}");
        }
        self.state = KernelState::Active;
        self.emit(&UiEventPayload::DialogHide(pending.dialog));
        Ok(pending)
    }

    /// Close the open dialog with `result`.
    ///
    /// The selection saved when the dialog opened is restored first, then the
    /// owning plugin applies the result and the toolbar is refreshed.
    pub fn resolve_dialog(&mut self, result: DialogResult) -> Result<Vec<Notice>, RteError> {
        if self.state != KernelState::Suspended {
            return Err(RteError::NoDialogOpen);
        }
        let pending = self.resume(true)?;
        let ((), notices) =
            self.run_plugin(pending.plugin, |plugin, env| plugin.on_dialog_result(result, env))?;
        self.update_toolbar()?;
        Ok(notices)
    }

    /// Route an in-dialog button (e.g. find next) to the owning plugin while
    /// the dialog stays open.
    pub fn dialog_action(&mut self, action: &str, values: &DialogValues) -> Result<Vec<Notice>, RteError> {
        let plugin = match (&self.pending, self.state) {
            (Some(pending), KernelState::Suspended) => pending.plugin,
            _ => return Err(RteError::NoDialogOpen),
        };
        let (flow, notices) =
            self.run_plugin(plugin, |plugin, env| plugin.on_dialog_action(action, values, env))?;
        match flow {
            DialogFlow::Continue => {
                // the dialog now returns to whatever the action selected
                let bookmark = self.edit_context.as_ref().and_then(create_range_bookmark);
                if let Some(pending) = self.pending.as_mut() {
                    pending.bookmark = bookmark;
                }
            }
            DialogFlow::Close => {
                self.resume(false)?;
            }
        }
        self.update_toolbar()?;
        Ok(notices)
    }

    /// Feed a host event. Ignored unless the kernel is active.
    pub fn handle_event(&mut self, event: EditorEvent) -> Result<(), RteError> {
        if self.state != KernelState::Active {
            log::debug!("ignoring {event:?} while {:?}", self.state);
            return Ok(());
        }
        if let EditorEvent::SelectionChange(range) = event {
            self.edit_context
                .as_mut()
                .ok_or(RteError::NoEditContext)?
                .set_selection(range);
        }
        self.update_toolbar()
    }

    /// Select the characters `start..end` of the flattened text, as a host
    /// selection change.
    pub fn select_chars(&mut self, start: usize, end: usize) -> Result<(), RteError> {
        let context = self.edit_context.as_ref().ok_or(RteError::NoEditContext)?;
        let tree = context.document();
        let map = PositionMap::build(tree, context.root());
        let range = range_for_chars(tree, &map, CharSpan::new(start, end));
        self.handle_event(EditorEvent::SelectionChange(range))
    }

    /// The selection facts plugins see, including undo availability.
    pub fn selection_definition(&self) -> Option<SelectionDefinition> {
        let context = self.edit_context.as_ref()?;
        let mut definition = SelectionDefinition::compute(context);
        definition.undo = UndoAvailability {
            can_undo: self.undo.can_undo(),
            can_redo: self.undo.can_redo(),
        };
        Some(definition)
    }

    /// Recompute the selection definition, let every plugin update its
    /// buttons and notify `UpdateState` listeners.
    pub fn update_toolbar(&mut self) -> Result<(), RteError> {
        let definition = self.selection_definition().ok_or(RteError::NoEditContext)?;
        for plugin in &self.plugins {
            plugin.update_state(&definition, &mut self.toolbar);
        }
        self.emit(&UiEventPayload::UpdateState(definition));
        Ok(())
    }

    pub fn add_ui_listener(&mut self, event: UiEvent, listener: UiListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, event, listener));
        id
    }

    /// Returns false if the listener was not registered.
    pub fn remove_ui_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _, _)| *listener != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, payload: &UiEventPayload) {
        let event = payload.event();
        for (_, wanted, listener) in &mut self.listeners {
            if *wanted == event {
                listener(payload);
            }
        }
    }

    fn toolbar_builder(&mut self) -> ToolbarBuilder {
        let mut icons = IconRegistry::default();
        for (id, icon) in &self.config.icons {
            icons.register_icon(id, icon);
        }
        for (id, class) in &self.config.additional_classes {
            icons.register_additional_classes(id, class);
        }
        let mut builder = ToolbarBuilder::new(icons);
        for plugin in &mut self.plugins {
            plugin.initialize_ui(&mut builder);
        }
        builder
    }

    /// Build the toolbar from the plugins' buttons and `ui_settings`.
    pub fn create_toolbar(&mut self, options: &ToolbarOptions) -> Result<&Toolbar, RteError> {
        if self.state == KernelState::Destroyed {
            return Err(RteError::InvalidState(self.state));
        }
        let builder = self.toolbar_builder();
        self.toolbar = builder.create_toolbar(options, &self.config.ui_settings);
        if self.state == KernelState::Active {
            self.update_toolbar()?;
        }
        Ok(&self.toolbar)
    }

    /// Adopt existing toolbar markup below `root` instead of building one.
    pub fn bind_toolbar(&mut self, markup: &Dom, root: NodeId, options: &ToolbarOptions) -> Result<&Toolbar, RteError> {
        if self.state == KernelState::Destroyed {
            return Err(RteError::InvalidState(self.state));
        }
        let builder = self.toolbar_builder();
        self.toolbar = builder.bind_toolbar(markup, root, options);
        if self.state == KernelState::Active {
            self.update_toolbar()?;
        }
        Ok(&self.toolbar)
    }

    /// Markup of the editable root's content.
    pub fn serialize(&self) -> Result<String, RteError> {
        let context = self.edit_context.as_ref().ok_or(RteError::NoEditContext)?;
        Ok(inner_markup(context.document(), context.root()))
    }

    /// Tear down the toolbar and listeners. The document stays readable
    /// through [`serialize`](Self::serialize).
    pub fn destroy(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.dialog_host.hide(pending.dialog);
        }
        self.toolbar = Toolbar::default();
        self.listeners.clear();
        self.undo.clear();
        self.state = KernelState::Destroyed;
        log::debug!("editor kernel destroyed");
    }
}
