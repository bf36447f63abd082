use std::collections::BTreeMap;

use coral_rte_config::{DialogDefinition, FieldDefinition, FieldKind, Features, PluginConfig};
use coral_rte_dom::TextTree;

use super::{ExecEnv, Outcome, Plugin, tooltip};
use crate::RteError;
use crate::commands::{AnchorValue, CommandValue, LinkValue};
use crate::selection::SelectionDefinition;
use crate::ui::{DialogId, DialogRequest, DialogResult, DialogValues, Toolbar, ToolbarBuilder, ensure_dialog};

const ID: &str = "links";
const FEATURES: &[&str] = &["modifylink", "unlink", "anchor"];
const LINK_DIALOG: &str = "link";
const ANCHOR_DIALOG: &str = "anchor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingDialog {
    Link,
    Anchor,
}

/// Creates, edits and removes hyperlinks and named anchors.
#[derive(Debug, Default)]
pub struct LinkPlugin {
    config: PluginConfig,
    link_dialog: Option<DialogId>,
    anchor_dialog: Option<DialogId>,
    pending: Option<PendingDialog>,
}

fn link_dialog() -> DialogDefinition {
    let mut target = FieldDefinition::new("target", FieldKind::Select, "Target");
    target.options = ["", "_blank", "_self", "_parent", "_top"]
        .into_iter()
        .map(str::to_string)
        .collect();
    DialogDefinition {
        dialog_class: Some("rte-link-dialog".to_string()),
        title: "Hyperlink".to_string(),
        items: Some(vec![
            FieldDefinition::new("href", FieldKind::Text, "Link to"),
            target,
            FieldDefinition::new("title", FieldKind::Text, "Title"),
        ]),
    }
}

fn anchor_dialog() -> DialogDefinition {
    DialogDefinition {
        dialog_class: Some("rte-anchor-dialog".to_string()),
        title: "Anchor".to_string(),
        items: Some(vec![FieldDefinition::new("name", FieldKind::Text, "Name")]),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl LinkPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_link_dialog(&mut self, env: &mut ExecEnv<'_>) -> Result<Outcome, RteError> {
        let definition = env.selection_definition();
        let mut initial = DialogValues::new();
        if let [anchor] = definition.anchors.as_slice() {
            let tree = env.edit_context().document();
            for name in ["href", "target", "title"] {
                if let Some(value) = tree.attr(*anchor, name) {
                    initial.set(name, value);
                }
            }
        }
        let dialog = ensure_dialog(
            env.dialogs(),
            &mut self.link_dialog,
            self.config.dialog(LINK_DIALOG),
            link_dialog(),
        )?;
        self.pending = Some(PendingDialog::Link);
        Ok(Outcome::OpenDialog(DialogRequest { dialog, initial }))
    }

    fn open_anchor_dialog(&mut self, env: &mut ExecEnv<'_>) -> Result<Outcome, RteError> {
        let definition = env.selection_definition();
        let mut initial = DialogValues::new();
        if let [anchor] = definition.named_anchors.as_slice()
            && let Some(name) = env.edit_context().document().attr(*anchor, "name")
        {
            initial.set("name", name);
        }
        let dialog = ensure_dialog(
            env.dialogs(),
            &mut self.anchor_dialog,
            self.config.dialog(ANCHOR_DIALOG),
            anchor_dialog(),
        )?;
        self.pending = Some(PendingDialog::Anchor);
        Ok(Outcome::OpenDialog(DialogRequest { dialog, initial }))
    }
}

impl Plugin for LinkPlugin {
    fn id(&self) -> &str {
        ID
    }

    fn features(&self) -> &'static [&'static str] {
        FEATURES
    }

    fn default_config(&self) -> PluginConfig {
        PluginConfig {
            features: Some(Features::All),
            tooltips: BTreeMap::from([
                ("modifylink".to_string(), "Hyperlink".to_string()),
                ("unlink".to_string(), "Unlink".to_string()),
                ("anchor".to_string(), "Anchor".to_string()),
            ]),
            dialogs: BTreeMap::new(),
        }
    }

    fn notify_plugin_config(&mut self, config: PluginConfig) {
        self.config = config;
    }

    fn initialize_ui(&mut self, toolbar: &mut ToolbarBuilder) {
        for &feature in FEATURES {
            if self.config.is_feature_enabled(feature) {
                toolbar.add_element(ID, feature, tooltip(&self.config, feature), feature == "anchor");
            }
        }
    }

    fn execute(
        &mut self,
        command: &str,
        value: Option<&CommandValue>,
        env: &mut ExecEnv<'_>,
    ) -> Result<Outcome, RteError> {
        match (command, value) {
            ("modifylink", None) => self.open_link_dialog(env),
            ("anchor", None) => self.open_anchor_dialog(env),
            ("modifylink" | "unlink" | "anchor", value) => {
                env.relay(command, value.cloned())?;
                Ok(Outcome::Done)
            }
            _ => Err(RteError::UnknownCommand(command.to_string())),
        }
    }

    fn update_state(&self, selection: &SelectionDefinition, toolbar: &mut Toolbar) {
        let nothing_to_link = !selection.is_selection && selection.anchor_count == 0;
        toolbar.set_disabled("links#modifylink", nothing_to_link);
        toolbar.set_disabled("links#unlink", selection.anchor_count == 0);
        toolbar.set_selected("links#anchor", selection.named_anchor_count > 0);
    }

    fn on_dialog_result(&mut self, result: DialogResult, env: &mut ExecEnv<'_>) -> Result<(), RteError> {
        let pending = self.pending.take();
        let DialogResult::Applied(values) = result else {
            return Ok(());
        };
        match pending {
            Some(PendingDialog::Link) if values.get("href").is_empty() => env.relay("unlink", None),
            Some(PendingDialog::Link) => {
                let link = LinkValue {
                    href: values.get("href").to_string(),
                    target: non_empty(values.get("target")),
                    title: non_empty(values.get("title")),
                };
                env.relay("modifylink", Some(CommandValue::Link(link)))
            }
            Some(PendingDialog::Anchor) => {
                let anchor = AnchorValue {
                    name: values.get("name").to_string(),
                };
                env.relay("anchor", Some(CommandValue::Anchor(anchor)))
            }
            None => {
                log::warn!("dialog result without an open links dialog");
                Ok(())
            }
        }
    }
}
