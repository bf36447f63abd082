use std::collections::BTreeMap;

use coral_rte_config::{Features, PluginConfig};

use super::{ExecEnv, Outcome, Plugin, tooltip};
use crate::RteError;
use crate::commands::CommandValue;
use crate::selection::SelectionDefinition;
use crate::ui::{Toolbar, ToolbarBuilder};

const ID: &str = "undo";
const FEATURES: &[&str] = &["undo", "redo"];

/// Undo and redo buttons over the kernel's snapshot history.
#[derive(Debug, Default)]
pub struct UndoPlugin {
    config: PluginConfig,
}

impl UndoPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for UndoPlugin {
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
                ("undo".to_string(), "Undo".to_string()),
                ("redo".to_string(), "Redo".to_string()),
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
                toolbar.add_element(ID, feature, tooltip(&self.config, feature), false);
            }
        }
    }

    fn execute(
        &mut self,
        command: &str,
        _value: Option<&CommandValue>,
        env: &mut ExecEnv<'_>,
    ) -> Result<Outcome, RteError> {
        let applied = match command {
            "undo" => env.undo(),
            "redo" => env.redo(),
            _ => return Err(RteError::UnknownCommand(command.to_string())),
        };
        if !applied {
            log::debug!("nothing to {command}");
        }
        Ok(Outcome::Done)
    }

    fn update_state(&self, selection: &SelectionDefinition, toolbar: &mut Toolbar) {
        toolbar.set_disabled("undo#undo", !selection.undo.can_undo);
        toolbar.set_disabled("undo#redo", !selection.undo.can_redo);
    }
}
