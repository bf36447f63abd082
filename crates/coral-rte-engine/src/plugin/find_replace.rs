use std::collections::BTreeMap;

use coral_rte_config::{
    DialogDefinition, FieldDefinition, FieldKind, FindReplaceConfig, Features, PluginConfig,
};

use super::{DialogFlow, ExecEnv, Outcome, Plugin, tooltip};
use crate::RteError;
use crate::commands::CommandValue;
use crate::events::Notice;
use crate::search::{FindOptions, Match, SearchableDocument};
use crate::selection::{SelectionDefinition, get_first_selection_offset, get_last_selection_offset};
use crate::ui::{DialogId, DialogRequest, DialogResult, DialogValues, Toolbar, ToolbarBuilder, ensure_dialog};

const ID: &str = "findreplace";
const FEATURES: &[&str] = &["find", "replace"];
const DIALOG: &str = "findreplace";

/// Find and replace through a non-modal dialog.
///
/// Dialog actions: `find`, `replace` and `replaceall`. Searching continues
/// from the previous match until the end of the document, then restarts at
/// the top on the next request.
#[derive(Debug)]
pub struct FindReplacePlugin {
    config: PluginConfig,
    defaults: FindReplaceConfig,
    dialog: Option<DialogId>,
    search: Option<ActiveSearch>,
    restart: bool,
}

#[derive(Debug)]
struct ActiveSearch {
    index: SearchableDocument,
    term: String,
    match_case: bool,
    start_pos: usize,
    found: usize,
}

fn find_replace_dialog() -> DialogDefinition {
    DialogDefinition {
        dialog_class: Some("rte-findreplace-dialog".to_string()),
        title: "Find/Replace".to_string(),
        items: Some(vec![
            FieldDefinition::new("findText", FieldKind::Text, "Find"),
            FieldDefinition::new("replaceText", FieldKind::Text, "Replace"),
            FieldDefinition::new("matchCase", FieldKind::Checkbox, "Match case"),
            FieldDefinition::new("mode", FieldKind::Hidden, ""),
        ]),
    }
}

impl FindReplacePlugin {
    pub fn new(defaults: FindReplaceConfig) -> Self {
        Self {
            config: PluginConfig::default(),
            defaults,
            dialog: None,
            search: None,
            restart: false,
        }
    }

    /// Term of the search in progress, if any.
    pub fn current_term(&self) -> Option<&str> {
        self.search.as_ref().map(|s| s.term.as_str())
    }

    fn reset(&mut self) {
        self.search = None;
        self.restart = false;
    }

    fn continues(&self, term: &str, match_case: bool) -> bool {
        self.search
            .as_ref()
            .is_some_and(|s| s.term == term && s.match_case == match_case)
    }

    /// Select the next occurrence of `term`, reporting when there is none.
    fn find(&mut self, term: &str, match_case: bool, env: &mut ExecEnv<'_>) -> Result<Option<Match>, RteError> {
        let ctx = env.edit_context();
        let tree = ctx.document();
        let continuing = self.continues(term, match_case);

        let fresh = continuing
            && !self.restart
            && self.search.as_ref().is_some_and(|s| !s.index.is_stale(tree));

        let found = match self.search.as_mut().filter(|_| fresh) {
            Some(active) => active.index.find_next(tree)?,
            None => {
                let start_pos = if self.restart {
                    0
                } else if continuing {
                    // the document was edited since, continue behind the selection
                    get_last_selection_offset(ctx).unwrap_or(0)
                } else {
                    get_first_selection_offset(ctx).unwrap_or(0)
                };
                let mut index = SearchableDocument::create(tree, ctx.root());
                let found = index.find(tree, term, FindOptions { match_case, start_pos })?;
                let previous = self
                    .search
                    .take()
                    .filter(|_| continuing && !self.restart)
                    .map_or(0, |s| s.found);
                self.search = Some(ActiveSearch {
                    index,
                    term: term.to_string(),
                    match_case,
                    start_pos,
                    found: previous,
                });
                found
            }
        };
        self.restart = false;
        self.select(found, env)
    }

    fn select(&mut self, found: Option<Match>, env: &mut ExecEnv<'_>) -> Result<Option<Match>, RteError> {
        let Some(active) = self.search.as_mut() else {
            return Ok(found);
        };
        match &found {
            Some(hit) => {
                active.found += 1;
                if let Some(range) = hit.range() {
                    env.edit_context_mut().set_selection(Some(range));
                }
            }
            None if active.start_pos == 0 && active.found == 0 => {
                let term = active.term.clone();
                self.search = None;
                env.notify(Notice::TextNotFound { term });
            }
            None => {
                let term = active.term.clone();
                self.search = None;
                self.restart = true;
                env.notify(Notice::SearchRestarted { term });
            }
        }
        Ok(found)
    }

    /// Replace the current match, then select the next one. Without a
    /// current match this only finds.
    fn replace(
        &mut self,
        term: &str,
        replacement: &str,
        match_case: bool,
        env: &mut ExecEnv<'_>,
    ) -> Result<(), RteError> {
        let current = self
            .search
            .as_ref()
            .filter(|s| s.term == term && s.match_case == match_case && !self.restart)
            .filter(|s| !s.index.is_stale(env.edit_context().document()))
            .and_then(|s| s.index.last_match())
            .and_then(Match::range);
        let Some(range) = current else {
            self.find(term, match_case, env)?;
            return Ok(());
        };

        env.edit_context_mut().set_selection(Some(range));
        env.relay("inserttext", Some(CommandValue::Text(replacement.to_string())))?;

        let tree = env.edit_context().document();
        let found = match self.search.as_mut() {
            Some(active) => {
                active.index.adjust_to_replace(tree, replacement)?;
                active.index.find_next(tree)?
            }
            None => None,
        };
        self.select(found, env)?;
        Ok(())
    }

    /// Replace every occurrence from the top of the document.
    fn replace_all(
        &mut self,
        term: &str,
        replacement: &str,
        match_case: bool,
        env: &mut ExecEnv<'_>,
    ) -> Result<usize, RteError> {
        self.reset();
        let replacement_chars = replacement.chars().count();
        let mut pos = 0;
        let mut count = 0;
        loop {
            let ctx = env.edit_context();
            let tree = ctx.document();
            let mut index = SearchableDocument::create(tree, ctx.root());
            let Some(found) = index.find(tree, term, FindOptions { match_case, start_pos: pos })? else {
                break;
            };
            let Some(range) = found.range() else {
                break;
            };
            env.edit_context_mut().set_selection(Some(range));
            env.relay("inserttext", Some(CommandValue::Text(replacement.to_string())))?;
            pos = found.start_pos + replacement_chars;
            count += 1;
        }

        if count == 0 {
            env.notify(Notice::TextNotFound {
                term: term.to_string(),
            });
        } else {
            env.notify(Notice::ReplacedCount(count));
        }
        Ok(count)
    }
}

impl Plugin for FindReplacePlugin {
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
                ("find".to_string(), "Find".to_string()),
                ("replace".to_string(), "Replace".to_string()),
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
        value: Option<&CommandValue>,
        env: &mut ExecEnv<'_>,
    ) -> Result<Outcome, RteError> {
        match (command, value) {
            ("find", Some(CommandValue::Text(term))) => {
                if term.is_empty() {
                    env.notify(Notice::EmptySearchTerm);
                } else {
                    self.find(term, self.defaults.match_case, env)?;
                }
                Ok(Outcome::Done)
            }
            ("find" | "replace", None) => {
                let dialog = ensure_dialog(
                    env.dialogs(),
                    &mut self.dialog,
                    self.config.dialog(DIALOG),
                    find_replace_dialog(),
                )?;
                let match_case = if self.defaults.match_case { "true" } else { "false" };
                let initial = DialogValues::new()
                    .with("findText", self.current_term().unwrap_or_default())
                    .with("matchCase", match_case)
                    .with("mode", command);
                Ok(Outcome::OpenDialog(DialogRequest { dialog, initial }))
            }
            ("find" | "replace", Some(_)) => Err(RteError::InvalidValue {
                command: command.to_string(),
                expected: "text",
            }),
            _ => Err(RteError::UnknownCommand(command.to_string())),
        }
    }

    fn update_state(&self, _selection: &SelectionDefinition, _toolbar: &mut Toolbar) {}

    fn on_dialog_action(
        &mut self,
        action: &str,
        values: &DialogValues,
        env: &mut ExecEnv<'_>,
    ) -> Result<DialogFlow, RteError> {
        let term = values.get("findText");
        let replacement = values.get("replaceText");
        let match_case = values.is_checked("matchCase");
        if term.is_empty() {
            env.notify(Notice::EmptySearchTerm);
            return Ok(DialogFlow::Continue);
        }
        match action {
            "find" => {
                self.find(term, match_case, env)?;
            }
            "replace" => self.replace(term, replacement, match_case, env)?,
            "replaceall" => {
                self.replace_all(term, replacement, match_case, env)?;
            }
            _ => log::debug!("unknown find/replace action {action}"),
        }
        Ok(DialogFlow::Continue)
    }

    fn on_dialog_result(&mut self, _result: DialogResult, _env: &mut ExecEnv<'_>) -> Result<(), RteError> {
        self.reset();
        Ok(())
    }
}
