use std::collections::BTreeMap;

use coral_rte_config::{Features, PluginConfig, SpellCheckConfig};
use coral_rte_dom::inner_markup;

use super::{ExecEnv, Outcome, Plugin, tooltip};
use crate::RteError;
use crate::commands::CommandValue;
use crate::events::Notice;
use crate::search::SearchableDocument;
use crate::selection::SelectionDefinition;
use crate::spellcheck::{HttpTransport, SpellCheckRequest, SpellCheckTransport, check_with_retry};
use crate::ui::{Toolbar, ToolbarBuilder};

const ID: &str = "spellcheck";
const FEATURES: &[&str] = &["checktext"];

/// Toggles server side spell checking. Misspelled words are marked in the
/// document until the button is pressed again.
pub struct SpellCheckerPlugin {
    config: PluginConfig,
    settings: SpellCheckConfig,
    transport: Box<dyn SpellCheckTransport>,
    active: bool,
}

impl SpellCheckerPlugin {
    pub fn new(settings: &SpellCheckConfig) -> Self {
        Self::with_transport(settings, Box::new(HttpTransport::new(settings)))
    }

    pub fn with_transport(settings: &SpellCheckConfig, transport: Box<dyn SpellCheckTransport>) -> Self {
        Self {
            config: PluginConfig::default(),
            settings: settings.clone(),
            transport,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn request(&self, env: &ExecEnv<'_>) -> SpellCheckRequest {
        let ctx = env.edit_context();
        let text = SearchableDocument::create(ctx.document(), ctx.root())
            .text()
            .to_string();
        SpellCheckRequest {
            charset: self.settings.charset.clone(),
            mode: self.settings.mode.clone(),
            html: inner_markup(ctx.document(), ctx.root()),
            text,
            content_path: self.settings.content_path.clone(),
        }
    }

    fn check(&mut self, env: &mut ExecEnv<'_>) -> Result<(), RteError> {
        let request = self.request(env);
        let response = match check_with_retry(self.transport.as_ref(), &request, self.settings.retries) {
            Ok(response) => response,
            Err(err) => {
                log::warn!("spell check failed: {err}");
                self.active = false;
                env.notify(Notice::Alert(format!("Spell checking failed: {err}")));
                return Ok(());
            }
        };
        let words = response.misspellings();
        if words.is_empty() {
            env.notify(Notice::NoSpellingErrors);
            return Ok(());
        }
        log::debug!("marking {} misspelled words", words.len());
        env.relay("spellcheckmark", Some(CommandValue::SpellCheck(words)))?;
        self.active = true;
        Ok(())
    }
}

impl Plugin for SpellCheckerPlugin {
    fn id(&self) -> &str {
        ID
    }

    fn features(&self) -> &'static [&'static str] {
        FEATURES
    }

    fn default_config(&self) -> PluginConfig {
        PluginConfig {
            features: Some(Features::All),
            tooltips: BTreeMap::from([("checktext".to_string(), "Check spelling".to_string())]),
            dialogs: BTreeMap::new(),
        }
    }

    fn notify_plugin_config(&mut self, config: PluginConfig) {
        self.config = config;
    }

    fn initialize_ui(&mut self, toolbar: &mut ToolbarBuilder) {
        if self.config.is_feature_enabled("checktext") {
            toolbar.add_element(ID, "checktext", tooltip(&self.config, "checktext"), true);
        }
    }

    fn execute(
        &mut self,
        command: &str,
        _value: Option<&CommandValue>,
        env: &mut ExecEnv<'_>,
    ) -> Result<Outcome, RteError> {
        if command != "checktext" {
            return Err(RteError::UnknownCommand(command.to_string()));
        }
        if self.active {
            env.relay("spellcheckclear", None)?;
            self.active = false;
        } else {
            self.check(env)?;
        }
        Ok(Outcome::Done)
    }

    fn update_state(&self, _selection: &SelectionDefinition, toolbar: &mut Toolbar) {
        toolbar.set_selected("spellcheck#checktext", self.active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandRegistry;
    use crate::commands::test_support::{markup, selected};
    use crate::spellcheck::SpellCheckError;
    use crate::ui::HeadlessDialogHost;
    use crate::undo::UndoHistory;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct Fixed {
        body: Result<String, u16>,
        seen: Rc<RefCell<Vec<SpellCheckRequest>>>,
    }

    impl SpellCheckTransport for Fixed {
        fn send(&self, request: &SpellCheckRequest) -> Result<String, SpellCheckError> {
            self.seen.borrow_mut().push(request.clone());
            self.body.clone().map_err(SpellCheckError::Status)
        }
    }

    fn plugin(body: Result<&str, u16>) -> (SpellCheckerPlugin, Rc<RefCell<Vec<SpellCheckRequest>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let transport = Fixed {
            body: body.map(str::to_string),
            seen: Rc::clone(&seen),
        };
        let settings = SpellCheckConfig {
            retries: 0,
            content_path: Some("/content/page".to_string()),
            ..SpellCheckConfig::default()
        };
        let mut plugin = SpellCheckerPlugin::with_transport(&settings, Box::new(transport));
        let defaults = plugin.default_config();
        plugin.notify_plugin_config(defaults);
        (plugin, seen)
    }

    fn toggle(plugin: &mut SpellCheckerPlugin, ctx: &mut crate::context::EditContext) -> Vec<Notice> {
        let commands = CommandRegistry::with_defaults();
        let mut host = HeadlessDialogHost::new();
        let mut history = UndoHistory::new(10);
        let mut env = ExecEnv::new(ctx, &commands, &mut host, &mut history);
        plugin.execute("checktext", None, &mut env).unwrap();
        env.into_notices()
    }

    const TEH: &str =
        r#"{"words":[{"start":0,"chars":3,"result":{"isCorrect":false,"suggestions":["the"]}}]}"#;

    #[test]
    fn toggling_marks_then_clears() {
        let (mut plugin, seen) = plugin(Ok(TEH));
        let mut ctx = selected("<p>teh cat</p>", 4, 7);

        assert!(toggle(&mut plugin, &mut ctx).is_empty());
        assert!(plugin.is_active());
        assert_eq!(
            markup(&ctx),
            r#"<p><span class="rte-spellcheck" data-suggestions="the">teh</span> cat</p>"#
        );
        let request = &seen.borrow()[0];
        assert_eq!(request.text, "teh cat");
        assert_eq!(request.html, "<p>teh cat</p>");
        assert_eq!(request.content_path.as_deref(), Some("/content/page"));

        toggle(&mut plugin, &mut ctx);
        assert!(!plugin.is_active());
        assert_eq!(markup(&ctx), "<p>teh cat</p>");
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn clean_text_is_reported() {
        let (mut plugin, _) = plugin(Ok(r#"{"words":[]}"#));
        let mut ctx = selected("<p>the cat</p>", 0, 0);

        assert_eq!(toggle(&mut plugin, &mut ctx), vec![Notice::NoSpellingErrors]);
        assert!(!plugin.is_active());
    }

    #[test]
    fn service_failure_alerts_and_leaves_the_document() {
        let (mut plugin, _) = plugin(Err(502));
        let mut ctx = selected("<p>teh cat</p>", 0, 0);

        let notices = toggle(&mut plugin, &mut ctx);

        assert!(matches!(notices.as_slice(), [Notice::Alert(message)] if message.contains("502")));
        assert!(!plugin.is_active());
        assert_eq!(markup(&ctx), "<p>teh cat</p>");
    }

    #[test]
    fn button_reflects_the_active_state() {
        let (mut plugin, _) = plugin(Ok(TEH));
        let mut builder = ToolbarBuilder::default();
        plugin.initialize_ui(&mut builder);
        let mut toolbar = builder.create_toolbar(&Default::default(), &BTreeMap::new());
        let mut ctx = selected("<p>teh</p>", 0, 0);

        toggle(&mut plugin, &mut ctx);
        plugin.update_state(&SelectionDefinition::default(), &mut toolbar);

        let button = toolbar.element("spellcheck#checktext").unwrap();
        assert!(button.toggle);
        assert!(button.selected);
    }
}
