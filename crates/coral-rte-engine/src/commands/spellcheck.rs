use coral_rte_dom::{NodeId, TextTree};

use super::{CommandValue, EditorCommand, invalid_value, isolate_selection};
use crate::RteError;
use crate::common::PositionMap;
use crate::context::EditContext;
use crate::selection::{Bookmark, CharSpan, create_range_bookmark, range_for_chars, select_bookmark};

/// Class of the `span` elements that mark misspelled words.
pub const MARKER_CLASS: &str = "rte-spellcheck";

/// A misspelled word, addressed by char position in the flattened text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Misspelling {
    pub start: usize,
    pub chars: usize,
    pub suggestions: Vec<String>,
}

fn restore(ctx: &mut EditContext, bookmark: Option<Bookmark>) {
    if let Some(bookmark) = bookmark {
        select_bookmark(ctx, &Bookmark::Chars(bookmark.chars()));
    } else {
        ctx.set_selection(None);
    }
}

/// Spell-check markers below `root`, in document order.
pub fn markers<T: TextTree>(tree: &T, root: NodeId) -> Vec<NodeId> {
    tree.descendants(root)
        .into_iter()
        .filter(|&n| tree.is_tag(n, "span") && tree.element(n).is_some_and(|e| e.has_class(MARKER_CLASS)))
        .collect()
}

/// `spellcheckmark`: wrap each misspelled word in a marker span carrying the
/// suggestions. The selection is preserved.
pub struct SpellCheckMarkCommand;

impl EditorCommand for SpellCheckMarkCommand {
    fn ids(&self) -> &'static [&'static str] {
        &["spellcheckmark"]
    }

    fn execute(
        &self,
        ctx: &mut EditContext,
        command: &str,
        value: Option<&CommandValue>,
    ) -> Result<(), RteError> {
        let Some(CommandValue::SpellCheck(words)) = value else {
            return Err(invalid_value(command, "spell check"));
        };
        let saved = create_range_bookmark(ctx);

        for word in words.iter().filter(|w| w.chars > 0) {
            let map = PositionMap::build(ctx.document(), ctx.root());
            let span = CharSpan::new(word.start, word.start + word.chars);
            let Some(range) = range_for_chars(ctx.document(), &map, span) else {
                log::warn!("misspelling at {} is outside the document", word.start);
                continue;
            };
            ctx.set_selection(Some(range));
            let attrs = vec![
                ("class".to_string(), MARKER_CLASS.to_string()),
                ("data-suggestions".to_string(), word.suggestions.join(",")),
            ];
            for node in isolate_selection(ctx)? {
                ctx.document_mut().wrap(node, "span", attrs.clone())?;
            }
        }

        restore(ctx, saved);
        Ok(())
    }
}

/// `spellcheckclear`: remove every marker span, keeping the words.
pub struct SpellCheckClearCommand;

impl EditorCommand for SpellCheckClearCommand {
    fn ids(&self) -> &'static [&'static str] {
        &["spellcheckclear"]
    }

    fn execute(
        &self,
        ctx: &mut EditContext,
        _command: &str,
        _value: Option<&CommandValue>,
    ) -> Result<(), RteError> {
        let found = markers(ctx.document(), ctx.root());
        if found.is_empty() {
            return Ok(());
        }
        let saved = create_range_bookmark(ctx);
        for marker in found {
            ctx.document_mut().unwrap(marker)?;
        }
        let root = ctx.root();
        ctx.document_mut().normalize(root);
        restore(ctx, saved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::CommandRegistry;
    use super::super::test_support::*;
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn word(start: usize, chars: usize, suggestions: &[&str]) -> Misspelling {
        Misspelling {
            start,
            chars,
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn marks_and_clears_words() {
        let mut ctx = selected("<p>teh cat <b>jumpd</b></p>", 4, 7);
        let commands = CommandRegistry::with_defaults();
        let words = vec![word(0, 3, &["the", "tech"]), word(8, 5, &["jumped"])];

        commands
            .execute(&mut ctx, "spellcheckmark", Some(&CommandValue::SpellCheck(words)))
            .unwrap();

        assert_snapshot!(markup(&ctx), @r#"<p><span class="rte-spellcheck" data-suggestions="the,tech">teh</span> cat <b><span class="rte-spellcheck" data-suggestions="jumped">jumpd</span></b></p>"#);
        assert_eq!(selected_text(&ctx), "cat");
        assert_eq!(markers(ctx.document(), ctx.root()).len(), 2);

        commands.execute(&mut ctx, "spellcheckclear", None).unwrap();

        assert_eq!(markup(&ctx), "<p>teh cat <b>jumpd</b></p>");
        assert_eq!(selected_text(&ctx), "cat");
    }

    #[test]
    fn out_of_range_words_are_skipped() {
        let mut ctx = selected("<p>abc</p>", 0, 0);
        CommandRegistry::with_defaults()
            .execute(
                &mut ctx,
                "spellcheckmark",
                Some(&CommandValue::SpellCheck(vec![word(10, 2, &[])])),
            )
            .unwrap();
        assert_eq!(markup(&ctx), "<p>abc</p>");
    }
}
