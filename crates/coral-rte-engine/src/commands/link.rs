use coral_rte_dom::{NodeId, TextTree};

use super::{CommandValue, EditorCommand, invalid_value, isolate_selection};
use crate::RteError;
use crate::context::EditContext;
use crate::selection::{
    Bookmark, Point, SelectionDefinition, create_range_bookmark, select_bookmark,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkValue {
    pub href: String,
    pub target: Option<String>,
    pub title: Option<String>,
}

impl LinkValue {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorValue {
    pub name: String,
}

fn set_or_remove(ctx: &mut EditContext, node: NodeId, name: &str, value: Option<&str>) -> Result<(), RteError> {
    let dom = ctx.document_mut();
    match value.filter(|v| !v.is_empty()) {
        Some(value) => dom.set_attr(node, name, value)?,
        None => dom.remove_attr(node, name)?,
    }
    Ok(())
}

fn apply_link(ctx: &mut EditContext, anchor: NodeId, link: &LinkValue) -> Result<(), RteError> {
    ctx.document_mut().set_attr(anchor, "href", &link.href)?;
    set_or_remove(ctx, anchor, "target", link.target.as_deref())?;
    set_or_remove(ctx, anchor, "title", link.title.as_deref())?;
    Ok(())
}

fn unwrap_all(ctx: &mut EditContext, nodes: &[NodeId]) -> Result<(), RteError> {
    let bookmark = create_range_bookmark(ctx);
    for &node in nodes {
        ctx.document_mut().unwrap(node)?;
    }
    let root = ctx.root();
    ctx.document_mut().normalize(root);
    if let Some(bookmark) = bookmark {
        select_bookmark(ctx, &Bookmark::Chars(bookmark.chars()));
    }
    Ok(())
}

fn within(ctx: &EditContext, ancestor: NodeId, point: &Point) -> bool {
    ctx.document().contains(ancestor, point.node)
}

/// `modifylink`: edit the link around the selection, or link the selection.
pub struct ModifyLinkCommand;

impl EditorCommand for ModifyLinkCommand {
    fn ids(&self) -> &'static [&'static str] {
        &["modifylink"]
    }

    fn execute(
        &self,
        ctx: &mut EditContext,
        command: &str,
        value: Option<&CommandValue>,
    ) -> Result<(), RteError> {
        let Some(CommandValue::Link(link)) = value else {
            return Err(invalid_value(command, "link"));
        };
        let Some(range) = ctx.selection() else {
            return Ok(());
        };
        let def = SelectionDefinition::compute(ctx);

        if let [anchor] = def.anchors[..]
            && within(ctx, anchor, &range.start)
            && within(ctx, anchor, &range.end)
        {
            log::debug!("updating link {anchor} in place");
            return apply_link(ctx, anchor, link);
        }
        if !def.is_selection {
            log::debug!("nothing selected, no link created");
            return Ok(());
        }

        unwrap_all(ctx, &def.anchors)?;
        let nodes = isolate_selection(ctx)?;
        let mut previous: Option<NodeId> = None;
        for node in nodes {
            let dom = ctx.document_mut();
            match previous {
                Some(anchor) if dom.next_sibling(anchor) == Some(node) => {
                    dom.append_child(anchor, node)?;
                }
                _ => {
                    let anchor = dom.wrap(node, "a", Vec::new())?;
                    apply_link(ctx, anchor, link)?;
                    previous = Some(anchor);
                }
            }
        }
        Ok(())
    }
}

/// `unlink`: remove every link touching the selection, keeping its content.
pub struct UnlinkCommand;

impl EditorCommand for UnlinkCommand {
    fn ids(&self) -> &'static [&'static str] {
        &["unlink"]
    }

    fn execute(
        &self,
        ctx: &mut EditContext,
        _command: &str,
        _value: Option<&CommandValue>,
    ) -> Result<(), RteError> {
        let anchors = SelectionDefinition::compute(ctx).anchors;
        if anchors.is_empty() {
            return Ok(());
        }
        log::debug!("unlinking {} link(s)", anchors.len());
        unwrap_all(ctx, &anchors)
    }
}

/// `anchor`: named anchors. An empty name removes the ones in the selection.
pub struct AnchorCommand;

impl AnchorCommand {
    fn insert_at(ctx: &mut EditContext, point: Point, anchor: NodeId) -> Result<(), RteError> {
        let dom = ctx.document_mut();
        let offset = point.resolved_offset(dom);
        if dom.is_text(point.node) {
            let len = dom.char_len(point.node);
            if offset == 0 {
                dom.insert_before(point.node, anchor)?;
            } else {
                if offset < len {
                    dom.split_text(point.node, offset)?;
                }
                dom.insert_after(point.node, anchor)?;
            }
        } else {
            dom.insert_child(point.node, offset, anchor)?;
        }
        Ok(())
    }
}

impl EditorCommand for AnchorCommand {
    fn ids(&self) -> &'static [&'static str] {
        &["anchor"]
    }

    fn execute(
        &self,
        ctx: &mut EditContext,
        command: &str,
        value: Option<&CommandValue>,
    ) -> Result<(), RteError> {
        let Some(CommandValue::Anchor(AnchorValue { name })) = value else {
            return Err(invalid_value(command, "anchor"));
        };
        let def = SelectionDefinition::compute(ctx);

        if name.is_empty() {
            return unwrap_all(ctx, &def.named_anchors);
        }
        if let Some(&existing) = def.named_anchors.first() {
            ctx.document_mut().set_attr(existing, "name", name)?;
            return Ok(());
        }
        let (Some(range), Some(bookmark)) = (ctx.selection(), create_range_bookmark(ctx)) else {
            return Ok(());
        };
        let start = if bookmark_is_reversed(&bookmark, &range.start) {
            range.end
        } else {
            range.start
        };
        let anchor = ctx
            .document_mut()
            .create_element_with_attrs("a", vec![("name".to_string(), name.clone())]);
        Self::insert_at(ctx, start, anchor)?;
        select_bookmark(ctx, &Bookmark::Chars(bookmark.chars()));
        Ok(())
    }
}

fn bookmark_is_reversed(bookmark: &Bookmark, start: &Point) -> bool {
    matches!(bookmark, Bookmark::Dom { start: first, .. } if first != start)
}
