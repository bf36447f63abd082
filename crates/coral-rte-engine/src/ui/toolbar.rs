//! # Toolbar Building
//!
//! Plugins declare their buttons on a [`ToolbarBuilder`] during
//! [`Plugin::initialize_ui`](crate::plugin::Plugin::initialize_ui). The
//! builder then lays them out as a [`Toolbar`], either following the host's
//! `ui_settings` for the toolbar id or, without settings, in declaration
//! order. An existing toolbar markup can be bound instead with
//! [`ToolbarBuilder::bind_toolbar`].
//!
//! Item ids in `ui_settings` look like this:
//!
//! ```text
//! links#modifylink   plugin button
//! unlink             bare feature name, matched against any plugin
//! -                  separator
//! #find              popover trigger, items from ui_settings.<id>.popovers.find
//! ```
//!
//! Unknown ids are skipped so hosts can list features that are disabled.

use std::collections::BTreeMap;

use coral_rte_config::ToolbarSettings;
use coral_rte_dom::{Dom, NodeId, TextTree, to_markup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarElement {
    pub plugin: String,
    pub feature: String,
    pub tooltip: String,
    /// Toggle buttons render their selected state.
    pub toggle: bool,
    pub disabled: bool,
    pub selected: bool,
    pub icon: Option<String>,
    pub class: Option<String>,
}

impl ToolbarElement {
    /// `plugin#feature`
    pub fn id(&self) -> String {
        format!("{}#{}", self.plugin, self.feature)
    }

    fn matches(&self, id: &str) -> bool {
        match id.split_once('#') {
            Some((plugin, feature)) => plugin == self.plugin && feature == self.feature,
            None => id == self.feature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarItem {
    Element(ToolbarElement),
    Separator,
    Popover {
        /// Trigger id including the leading `#`.
        id: String,
        icon: Option<String>,
        items: Vec<ToolbarItem>,
    },
}

/// Command id → icon and CSS class lookup, extensible at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRegistry {
    icons: BTreeMap<String, String>,
    classes: BTreeMap<String, String>,
}

impl Default for IconRegistry {
    fn default() -> Self {
        let icons = [
            ("links#modifylink", "link"),
            ("links#unlink", "linkOff"),
            ("links#anchor", "anchor"),
            ("findreplace#find", "search"),
            ("findreplace#replace", "findAndReplace"),
            ("spellcheck#checktext", "spellcheck"),
            ("undo#undo", "undo"),
            ("undo#redo", "redo"),
            ("#links", "link"),
            ("#findreplace", "search"),
        ];
        Self {
            icons: icons
                .into_iter()
                .map(|(id, icon)| (id.to_string(), icon.to_string()))
                .collect(),
            classes: BTreeMap::new(),
        }
    }
}

impl IconRegistry {
    pub fn register_icon(&mut self, id: &str, icon: &str) {
        self.icons.insert(id.to_string(), icon.to_string());
    }

    pub fn register_additional_classes(&mut self, id: &str, class: &str) {
        self.classes.insert(id.to_string(), class.to_string());
    }

    pub fn icon(&self, id: &str) -> Option<&str> {
        self.icons.get(id).map(String::as_str)
    }

    pub fn class(&self, id: &str) -> Option<&str> {
        self.classes.get(id).map(String::as_str)
    }
}

/// Where the host attaches the toolbar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolbarPlacement {
    /// Directly before the editable element.
    #[default]
    BeforeEditable,
    /// Into the named UI container, used when the editable lives in another
    /// document (an iframe).
    Container(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarOptions {
    pub toolbar_id: String,
    pub placement: ToolbarPlacement,
}

impl Default for ToolbarOptions {
    fn default() -> Self {
        Self {
            toolbar_id: "inline".to_string(),
            placement: ToolbarPlacement::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolbar {
    pub id: String,
    pub placement: ToolbarPlacement,
    pub items: Vec<ToolbarItem>,
}

fn visit_elements<'a>(items: &'a mut [ToolbarItem], found: &mut Vec<&'a mut ToolbarElement>) {
    for item in items {
        match item {
            ToolbarItem::Element(element) => found.push(element),
            ToolbarItem::Popover { items, .. } => visit_elements(items, found),
            ToolbarItem::Separator => {}
        }
    }
}

impl Toolbar {
    fn elements_mut(&mut self) -> Vec<&mut ToolbarElement> {
        let mut found = Vec::new();
        visit_elements(&mut self.items, &mut found);
        found
    }

    /// Every element, popover contents included, in display order.
    pub fn elements(&self) -> Vec<&ToolbarElement> {
        fn visit<'a>(items: &'a [ToolbarItem], found: &mut Vec<&'a ToolbarElement>) {
            for item in items {
                match item {
                    ToolbarItem::Element(element) => found.push(element),
                    ToolbarItem::Popover { items, .. } => visit(items, found),
                    ToolbarItem::Separator => {}
                }
            }
        }
        let mut found = Vec::new();
        visit(&self.items, &mut found);
        found
    }

    pub fn element(&self, id: &str) -> Option<&ToolbarElement> {
        self.elements().into_iter().find(|e| e.id() == id)
    }

    /// Set the disabled state of every button for `id` (`plugin#feature`).
    /// Buttons the layout left out are ignored.
    pub fn set_disabled(&mut self, id: &str, disabled: bool) {
        for element in self.elements_mut().into_iter().filter(|e| e.id() == id) {
            element.disabled = disabled;
        }
    }

    pub fn set_selected(&mut self, id: &str, selected: bool) {
        for element in self.elements_mut().into_iter().filter(|e| e.id() == id) {
            element.selected = selected;
        }
    }

    /// Render the toolbar as markup for hosts that build their UI from HTML.
    pub fn to_markup(&self) -> String {
        let mut dom = Dom::new("div");
        let root = dom.root();
        for (name, value) in [("class", "rte-toolbar"), ("data-toolbar", self.id.as_str())] {
            if let Err(err) = dom.set_attr(root, name, value) {
                log::warn!("could not set toolbar attribute {name}: {err}");
            }
        }
        render_items(&mut dom, root, &self.items);
        to_markup(&dom, root)
    }
}

fn render_items(dom: &mut Dom, parent: NodeId, items: &[ToolbarItem]) {
    for item in items {
        let node = match item {
            ToolbarItem::Separator => dom.create_element_with_attrs(
                "span",
                vec![("class".to_string(), "rte-toolbar-separator".to_string())],
            ),
            ToolbarItem::Popover { id, icon, items } => {
                let mut attrs = vec![
                    ("class".to_string(), "rte-popover".to_string()),
                    ("data-popover".to_string(), id.clone()),
                ];
                if let Some(icon) = icon {
                    attrs.push(("data-icon".to_string(), icon.clone()));
                }
                let node = dom.create_element_with_attrs("div", attrs);
                render_items(dom, node, items);
                node
            }
            ToolbarItem::Element(element) => {
                let mut classes = vec!["rte-toolbar-item".to_string()];
                classes.extend(element.icon.as_ref().map(|icon| format!("icon-{icon}")));
                classes.extend(element.class.clone());
                if element.selected {
                    classes.push("is-selected".to_string());
                }
                let mut attrs = vec![
                    ("type".to_string(), "button".to_string()),
                    ("data-action".to_string(), element.id()),
                    ("title".to_string(), element.tooltip.clone()),
                    ("class".to_string(), classes.join(" ")),
                ];
                if element.disabled {
                    attrs.push(("disabled".to_string(), "disabled".to_string()));
                }
                dom.create_element_with_attrs("button", attrs)
            }
        };
        if let Err(err) = dom.append_child(parent, node) {
            log::warn!("could not render toolbar item: {err}");
        }
    }
}

/// Collects plugin buttons and lays them out.
#[derive(Debug, Clone, Default)]
pub struct ToolbarBuilder {
    elements: Vec<ToolbarElement>,
    icons: IconRegistry,
}

impl ToolbarBuilder {
    pub fn new(icons: IconRegistry) -> Self {
        Self {
            elements: Vec::new(),
            icons,
        }
    }

    pub fn add_element(&mut self, plugin: &str, feature: &str, tooltip: &str, toggle: bool) {
        self.elements.push(ToolbarElement {
            plugin: plugin.to_string(),
            feature: feature.to_string(),
            tooltip: tooltip.to_string(),
            toggle,
            disabled: false,
            selected: false,
            icon: None,
            class: None,
        });
    }

    pub fn register_icon(&mut self, id: &str, icon: &str) {
        self.icons.register_icon(id, icon);
    }

    pub fn register_additional_classes(&mut self, id: &str, class: &str) {
        self.icons.register_additional_classes(id, class);
    }

    pub fn elements(&self) -> &[ToolbarElement] {
        &self.elements
    }

    fn resolve_element(&self, id: &str) -> Option<ToolbarItem> {
        let element = self.elements.iter().find(|e| e.matches(id))?;
        let mut element = element.clone();
        let key = element.id();
        element.icon = self.icons.icon(&key).map(str::to_string);
        element.class = self.icons.class(&key).map(str::to_string);
        Some(ToolbarItem::Element(element))
    }

    fn resolve(&self, id: &str, settings: &ToolbarSettings, nested: bool) -> Option<ToolbarItem> {
        if id == "-" {
            return Some(ToolbarItem::Separator);
        }
        if let Some(name) = id.strip_prefix('#') {
            if nested {
                log::debug!("nested popover {id} ignored");
                return None;
            }
            let popover = settings.popovers.get(name)?;
            let items: Vec<ToolbarItem> = popover
                .items
                .iter()
                .filter_map(|item| self.resolve(item, settings, true))
                .collect();
            if !items.iter().any(|i| matches!(i, ToolbarItem::Element(_))) {
                return None;
            }
            let icon = popover
                .icon
                .clone()
                .or_else(|| self.icons.icon(id).map(str::to_string));
            return Some(ToolbarItem::Popover {
                id: id.to_string(),
                icon,
                items,
            });
        }
        let resolved = self.resolve_element(id);
        if resolved.is_none() {
            log::debug!("toolbar item {id} is not provided by any plugin, skipped");
        }
        resolved
    }

    /// Lay out the collected elements for `options.toolbar_id`.
    pub fn create_toolbar(
        &self,
        options: &ToolbarOptions,
        ui_settings: &BTreeMap<String, ToolbarSettings>,
    ) -> Toolbar {
        let items = match ui_settings.get(&options.toolbar_id) {
            Some(settings) => settings
                .toolbar
                .iter()
                .filter_map(|id| self.resolve(id, settings, false))
                .collect(),
            None => self
                .elements
                .iter()
                .filter_map(|e| self.resolve_element(&e.id()))
                .collect(),
        };
        Toolbar {
            id: options.toolbar_id.clone(),
            placement: options.placement.clone(),
            items,
        }
    }

    /// Build a toolbar from existing markup below `root`.
    ///
    /// Buttons are recognised by `data-action`, separators by the
    /// `rte-toolbar-separator` class and popovers by `data-popover`.
    pub fn bind_toolbar<T: TextTree>(&self, tree: &T, root: NodeId, options: &ToolbarOptions) -> Toolbar {
        Toolbar {
            id: options.toolbar_id.clone(),
            placement: options.placement.clone(),
            items: self.bind_items(tree, root),
        }
    }

    fn bind_items<T: TextTree>(&self, tree: &T, node: NodeId) -> Vec<ToolbarItem> {
        let mut items = Vec::new();
        for &child in tree.children(node) {
            let Some(element) = tree.element(child) else {
                continue;
            };
            if let Some(action) = element.attr("data-action") {
                items.extend(self.resolve_element(action));
            } else if element.has_class("rte-toolbar-separator") {
                items.push(ToolbarItem::Separator);
            } else if let Some(id) = element.attr("data-popover") {
                items.push(ToolbarItem::Popover {
                    id: id.to_string(),
                    icon: element.attr("data-icon").map(str::to_string),
                    items: self.bind_items(tree, child),
                });
            } else {
                items.extend(self.bind_items(tree, child));
            }
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_rte_config::PopoverSettings;
    use coral_rte_dom::parse_markup;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn builder() -> ToolbarBuilder {
        let mut builder = ToolbarBuilder::default();
        builder.add_element("links", "modifylink", "Hyperlink", false);
        builder.add_element("links", "unlink", "Unlink", false);
        builder.add_element("findreplace", "find", "Find", false);
        builder.add_element("findreplace", "replace", "Replace", false);
        builder
    }

    fn ids(items: &[ToolbarItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                ToolbarItem::Element(e) => e.id(),
                ToolbarItem::Separator => "-".to_string(),
                ToolbarItem::Popover { id, items, .. } => format!("{id}[{}]", ids(items).join(",")),
            })
            .collect()
    }

    #[test]
    fn follows_ui_settings_order_and_skips_unknown_ids() {
        let settings = ToolbarSettings {
            toolbar: vec![
                "findreplace#find".to_string(),
                "-".to_string(),
                "bold".to_string(),
                "unlink".to_string(),
                "#links".to_string(),
                "#missing".to_string(),
            ],
            popovers: BTreeMap::from([(
                "links".to_string(),
                PopoverSettings {
                    icon: None,
                    items: vec!["links#modifylink".to_string(), "format#bold".to_string()],
                },
            )]),
        };
        let ui = BTreeMap::from([("inline".to_string(), settings)]);

        let toolbar = builder().create_toolbar(&ToolbarOptions::default(), &ui);

        assert_eq!(
            ids(&toolbar.items),
            vec!["findreplace#find", "-", "links#unlink", "#links[links#modifylink]"]
        );
        let ToolbarItem::Popover { icon, .. } = &toolbar.items[3] else {
            panic!("expected a popover");
        };
        assert_eq!(icon.as_deref(), Some("link"));
    }

    #[test]
    fn without_settings_uses_declaration_order() {
        let toolbar = builder().create_toolbar(&ToolbarOptions::default(), &BTreeMap::new());
        assert_eq!(
            ids(&toolbar.items),
            vec![
                "links#modifylink",
                "links#unlink",
                "findreplace#find",
                "findreplace#replace"
            ]
        );
    }

    #[test]
    fn state_changes_reach_popover_items() {
        let settings = ToolbarSettings {
            toolbar: vec!["#links".to_string()],
            popovers: BTreeMap::from([(
                "links".to_string(),
                PopoverSettings {
                    icon: Some("chain".to_string()),
                    items: vec!["unlink".to_string()],
                },
            )]),
        };
        let ui = BTreeMap::from([("inline".to_string(), settings)]);
        let mut toolbar = builder().create_toolbar(&ToolbarOptions::default(), &ui);

        toolbar.set_disabled("links#unlink", true);
        toolbar.set_selected("links#modifylink", true);

        assert!(toolbar.element("links#unlink").unwrap().disabled);
        assert!(toolbar.element("links#modifylink").is_none());
    }

    #[test]
    fn renders_markup() {
        let mut builder = builder();
        builder.register_additional_classes("links#unlink", "is-compact");
        let mut toolbar = builder.create_toolbar(
            &ToolbarOptions {
                toolbar_id: "fullscreen".to_string(),
                placement: ToolbarPlacement::Container("ui".to_string()),
            },
            &BTreeMap::new(),
        );
        toolbar.items.truncate(2);
        toolbar.set_disabled("links#unlink", true);

        assert_snapshot!(toolbar.to_markup(), @r#"<div class="rte-toolbar" data-toolbar="fullscreen"><button type="button" data-action="links#modifylink" title="Hyperlink" class="rte-toolbar-item icon-link"></button><button type="button" data-action="links#unlink" title="Unlink" class="rte-toolbar-item icon-linkOff is-compact" disabled="disabled"></button></div>"#);
    }

    #[test]
    fn empty_toolbar_keeps_its_root_attributes() {
        let toolbar = Toolbar {
            id: "inline".to_string(),
            placement: ToolbarPlacement::Container("ui".to_string()),
            items: Vec::new(),
        };

        assert_snapshot!(toolbar.to_markup(), @r#"<div class="rte-toolbar" data-toolbar="inline"></div>"#);
    }

    #[test]
    fn binds_existing_markup() {
        let dom = parse_markup(
            r##"<div class="bar"><button data-action="links#unlink"></button><span class="rte-toolbar-separator"></span><div data-popover="#find"><button data-action="findreplace#find"></button><button data-action="other#thing"></button></div></div>"##,
        )
        .unwrap();

        let toolbar = builder().bind_toolbar(&dom, dom.root(), &ToolbarOptions::default());

        assert_eq!(
            ids(&toolbar.items),
            vec!["links#unlink", "-", "#find[findreplace#find]"]
        );
    }
}
