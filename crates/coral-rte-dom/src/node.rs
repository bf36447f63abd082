//! Node identifiers, node payloads and tag classification.

/// Index of a node inside a [`Dom`](crate::Dom) arena.
///
/// Ids stay valid for the lifetime of the arena, even after the node has been
/// detached. Whether a node is still part of the document is answered by
/// [`TextTree::is_attached`](crate::TextTree::is_attached).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index, mostly useful for debugging output.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An element: lower-cased tag name plus attributes in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attrs(tag: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        Self {
            attrs,
            ..Self::new(tag)
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the space separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

impl NodeKind {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }
}

/// Elements that start a new line of text and therefore separate character runs.
pub fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "li"
            | "ul"
            | "ol"
            | "dl"
            | "dt"
            | "dd"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "blockquote"
            | "pre"
            | "table"
            | "tbody"
            | "thead"
            | "tr"
            | "td"
            | "th"
            | "body"
    )
}

/// Elements that never have children.
pub fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "br" | "img" | "hr" | "input" | "meta" | "link" | "col" | "wbr" | "area"
    )
}

/// Void elements that occupy one character position in the flattened text.
pub fn is_character_tag(tag: &str) -> bool {
    matches!(tag, "br" | "img" | "hr")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn element_lowercases_tag() {
        assert_eq!(Element::new("SPAN").tag, "span");
    }

    #[test]
    fn has_class_matches_whole_words() {
        let element = Element::with_attrs(
            "span",
            vec![("class".to_string(), "rte-spellcheck  marked".to_string())],
        );
        assert!(element.has_class("marked"));
        assert!(element.has_class("rte-spellcheck"));
        assert!(!element.has_class("rte"));
    }

    #[rstest]
    #[case("p", true, false, false)]
    #[case("li", true, false, false)]
    #[case("br", false, true, true)]
    #[case("img", false, true, true)]
    #[case("input", false, true, false)]
    #[case("span", false, false, false)]
    #[case("a", false, false, false)]
    fn tag_classification(
        #[case] tag: &str,
        #[case] block: bool,
        #[case] void: bool,
        #[case] character: bool,
    ) {
        assert_eq!(is_block_tag(tag), block);
        assert_eq!(is_void_tag(tag), void);
        assert_eq!(is_character_tag(tag), character);
    }
}
