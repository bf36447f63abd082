//! Markup serialization. Serializing to a string is the persistence boundary
//! of the editor: whatever the host stores comes out of these functions.

use crate::node::{NodeId, NodeKind, is_void_tag};
use crate::tree::TextTree;

/// Serialize `node` including its own tag.
pub fn to_markup<T: TextTree>(tree: &T, node: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, node, &mut out);
    out
}

/// Serialize the children of `node`, e.g. the editable content under the root.
pub fn inner_markup<T: TextTree>(tree: &T, node: NodeId) -> String {
    let mut out = String::new();
    for &child in tree.children(node) {
        write_node(tree, child, &mut out);
    }
    out
}

fn write_node<T: TextTree>(tree: &T, node: NodeId, out: &mut String) {
    match tree.kind(node) {
        NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
        NodeKind::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (key, value) in &element.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');
            if is_void_tag(&element.tag) {
                return;
            }
            for &child in tree.children(node) {
                write_node(tree, child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}
