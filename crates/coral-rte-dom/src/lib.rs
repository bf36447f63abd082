//! # coral-rte-dom
//!
//! The document model the Coral rich text engine edits: an arena backed tree
//! of elements and text nodes, plus the markup lexer, parser and serializer
//! that move content in and out of it.
//!
//! ## Architecture Overview
//!
//! ```text
//! Markup → Lexer → Tokens → Parser → Dom ──(edits)──→ Serializer → Markup
//!          (Logos)                    ↑
//!                          TextTree (read-only view)
//! ```
//!
//! The engine never touches a browser DOM. It sees documents only through the
//! [`TextTree`] trait, which is enough to walk nodes in document order, count
//! characters and read attributes. [`Dom`] implements it and adds the small
//! set of structural edits editing commands need (split, wrap, unwrap,
//! splice text).
//!
//! ## Module Structure
//!
//! ```text
//! coral-rte-dom/
//! ├── lib.rs        # This file - public API
//! ├── node.rs       # NodeId, NodeKind, Element and tag classification
//! ├── tree.rs       # TextTree trait and the Dom arena
//! ├── lexer.rs      # Logos-based tokenizer
//! ├── parser.rs     # Tolerant token → Dom builder
//! └── serialize.rs  # Dom → markup
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use coral_rte_dom::{inner_markup, parse_markup, TextTree};
//!
//! let dom = parse_markup("<p>Hello <b>world</b></p>").unwrap();
//! assert_eq!(dom.text_content(dom.root()), "Hello world");
//! assert_eq!(inner_markup(&dom, dom.root()), "<p>Hello <b>world</b></p>");
//! ```

pub mod lexer;
pub mod node;
pub mod parser;
pub mod serialize;
pub mod tree;

pub use node::{Element, NodeId, NodeKind, is_block_tag, is_character_tag, is_void_tag};
pub use parser::{MarkupError, parse_into, parse_markup};
pub use serialize::{inner_markup, to_markup};
pub use tree::{Dom, DomError, TextTree, byte_index};
