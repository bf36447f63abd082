//! # Searchable Document
//!
//! A flattened, position-indexed view of the editable root's text, used by
//! find/replace. The index is a list of [`Fragment`]s whose positions are
//! contiguous and agree with the char-position model of
//! [`PositionMap`](crate::common::PositionMap): every block boundary and `br`
//! becomes a `"\n"` fragment, `img`/`hr` become an object replacement char.
//!
//! The index records the tree revision it was built from. Any call made
//! after the tree changed fails with [`SearchError::Stale`]; callers rebuild
//! with [`SearchableDocument::create`] or [`SearchableDocument::adjust_to_replace`].

use coral_rte_dom::{NodeId, TextTree, byte_index};
use regex::{Regex, RegexBuilder};

use crate::common::{PositionMap, TokenKind};
use crate::selection::{CharSpan, Point, Range};

const LINE_SEPARATOR: &str = "\n";
const OBJECT_REPLACEMENT: &str = "\u{FFFC}";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("the document changed since the search index was built (index revision {indexed}, document revision {current})")]
    Stale { indexed: u64, current: u64 },
    #[error("the search term is empty")]
    EmptyTerm,
    #[error("no search is in progress")]
    NoActiveSearch,
    #[error("invalid search pattern: {0}")]
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Text node, or the element that produced a separator.
    pub node: NodeId,
    pub node_pos: usize,
    pub text: String,
    pub is_text: bool,
}

impl Fragment {
    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// The part of a match that lies in one text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSegment {
    pub node: NodeId,
    /// Char position of the node's first character.
    pub node_pos: usize,
    /// Offset of the match inside the node.
    pub match_pos: usize,
    pub match_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub segments: Vec<MatchSegment>,
    pub start_pos: usize,
    pub char_len: usize,
}

impl Match {
    pub fn span(&self) -> CharSpan {
        CharSpan {
            start_pos: self.start_pos,
            char_cnt: self.char_len,
        }
    }

    /// Selection covering the match, from the first segment to the last.
    pub fn range(&self) -> Option<Range> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some(Range::new(
            Point::new(first.node, first.match_pos),
            Point::new(last.node, last.match_pos + last.match_chars),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindOptions {
    pub match_case: bool,
    pub start_pos: usize,
}

/// Char position reference for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRef {
    pub text_pos: usize,
}

#[derive(Debug, Clone)]
struct ActiveSearch {
    term: String,
    pattern: Regex,
    next_pos: usize,
    last: Option<Match>,
}

#[derive(Debug, Clone)]
pub struct SearchableDocument {
    root: NodeId,
    revision: u64,
    map: PositionMap,
    fragments: Vec<Fragment>,
    text: String,
    search: Option<ActiveSearch>,
}

impl SearchableDocument {
    /// Build the index for the subtree below `root`.
    pub fn create<T: TextTree>(tree: &T, root: NodeId) -> Self {
        let map = PositionMap::build(tree, root);
        let mut fragments: Vec<Fragment> = Vec::new();

        for (index, token) in map.tokens().iter().enumerate() {
            match token.kind {
                TokenKind::TextStart => {
                    let text = tree.text(token.node).unwrap_or_default();
                    if !text.is_empty() {
                        fragments.push(Fragment {
                            node: token.node,
                            node_pos: map.char_pos(index),
                            text: text.to_string(),
                            is_text: true,
                        });
                    }
                }
                _ if token.weight > 0 && !matches!(token.kind, TokenKind::Char(_)) => {
                    let separator = if tree.is_tag(token.node, "img") || tree.is_tag(token.node, "hr") {
                        OBJECT_REPLACEMENT
                    } else {
                        LINE_SEPARATOR
                    };
                    fragments.push(Fragment {
                        node: token.node,
                        node_pos: map.char_pos(index),
                        text: separator.to_string(),
                        is_text: false,
                    });
                }
                _ => {}
            }
        }

        let text = fragments.iter().map(|f| f.text.as_str()).collect();
        Self {
            root,
            revision: tree.revision(),
            map,
            fragments,
            text,
            search: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// The flattened text the positions refer to.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_stale<T: TextTree>(&self, tree: &T) -> bool {
        tree.revision() != self.revision
    }

    fn check_fresh<T: TextTree>(&self, tree: &T) -> Result<(), SearchError> {
        if self.is_stale(tree) {
            return Err(SearchError::Stale {
                indexed: self.revision,
                current: tree.revision(),
            });
        }
        Ok(())
    }

    /// Find the first occurrence of `term` at or after `options.start_pos`.
    ///
    /// Starts a new search; [`find_next`](Self::find_next) continues it.
    pub fn find<T: TextTree>(
        &mut self,
        tree: &T,
        term: &str,
        options: FindOptions,
    ) -> Result<Option<Match>, SearchError> {
        self.check_fresh(tree)?;
        if term.is_empty() {
            return Err(SearchError::EmptyTerm);
        }
        let pattern = RegexBuilder::new(&regex::escape(term))
            .case_insensitive(!options.match_case)
            .build()
            .map_err(|e| SearchError::Pattern(e.to_string()))?;
        self.search = Some(ActiveSearch {
            term: term.to_string(),
            pattern,
            next_pos: options.start_pos,
            last: None,
        });
        self.advance()
    }

    /// Continue the current search after the end of the previous match.
    ///
    /// Returns `Ok(None)` once no match is left; the search does not wrap.
    pub fn find_next<T: TextTree>(&mut self, tree: &T) -> Result<Option<Match>, SearchError> {
        self.check_fresh(tree)?;
        if self.search.is_none() {
            return Err(SearchError::NoActiveSearch);
        }
        self.advance()
    }

    fn advance(&mut self) -> Result<Option<Match>, SearchError> {
        let search = self.search.as_mut().ok_or(SearchError::NoActiveSearch)?;
        let from = byte_index(&self.text, search.next_pos);
        let Some(found) = search.pattern.find_at(&self.text, from) else {
            search.last = None;
            return Ok(None);
        };

        let start_pos = self.text[..found.start()].chars().count();
        let char_len = found.as_str().chars().count();
        let segments = segments_for(&self.fragments, start_pos, char_len);
        let found = Match {
            segments,
            start_pos,
            char_len,
        };
        search.next_pos = start_pos + char_len.max(1);
        search.last = Some(found.clone());
        log::debug!("found {:?} at {start_pos}", search.term);
        Ok(Some(found))
    }

    pub fn current_term(&self) -> Option<&str> {
        self.search.as_ref().map(|s| s.term.as_str())
    }

    pub fn last_match(&self) -> Option<&Match> {
        self.search.as_ref().and_then(|s| s.last.as_ref())
    }

    /// Re-sync after the last match was replaced by `replacement`.
    ///
    /// The index is rebuilt from the tree rather than patched; the active
    /// search continues right after the inserted text.
    pub fn adjust_to_replace<T: TextTree>(&mut self, tree: &T, replacement: &str) -> Result<(), SearchError> {
        let mut search = self.search.take().ok_or(SearchError::NoActiveSearch)?;
        let last = search.last.take().ok_or(SearchError::NoActiveSearch)?;
        *self = Self::create(tree, self.root);
        search.next_pos = last.start_pos + replacement.chars().count();
        self.search = Some(search);
        Ok(())
    }

    /// Start position of `node` in the flattened text.
    pub fn get_ref_for_node(&self, node: NodeId) -> Option<TextRef> {
        self.map.node_start(node).map(|text_pos| TextRef { text_pos })
    }

    /// Position of a DOM point, used to seed a search at the caret.
    pub fn get_ref_for_point<T: TextTree>(&self, tree: &T, point: &Point) -> Result<Option<TextRef>, SearchError> {
        self.check_fresh(tree)?;
        Ok(self
            .map
            .char_pos_of(tree, point)
            .map(|text_pos| TextRef { text_pos }))
    }
}

fn segments_for(fragments: &[Fragment], start_pos: usize, char_len: usize) -> Vec<MatchSegment> {
    let end_pos = start_pos + char_len;
    fragments
        .iter()
        .filter(|f| f.is_text)
        .filter_map(|f| {
            let node_end = f.node_pos + f.char_len();
            let from = start_pos.max(f.node_pos);
            let to = end_pos.min(node_end);
            (from < to).then(|| MatchSegment {
                node: f.node,
                node_pos: f.node_pos,
                match_pos: from - f.node_pos,
                match_chars: to - from,
            })
        })
        .collect()
}
