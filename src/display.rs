//! Deterministic ASCII-art tree rendering.
//!
//! One line per node in depth-first pre-order: a glyph prefix derived from a
//! per-depth "last sibling" bit vector, an optional `key: ` part for children
//! of keyed nodes, then the node's two-part representation. The output of the
//! default style is an exact contract relied on by the test suite.

use itertools::Itertools;

use crate::errors::TreeResult;
use crate::node::{Key, Node};
use crate::tree::Tree;

/// Glyph set used for the tree-drawing prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    Ascii,
    #[default]
    AsciiEx,
    AsciiExr,
    AsciiEm,
    AsciiEmv,
    AsciiEmh,
}

impl LineStyle {
    /// (vertical line, branch box, closing corner)
    fn glyphs(self) -> (&'static str, &'static str, &'static str) {
        match self {
            LineStyle::Ascii => ("|", "|-- ", "+-- "),
            LineStyle::AsciiEx => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            LineStyle::AsciiExr => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2570}\u{2500}\u{2500} "),
            LineStyle::AsciiEm => ("\u{2551}", "\u{2560}\u{2550}\u{2550} ", "\u{255a}\u{2550}\u{2550} "),
            LineStyle::AsciiEmv => ("\u{2551}", "\u{255f}\u{2500}\u{2500} ", "\u{2559}\u{2500}\u{2500} "),
            LineStyle::AsciiEmh => ("\u{2502}", "\u{255e}\u{2550}\u{2550} ", "\u{2558}\u{2550}\u{2550} "),
        }
    }
}

type ShowFilter<'a, P> = Box<dyn Fn(&Node<P>) -> bool + 'a>;

/// Rendering options for [`Tree::show_with`].
pub struct ShowOptions<'a, P> {
    /// Render the subtree below this node instead of the whole tree
    pub nid: Option<&'a str>,
    /// Nodes failing the predicate are hidden together with their subtree
    pub filter: Option<ShowFilter<'a, P>>,
    pub reverse: bool,
    pub line_style: LineStyle,
    /// Stop after this many lines, appending a truncation marker
    pub limit: Option<usize>,
    /// Lines are padded/truncated to this width when a right part is present
    pub line_max_length: usize,
    /// Separator between a displayed key and the node representation
    pub key_delimiter: &'a str,
    /// Whether string keys are shown in front of nodes
    pub display_key: bool,
}

impl<P> Default for ShowOptions<'_, P> {
    fn default() -> Self {
        Self {
            nid: None,
            filter: None,
            reverse: false,
            line_style: LineStyle::default(),
            limit: None,
            line_max_length: 60,
            key_delimiter: ": ",
            display_key: true,
        }
    }
}

impl<P> Tree<P> {
    /// Render the tree in hierarchy style with default options.
    pub fn show(&self) -> String {
        // infallible: no explicit start id involved
        self.show_with(ShowOptions::default())
            .unwrap_or_default()
    }

    /// Render the tree in hierarchy style.
    ///
    /// Fails with `NotFound` when `options.nid` does not exist; an empty tree
    /// renders as the empty string.
    pub fn show_with(&self, options: ShowOptions<'_, P>) -> TreeResult<String> {
        let mut lines: Vec<(Vec<bool>, Option<Key>, &Node<P>)> = Vec::new();
        if let Some(start) = self.resolve_start(options.nid)? {
            let mut is_last_list = Vec::new();
            self.collect_located(
                start,
                &options,
                &mut is_last_list,
                &mut lines,
            )?;
        }

        let mut output = String::new();
        let limit = options.limit.filter(|l| *l > 0);
        let mut emitted = 0usize;
        for (is_last_list, key, node) in lines {
            let prefix = line_prefix_repr(options.line_style, &is_last_list);
            let (start_part, end_part) = node.line_repr();
            let (prefix, is_key_displayed) = match key {
                Some(Key::Map(k)) if options.display_key => (format!("{}{}", prefix, k), true),
                _ => (prefix, false),
            };
            output.push_str(&line_repr(
                &prefix,
                is_key_displayed,
                options.key_delimiter,
                &start_part,
                &end_part,
                options.line_max_length,
            ));
            output.push('\n');
            emitted += 1;
            if limit == Some(emitted) {
                output.push_str(&format!(
                    "...\n(truncated, total number of nodes: {})\n",
                    self.len()
                ));
                return Ok(output);
            }
        }
        Ok(output)
    }

    /// Depth-first pre-order walk recording, for each visited node, at which
    /// depths it is the last of its siblings.
    fn collect_located<'t>(
        &'t self,
        nid: &str,
        options: &ShowOptions<'_, P>,
        is_last_list: &mut Vec<bool>,
        out: &mut Vec<(Vec<bool>, Option<Key>, &'t Node<P>)>,
    ) -> TreeResult<()> {
        let node = self.node(nid)?.as_ref();
        if let Some(filter) = &options.filter {
            if !filter(node) {
                return Ok(());
            }
        }
        out.push((is_last_list.clone(), self.get_key(nid)?, node));

        let mut children: Vec<(Key, String)> = Vec::new();
        for cid in self.children_ids(nid)? {
            let visible = match &options.filter {
                Some(filter) => filter(self.nodes[cid].as_ref()),
                None => true,
            };
            if !visible {
                continue;
            }
            if let Some(key) = self.get_key(cid)? {
                children.push((key, cid.to_string()));
            }
        }
        let children = children
            .into_iter()
            .sorted_by(|(ka, _), (kb, _)| {
                if options.reverse {
                    kb.cmp(ka)
                } else {
                    ka.cmp(kb)
                }
            })
            .collect_vec();
        let last_index = children.len().saturating_sub(1);
        for (index, (_, cid)) in children.iter().enumerate() {
            is_last_list.push(index == last_index);
            self.collect_located(cid, options, is_last_list, out)?;
            is_last_list.pop();
        }
        Ok(())
    }
}

/// Tree-drawing prefix for a node located by its "last sibling" bit vector.
fn line_prefix_repr(style: LineStyle, is_last_list: &[bool]) -> String {
    let Some((last, leading)) = is_last_list.split_last() else {
        return String::new();
    };
    let (vertical, box_glyph, corner_glyph) = style.glyphs();
    let mut prefix = String::new();
    for is_last in leading {
        if *is_last {
            prefix.push_str("    ");
        } else {
            prefix.push_str(vertical);
            prefix.push_str("   ");
        }
    }
    prefix.push_str(if *last { corner_glyph } else { box_glyph });
    prefix
}

/// Assemble one output line: prefix, optional key delimiter, left part, then
/// the right part padded to right-align at `line_max_length`. Overlong lines
/// are cut to `line_max_length - 3` plus an ellipsis.
fn line_repr(
    prefix: &str,
    is_key_displayed: bool,
    key_delimiter: &str,
    node_start: &str,
    node_end: &str,
    line_max_length: usize,
) -> String {
    let mut line = prefix.to_string();
    if is_key_displayed {
        line.push_str(key_delimiter);
    }
    line.push_str(node_start);
    if !node_end.is_empty() {
        let width = line.chars().count() + node_end.chars().count();
        let padding = line_max_length.saturating_sub(width);
        line.extend(std::iter::repeat(' ').take(padding));
        line.push_str(node_end);
    }
    if line.chars().count() > line_max_length {
        let cut: String = line
            .chars()
            .take(line_max_length.saturating_sub(3))
            .collect();
        return format!("{}...", cut);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_location_vectors_when_prefixing_then_matches_glyph_table() {
        let style = LineStyle::AsciiEx;
        assert_eq!(line_prefix_repr(style, &[]), "");
        assert_eq!(line_prefix_repr(style, &[true]), "└── ");
        assert_eq!(line_prefix_repr(style, &[false]), "├── ");
        assert_eq!(line_prefix_repr(style, &[true, false, true]), "    │   └── ");
        assert_eq!(line_prefix_repr(style, &[false, false, false]), "│   │   ├── ");
    }

    #[test]
    fn given_two_part_repr_when_formatting_then_end_is_right_aligned() {
        let line = line_repr("└──", false, ": ", "start message", "end message", 40);
        assert_eq!(line, "└──start message             end message");
        assert_eq!(line.chars().count(), 40);

        let line = line_repr("└── a", true, ": ", "start message", "end message", 40);
        assert_eq!(line, "└── a: start message         end message");
        assert_eq!(line.chars().count(), 40);
    }

    #[test]
    fn given_overlong_line_when_formatting_then_truncates_with_ellipsis() {
        let line = line_repr("└──", false, ": ", "start message", "end message", 15);
        assert_eq!(line, "└──start mes...");
        assert_eq!(line.chars().count(), 15);

        let line = line_repr("└── a", true, ": ", "start message", "end message", 15);
        assert_eq!(line, "└── a: start...");
        assert_eq!(line.chars().count(), 15);
    }

    #[test]
    fn given_plain_line_when_under_limit_then_no_padding_applied() {
        assert_eq!(line_repr("├── a", true, ": ", "{}", "", 60), "├── a: {}");
        assert_eq!(line_repr("", false, ": ", "{}", "", 60), "{}");
    }
}
