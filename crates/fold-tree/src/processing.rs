//! The lexer seam used to feed a [`FoldingTree`](crate::FoldingTree).
//!
//! A lexer turns the text of one line into signed region tokens. External crates
//! (`fold-tree-highlight-simple`) implement [`RegionLexer`]; [`FoldedDocument`](crate::FoldedDocument)
//! drives it after every edit.

use crate::node::RegionType;

/// Produces the region tokens of a single line.
pub trait RegionLexer {
    /// Tokens found on real line `line`, ordered left to right.
    ///
    /// `text` is the line's content without its line terminator. Positive tokens open a region of
    /// that type, negative tokens close one.
    fn region_tokens(&mut self, line: usize, text: &str) -> Vec<RegionType>;
}

impl<F> RegionLexer for F
where
    F: FnMut(usize, &str) -> Vec<RegionType>,
{
    fn region_tokens(&mut self, line: usize, text: &str) -> Vec<RegionType> {
        self(line, text)
    }
}

/// Lexer that treats `{` / `}` as region type 1, ignoring everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceLexer;

impl RegionLexer for BraceLexer {
    fn region_tokens(&mut self, _line: usize, text: &str) -> Vec<RegionType> {
        text.chars()
            .filter_map(|ch| match ch {
                '{' => Some(1),
                '}' => Some(-1),
                _ => None,
            })
            .collect()
    }
}
