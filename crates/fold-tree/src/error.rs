use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`FoldedDocument`](crate::FoldedDocument) edits.
pub enum DocumentError {
    #[error("invalid offset {offset} (document has {len} characters)")]
    /// A character offset lies past the end of the document.
    InvalidOffset {
        /// The rejected character offset.
        offset: usize,
        /// Document length in characters.
        len: usize,
    },

    #[error("invalid range {start}..{end} (document has {len} characters)")]
    /// A character range is reversed or extends past the end of the document.
    InvalidRange {
        /// Inclusive start character offset.
        start: usize,
        /// Exclusive end character offset.
        end: usize,
        /// Document length in characters.
        len: usize,
    },
}
