//! Folding change notifications.

/// A visibility change reported by a [`crate::FoldingTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldingEvent {
    /// A fold toggle changed visibility; `line` is the opening line of the toggled region.
    RegionVisibilityChanged {
        /// Real line of the toggled region's opening.
        line: usize,
    },
    /// A single real line was hidden or shown.
    LineVisibilityChanged {
        /// Real line number.
        line: usize,
        /// New visibility.
        visible: bool,
    },
}

/// Folding event callback function type
pub type FoldingEventCallback = Box<dyn FnMut(&FoldingEvent) + Send>;
