#![forbid(unsafe_code)]

use crate::core::Core;

/// A navigation stack: one visible page at a time, with a back history.
pub trait StackCore: Send + Sync {
    /// Push `page` on top with a navigation title.
    fn push_view(&self, page: &dyn Core, title: &str);

    /// Pop the top page. Returns `false` if the stack was empty.
    fn pop_view(&self) -> bool;

    /// Number of pages on the native stack.
    fn depth(&self) -> usize;
}
