#![forbid(unsafe_code)]

use crate::core::Core;

/// A plain grouping element.
pub trait ContainerCore: Send + Sync {
    /// Attach `child`'s native element as the last child.
    fn add_child(&self, child: &dyn Core);

    /// Detach every native child element.
    fn remove_all_children(&self);

    fn child_count(&self) -> usize;
}
