#![forbid(unsafe_code)]

use tether_runtime::Property;

use crate::core::Core;

/// A top-level window holding at most one content core.
pub trait WindowCore: Send + Sync {
    fn title(&self) -> &Property<String>;

    /// Replace the native content element. `None` clears it.
    fn set_content(&self, content: Option<&dyn Core>);
}
