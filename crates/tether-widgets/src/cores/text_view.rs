#![forbid(unsafe_code)]

use tether_runtime::Property;

/// Read-only, possibly multi-line text.
pub trait TextViewCore: Send + Sync {
    fn text(&self) -> &Property<String>;

    /// Wrap long lines instead of clipping them.
    fn wrap(&self) -> &Property<bool>;
}
