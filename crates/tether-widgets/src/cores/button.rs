#![forbid(unsafe_code)]

use tether_core::WeakCallback;
use tether_runtime::Property;

/// A push button.
pub trait ButtonCore: Send + Sync {
    /// Text shown on the button.
    fn label(&self) -> &Property<String>;

    /// Fired on the UI thread when the user activates the button.
    fn on_click(&self) -> &WeakCallback;
}
