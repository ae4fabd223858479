#![forbid(unsafe_code)]

use tether_core::WeakCallback;
use tether_runtime::Property;

/// A single-line editable text input.
///
/// Native edits are mirrored into [`text`](Self::text) on the UI thread.
pub trait TextFieldCore: Send + Sync {
    fn text(&self) -> &Property<String>;

    /// Fired when the user confirms the input (return key or equivalent).
    fn on_submit(&self) -> &WeakCallback;
}
