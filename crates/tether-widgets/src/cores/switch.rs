#![forbid(unsafe_code)]

use tether_core::WeakCallback;
use tether_runtime::Property;

/// An on/off toggle with a label.
///
/// A native toggle must write the new state into [`on`](Self::on) on the UI
/// thread and only then fire [`on_click`](Self::on_click), so handlers
/// observe the updated state.
pub trait SwitchCore: Send + Sync {
    fn label(&self) -> &Property<String>;

    fn on(&self) -> &Property<bool>;

    fn on_click(&self) -> &WeakCallback;
}
