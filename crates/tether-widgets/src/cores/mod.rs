#![forbid(unsafe_code)]

//! Capability interfaces a platform implements for its cores.
//!
//! One trait per capability. Properties here are the core's own cells: a
//! platform core subscribes to them at construction and applies each change
//! to the native element before the write returns. Reads return the last
//! written value.
//!
//! Events flow the other way through [`WeakCallback`] slots that the view
//! binds. Platform code must invoke them from a closure enqueued on the
//! core's dispatcher, never directly from a native event thread.
//!
//! [`WeakCallback`]: tether_core::WeakCallback

mod button;
mod container;
mod list_view;
mod stack;
mod switch;
mod text_field;
mod text_view;
mod web_view;
mod window;

pub use button::ButtonCore;
pub use container::ContainerCore;
pub use list_view::{ListViewCore, ListViewDataSource};
pub use stack::StackCore;
pub use switch::SwitchCore;
pub use text_field::TextFieldCore;
pub use text_view::TextViewCore;
pub use web_view::WebViewCore;
pub use window::WindowCore;
