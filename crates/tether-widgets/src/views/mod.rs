#![forbid(unsafe_code)]

//! Concrete views.
//!
//! Each view is created behind an `Arc` (cores call back into it through
//! weak references) and is bound with [`bind`](crate::view::bind).
//!
//! Containers (`ContainerView`, `Window`, `Stack`) own their children and
//! bind them into the same context when they are bound themselves. Child
//! cores are released before the container's core.

mod button;
mod container;
mod list_view;
mod stack;
mod switch;
mod text_field;
mod text_view;
mod web_view;
mod window;

pub use button::Button;
pub use container::ContainerView;
pub use list_view::ListView;
pub use stack::Stack;
pub use switch::Switch;
pub use text_field::TextField;
pub use text_view::TextView;
pub use web_view::WebView;
pub use window::Window;
