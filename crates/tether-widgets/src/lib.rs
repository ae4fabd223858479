#![forbid(unsafe_code)]

//! Widgets: cores, core resolution, UI contexts, and views.
//!
//! # Role in tether
//! `tether-widgets` is where a platform-independent view meets a native
//! implementation. It defines what a platform must provide (the [`Core`]
//! trait and one capability interface per widget kind), how a core is chosen
//! for a view ([`CoreRegistry`]), and the views applications build with.
//!
//! # Primary responsibilities
//! - **Cores**: [`Core`], [`CoreBase`], [`CoreInterface`] and the traits in
//!   [`cores`].
//! - **Resolution**: [`CoreRegistry`] maps `(kind, capability)` to a
//!   constructor with deterministic fallback along capability parents.
//! - **Context**: [`UiContext`] bundles the kind, registry and dispatcher.
//! - **Views**: [`View`], [`CoreSlot`] and the concrete views in [`views`].
//!
//! # How it fits in the system
//! Platform glue registers constructors and builds a [`UiContext`] around a
//! `tether_runtime::Dispatcher`. Applications build views and [`bind`] them.
//! `tether-harness` provides a recording mock platform for tests.

pub mod context;
pub mod core;
pub mod cores;
pub mod registry;
pub mod view;
pub mod views;

pub use context::{UiContext, UiContextKind};
pub use self::core::{Core, CoreBase, CoreInterface, CoreRequest, WeakView};
pub use registry::{CoreConstructor, CoreError, CoreRegistry};
pub use view::{CoreSlot, EventHandlers, View, ViewBase, WireGuard, bind, bind_dyn, unbind};
