#![forbid(unsafe_code)]

//! Runtime: observable properties and the UI-thread dispatcher.
//!
//! # Role in tether
//! `tether-runtime` carries state and work between threads. Views and cores
//! share [`Property`] cells; native event threads hand work to the UI-affine
//! thread through a [`Dispatcher`].
//!
//! # Primary responsibilities
//! - **Reactive cells**: [`Property`], [`ReadProperty`], [`Subscription`] and
//!   [`Binding`].
//! - **Dispatch**: a FIFO queue with delayed work, cancellation, repeating
//!   timers, and idle priority.
//! - **Failure isolation**: panicking or failing closures are reported to a
//!   [`FailureHandler`] and never stop the loop.
//! - **UI thread**: [`UiThread`] owns a dispatcher on a dedicated thread for
//!   platforms (and tests) without a native run loop.
//!
//! # How it fits in the system
//! `tether-widgets` builds views on top of these primitives; platform glue
//! drains the dispatcher from its native loop via
//! [`Dispatcher::run_pending`] and [`Dispatcher::set_waker`].

pub mod dispatcher;
pub mod failure;
pub mod reactive;
pub mod ui_thread;

pub use dispatcher::{DelayedHandle, Dispatcher, DispatcherConfig, Priority, TimerHandle};
pub use failure::{
    DispatchError, DispatchFailure, FailureHandler, TaskError, TaskKind, clear_failure_handler,
    set_failure_handler,
};
pub use reactive::{BindMode, Binding, Property, ReadProperty, Subscription, SubscriptionId};
pub use ui_thread::UiThread;
