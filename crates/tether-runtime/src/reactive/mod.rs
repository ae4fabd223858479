#![forbid(unsafe_code)]

//! Reactive data bindings for tether.
//!
//! This module provides the state channel between views and their native
//! cores:
//!
//! - [`Property`]: a shared, version-tracked value cell with equality-gated
//!   change notification.
//! - [`ReadProperty`]: read-only view of the same cell.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Binding`]: keeps two properties in sync, one way or both ways.
//!
//! # Architecture
//!
//! `Property<T>` uses `Arc<Mutex<..>>` so cells can be shared between a view
//! and its core and read from any thread. Writes are expected on the UI-affine
//! thread; observers are snapshotted under the lock and called after it is
//! released.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per write that changes the value.
//! 2. Observers are notified in subscription order with `(old, new)`.
//! 3. Writing a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Observers added or removed during a notification pass take effect on
//!    the next pass.

pub mod binding;
pub mod property;

pub use binding::{BindMode, Binding};
pub use property::{Property, ReadProperty, Subscription, SubscriptionId};
