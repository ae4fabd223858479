#![forbid(unsafe_code)]

//! Core: capability taxonomy, weak callbacks, and thread-affinity tracking.
//!
//! # Role in tether
//! `tether-core` holds the platform-independent vocabulary shared by the
//! runtime and the widget layer. It has no knowledge of native toolkits.
//!
//! # Primary responsibilities
//! - **Capability**: named contracts a native core may implement, each with a
//!   documented fallback parent.
//! - **WeakCallback**: non-owning, revocable callback slots used for
//!   core → view event delivery.
//! - **Thread affinity**: records which thread is the UI-affine thread and
//!   detects writes from the wrong thread in debug builds.
//! - **Logging**: tracing re-exports and an optional JSON subscriber.
//!
//! # How it fits in the system
//! `tether-runtime` builds `Property` and the `Dispatcher` on top of the
//! affinity tracker, and `tether-widgets` resolves cores by [`Capability`].

pub mod capability;
pub mod logging;
pub mod thread_affinity;
pub mod weak_callback;

pub use capability::Capability;
pub use thread_affinity::ThreadAffinity;
pub use weak_callback::WeakCallback;
