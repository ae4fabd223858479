#![forbid(unsafe_code)]

//! Core registry: maps `(context kind, capability)` to a constructor.
//!
//! Platforms register one constructor per capability they support. When a
//! view is bound, the registry picks the constructor for the view's declared
//! capability, or for the nearest ancestor along the capability's documented
//! fallback chain (see [`Capability::lineage`]).
//!
//! # Resolution
//!
//! 1. Exact match for `(kind, capability)`.
//! 2. Otherwise each parent in order: `Window → Container → View`.
//! 3. Otherwise [`CoreError::CoreUnavailable`].
//!
//! Resolution is deterministic: it depends only on the registered set.
//!
//! # Concurrency
//!
//! Registration and lookup take `&self`; the table sits behind an `RwLock`.
//! Constructors run after the lock is released, so a constructor may itself
//! create cores (a window building its content, say).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tether_core::Capability;
use tracing::{debug, warn};

use crate::context::{UiContext, UiContextKind};
use crate::core::{Core, CoreRequest, WeakView};

/// Errors from core resolution and construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// No constructor for the capability or any of its ancestors.
    CoreUnavailable {
        kind: UiContextKind,
        capability: &'static str,
    },
    /// The selected constructor failed.
    Construction {
        capability: &'static str,
        reason: String,
    },
}

impl CoreError {
    /// Convenience for constructors reporting a failure.
    pub fn construction(capability: &Capability, reason: impl Into<String>) -> Self {
        Self::Construction {
            capability: capability.name(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoreUnavailable { kind, capability } => {
                write!(f, "no '{kind}' core available for {capability}")
            }
            Self::Construction { capability, reason } => {
                write!(f, "failed to construct core for {capability}: {reason}")
            }
        }
    }
}

impl std::error::Error for CoreError {}

/// Builds a core for a view.
pub type CoreConstructor =
    Arc<dyn Fn(&UiContext, &CoreRequest) -> Result<Box<dyn Core>, CoreError> + Send + Sync>;

struct Registration {
    capability: &'static Capability,
    constructor: CoreConstructor,
}

type Table = HashMap<(UiContextKind, &'static str), Registration>;

/// Explicit registry object; contexts hold it by `Arc`.
#[derive(Default)]
pub struct CoreRegistry {
    entries: RwLock<Table>,
}

impl fmt::Debug for CoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.read();
        let mut keys: Vec<_> = entries
            .keys()
            .map(|(kind, cap)| format!("{kind}:{cap}"))
            .collect();
        keys.sort();
        f.debug_struct("CoreRegistry")
            .field("entries", &keys)
            .finish()
    }
}

impl CoreRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `constructor` for `capability` under `kind`.
    ///
    /// Replaces (and returns `true` for) an existing registration.
    pub fn register<F>(
        &self,
        kind: UiContextKind,
        capability: &'static Capability,
        constructor: F,
    ) -> bool
    where
        F: Fn(&UiContext, &CoreRequest) -> Result<Box<dyn Core>, CoreError> + Send + Sync + 'static,
    {
        let registration = Registration {
            capability,
            constructor: Arc::new(constructor),
        };
        let replaced = self
            .write()
            .insert((kind, capability.name()), registration)
            .is_some();
        if replaced {
            warn!(%kind, capability = capability.name(), "core constructor replaced");
        } else {
            debug!(%kind, capability = capability.name(), "core constructor registered");
        }
        replaced
    }

    /// Remove the registration for exactly `capability`. Returns `true` if
    /// one existed.
    pub fn unregister(&self, kind: UiContextKind, capability: &Capability) -> bool {
        self.write().remove(&(kind, capability.name())).is_some()
    }

    /// Remove every registration.
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut *self.write());
        debug!(count = dropped.len(), "core registry cleared");
    }

    /// True if a constructor is registered for exactly `capability`.
    #[must_use]
    pub fn is_registered(&self, kind: UiContextKind, capability: &Capability) -> bool {
        self.read().contains_key(&(kind, capability.name()))
    }

    /// Number of registrations across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// The capability whose constructor would be used for `capability`.
    #[must_use]
    pub fn resolve(
        &self,
        kind: UiContextKind,
        capability: &'static Capability,
    ) -> Option<&'static Capability> {
        self.lookup(kind, capability).map(|(resolved, _)| resolved)
    }

    fn lookup(
        &self,
        kind: UiContextKind,
        capability: &'static Capability,
    ) -> Option<(&'static Capability, CoreConstructor)> {
        let entries = self.read();
        capability.lineage().find_map(|candidate| {
            entries
                .get(&(kind, candidate.name()))
                .map(|reg| (reg.capability, Arc::clone(&reg.constructor)))
        })
    }

    /// Build a core for `capability` in `context`.
    pub fn create_core(
        &self,
        context: &UiContext,
        capability: &'static Capability,
        view: WeakView,
    ) -> Result<Box<dyn Core>, CoreError> {
        let kind = context.kind();
        let Some((resolved, constructor)) = self.lookup(kind, capability) else {
            debug!(%kind, capability = capability.name(), "no core available");
            return Err(CoreError::CoreUnavailable {
                kind,
                capability: capability.name(),
            });
        };
        let request = CoreRequest {
            requested: capability,
            resolved,
            view,
        };
        if request.is_fallback() {
            debug!(
                %kind,
                requested = capability.name(),
                resolved = resolved.name(),
                "core resolved through fallback"
            );
        }
        constructor(context, &request)
    }
}
