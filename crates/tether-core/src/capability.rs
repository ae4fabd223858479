#![forbid(unsafe_code)]

//! Capability taxonomy used to resolve native cores.
//!
//! A [`Capability`] names a contract (button, switch, window, ...) that a
//! native core may implement. Every capability except [`VIEW`] declares
//! exactly one parent; the chain of parents is the fallback order used by the
//! core registry when no implementation is registered for the exact
//! capability.
//!
//! # Fallback chains
//!
//! | Capability   | Chain                                      |
//! |--------------|--------------------------------------------|
//! | `window`     | window → container → view                  |
//! | `stack`      | stack → container → view                   |
//! | `container`  | container → view                           |
//! | `button`     | button → view                              |
//! | `switch`     | switch → view                              |
//! | `text_field` | text_field → view                          |
//! | `text_view`  | text_view → view                           |
//! | `list_view`  | list_view → view                           |
//! | `web_view`   | web_view → view                            |
//!
//! # Invariants
//!
//! 1. **Chains terminate**: parents are `'static` references fixed at
//!    definition time, so a chain cannot be extended into a cycle at runtime.
//! 2. **Identity is the name**: two capabilities are equal iff their names are
//!    equal. Custom capabilities should use a dotted namespace prefix
//!    (`"com.example.Gauge"`) to avoid collisions.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A named contract a core may implement.
#[derive(Clone, Copy)]
pub struct Capability {
    name: &'static str,
    parent: Option<&'static Capability>,
}

impl Capability {
    /// Define a root capability (no fallback).
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Define a capability that falls back to `parent`.
    #[must_use]
    pub const fn derived(name: &'static str, parent: &'static Capability) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// The capability name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The fallback parent, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&'static Capability> {
        self.parent
    }

    /// Iterate this capability followed by its ancestors, most specific first.
    pub fn lineage(&'static self) -> impl Iterator<Item = &'static Capability> {
        std::iter::successors(Some(self), |cap| cap.parent)
    }

    /// True if `self` is `other` or one of its descendants.
    #[must_use]
    pub fn is_a(&'static self, other: &Capability) -> bool {
        self.lineage().any(|cap| cap == other)
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.name).finish()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ============================================================================
// Built-in capabilities
// ============================================================================

/// Generic view: visibility only. Root of every chain.
pub static VIEW: Capability = Capability::root("tether.View");

/// A view that hosts other views.
pub static CONTAINER: Capability = Capability::derived("tether.Container", &VIEW);

/// Top-level window.
pub static WINDOW: Capability = Capability::derived("tether.Window", &CONTAINER);

/// Navigation stack of pushed views.
pub static STACK: Capability = Capability::derived("tether.Stack", &CONTAINER);

/// Push button with a label.
pub static BUTTON: Capability = Capability::derived("tether.Button", &VIEW);

/// On/off switch with a label.
pub static SWITCH: Capability = Capability::derived("tether.Switch", &VIEW);

/// Single-line editable text.
pub static TEXT_FIELD: Capability = Capability::derived("tether.TextField", &VIEW);

/// Read-only multi-line text.
pub static TEXT_VIEW: Capability = Capability::derived("tether.TextView", &VIEW);

/// Row list fed by a data source.
pub static LIST_VIEW: Capability = Capability::derived("tether.ListView", &VIEW);

/// Embedded web content.
pub static WEB_VIEW: Capability = Capability::derived("tether.WebView", &VIEW);

/// Every built-in capability, roots first.
pub static BUILTIN: [&Capability; 10] = [
    &VIEW,
    &CONTAINER,
    &WINDOW,
    &STACK,
    &BUTTON,
    &SWITCH,
    &TEXT_FIELD,
    &TEXT_VIEW,
    &LIST_VIEW,
    &WEB_VIEW,
];
