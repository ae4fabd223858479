#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use tether_core::{Capability, capability};

use crate::context::UiContext;
use crate::core::Core;
use crate::registry::CoreError;
use crate::view::{
    View, ViewBase, WireGuard, bind_child, bind_dyn, note_missing_interface, unbind,
};

/// A plain grouping view that owns an ordered list of children.
#[derive(Debug)]
pub struct ContainerView {
    // Shared with the release guard, which unbinds the children first.
    children: Arc<Mutex<Vec<Arc<dyn View>>>>,
    base: ViewBase,
}

impl ContainerView {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            children: Arc::new(Mutex::new(Vec::new())),
            base: ViewBase::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn View>>> {
        lock(&self.children)
    }

    /// Append `child`. If this container is bound, the child is bound into
    /// the same context and attached to the native container.
    pub fn add_child(&self, child: Arc<dyn View>) -> Result<(), CoreError> {
        if let Some(context) = self.base.slot().context() {
            bind_dyn(&child, &context)?;
            self.base.slot().with_core(|core| {
                if let Some(container) = core.interface().as_container() {
                    child
                        .view_base()
                        .slot()
                        .with_core(|child_core| container.add_child(child_core));
                }
            });
        }
        self.lock().push(child);
        Ok(())
    }

    /// Detach and release every child, returning them.
    pub fn remove_all_children(&self) -> Vec<Arc<dyn View>> {
        let removed = std::mem::take(&mut *self.lock());
        self.base.slot().with_core(|core| {
            if let Some(container) = core.interface().as_container() {
                container.remove_all_children();
            }
        });
        for child in &removed {
            unbind(child.as_ref());
        }
        removed
    }

    /// Snapshot of the children in order.
    #[must_use]
    pub fn children(&self) -> Vec<Arc<dyn View>> {
        self.lock().clone()
    }
}

impl View for ContainerView {
    fn capability_for_core_creation(&self) -> &'static Capability {
        &capability::CONTAINER
    }

    fn view_base(&self) -> &ViewBase {
        &self.base
    }

    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError> {
        let Some(container) = core.interface().as_container() else {
            note_missing_interface("ContainerView", core);
            return Ok(Vec::new());
        };
        for child in self.children() {
            bind_child(&child, context, |child_core| container.add_child(child_core))?;
        }
        let cell = Arc::clone(&self.children);
        Ok(vec![WireGuard::on_release(move || {
            let children = lock(&cell).clone();
            for child in &children {
                unbind(child.as_ref());
            }
        })])
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
