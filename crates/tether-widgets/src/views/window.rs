#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use tether_core::{Capability, capability};
use tether_runtime::{Binding, Property};

use crate::context::UiContext;
use crate::core::Core;
use crate::cores::WindowCore;
use crate::registry::CoreError;
use crate::view::{
    View, ViewBase, WireGuard, bind_child, bind_dyn, note_missing_interface, unbind,
};

/// A top-level window with a title and at most one content view.
#[derive(Debug)]
pub struct Window {
    // Shared with the release guard, which unbinds the content first.
    content: Arc<Mutex<Option<Arc<dyn View>>>>,
    base: ViewBase,
    title: Property<String>,
}

impl Window {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            content: Arc::new(Mutex::new(None)),
            base: ViewBase::new(),
            title: Property::named("title", title.into()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn View>>> {
        lock(&self.content)
    }

    #[must_use]
    pub fn title(&self) -> &Property<String> {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> Option<Arc<dyn View>> {
        self.lock().clone()
    }

    /// Replace the content view.
    ///
    /// While bound, the old content is detached and released and the new
    /// content is bound into the window's context. If binding fails the new
    /// content is still stored, unbound.
    pub fn set_content(&self, content: Option<Arc<dyn View>>) -> Result<(), CoreError> {
        let previous = std::mem::replace(&mut *self.lock(), content.clone());
        let Some(context) = self.base.slot().context() else {
            return Ok(());
        };

        self.with_window_core(|window| window.set_content(None));
        if let Some(previous) = previous {
            unbind(previous.as_ref());
        }
        if let Some(content) = content {
            bind_dyn(&content, &context)?;
            self.with_window_core(|window| {
                content
                    .view_base()
                    .slot()
                    .with_core(|content_core| window.set_content(Some(content_core)));
            });
        }
        Ok(())
    }

    fn with_window_core(&self, f: impl FnOnce(&dyn WindowCore)) {
        self.base.slot().with_core(|core| {
            if let Some(window) = core.interface().as_window() {
                f(window);
            }
        });
    }
}

impl View for Window {
    fn capability_for_core_creation(&self) -> &'static Capability {
        &capability::WINDOW
    }

    fn view_base(&self) -> &ViewBase {
        &self.base
    }

    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError> {
        let Some(window) = core.interface().as_window() else {
            note_missing_interface("Window", core);
            return Ok(Vec::new());
        };
        let mut guards = vec![WireGuard::from(Binding::one_way(&self.title, window.title()))];
        if let Some(content) = self.content() {
            bind_child(&content, context, |content_core| {
                window.set_content(Some(content_core));
            })?;
        }
        let cell = Arc::clone(&self.content);
        guards.push(WireGuard::on_release(move || {
            let content = lock(&cell).clone();
            if let Some(content) = content {
                unbind(content.as_ref());
            }
        }));
        Ok(guards)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
