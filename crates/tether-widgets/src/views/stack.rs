#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use tether_core::{Capability, capability};

use crate::context::UiContext;
use crate::core::Core;
use crate::registry::CoreError;
use crate::view::{View, ViewBase, WireGuard, bind_child, bind_dyn, note_missing_interface, unbind};

#[derive(Debug, Clone)]
struct Page {
    view: Arc<dyn View>,
    title: String,
}

/// A navigation stack of pages.
#[derive(Debug)]
pub struct Stack {
    // Shared with the release guard, which unbinds the pages first.
    pages: Arc<Mutex<Vec<Page>>>,
    base: ViewBase,
}

impl Stack {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pages: Arc::new(Mutex::new(Vec::new())),
            base: ViewBase::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Page>> {
        lock(&self.pages)
    }

    /// Push `view` with a navigation title. While bound, the page is bound
    /// and pushed onto the native stack.
    pub fn push_view(
        &self,
        view: Arc<dyn View>,
        title: impl Into<String>,
    ) -> Result<(), CoreError> {
        let page = Page {
            view,
            title: title.into(),
        };
        if let Some(context) = self.base.slot().context() {
            bind_dyn(&page.view, &context)?;
            self.base.slot().with_core(|core| {
                if let Some(stack) = core.interface().as_stack() {
                    page.view
                        .view_base()
                        .slot()
                        .with_core(|page_core| stack.push_view(page_core, &page.title));
                }
            });
        }
        self.lock().push(page);
        Ok(())
    }

    /// Pop the top page, releasing its core. Returns `None` if empty.
    pub fn pop_view(&self) -> Option<Arc<dyn View>> {
        let page = self.lock().pop()?;
        self.base.slot().with_core(|core| {
            if let Some(stack) = core.interface().as_stack() {
                stack.pop_view();
            }
        });
        unbind(page.view.as_ref());
        Some(page.view)
    }

    /// Number of pages.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.lock().len()
    }

    /// The top page, if any.
    #[must_use]
    pub fn top(&self) -> Option<Arc<dyn View>> {
        self.lock().last().map(|page| Arc::clone(&page.view))
    }

    fn snapshot(&self) -> Vec<Page> {
        self.lock().clone()
    }
}

impl View for Stack {
    fn capability_for_core_creation(&self) -> &'static Capability {
        &capability::STACK
    }

    fn view_base(&self) -> &ViewBase {
        &self.base
    }

    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError> {
        let Some(stack) = core.interface().as_stack() else {
            note_missing_interface("Stack", core);
            return Ok(Vec::new());
        };
        for page in self.snapshot() {
            bind_child(&page.view, context, |page_core| {
                stack.push_view(page_core, &page.title);
            })?;
        }
        let cell = Arc::clone(&self.pages);
        Ok(vec![WireGuard::on_release(move || {
            let pages = lock(&cell).clone();
            for page in pages.iter().rev() {
                unbind(page.view.as_ref());
            }
        })])
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
