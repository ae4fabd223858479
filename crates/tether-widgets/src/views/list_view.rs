#![forbid(unsafe_code)]

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tether_core::{Capability, capability};

use crate::context::UiContext;
use crate::core::Core;
use crate::cores::ListViewDataSource;
use crate::registry::CoreError;
use crate::view::{EventHandlers, View, ViewBase, WireGuard, note_missing_interface};

/// A list of text rows pulled from a [`ListViewDataSource`].
///
/// Rows are not mirrored through properties. After changing the data,
/// call [`reload_data`](Self::reload_data).
pub struct ListView {
    base: ViewBase,
    data_source: Mutex<Option<Arc<dyn ListViewDataSource>>>,
    on_select: EventHandlers<usize>,
}

impl fmt::Debug for ListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListView")
            .field("base", &self.base)
            .field("has_data_source", &self.data_source().is_some())
            .field("on_select", &self.on_select)
            .finish()
    }
}

impl ListView {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: ViewBase::new(),
            data_source: Mutex::new(None),
            on_select: EventHandlers::default(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn ListViewDataSource>>> {
        self.data_source
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[must_use]
    pub fn data_source(&self) -> Option<Arc<dyn ListViewDataSource>> {
        self.lock().clone()
    }

    /// Replace the data source. Rows are not pulled until the next
    /// [`reload_data`](Self::reload_data) (or the next bind).
    pub fn set_data_source(&self, source: Option<Arc<dyn ListViewDataSource>>) {
        *self.lock() = source.clone();
        self.base.slot().with_core(|core| {
            if let Some(list) = core.interface().as_list_view() {
                list.set_data_source(source);
            }
        });
    }

    /// Ask the native list to re-pull every row. No-op while unbound.
    pub fn reload_data(&self) {
        self.base.slot().with_core(|core| {
            if let Some(list) = core.interface().as_list_view() {
                list.reload_data();
            }
        });
    }

    /// Add a handler called with the selected row index, on the UI thread.
    pub fn on_select(&self, handler: impl Fn(usize) + Send + Sync + 'static) {
        self.on_select.add(move |index| handler(*index));
    }
}

impl View for ListView {
    fn capability_for_core_creation(&self) -> &'static Capability {
        &capability::LIST_VIEW
    }

    fn view_base(&self) -> &ViewBase {
        &self.base
    }

    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        _context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError> {
        let Some(list) = core.interface().as_list_view() else {
            note_missing_interface("ListView", core);
            return Ok(Vec::new());
        };
        list.on_select().bind(&self, |view, index| {
            view.on_select.emit(&index);
        });
        list.set_data_source(self.data_source());
        list.reload_data();
        Ok(Vec::new())
    }
}
