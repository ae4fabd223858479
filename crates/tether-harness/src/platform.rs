#![forbid(unsafe_code)]

//! Mock platform: a registry populated with recording mock cores.
//!
//! ```ignore
//! let platform = MockPlatform::new();
//! let context = platform.context(ui_dispatcher());
//! let button = Button::with_label("OK");
//! bind(&button, &context)?;
//! assert_eq!(platform.log().count("set label: OK"), 1);
//! ```

use std::sync::Arc;
use std::thread;

use tether_runtime::{DispatchError, Dispatcher, DispatcherConfig};
use tether_widgets::{Core, CoreRegistry, UiContext, UiContextKind, View};

use crate::mock::{MockCore, MockElement, NativeEvents};
use crate::native_log::NativeCallLog;

/// Context kind the mock cores are registered under.
pub const MOCK_KIND: UiContextKind = UiContextKind::new("mock");

/// A registry of mock cores sharing one native call log.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    registry: Arc<CoreRegistry>,
    log: NativeCallLog,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    /// A platform supporting every capability.
    #[must_use]
    pub fn new() -> Self {
        Self::with_elements(&MockElement::ALL)
    }

    /// A platform supporting only `elements`; other capabilities resolve
    /// through their fallback chain or not at all.
    #[must_use]
    pub fn with_elements(elements: &[MockElement]) -> Self {
        let platform = Self {
            registry: Arc::new(CoreRegistry::new()),
            log: NativeCallLog::new(),
        };
        for &element in elements {
            platform.register(element);
        }
        platform
    }

    /// Register the mock constructor for `element`.
    pub fn register(&self, element: MockElement) {
        let log = self.log.clone();
        self.registry
            .register(MOCK_KIND, element.capability(), move |context, request| {
                let core: Box<dyn Core> = Box::new(MockCore::new(context, request, element, &log));
                Ok(core)
            });
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<CoreRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn log(&self) -> &NativeCallLog {
        &self.log
    }

    /// A context on `dispatcher` resolving through this platform.
    #[must_use]
    pub fn context(&self, dispatcher: Dispatcher) -> UiContext {
        UiContext::new(MOCK_KIND, dispatcher, Arc::clone(&self.registry))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A dispatcher whose UI thread is the calling (test) thread.
#[must_use]
pub fn ui_dispatcher() -> Dispatcher {
    Dispatcher::for_current_thread(DispatcherConfig::named("tether-test"))
}

/// Run ready work until the queue is empty. Returns how many closures ran.
pub fn drain(dispatcher: &Dispatcher) -> Result<usize, DispatchError> {
    let mut total = 0;
    loop {
        let ran = dispatcher.run_pending()?;
        if ran == 0 {
            return Ok(total);
        }
        total += ran;
    }
}

/// Run `f` on a separate thread standing in for a toolkit event thread.
pub fn on_native_thread<R: Send>(f: impl FnOnce() -> R + Send) -> R {
    thread::scope(|scope| {
        scope
            .spawn(f)
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
    })
}

/// Run `f` with the mock core bound to `view`.
pub fn with_mock_core<R>(view: &dyn View, f: impl FnOnce(&MockCore) -> R) -> Option<R> {
    view.view_base()
        .slot()
        .with_core(|core| core.as_any().downcast_ref::<MockCore>().map(f))
        .flatten()
}

/// Event simulator for the mock core bound to `view`.
#[must_use]
pub fn native_events(view: &dyn View) -> Option<NativeEvents> {
    with_mock_core(view, MockCore::events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::capability;

    #[test]
    fn new_registers_every_capability() {
        let platform = MockPlatform::new();
        for element in MockElement::ALL {
            assert!(
                platform
                    .registry()
                    .is_registered(MOCK_KIND, element.capability())
            );
        }
    }

    #[test]
    fn subset_falls_back() {
        let platform = MockPlatform::with_elements(&[MockElement::View]);
        assert_eq!(
            platform.registry().resolve(MOCK_KIND, &capability::BUTTON),
            Some(&capability::VIEW)
        );
    }

    #[test]
    fn drain_runs_follow_up_work() {
        let dispatcher = ui_dispatcher();
        let inner = dispatcher.clone();
        dispatcher
            .enqueue(move || inner.enqueue(|| {}).unwrap())
            .unwrap();
        assert_eq!(drain(&dispatcher).unwrap(), 2);
    }

    #[test]
    fn native_thread_is_not_ui_thread() {
        let dispatcher = ui_dispatcher();
        let checker = dispatcher.clone();
        assert!(!on_native_thread(move || checker.is_ui_thread()));
        assert!(dispatcher.is_ui_thread());
    }
}
