#![forbid(unsafe_code)]

//! Mock cores that record native calls instead of making them.
//!
//! One [`MockCore`] type implements every capability interface; its
//! [`MockElement`] decides which one [`Core::interface`] reports. Setter-backed
//! properties are mirrored into the [`NativeCallLog`] synchronously, the way a
//! real core forwards them to its toolkit.
//!
//! Native events are simulated with [`NativeEvents`], a `Send` handle that
//! posts to the core's dispatcher like a toolkit callback would.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tether_core::{Capability, WeakCallback, capability};
use tether_runtime::{DispatchError, Dispatcher, Property, Subscription};
use tether_widgets::cores::{
    ButtonCore, ContainerCore, ListViewCore, ListViewDataSource, StackCore, SwitchCore,
    TextFieldCore, TextViewCore, WebViewCore, WindowCore,
};
use tether_widgets::{Core, CoreBase, CoreInterface, CoreRequest, UiContext};

use crate::native_log::{NativeCallLog, NativeId};

/// Which native element a mock core simulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockElement {
    View,
    Container,
    Window,
    Stack,
    Button,
    Switch,
    TextField,
    TextView,
    ListView,
    WebView,
}

impl MockElement {
    /// Every element, in capability-table order.
    pub const ALL: [MockElement; 10] = [
        Self::View,
        Self::Container,
        Self::Window,
        Self::Stack,
        Self::Button,
        Self::Switch,
        Self::TextField,
        Self::TextView,
        Self::ListView,
        Self::WebView,
    ];

    /// The capability this element is registered for.
    #[must_use]
    pub fn capability(self) -> &'static Capability {
        match self {
            Self::View => &capability::VIEW,
            Self::Container => &capability::CONTAINER,
            Self::Window => &capability::WINDOW,
            Self::Stack => &capability::STACK,
            Self::Button => &capability::BUTTON,
            Self::Switch => &capability::SWITCH,
            Self::TextField => &capability::TEXT_FIELD,
            Self::TextView => &capability::TEXT_VIEW,
            Self::ListView => &capability::LIST_VIEW,
            Self::WebView => &capability::WEB_VIEW,
        }
    }
}

// ---------------------------------------------------------------------------
// Native handle
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct NativeRef {
    id: NativeId,
    element: &'static str,
    log: NativeCallLog,
    // Set while a simulated native event writes a property, so the write is
    // not echoed back as a setter call.
    from_native: Arc<AtomicBool>,
}

impl NativeRef {
    fn record(&self, action: impl Into<String>) {
        self.log.record(self.id, self.element, action);
    }

    fn apply_from_native(&self, f: impl FnOnce()) {
        self.from_native.store(true, Ordering::Release);
        f();
        self.from_native.store(false, Ordering::Release);
    }

    fn is_from_native(&self) -> bool {
        self.from_native.load(Ordering::Acquire)
    }
}

/// Exclusively owned native element; records `release` when dropped.
struct NativeHandle(NativeRef);

impl Drop for NativeHandle {
    fn drop(&mut self) {
        self.0.record("release");
    }
}

fn mirror<T>(prop: &Property<T>, native: &NativeRef, setter: &'static str) -> Subscription
where
    T: Clone + PartialEq + Send + fmt::Display + 'static,
{
    let native = native.clone();
    prop.subscribe(move |_old, new| {
        if !native.is_from_native() {
            native.record(format!("{setter}: {new}"));
        }
    })
}

fn describe(core: &dyn Core) -> String {
    match core.as_any().downcast_ref::<MockCore>() {
        Some(mock) => format!("#{}", mock.native_id()),
        None => format!("foreign {}", core.capability()),
    }
}

// ---------------------------------------------------------------------------
// Mock core
// ---------------------------------------------------------------------------

#[derive(Default)]
struct NativeState {
    children: Vec<String>,
    content: Option<String>,
    pages: Vec<(String, String)>,
    data_source: Option<Arc<dyn ListViewDataSource>>,
    rows: Vec<String>,
}

/// A core for any capability, backed by a recording native handle.
pub struct MockCore {
    base: CoreBase,
    element: MockElement,
    native: NativeHandle,
    label: Property<String>,
    text: Property<String>,
    title: Property<String>,
    url: Property<String>,
    on: Property<bool>,
    wrap: Property<bool>,
    on_click: WeakCallback,
    on_submit: WeakCallback,
    on_select: WeakCallback<usize>,
    state: Mutex<NativeState>,
    _setters: Vec<Subscription>,
}

impl fmt::Debug for MockCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockCore")
            .field("element", &self.element)
            .field("native_id", &self.native_id())
            .field("capability", &self.base.capability().name())
            .finish_non_exhaustive()
    }
}

impl MockCore {
    /// Build a mock core for `request`, allocating a native id in `log`.
    #[must_use]
    pub fn new(
        context: &UiContext,
        request: &CoreRequest,
        element: MockElement,
        log: &NativeCallLog,
    ) -> Self {
        let base = CoreBase::new(context, request);
        let name = request.resolved.name();
        let native = NativeRef {
            id: log.allocate(name),
            element: name,
            log: log.clone(),
            from_native: Arc::new(AtomicBool::new(false)),
        };

        let label = base.property("label", String::new());
        let text = base.property("text", String::new());
        let title = base.property("title", String::new());
        let url = base.property("url", String::new());
        let on = base.property("on", false);
        let wrap = base.property("wrap", false);

        let mut setters = vec![mirror(base.visible(), &native, "set visible")];
        match element {
            MockElement::Button => setters.push(mirror(&label, &native, "set label")),
            MockElement::Switch => {
                setters.push(mirror(&label, &native, "set label"));
                setters.push(mirror(&on, &native, "set on"));
            }
            MockElement::TextField => setters.push(mirror(&text, &native, "set text")),
            MockElement::TextView => {
                setters.push(mirror(&text, &native, "set text"));
                setters.push(mirror(&wrap, &native, "set wrap"));
            }
            MockElement::Window => setters.push(mirror(&title, &native, "set title")),
            MockElement::WebView => setters.push(mirror(&url, &native, "load url")),
            MockElement::View
            | MockElement::Container
            | MockElement::Stack
            | MockElement::ListView => {}
        }

        Self {
            base,
            element,
            native: NativeHandle(native),
            label,
            text,
            title,
            url,
            on,
            wrap,
            on_click: WeakCallback::new(),
            on_submit: WeakCallback::new(),
            on_select: WeakCallback::new(),
            state: Mutex::new(NativeState::default()),
            _setters: setters,
        }
    }

    fn lock(&self) -> MutexGuard<'_, NativeState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, action: impl Into<String>) {
        self.native.0.record(action);
    }

    #[must_use]
    pub fn element(&self) -> MockElement {
        self.element
    }

    /// Id of the simulated native element.
    #[must_use]
    pub fn native_id(&self) -> NativeId {
        self.native.0.id
    }

    /// Children attached to a container, as `#id` strings.
    #[must_use]
    pub fn children(&self) -> Vec<String> {
        self.lock().children.clone()
    }

    /// Content attached to a window.
    #[must_use]
    pub fn content(&self) -> Option<String> {
        self.lock().content.clone()
    }

    /// Pages on a native stack as `(#id, title)`, bottom first.
    #[must_use]
    pub fn pages(&self) -> Vec<(String, String)> {
        self.lock().pages.clone()
    }

    /// Rows pulled by the last reload.
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.lock().rows.clone()
    }

    /// Handle for simulating native events from any thread.
    #[must_use]
    pub fn events(&self) -> NativeEvents {
        NativeEvents {
            dispatcher: self.base.dispatcher().clone(),
            native: self.native.0.clone(),
            element: self.element,
            on: self.on.clone(),
            text: self.text.clone(),
            url: self.url.clone(),
            on_click: self.on_click.clone(),
            on_submit: self.on_submit.clone(),
            on_select: self.on_select.clone(),
        }
    }
}

impl Core for MockCore {
    fn base(&self) -> &CoreBase {
        &self.base
    }

    fn interface(&self) -> CoreInterface<'_> {
        match self.element {
            MockElement::View => CoreInterface::View,
            MockElement::Container => CoreInterface::Container(self),
            MockElement::Window => CoreInterface::Window(self),
            MockElement::Stack => CoreInterface::Stack(self),
            MockElement::Button => CoreInterface::Button(self),
            MockElement::Switch => CoreInterface::Switch(self),
            MockElement::TextField => CoreInterface::TextField(self),
            MockElement::TextView => CoreInterface::TextView(self),
            MockElement::ListView => CoreInterface::ListView(self),
            MockElement::WebView => CoreInterface::WebView(self),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ContainerCore for MockCore {
    fn add_child(&self, child: &dyn Core) {
        let child = describe(child);
        self.record(format!("add child {child}"));
        self.lock().children.push(child);
    }

    fn remove_all_children(&self) {
        self.record("remove all children");
        self.lock().children.clear();
    }

    fn child_count(&self) -> usize {
        self.lock().children.len()
    }
}

impl WindowCore for MockCore {
    fn title(&self) -> &Property<String> {
        &self.title
    }

    fn set_content(&self, content: Option<&dyn Core>) {
        let content = content.map(describe);
        match &content {
            Some(c) => self.record(format!("set content {c}")),
            None => self.record("clear content"),
        }
        self.lock().content = content;
    }
}

impl StackCore for MockCore {
    fn push_view(&self, page: &dyn Core, title: &str) {
        let page = describe(page);
        self.record(format!("push {page}: {title}"));
        self.lock().pages.push((page, title.to_owned()));
    }

    fn pop_view(&self) -> bool {
        let popped = self.lock().pages.pop().is_some();
        if popped {
            self.record("pop");
        }
        popped
    }

    fn depth(&self) -> usize {
        self.lock().pages.len()
    }
}

impl ButtonCore for MockCore {
    fn label(&self) -> &Property<String> {
        &self.label
    }

    fn on_click(&self) -> &WeakCallback {
        &self.on_click
    }
}

impl SwitchCore for MockCore {
    fn label(&self) -> &Property<String> {
        &self.label
    }

    fn on(&self) -> &Property<bool> {
        &self.on
    }

    fn on_click(&self) -> &WeakCallback {
        &self.on_click
    }
}

impl TextFieldCore for MockCore {
    fn text(&self) -> &Property<String> {
        &self.text
    }

    fn on_submit(&self) -> &WeakCallback {
        &self.on_submit
    }
}

impl TextViewCore for MockCore {
    fn text(&self) -> &Property<String> {
        &self.text
    }

    fn wrap(&self) -> &Property<bool> {
        &self.wrap
    }
}

impl ListViewCore for MockCore {
    fn set_data_source(&self, source: Option<Arc<dyn ListViewDataSource>>) {
        self.record(if source.is_some() {
            "set data source"
        } else {
            "clear data source"
        });
        self.lock().data_source = source;
    }

    fn reload_data(&self) {
        // The source is application code; call it without holding the lock.
        let source = self.lock().data_source.clone();
        let rows: Vec<String> = source
            .map(|source| {
                (0..source.number_of_rows())
                    .map(|index| source.label_text_for_row_index(index))
                    .collect()
            })
            .unwrap_or_default();
        self.record(format!("reload: {} rows", rows.len()));
        self.lock().rows = rows;
    }

    fn on_select(&self) -> &WeakCallback<usize> {
        &self.on_select
    }
}

impl WebViewCore for MockCore {
    fn url(&self) -> &Property<String> {
        &self.url
    }
}

// ---------------------------------------------------------------------------
// Simulated native events
// ---------------------------------------------------------------------------

/// Simulates toolkit callbacks for one mock core.
///
/// Every method may be called from any thread. Like a real toolkit
/// callback, it only enqueues; the effect happens when the core's
/// dispatcher runs the closure on the UI thread.
#[derive(Clone)]
pub struct NativeEvents {
    dispatcher: Dispatcher,
    native: NativeRef,
    element: MockElement,
    on: Property<bool>,
    text: Property<String>,
    url: Property<String>,
    on_click: WeakCallback,
    on_submit: WeakCallback,
    on_select: WeakCallback<usize>,
}

impl fmt::Debug for NativeEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEvents")
            .field("element", &self.element)
            .field("native_id", &self.native.id)
            .finish_non_exhaustive()
    }
}

impl NativeEvents {
    #[must_use]
    pub fn native_id(&self) -> NativeId {
        self.native.id
    }

    /// The user clicked. A switch flips its state before handlers run.
    pub fn click(&self) -> Result<(), DispatchError> {
        let events = self.clone();
        self.dispatcher.enqueue(move || {
            events.native.record("event: click");
            if events.element == MockElement::Switch {
                events
                    .native
                    .apply_from_native(|| events.on.update(|on| *on = !*on));
            }
            events.on_click.invoke(());
        })
    }

    /// The user replaced the text of a text field.
    pub fn type_text(&self, text: impl Into<String>) -> Result<(), DispatchError> {
        let events = self.clone();
        let text = text.into();
        self.dispatcher.enqueue(move || {
            events.native.record(format!("event: input {text}"));
            events.native.apply_from_native(|| events.text.set(text));
        })
    }

    /// The user confirmed a text field.
    pub fn submit(&self) -> Result<(), DispatchError> {
        let events = self.clone();
        self.dispatcher.enqueue(move || {
            events.native.record("event: submit");
            events.on_submit.invoke(());
        })
    }

    /// The user selected a list row.
    pub fn select_row(&self, index: usize) -> Result<(), DispatchError> {
        let events = self.clone();
        self.dispatcher.enqueue(move || {
            events.native.record(format!("event: select {index}"));
            events.on_select.invoke(index);
        })
    }

    /// The embedded browser navigated on its own (a followed link).
    pub fn navigate(&self, url: impl Into<String>) -> Result<(), DispatchError> {
        let events = self.clone();
        let url = url.into();
        self.dispatcher.enqueue(move || {
            events.native.record(format!("event: navigate {url}"));
            events.native.apply_from_native(|| events.url.set(url));
        })
    }
}
