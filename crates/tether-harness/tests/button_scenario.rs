//! The canonical round trip: a label written by the application reaches the
//! native button once, and a click arriving on a toolkit thread reaches the
//! application handler once, on the UI thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, ThreadId};
use std::time::Duration;

use tether_harness::{
    MockPlatform, drain, native_events, on_native_thread, ui_dispatcher, with_mock_core,
};
use tether_runtime::{DispatcherConfig, UiThread};
use tether_widgets::cores::ButtonCore;
use tether_widgets::views::Button;
use tether_widgets::{bind, unbind};

#[test]
fn label_reaches_native_exactly_once() {
    let platform = MockPlatform::new();
    let context = platform.context(ui_dispatcher());
    let button = Button::with_label("OK");

    bind(&button, &context).unwrap();
    assert_eq!(platform.log().count("set label: OK"), 1);

    // Equal writes are not forwarded.
    button.label().set("OK".into());
    assert_eq!(platform.log().count("set label: OK"), 1);

    button.label().set("Cancel".into());
    assert_eq!(platform.log().count("set label: Cancel"), 1);
    with_mock_core(button.as_ref(), |core| {
        assert_eq!(ButtonCore::label(core).get(), "Cancel");
    })
    .unwrap();
}

#[test]
fn click_from_native_thread_fires_handler_once_on_ui_thread() {
    let platform = MockPlatform::new();
    let dispatcher = ui_dispatcher();
    let context = platform.context(dispatcher.clone());
    let button = Button::with_label("OK");

    let clicks = Arc::new(AtomicUsize::new(0));
    let threads: Arc<Mutex<Vec<ThreadId>>> = Arc::new(Mutex::new(Vec::new()));
    let (c, t) = (Arc::clone(&clicks), Arc::clone(&threads));
    button.on_click(move || {
        c.fetch_add(1, Ordering::SeqCst);
        t.lock().unwrap().push(thread::current().id());
    });
    bind(&button, &context).unwrap();

    let events = native_events(button.as_ref()).unwrap();
    on_native_thread(move || events.click().unwrap());

    // Nothing runs until the UI thread drains its queue.
    assert_eq!(clicks.load(Ordering::SeqCst), 0);
    assert_eq!(drain(&dispatcher).unwrap(), 1);
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
    assert_eq!(*threads.lock().unwrap(), vec![thread::current().id()]);
}

#[test]
fn click_after_view_dropped_is_silent() {
    let platform = MockPlatform::new();
    let dispatcher = ui_dispatcher();
    let context = platform.context(dispatcher.clone());
    let button = Button::with_label("OK");
    let clicks = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&clicks);
    button.on_click(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    bind(&button, &context).unwrap();
    let events = native_events(button.as_ref()).unwrap();
    let id = events.native_id();

    drop(button);
    assert_eq!(platform.log().actions_for(id).last().map(String::as_str), Some("release"));

    on_native_thread(move || events.click().unwrap());
    drain(&dispatcher).unwrap();
    assert_eq!(clicks.load(Ordering::SeqCst), 0);
}

#[test]
fn unbound_view_no_longer_forwards_writes() {
    let platform = MockPlatform::new();
    let context = platform.context(ui_dispatcher());
    let button = Button::with_label("OK");
    bind(&button, &context).unwrap();
    assert!(unbind(button.as_ref()));
    assert!(!unbind(button.as_ref()));

    button.label().set("Later".into());
    assert_eq!(platform.log().count("set label: Later"), 0);
    assert_eq!(platform.log().count("release"), 1);
}

#[cfg(debug_assertions)]
#[test]
fn core_property_write_off_ui_thread_panics_in_debug() {
    let platform = MockPlatform::new();
    let context = platform.context(ui_dispatcher());
    let button = Button::with_label("OK");
    bind(&button, &context).unwrap();

    let label = with_mock_core(button.as_ref(), |core| ButtonCore::label(core).clone()).unwrap();
    let result = thread::spawn(move || label.set("from worker".into())).join();
    assert!(result.is_err());
    assert_eq!(platform.log().count("set label: from worker"), 0);
}

#[cfg(debug_assertions)]
#[test]
fn label_binding_survives_rejected_off_thread_write() {
    let platform = MockPlatform::new();
    let context = platform.context(ui_dispatcher());
    let button = Button::with_label("OK");
    bind(&button, &context).unwrap();

    let worker = Arc::clone(&button);
    let result = thread::spawn(move || worker.label().set("worker".into())).join();
    assert!(result.is_err());

    button.label().set("Later".into());
    assert_eq!(platform.log().count("set label: Later"), 1);
    assert_eq!(
        with_mock_core(button.as_ref(), |core| ButtonCore::label(core).get()),
        Some("Later".to_string())
    );
}

#[test]
fn dedicated_ui_thread_round_trip() {
    let ui = UiThread::start(DispatcherConfig::named("tether-ui")).unwrap();
    let platform = MockPlatform::new();
    let context = platform.context(ui.dispatcher().clone());
    let button = Button::with_label("OK");

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    button.on_click(move || {
        let name = thread::current().name().map(String::from);
        tx.lock().unwrap().send(name).unwrap();
    });

    // Binding must happen on the UI thread.
    let (bound_tx, bound_rx) = mpsc::channel();
    let (view, ctx) = (Arc::clone(&button), context.clone());
    ui.dispatcher()
        .enqueue(move || {
            let events = bind(&view, &ctx)
                .ok()
                .and_then(|()| native_events(view.as_ref()));
            bound_tx.send(events).unwrap();
        })
        .unwrap();
    let events = bound_rx
        .recv_timeout(Duration::from_secs(5))
        .unwrap()
        .unwrap();
    assert_eq!(platform.log().count("set label: OK"), 1);

    on_native_thread(move || events.click().unwrap());
    let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(name.as_deref(), Some("tether-ui"));

    // Release on the UI thread too.
    let (done_tx, done_rx) = mpsc::channel();
    ui.dispatcher()
        .enqueue(move || {
            done_tx.send(unbind(button.as_ref())).unwrap();
        })
        .unwrap();
    assert!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap());
}
