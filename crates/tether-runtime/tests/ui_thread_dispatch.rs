//! Cross-thread scenarios: native event threads handing work to the UI
//! thread, with properties guarded by the dispatcher's affinity.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use tether_core::WeakCallback;
use tether_runtime::{DispatcherConfig, Property, UiThread};

fn flush(ui: &UiThread) {
    let (tx, rx) = mpsc::channel();
    ui.dispatcher().enqueue(move || tx.send(()).unwrap()).unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
}

#[test]
fn native_event_reaches_weak_callback_on_ui_thread() {
    struct Handler {
        clicks: AtomicUsize,
        ui_hits: AtomicUsize,
    }

    let ui = UiThread::start(DispatcherConfig::named("native-events")).unwrap();
    let handler = Arc::new(Handler {
        clicks: AtomicUsize::new(0),
        ui_hits: AtomicUsize::new(0),
    });
    let on_click: WeakCallback = WeakCallback::new();
    let checker = ui.dispatcher().clone();
    on_click.bind(&handler, move |h, ()| {
        h.clicks.fetch_add(1, Ordering::SeqCst);
        if checker.is_ui_thread() {
            h.ui_hits.fetch_add(1, Ordering::SeqCst);
        }
    });

    let d = ui.dispatcher().clone();
    let cb = on_click.clone();
    thread::spawn(move || {
        d.enqueue(move || {
            cb.invoke(());
        })
        .unwrap();
    })
    .join()
    .unwrap();
    flush(&ui);

    assert_eq!(handler.clicks.load(Ordering::SeqCst), 1);
    assert_eq!(handler.ui_hits.load(Ordering::SeqCst), 1);

    // A dropped handler turns later events into no-ops.
    drop(handler);
    let cb = on_click.clone();
    let (tx, rx) = mpsc::channel();
    ui.dispatcher()
        .enqueue(move || tx.send(cb.invoke(())).unwrap())
        .unwrap();
    assert!(!rx.recv_timeout(Duration::from_secs(5)).unwrap());
}

#[test]
fn affine_property_written_through_dispatcher() {
    let ui = UiThread::start(DispatcherConfig::named("affine")).unwrap();
    let label = Property::with_affinity("label", String::new(), ui.dispatcher().affinity().clone());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let _sub = label.subscribe(move |_, new| s.lock().unwrap().push(new.clone()));

    for text in ["one", "two", "two", "three"] {
        let label = label.clone();
        ui.dispatcher()
            .enqueue(move || label.set(text.to_string()))
            .unwrap();
    }
    flush(&ui);

    assert_eq!(label.get(), "three");
    assert_eq!(label.version(), 3);
    assert_eq!(*seen.lock().unwrap(), vec!["one", "two", "three"]);
}

#[test]
fn delayed_work_runs_on_ui_thread_after_delay() {
    let ui = UiThread::start(DispatcherConfig::default()).unwrap();
    let (tx, rx) = mpsc::channel();
    let checker = ui.dispatcher().clone();
    ui.dispatcher()
        .enqueue_delayed(Duration::from_millis(20), move || {
            tx.send(checker.is_ui_thread()).unwrap();
        })
        .unwrap();
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
}
