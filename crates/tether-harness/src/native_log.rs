#![forbid(unsafe_code)]

//! Recording of simulated native toolkit calls.
//!
//! Every mock core writes what a real toolkit call would have done
//! (`"set label: OK"`, `"push #4: Settings"`, `"release"`) into a shared
//! [`NativeCallLog`]. Tests assert on the log instead of on pixels.
//!
//! The log can be exported as JSONL for failure artifacts, one object per
//! call: `{"seq":0,"handle":1,"element":"tether.Button","action":"create"}`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifier of a simulated native element.
pub type NativeId = u64;

/// One recorded native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCall {
    pub handle: NativeId,
    pub element: &'static str,
    pub action: String,
}

impl fmt::Display for NativeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}: {}", self.element, self.handle, self.action)
    }
}

#[derive(Debug, Default)]
struct LogInner {
    calls: Mutex<Vec<NativeCall>>,
    next_id: AtomicU64,
}

/// Shared, append-only log of native calls. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct NativeCallLog {
    inner: Arc<LogInner>,
}

impl NativeCallLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<NativeCall>> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allocate a native id for a new element and record its creation.
    pub fn allocate(&self, element: &'static str) -> NativeId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.record(id, element, "create");
        id
    }

    pub fn record(&self, handle: NativeId, element: &'static str, action: impl Into<String>) {
        let call = NativeCall {
            handle,
            element,
            action: action.into(),
        };
        tracing::trace!(%call, "native call");
        self.lock().push(call);
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<NativeCall> {
        self.lock().clone()
    }

    /// Actions recorded for one element, in order.
    #[must_use]
    pub fn actions_for(&self, handle: NativeId) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|call| call.handle == handle)
            .map(|call| call.action.clone())
            .collect()
    }

    /// How many calls had exactly this action, across all elements.
    #[must_use]
    pub fn count(&self, action: &str) -> usize {
        self.lock()
            .iter()
            .filter(|call| call.action == action)
            .count()
    }

    /// Ids of elements created for `element`, in creation order.
    #[must_use]
    pub fn created(&self, element: &str) -> Vec<NativeId> {
        self.lock()
            .iter()
            .filter(|call| call.element == element && call.action == "create")
            .map(|call| call.handle)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget recorded calls. Id allocation continues.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Render the log as JSONL.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for (seq, call) in self.lock().iter().enumerate() {
            let line = serde_json::json!({
                "seq": seq,
                "handle": call.handle,
                "element": call.element,
                "action": call.action,
            });
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_records_create_with_fresh_ids() {
        let log = NativeCallLog::new();
        let a = log.allocate("tether.Button");
        let b = log.allocate("tether.Button");
        assert_ne!(a, b);
        assert_eq!(log.created("tether.Button"), vec![a, b]);
        assert_eq!(log.count("create"), 2);
    }

    #[test]
    fn actions_filter_by_handle() {
        let log = NativeCallLog::new();
        let a = log.allocate("tether.Button");
        let b = log.allocate("tether.Switch");
        log.record(a, "tether.Button", "set label: OK");
        log.record(b, "tether.Switch", "set on: true");
        assert_eq!(log.actions_for(a), vec!["create", "set label: OK"]);
        assert_eq!(log.actions_for(b), vec!["create", "set on: true"]);
    }

    #[test]
    fn jsonl_has_one_object_per_call() {
        let log = NativeCallLog::new();
        let id = log.allocate("tether.View");
        log.record(id, "tether.View", "release");
        let jsonl = log.to_jsonl();
        let lines: Vec<&str> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(last["seq"], 1);
        assert_eq!(last["action"], "release");
        assert_eq!(last["element"], "tether.View");
    }

    #[test]
    fn clones_share_entries() {
        let log = NativeCallLog::new();
        let other = log.clone();
        other.allocate("tether.Window");
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(other.is_empty());
    }
}
