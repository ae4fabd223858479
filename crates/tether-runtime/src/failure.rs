#![forbid(unsafe_code)]

//! Failure reporting for dispatched work.
//!
//! A closure running on the dispatcher may panic or return an error. Neither
//! is allowed to stop the queue: the failure is packaged as a
//! [`DispatchFailure`] and handed to a [`FailureHandler`], then the loop moves
//! on to the next closure.
//!
//! # Handler resolution
//!
//! 1. The handler in the dispatcher's own config, if set.
//! 2. Otherwise the process-wide handler installed with
//!    [`set_failure_handler`].
//! 3. Otherwise the failure is logged with `tracing::error!`.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use tether_core::thread_affinity::AffinityError;

/// Error type returned by fallible dispatched closures.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from dispatcher operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The dispatcher was shut down; the closure was not queued.
    ShutDown,
    /// The run loop was entered from a thread other than the UI-affine one.
    WrongThread(AffinityError),
    /// The dedicated UI thread could not be spawned.
    Spawn(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShutDown => write!(f, "dispatcher has been shut down"),
            Self::WrongThread(err) => write!(f, "dispatcher entered off its UI thread: {err}"),
            Self::Spawn(msg) => write!(f, "failed to spawn UI thread: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::WrongThread(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AffinityError> for DispatchError {
    fn from(err: AffinityError) -> Self {
        Self::WrongThread(err)
    }
}

/// Which queue a failed closure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Plain `enqueue` work.
    Immediate,
    /// `enqueue_delayed` work.
    Delayed,
    /// Idle-priority work.
    Idle,
    /// A timer tick.
    Timer,
}

/// A closure that failed while running on a dispatcher.
#[derive(Debug)]
pub enum DispatchFailure {
    /// The closure panicked.
    Panicked {
        dispatcher: String,
        kind: TaskKind,
        message: String,
    },
    /// The closure returned an error.
    Errored {
        dispatcher: String,
        kind: TaskKind,
        error: TaskError,
    },
}

impl DispatchFailure {
    /// Name of the dispatcher the closure ran on.
    #[must_use]
    pub fn dispatcher(&self) -> &str {
        match self {
            Self::Panicked { dispatcher, .. } | Self::Errored { dispatcher, .. } => dispatcher,
        }
    }

    /// Queue the closure came from.
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Panicked { kind, .. } | Self::Errored { kind, .. } => *kind,
        }
    }

    pub(crate) fn from_panic(dispatcher: &str, kind: TaskKind, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked {
            dispatcher: dispatcher.to_string(),
            kind,
            message,
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panicked {
                dispatcher,
                kind,
                message,
            } => write!(f, "{kind:?} task on '{dispatcher}' panicked: {message}"),
            Self::Errored {
                dispatcher,
                kind,
                error,
            } => write!(f, "{kind:?} task on '{dispatcher}' failed: {error}"),
        }
    }
}

impl std::error::Error for DispatchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Errored { error, .. } => Some(error.as_ref()),
            Self::Panicked { .. } => None,
        }
    }
}

/// Receives failures of dispatched closures.
pub trait FailureHandler: Send + Sync {
    /// Called on the UI-affine thread right after the closure failed.
    fn handle(&self, failure: &DispatchFailure);
}

impl<F> FailureHandler for F
where
    F: Fn(&DispatchFailure) + Send + Sync,
{
    fn handle(&self, failure: &DispatchFailure) {
        self(failure);
    }
}

static GLOBAL_HANDLER: RwLock<Option<Arc<dyn FailureHandler>>> = RwLock::new(None);

/// Install the process-wide failure handler, returning the previous one.
pub fn set_failure_handler(handler: Arc<dyn FailureHandler>) -> Option<Arc<dyn FailureHandler>> {
    let mut slot = GLOBAL_HANDLER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.replace(handler)
}

/// Remove the process-wide failure handler.
pub fn clear_failure_handler() -> Option<Arc<dyn FailureHandler>> {
    GLOBAL_HANDLER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
}

pub(crate) fn report(local: Option<&Arc<dyn FailureHandler>>, failure: &DispatchFailure) {
    let handler = local.cloned().or_else(|| {
        GLOBAL_HANDLER
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    });
    let Some(handler) = handler else {
        log_failure(failure);
        return;
    };
    // A handler must not take the run loop down with it.
    if panic::catch_unwind(AssertUnwindSafe(|| handler.handle(failure))).is_err() {
        tracing::error!(
            dispatcher = failure.dispatcher(),
            "failure handler panicked"
        );
        log_failure(failure);
    }
}

fn log_failure(failure: &DispatchFailure) {
    tracing::error!(
        dispatcher = failure.dispatcher(),
        kind = ?failure.kind(),
        "{failure}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn panic_payloads_become_messages() {
        let f = DispatchFailure::from_panic("ui", TaskKind::Immediate, &"boom");
        assert!(f.to_string().contains("boom"));
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let f = DispatchFailure::from_panic("ui", TaskKind::Timer, owned.as_ref());
        assert!(f.to_string().contains("owned boom"));
        assert_eq!(f.kind(), TaskKind::Timer);
        assert_eq!(f.dispatcher(), "ui");
    }

    #[test]
    fn errored_exposes_source() {
        use std::error::Error as _;
        let err: TaskError = "disk on fire".into();
        let f = DispatchFailure::Errored {
            dispatcher: "ui".into(),
            kind: TaskKind::Delayed,
            error: err,
        };
        assert!(f.source().is_some());
        assert!(f.to_string().contains("disk on fire"));
    }

    #[test]
    fn local_handler_takes_precedence() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let local: Arc<dyn FailureHandler> = Arc::new(move |f: &DispatchFailure| {
            seen_clone.lock().unwrap().push(f.to_string());
        });
        let failure = DispatchFailure::from_panic("ui", TaskKind::Idle, &"x");
        report(Some(&local), &failure);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn panicking_handler_is_contained() {
        fn exploding(_: &DispatchFailure) {
            panic!("handler failed too");
        }
        let local: Arc<dyn FailureHandler> = Arc::new(exploding);
        let failure = DispatchFailure::from_panic("ui", TaskKind::Immediate, &"x");
        report(Some(&local), &failure);
    }

    #[test]
    fn dispatch_error_display() {
        assert!(DispatchError::ShutDown.to_string().contains("shut down"));
        assert!(DispatchError::Spawn("no threads".into()).to_string().contains("no threads"));
    }
}
