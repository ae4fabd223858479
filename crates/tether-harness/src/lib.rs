#![forbid(unsafe_code)]

//! Test harness for tether: a recording mock platform.
//!
//! # Role in tether
//! `tether-harness` stands in for a native toolkit. Its cores record every
//! call they would make into a [`NativeCallLog`], and [`NativeEvents`]
//! simulates toolkit callbacks arriving on foreign threads.
//!
//! # Primary responsibilities
//! - **Mock platform**: [`MockPlatform`] registers a [`MockCore`]
//!   constructor per capability (or a chosen subset, to exercise fallback).
//! - **Call log**: ordered, shareable, exportable as JSONL.
//! - **Fixtures**: [`ui_dispatcher`], [`drain`], [`on_native_thread`],
//!   [`native_events`], [`with_mock_core`].

pub mod mock;
pub mod native_log;
pub mod platform;

pub use mock::{MockCore, MockElement, NativeEvents};
pub use native_log::{NativeCall, NativeCallLog, NativeId};
pub use platform::{
    MOCK_KIND, MockPlatform, drain, native_events, on_native_thread, ui_dispatcher, with_mock_core,
};
