#![forbid(unsafe_code)]

use std::sync::Arc;

use tether_core::{Capability, capability};
use tether_runtime::{Binding, Property};

use crate::context::UiContext;
use crate::core::Core;
use crate::registry::CoreError;
use crate::view::{View, ViewBase, WireGuard, note_missing_interface};

/// An embedded browser.
///
/// `url` is bound both ways: writing it requests a load, and navigation
/// inside the native browser is reflected back.
#[derive(Debug)]
pub struct WebView {
    base: ViewBase,
    url: Property<String>,
}

impl WebView {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: ViewBase::new(),
            url: Property::named("url", String::new()),
        })
    }

    #[must_use]
    pub fn url(&self) -> &Property<String> {
        &self.url
    }

    /// Request `url`. Takes effect on the native browser once bound.
    pub fn load_url(&self, url: impl Into<String>) {
        self.url.set(url.into());
    }
}

impl View for WebView {
    fn capability_for_core_creation(&self) -> &'static Capability {
        &capability::WEB_VIEW
    }

    fn view_base(&self) -> &ViewBase {
        &self.base
    }

    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        _context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError> {
        let Some(web) = core.interface().as_web_view() else {
            note_missing_interface("WebView", core);
            return Ok(Vec::new());
        };
        Ok(vec![Binding::two_way(&self.url, web.url()).into()])
    }
}
