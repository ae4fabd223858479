#![forbid(unsafe_code)]

use tether_runtime::Property;

/// An embedded browser.
pub trait WebViewCore: Send + Sync {
    /// Ask the native browser to load `url`.
    ///
    /// Writes [`url`](Self::url); the platform core loads on each change.
    fn load_url(&self, url: &str) {
        self.url().set(url.to_owned());
    }

    /// The last requested address.
    fn url(&self) -> &Property<String>;
}
