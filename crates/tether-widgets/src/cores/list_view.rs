#![forbid(unsafe_code)]

use std::sync::Arc;

use tether_core::WeakCallback;

/// Supplies rows to a list view.
///
/// Called on the UI thread, and only from
/// [`ListViewCore::reload_data`] (including the reload that happens when a
/// list view is first bound).
pub trait ListViewDataSource: Send + Sync {
    fn number_of_rows(&self) -> usize;

    fn label_text_for_row_index(&self, index: usize) -> String;
}

/// A scrolling list of text rows.
///
/// Rows are pulled from the data source on demand rather than mirrored
/// through per-row properties; call [`reload_data`](Self::reload_data) after
/// the source changes.
pub trait ListViewCore: Send + Sync {
    fn set_data_source(&self, source: Option<Arc<dyn ListViewDataSource>>);

    /// Re-pull every row from the data source. Idempotent.
    fn reload_data(&self);

    /// Fired on the UI thread with the selected row index.
    fn on_select(&self) -> &WeakCallback<usize>;
}
