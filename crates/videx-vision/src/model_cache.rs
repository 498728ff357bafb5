//! Single-flight lazy loading for a local VLM (spec §9 Design Notes): the
//! first caller to need the model pays the load cost, every concurrent
//! caller behind it awaits the same in-flight load instead of starting a
//! second one.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

pub struct SingleFlightModel<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> Default for SingleFlightModel<T> {
    fn default() -> Self {
        Self { cell: OnceCell::new() }
    }
}

impl<T> SingleFlightModel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached model, loading it via `loader` on first call.
    /// Concurrent callers during the first load all await the same
    /// `OnceCell` initialization rather than racing independent loads.
    pub async fn get_or_load<F, Fut, E>(&self, loader: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(|| async { loader().await.map(Arc::new) }).await.cloned()
    }
}
