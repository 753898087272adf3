//! Load-once memoisation keyed by content hash.
//!
//! [`LoadOnce`] maps each key to a single shared future. The first caller
//! for a key creates the future under the lock; everyone else, concurrent
//! or later, clones and awaits the same one. Completed results (success or
//! failure) stay in the map for the life of the store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::Result;

type SharedLoad<V> = Shared<BoxFuture<'static, Result<V>>>;

/// A map from key to one shared unit of work.
pub struct LoadOnce<V: Clone> {
    loads: Mutex<HashMap<String, SharedLoad<V>>>,
}

impl<V: Clone> Default for LoadOnce<V> {
    fn default() -> Self {
        Self {
            loads: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> LoadOnce<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the load for `key`, starting it with `load` if nobody has.
    ///
    /// `load` is only invoked by the first caller for a key.
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let shared = {
            let mut loads = self.loads.lock().unwrap_or_else(|e| e.into_inner());
            loads
                .entry(key.to_owned())
                .or_insert_with(|| load().boxed().shared())
                .clone()
        };
        shared.await
    }

    /// Whether a load for `key` has been started.
    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.loads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Number of distinct keys ever requested.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.loads.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
