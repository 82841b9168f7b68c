//! Reactive Cache Consumer
//!
//! Binds a `(key, fetcher)` pair to an observable `{data, loading, error}`
//! state. UI layers subscribe to state changes through a watch channel and
//! drive the query with `activate`, `set_key`, `set_enabled`, `invalidate`
//! and `refresh`.
//!
//! In-flight fetches are never cancelled. A fetch that resolves after the
//! key changed still writes its value to the cache, but leaves the state of
//! the new key alone.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::SharedCache;

type Fetcher<T, E> = Arc<dyn Fn(String) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

// == Query State ==
/// What a subscriber renders.
#[derive(Debug)]
pub struct QueryState<T, E> {
    /// Last value loaded for the current key
    pub data: Option<T>,
    /// True while the fetcher runs
    pub loading: bool,
    /// Failure of the last fetch, cleared when a new one starts
    pub error: Option<Arc<E>>,
}

impl<T, E> Default for QueryState<T, E> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T: Clone, E> Clone for QueryState<T, E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

// == Query Options ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// TTL for fetched values; `None` uses the cache default
    pub ttl: Option<Duration>,
    /// A disabled query never fetches
    pub enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            enabled: true,
        }
    }
}

#[derive(Debug)]
struct QueryParams {
    key: String,
    enabled: bool,
}

// == Cached Query ==
/// Cache-backed fetch with observable state.
pub struct CachedQuery<T, E> {
    cache: SharedCache<T>,
    fetcher: Fetcher<T, E>,
    ttl: Option<Duration>,
    params: Mutex<QueryParams>,
    state: watch::Sender<QueryState<T, E>>,
}

impl<T, E> CachedQuery<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an idle query; call `activate` to load.
    ///
    /// `fetcher` receives the key being loaded.
    pub fn new<F, Fut>(
        cache: SharedCache<T>,
        key: impl Into<String>,
        fetcher: F,
        options: QueryOptions,
    ) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let fetcher: Fetcher<T, E> = Arc::new(move |key| fetcher(key).boxed());
        let (state, _) = watch::channel(QueryState::default());

        Self {
            cache,
            fetcher,
            ttl: options.ttl,
            params: Mutex::new(QueryParams {
                key: key.into(),
                enabled: options.enabled,
            }),
            state,
        }
    }

    pub fn key(&self) -> String {
        self.params.lock().key.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.params.lock().enabled
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> QueryState<T, E> {
        (*self.state.borrow()).clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T, E>> {
        self.state.subscribe()
    }

    // == Activate ==
    /// Loads the current key: from the cache if fresh, else via the fetcher.
    ///
    /// Does nothing while the query is disabled.
    pub async fn activate(&self) {
        let (key, enabled) = {
            let params = self.params.lock();
            (params.key.clone(), params.enabled)
        };
        if !enabled {
            debug!(%key, "query disabled, skipping fetch");
            return;
        }

        if let Some(data) = self.cache.get(&key) {
            self.state.send_modify(|s| {
                s.data = Some(data);
                s.loading = false;
                s.error = None;
            });
            return;
        }

        self.fetch(key).await;
    }

    // == Set Key ==
    /// Switches to another key and re-activates if it changed.
    ///
    /// Data of the previous key is cleared first.
    pub async fn set_key(&self, key: impl Into<String>) {
        let key = key.into();
        let changed = {
            let mut params = self.params.lock();
            if params.key == key {
                false
            } else {
                params.key = key;
                true
            }
        };

        if changed {
            self.state.send_modify(|s| {
                s.data = None;
                s.error = None;
                s.loading = false;
            });
            self.activate().await;
        }
    }

    // == Set Enabled ==
    /// Enables or disables the query, re-activating on a toggle.
    pub async fn set_enabled(&self, enabled: bool) {
        let toggled = {
            let mut params = self.params.lock();
            let toggled = params.enabled != enabled;
            params.enabled = enabled;
            toggled
        };

        if toggled {
            self.activate().await;
        }
    }

    // == Invalidate ==
    /// Drops the cached value and local data without fetching.
    pub fn invalidate(&self) {
        let key = self.key();
        self.cache.delete(&key);
        self.state.send_modify(|s| s.data = None);
    }

    // == Refresh ==
    /// Deletes the cached value and fetches again, whatever the cache holds.
    ///
    /// Does nothing while the query is disabled.
    pub async fn refresh(&self) {
        let (key, enabled) = {
            let params = self.params.lock();
            (params.key.clone(), params.enabled)
        };
        if !enabled {
            debug!(%key, "query disabled, skipping refresh");
            return;
        }

        self.cache.delete(&key);
        self.fetch(key).await;
    }

    async fn fetch(&self, key: String) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = (self.fetcher)(key.clone()).await;
        let current = self.key() == key;

        match result {
            Ok(data) => {
                self.cache.set(&key, data.clone(), self.ttl);
                if current {
                    self.state.send_modify(|s| {
                        s.data = Some(data);
                        s.loading = false;
                    });
                } else {
                    debug!(%key, "key changed during fetch, state left untouched");
                }
            }
            Err(err) => {
                warn!(%key, "query fetch failed");
                if current {
                    self.state.send_modify(|s| {
                        s.error = Some(Arc::new(err));
                        s.loading = false;
                    });
                }
            }
        }
    }
}

impl<T, E> fmt::Debug for CachedQuery<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedQuery")
            .field("params", &*self.params.lock())
            .field("ttl", &self.ttl)
            .finish()
    }
}
