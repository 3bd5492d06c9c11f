//! Retrieval strategies: cache-first and network-first.
//!
//! Cache-first favors availability and latency; network-first keeps
//! dynamic content fresh while still building an offline fallback. Both
//! populate the store as a side effect of successful fetches, never on the
//! request's critical path.

use bytes::Bytes;

use swkit_client::fetch::{Fetch, FetchResponse, WebRequest};
use swkit_core::Error;
use swkit_core::cache::store::{CacheEntry, GenerationStore};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Network,
    OfflineFallback,
}

impl ServedFrom {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServedFrom::Cache => "cache",
            ServedFrom::Network => "network",
            ServedFrom::OfflineFallback => "offline-fallback",
        }
    }
}

/// A response on its way back to the page.
#[derive(Debug, Clone)]
pub struct Served {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ServedFrom,
}

impl Served {
    fn from_entry(entry: CacheEntry, source: ServedFrom) -> Self {
        Self {
            status: entry.status,
            headers: entry.headers,
            body: Bytes::from(entry.body),
            source,
        }
    }

    fn from_network(response: &FetchResponse) -> Self {
        Self {
            status: response.status.as_u16(),
            headers: response.header_pairs(),
            body: response.bytes.clone(),
            source: ServedFrom::Network,
        }
    }
}

/// Copy a successful response into the store on a detached task.
///
/// The entry gets its own body buffer before the caller's response is
/// returned, so the write can neither delay nor consume what the page
/// receives. Write-behind store failures are logged, not propagated.
fn store_copy(store: &GenerationStore, key: &str, request: &WebRequest, response: &FetchResponse) {
    let entry = CacheEntry::new(
        key.to_string(),
        request.method.clone(),
        request.url.clone(),
        response.status.as_u16(),
        response.header_pairs(),
        response.bytes.to_vec(),
    );
    let store = store.clone();
    tokio::spawn(async move {
        if let Err(e) = store.put(&entry).await {
            tracing::warn!("write-behind cache update failed for {}: {}", entry.url, e);
        }
    });
}

/// Cache-first: serve from the store when possible, fall back to the
/// network, and for failed navigations fall back again to the pre-cached
/// offline page.
pub async fn cache_first(
    store: &GenerationStore,
    fetcher: &dyn Fetch,
    request: &WebRequest,
    offline_key: &str,
) -> Result<Served, Error> {
    let key = request.cache_key().map_err(|e| Error::InvalidUrl(e.to_string()))?;

    if let Some(entry) = store.match_request(&key).await? {
        tracing::debug!("serving {} from cache", request.url);
        return Ok(Served::from_entry(entry, ServedFrom::Cache));
    }

    match fetcher.fetch(request).await {
        Ok(response) => {
            if response.status.as_u16() == 200 {
                store_copy(store, &key, request, &response);
            }
            Ok(Served::from_network(&response))
        }
        Err(err) => {
            if request.is_navigation
                && let Some(page) = store.match_request(offline_key).await?
            {
                tracing::debug!("navigation to {} failed offline, serving fallback page", request.url);
                return Ok(Served::from_entry(page, ServedFrom::OfflineFallback));
            }
            Err(err)
        }
    }
}

/// Network-first: fetch, cache a copy of fresh 200s, and only on network
/// failure fall back to whatever the store has. No static substitute
/// exists for dynamic content, so an empty store propagates the failure.
pub async fn network_first(
    store: &GenerationStore,
    fetcher: &dyn Fetch,
    request: &WebRequest,
) -> Result<Served, Error> {
    let key = request.cache_key().map_err(|e| Error::InvalidUrl(e.to_string()))?;

    match fetcher.fetch(request).await {
        Ok(response) => {
            if response.status.as_u16() == 200 {
                store_copy(store, &key, request, &response);
            }
            Ok(Served::from_network(&response))
        }
        Err(err) => {
            tracing::debug!("network failed for {}, trying cache", request.url);
            match store.match_request(&key).await? {
                Some(entry) => Ok(Served::from_entry(entry, ServedFrom::Cache)),
                None => Err(err),
            }
        }
    }
}
