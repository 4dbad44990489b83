//! Fetch strategies.
//!
//! Four algorithms for reconciling a live network attempt against a cached
//! fallback. Only [`network_first_with_timeout`] stamps entries with the
//! `sw-cache-time` capture timestamp; the other strategies store unstamped
//! entries that never expire.
//!
//! Storage failures are logged and skipped, never allowed to block a response
//! on its way back to the page. Concurrent requests to the same key may race
//! to populate the cache; the last write wins, which is fine because entries
//! are idempotent snapshots of GET responses.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ScopeConfig;
use crate::error::WorkerError;
use swkit_common::Clock;
use swkit_net::{Fetcher, NetError, Request, Response};
use swkit_store::{CacheEntry, CacheStorage};

/// Why the network leg did not produce a usable response.
enum FallbackCause {
    /// The server answered with a failure status. The response is kept so it
    /// can be returned as-is when no fallback exists.
    Status(Response),
    /// Transport error or timeout.
    Error(NetError),
}

/// Race the network against the scope's timeout. A successful response is
/// captured (stamped) into the scope's namespace and returned live. On
/// timeout, transport error, or failure status, fall back to a fresh cache
/// entry, expiring stale ones, and finally to the offline page for
/// navigations.
pub async fn network_first_with_timeout(
    fetcher: &Arc<dyn Fetcher>,
    storage: &CacheStorage,
    clock: &Arc<dyn Clock>,
    config: &ScopeConfig,
    request: Request,
) -> Result<Response, WorkerError> {
    // Dropping the in-flight future on expiry is the abort signal.
    let attempt = tokio::time::timeout(config.network_timeout, fetcher.fetch(request.clone())).await;

    let cause = match attempt {
        Ok(Ok(response)) if response.ok() => {
            let mut entry = CacheEntry::from_response(&response);
            entry.stamp(clock.now_ms());
            let cache = storage.open(&config.cache_name()).await;
            if let Err(err) = cache.put(&request, entry).await {
                warn!(url = %request.url, error = %err, "failed to cache network response");
            }
            return Ok(response);
        }
        Ok(Ok(response)) => {
            debug!(url = %request.url, status = %response.status, "network answered with failure status");
            FallbackCause::Status(response)
        }
        Ok(Err(err)) => {
            debug!(url = %request.url, error = %err, "network failed, trying cache");
            FallbackCause::Error(err)
        }
        Err(_) => {
            debug!(url = %request.url, timeout = ?config.network_timeout, "network timed out, trying cache");
            FallbackCause::Error(NetError::Timeout(config.network_timeout))
        }
    };

    if let Some(entry) = storage.match_any(&request).await {
        let max_age_ms = config.max_age.as_millis() as u64;
        let expired = entry
            .age(clock.now_ms())
            .map_or(false, |age| age > max_age_ms);
        if expired {
            debug!(url = %request.url, "cache entry expired, removing");
            let cache = storage.open(&config.cache_name()).await;
            if let Err(err) = cache.delete(&request).await {
                warn!(url = %request.url, error = %err, "failed to delete expired entry");
            }
        } else {
            return Ok(entry.into_response());
        }
    }

    offline_fallback(storage, config, &request, cause).await
}

/// Return a cached match immediately if present; otherwise fetch, store on
/// success, and return. Network failure propagates with no offline
/// substitution: this path only serves immutable build assets, and a missing
/// one is a deployment problem worth surfacing.
pub async fn cache_first(
    fetcher: &Arc<dyn Fetcher>,
    storage: &CacheStorage,
    config: &ScopeConfig,
    request: Request,
) -> Result<Response, WorkerError> {
    if let Some(entry) = storage.match_any(&request).await {
        return Ok(entry.into_response());
    }

    let response = fetcher.fetch(request.clone()).await?;
    if response.ok() {
        let cache = storage.open(&config.cache_name()).await;
        if let Err(err) = cache
            .put(&request, CacheEntry::from_response(&response))
            .await
        {
            warn!(url = %request.url, error = %err, "failed to cache static asset");
        }
    }
    Ok(response)
}

/// Serve the cache immediately when it can, refreshing it from the network in
/// a detached task. Only when no cached value exists does the network result
/// become the return value. The background leg is never cancelled, even if
/// the requesting page goes away; its errors are logged and swallowed.
pub async fn stale_while_revalidate(
    fetcher: &Arc<dyn Fetcher>,
    storage: &CacheStorage,
    config: &ScopeConfig,
    request: Request,
) -> Result<Response, WorkerError> {
    let cached = storage.match_any(&request).await;

    if let Some(entry) = cached {
        let fetcher = Arc::clone(fetcher);
        let storage = storage.clone();
        let cache_name = config.cache_name();
        let background = request.clone();
        tokio::spawn(async move {
            match fetcher.fetch(background.clone()).await {
                Ok(response) if response.ok() => {
                    let cache = storage.open(&cache_name).await;
                    if let Err(err) = cache
                        .put(&background, CacheEntry::from_response(&response))
                        .await
                    {
                        warn!(url = %background.url, error = %err, "revalidation store failed");
                    }
                }
                Ok(response) => {
                    debug!(url = %background.url, status = %response.status, "revalidation got failure status");
                }
                Err(err) => {
                    warn!(url = %background.url, error = %err, "revalidation fetch failed");
                }
            }
        });
        return Ok(entry.into_response());
    }

    match fetcher.fetch(request.clone()).await {
        Ok(response) => {
            if response.ok() {
                let cache = storage.open(&config.cache_name()).await;
                if let Err(err) = cache
                    .put(&request, CacheEntry::from_response(&response))
                    .await
                {
                    warn!(url = %request.url, error = %err, "failed to cache response");
                }
            }
            Ok(response)
        }
        Err(err) => offline_fallback(storage, config, &request, FallbackCause::Error(err)).await,
    }
}

/// Pure passthrough: no timeout race, no caching, no fallback.
pub async fn network_only(
    fetcher: &Arc<dyn Fetcher>,
    request: Request,
) -> Result<Response, WorkerError> {
    Ok(fetcher.fetch(request).await?)
}

/// Last resort once network and cache are both unusable: navigations get the
/// scope's offline fallback page; everything else surfaces the original
/// failure (a failure-status response is returned as-is, a transport error is
/// raised).
async fn offline_fallback(
    storage: &CacheStorage,
    config: &ScopeConfig,
    request: &Request,
    cause: FallbackCause,
) -> Result<Response, WorkerError> {
    if request.is_navigation() {
        if let Ok(url) = config.url_for(&config.offline_fallback_path) {
            if let Some(entry) = storage.match_any(&Request::get(url)).await {
                debug!(url = %request.url, "serving offline fallback page");
                return Ok(entry.into_response());
            }
        }
        warn!(url = %request.url, "offline fallback page not cached");
    }

    match cause {
        FallbackCause::Status(response) => Ok(response),
        FallbackCause::Error(err) => Err(WorkerError::Network(err)),
    }
}
