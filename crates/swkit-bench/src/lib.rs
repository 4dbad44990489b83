//! Shared fixtures for the swkit benchmarks.
//!
//! Run with: cargo bench -p swkit-bench

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use url::Url;

use swkit_engine::{presets, ScopeConfig};
use swkit_net::Request;
use swkit_store::CacheEntry;

/// Origin used by every benchmark.
pub fn bench_origin() -> Url {
    Url::parse("https://meuburguer.example").unwrap()
}

/// The admin scope, the busiest of the deployed configurations.
pub fn bench_config() -> ScopeConfig {
    presets::admin(bench_origin())
}

/// A representative traffic mix: navigations, statics, API calls, and
/// cross-origin requests.
pub fn traffic_mix(count: usize) -> Vec<Request> {
    let origin = bench_origin();
    (0..count)
        .map(|i| match i % 4 {
            0 => Request::navigate(origin.join(&format!("/admin/pedidos/{i}")).unwrap()),
            1 => Request::get(origin.join(&format!("/_next/static/chunks/{i}.js")).unwrap()),
            2 => Request::get(origin.join(&format!("/api/pedidos?page={i}")).unwrap()),
            _ => Request::get(
                Url::parse(&format!("https://cdn.example/img/{i}.png")).unwrap(),
            ),
        })
        .collect()
}

/// A cache entry with a body of the given size.
pub fn entry_of_size(url: Url, size: usize) -> CacheEntry {
    CacheEntry {
        url,
        status: StatusCode::OK,
        status_text: "OK".to_string(),
        headers: HeaderMap::new(),
        body: Bytes::from(vec![b'x'; size]),
    }
}
