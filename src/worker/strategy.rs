//! Fetch interception and the three retrieval strategies.

use color_eyre::Result;
use tracing::{debug, warn};

use super::router::Strategy;
use super::OfflineWorker;
use crate::cache::{CacheStore, PartitionKind, Served};
use crate::net::{Fetcher, Request, RequestKey, ResponseSnapshot};

impl<S: CacheStore, F: Fetcher> OfflineWorker<S, F> {
  /// Handle a fetch event.
  ///
  /// Returns `Ok(None)` when the request is not intercepted (non-GET,
  /// non-http(s), or this generation is not active yet); the caller should
  /// then go to the network itself. `Err` only surfaces from cache-first
  /// when the network fails and no offline document is cached, or when the
  /// store itself fails.
  pub async fn handle_fetch(&self, request: &Request) -> Result<Option<Served>> {
    if !request.is_interceptable() {
      debug!(method = %request.method, url = %request.url, "Passing through");
      return Ok(None);
    }
    if !self.lifecycle().can_intercept_fetch() {
      debug!(url = %request.url, state = %self.lifecycle(), "Not active, passing through");
      return Ok(None);
    }

    let (route, strategy) = self.router.classify(request);
    debug!(url = %request.url, route, %strategy, "Routing");

    let served = match strategy {
      Strategy::CacheFirst => self.cache_first(request).await?,
      Strategy::NetworkFirst => self.network_first(request).await?,
      Strategy::CacheFirstImages => self.cache_first_images(request).await?,
    };
    Ok(Some(served))
  }

  /// Cached snapshot if present, else network (stored on 2xx), else the offline document.
  pub async fn cache_first(&self, request: &Request) -> Result<Served> {
    let key = request.key();
    if let Some(cached) = self.lookup(&key)? {
      return Ok(Served::from_cache(cached, false));
    }

    match self.fetcher.fetch(request).await {
      Ok(response) => {
        self.store_copy(PartitionKind::Static, &key, &response);
        Ok(Served::from_network(response))
      }
      Err(e) => {
        warn!(url = %request.url, "Cache first failed: {}", e);
        match self.offline_fallback()? {
          Some(page) => Ok(Served::fallback_page(page)),
          None => Err(e),
        }
      }
    }
  }

  /// Network (stored on 2xx), else cached snapshot, else offline document for
  /// navigations, else a synthetic 408.
  pub async fn network_first(&self, request: &Request) -> Result<Served> {
    let key = request.key();

    let error = match self.fetcher.fetch(request).await {
      Ok(response) => {
        self.store_copy(PartitionKind::Dynamic, &key, &response);
        return Ok(Served::from_network(response));
      }
      Err(e) => e,
    };

    if let Some(cached) = self.lookup(&key)? {
      warn!(url = %request.url, "Network failed, serving cached copy: {}", error);
      return Ok(Served::from_cache(cached, true));
    }

    if request.is_navigation() {
      if let Some(page) = self.offline_fallback()? {
        warn!(url = %request.url, "Network failed, serving offline page: {}", error);
        return Ok(Served::fallback_page(page));
      }
    }

    warn!(url = %request.url, "Network failed with nothing cached: {}", error);
    Ok(Served::synthetic(ResponseSnapshot::network_error()))
  }

  /// Like cache-first, but stores into the image partition and degrades to a 404.
  pub async fn cache_first_images(&self, request: &Request) -> Result<Served> {
    let key = request.key();
    if let Some(cached) = self.lookup(&key)? {
      return Ok(Served::from_cache(cached, false));
    }

    match self.fetcher.fetch(request).await {
      Ok(response) => {
        self.store_copy(PartitionKind::Images, &key, &response);
        Ok(Served::from_network(response))
      }
      Err(e) => {
        warn!(url = %request.url, "Image unavailable: {}", e);
        Ok(Served::synthetic(ResponseSnapshot::image_not_found()))
      }
    }
  }

  /// Keep a copy of a 2xx response. Write failures are logged, not returned.
  fn store_copy(&self, kind: PartitionKind, key: &RequestKey, response: &ResponseSnapshot) {
    if !response.is_ok() {
      return;
    }
    let partition = self.settings.generation.partition(kind);
    if let Err(e) = self.store.put(&partition, key, response) {
      warn!(%partition, key = key.identity(), "Failed to cache response: {}", e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{MemoryStore, ServedFrom};
  use crate::testing::{active_worker, FakeFetcher};
  use std::sync::Arc;

  fn get(url: &str) -> Request {
    Request::get_str(url).unwrap()
  }

  #[tokio::test]
  async fn test_manifest_asset_identical_offline() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    let w = active_worker(store, fetcher.clone()).await;

    let online = w
      .handle_fetch(&get("https://ff.example/css/style.css"))
      .await
      .unwrap()
      .unwrap();

    fetcher.go_offline();
    let offline = w
      .handle_fetch(&get("https://ff.example/css/style.css"))
      .await
      .unwrap()
      .unwrap();

    assert_eq!(online.source, ServedFrom::Cache);
    assert_eq!(online.response, offline.response);
  }

  #[tokio::test]
  async fn test_cache_first_stores_in_static_partition() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    fetcher.serve("https://ff.example/fonts/inter.woff2", ResponseSnapshot::new(200, "font"));
    let w = active_worker(store.clone(), fetcher.clone()).await;
    let before = store.entry_count("freightflow-v1.0.0-static");

    let served = w
      .cache_first(&get("https://ff.example/fonts/inter.woff2"))
      .await
      .unwrap();
    assert_eq!(served.source, ServedFrom::Network);
    assert_eq!(store.entry_count("freightflow-v1.0.0-static"), before + 1);

    fetcher.go_offline();
    let again = w
      .cache_first(&get("https://ff.example/fonts/inter.woff2"))
      .await
      .unwrap();
    assert_eq!(again.source, ServedFrom::Cache);
    assert_eq!(again.response.body, b"font");
  }

  #[tokio::test]
  async fn test_cache_first_offline_falls_back_to_offline_page() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    let w = active_worker(store, fetcher.clone()).await;
    fetcher.go_offline();

    let served = w
      .cache_first(&get("https://ff.example/js/uncached.js"))
      .await
      .unwrap();
    assert_eq!(served.source, ServedFrom::FallbackPage);
    assert_eq!(served.response.body, FakeFetcher::body_for("https://ff.example/offline.html"));
  }

  #[tokio::test]
  async fn test_cache_first_without_fallback_propagates_error() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::new();
    fetcher.go_offline();
    let w = crate::testing::worker(store, fetcher);

    assert!(w
      .cache_first(&get("https://ff.example/js/uncached.js"))
      .await
      .is_err());
  }

  #[tokio::test]
  async fn test_non_ok_responses_are_returned_but_not_stored() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    fetcher.serve("https://ff.example/api/trucks", ResponseSnapshot::new(503, "busy"));
    let w = active_worker(store.clone(), fetcher).await;

    let served = w
      .handle_fetch(&get("https://ff.example/api/trucks"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(served.response.status, 503);
    assert_eq!(store.entry_count("freightflow-v1.0.0-dynamic"), 0);
  }

  #[tokio::test]
  async fn test_network_first_prefers_network_then_last_known_good() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    fetcher.serve("https://ff.example/api/trucks", ResponseSnapshot::new(200, "[1]"));
    let w = active_worker(store.clone(), fetcher.clone()).await;

    let first = w.handle_fetch(&get("https://ff.example/api/trucks")).await.unwrap().unwrap();
    assert_eq!(first.source, ServedFrom::Network);
    assert_eq!(store.entry_count("freightflow-v1.0.0-dynamic"), 1);

    fetcher.serve("https://ff.example/api/trucks", ResponseSnapshot::new(200, "[1,2]"));
    let second = w.handle_fetch(&get("https://ff.example/api/trucks")).await.unwrap().unwrap();
    assert_eq!(second.response.body, b"[1,2]");

    fetcher.go_offline();
    let offline = w.handle_fetch(&get("https://ff.example/api/trucks")).await.unwrap().unwrap();
    assert_eq!(offline.source, ServedFrom::Offline);
    assert_eq!(offline.response.body, b"[1,2]");
    assert!(offline.cached_at.is_some());
  }

  #[tokio::test]
  async fn test_network_first_navigation_gets_offline_page() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    let w = active_worker(store, fetcher.clone()).await;
    fetcher.go_offline();

    let served = w
      .handle_fetch(&get("https://ff.example/truck-details.html").navigate())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(served.source, ServedFrom::FallbackPage);
    assert_eq!(served.response.body, FakeFetcher::body_for("https://ff.example/offline.html"));
  }

  #[tokio::test]
  async fn test_network_first_non_navigation_gets_408() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    let w = active_worker(store, fetcher.clone()).await;
    fetcher.go_offline();

    let served = w
      .handle_fetch(&get("https://ff.example/api/bookings/FF1"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(served.source, ServedFrom::Synthetic);
    assert_eq!(served.response.status, 408);
  }

  #[tokio::test]
  async fn test_image_failure_is_404_not_offline_page() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    fetcher.serve("https://ff.example/img/truck-001.jpg", ResponseSnapshot::new(200, "jpeg"));
    let w = active_worker(store.clone(), fetcher.clone()).await;

    let cached = w
      .handle_fetch(&get("https://ff.example/img/truck-001.jpg").image())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(cached.source, ServedFrom::Network);
    assert_eq!(store.entry_count("freightflow-v1.0.0-images"), 1);

    fetcher.go_offline();
    let hit = w
      .handle_fetch(&get("https://ff.example/img/truck-001.jpg").image())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(hit.source, ServedFrom::Cache);

    let miss = w
      .handle_fetch(&get("https://ff.example/img/truck-002.jpg").image())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(miss.source, ServedFrom::Synthetic);
    assert_eq!(miss.response.status, 404);
  }

  #[tokio::test]
  async fn test_older_generation_is_never_served() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    let w = active_worker(store.clone(), fetcher.clone()).await;

    let old = get("https://ff.example/api/trucks").key();
    store
      .put("freightflow-v0.9.0-dynamic", &old, &ResponseSnapshot::new(200, "stale"))
      .unwrap();
    fetcher.go_offline();

    let served = w
      .handle_fetch(&get("https://ff.example/api/trucks"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(served.source, ServedFrom::Synthetic);
    assert_eq!(served.response.status, 408);
  }

  #[tokio::test]
  async fn test_non_get_and_inactive_pass_through() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = FakeFetcher::serving_manifest();
    let idle = crate::testing::worker(store.clone(), fetcher.clone());
    assert!(idle
      .handle_fetch(&get("https://ff.example/index.html"))
      .await
      .unwrap()
      .is_none());

    let w = active_worker(store, fetcher.clone()).await;
    let url = url::Url::parse("https://ff.example/api/bookings").unwrap();
    let post = Request::post_json(url, &serde_json::json!({"truck": "truck-001"})).unwrap();
    let requests_before = fetcher.request_count();
    assert!(w.handle_fetch(&post).await.unwrap().is_none());
    assert_eq!(fetcher.request_count(), requests_before);
  }
}
