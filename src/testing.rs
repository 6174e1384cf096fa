//! Test doubles shared by the unit tests.

use color_eyre::{eyre::eyre, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::MemoryStore;
use crate::config::Config;
use crate::net::{Fetcher, Request, ResponseSnapshot};
use crate::worker::{OfflineWorker, WorkerSettings};

const MANIFEST: &[&str] = &[
  "/",
  "/index.html",
  "/css/style.css",
  "/js/main.js",
  "https://unpkg.com/feather-icons",
  "/offline.html",
];

/// Settings for a site at https://ff.example/ with a small manifest.
pub fn settings() -> WorkerSettings {
  let mut config = Config::default();
  config.origin.url = "https://ff.example/".to_string();
  config.cache.manifest = MANIFEST.iter().map(|s| s.to_string()).collect();
  WorkerSettings::from_config(&config).unwrap()
}

pub fn worker(store: Arc<MemoryStore>, fetcher: FakeFetcher) -> OfflineWorker<MemoryStore, FakeFetcher> {
  OfflineWorker::new(settings(), store, fetcher)
}

/// Installed and activated against `fetcher`, which must serve the manifest.
pub async fn active_worker(
  store: Arc<MemoryStore>,
  fetcher: FakeFetcher,
) -> OfflineWorker<MemoryStore, FakeFetcher> {
  let w = worker(store, fetcher);
  w.handle_install().await.unwrap();
  w.handle_activate().await.unwrap();
  w
}

type Handler = Box<dyn Fn(&Request) -> Option<ResponseSnapshot> + Send + Sync>;

#[derive(Default)]
struct FakeState {
  routes: Mutex<HashMap<String, ResponseSnapshot>>,
  failing: Mutex<HashSet<String>>,
  offline: AtomicBool,
  requests: Mutex<Vec<Request>>,
  handler: Mutex<Option<Handler>>,
}

/// Scripted network. Unknown URLs get a 404; `go_offline` makes every fetch fail.
#[derive(Clone, Default)]
pub struct FakeFetcher {
  state: Arc<FakeState>,
}

impl FakeFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Serves every entry of the test manifest with `body_for(url)`.
  pub fn serving_manifest() -> Self {
    let fetcher = Self::new();
    for url in settings().manifest {
      let url = url.to_string();
      fetcher.serve(&url, ResponseSnapshot::new(200, Self::body_for(&url)));
    }
    fetcher
  }

  pub fn body_for(url: &str) -> Vec<u8> {
    format!("body of {}", url).into_bytes()
  }

  pub fn serve(&self, url: &str, response: ResponseSnapshot) {
    self
      .state
      .routes
      .lock()
      .unwrap()
      .insert(url.to_string(), response);
  }

  /// Transport failure for one URL.
  pub fn fail(&self, url: &str) {
    self.state.failing.lock().unwrap().insert(url.to_string());
  }

  /// Answer with `handler` before consulting the route table.
  pub fn respond_with(
    &self,
    handler: impl Fn(&Request) -> Option<ResponseSnapshot> + Send + Sync + 'static,
  ) {
    *self.state.handler.lock().unwrap() = Some(Box::new(handler));
  }

  pub fn go_offline(&self) {
    self.state.offline.store(true, Ordering::SeqCst);
  }

  pub fn go_online(&self) {
    self.state.offline.store(false, Ordering::SeqCst);
  }

  pub fn request_count(&self) -> usize {
    self.state.requests.lock().unwrap().len()
  }

  pub fn requests(&self) -> Vec<Request> {
    self.state.requests.lock().unwrap().clone()
  }

  fn respond(&self, request: &Request) -> Result<ResponseSnapshot> {
    self.state.requests.lock().unwrap().push(request.clone());

    let url = request.url.to_string();
    if self.state.offline.load(Ordering::SeqCst) {
      return Err(eyre!("Failed to fetch {}: offline", url));
    }
    if self.state.failing.lock().unwrap().contains(&url) {
      return Err(eyre!("Failed to fetch {}: connection reset", url));
    }
    if let Some(handler) = self.state.handler.lock().unwrap().as_ref() {
      if let Some(response) = handler(request) {
        return Ok(response);
      }
    }

    Ok(
      self
        .state
        .routes
        .lock()
        .unwrap()
        .get(&url)
        .cloned()
        .unwrap_or_else(|| ResponseSnapshot::new(404, "not found")),
    )
  }
}

impl Fetcher for FakeFetcher {
  async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot> {
    self.respond(request)
  }
}
