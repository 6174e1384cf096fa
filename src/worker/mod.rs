//! The offline cache manager.
//!
//! `OfflineWorker` is a single dispatcher for every event the host delivers:
//! install, activate, fetch, sync, push, notification click and consumer
//! messages. Each handler is independent and takes `&self`, so different
//! fetch events may run concurrently; the only shared mutable state is the
//! lifecycle flags behind a mutex that is never held across an await.

mod lifecycle;
mod messages;
mod push;
mod router;
mod strategy;
mod sync;

pub use lifecycle::{ActivateReport, InstallReport, LifecycleState};
pub use messages::{Broadcast, ClientMessage};
pub use push::{LogNotifier, Notification, NotificationAction, Notifier, PushPayload};
pub use router::{Matcher, Route, Router, Strategy};
pub use sync::{MemoryPendingStore, PendingStore, PendingWrite, SyncReport};

use color_eyre::{eyre::eyre, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use url::Url;

use crate::cache::{CacheStore, CachedResponse, Generation, PartitionKind};
use crate::config::{Config, PushConfig};
use crate::net::{Fetcher, RequestKey};

/// Everything the worker needs to know about the site, with URLs resolved.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
  pub origin: Url,
  pub generation: Generation,
  pub manifest: Vec<Url>,
  pub api_routes: Vec<String>,
  pub offline_page: Url,
  pub sync_tag: String,
  pub sync_endpoint: Url,
  pub push: PushConfig,
}

impl WorkerSettings {
  pub fn from_config(config: &Config) -> Result<Self> {
    // Partitions not starting with the prefix are never pruned
    if !config.cache.version.starts_with(&config.cache.prefix) {
      return Err(eyre!(
        "Cache version {} must start with prefix {}",
        config.cache.version,
        config.cache.prefix
      ));
    }

    let origin = Url::parse(&config.origin.url)
      .map_err(|e| eyre!("Invalid origin URL {}: {}", config.origin.url, e))?;

    let manifest = config
      .cache
      .manifest
      .iter()
      .map(|entry| resolve(&origin, entry))
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      generation: Generation::new(&config.cache.prefix, &config.cache.version),
      manifest,
      api_routes: config.cache.api_routes.clone(),
      offline_page: resolve(&origin, &config.cache.offline_page)?,
      sync_tag: config.sync.tag.clone(),
      sync_endpoint: resolve(&origin, &config.sync.endpoint)?,
      push: config.push.clone(),
      origin,
    })
  }

  /// Resolve a possibly relative URL against the site origin.
  pub fn resolve(&self, entry: &str) -> Result<Url> {
    resolve(&self.origin, entry)
  }
}

fn resolve(origin: &Url, entry: &str) -> Result<Url> {
  origin
    .join(entry)
    .map_err(|e| eyre!("Invalid URL {}: {}", entry, e))
}

#[derive(Debug)]
struct WorkerState {
  lifecycle: LifecycleState,
  skip_waiting: bool,
  clients_claimed: bool,
}

/// Offline cache manager for one cache generation.
pub struct OfflineWorker<S: CacheStore, F: Fetcher> {
  settings: WorkerSettings,
  router: Router,
  store: Arc<S>,
  fetcher: F,
  pending: Arc<dyn PendingStore>,
  notifier: Arc<dyn Notifier>,
  clients: broadcast::Sender<Broadcast>,
  state: Mutex<WorkerState>,
}

impl<S: CacheStore, F: Fetcher> OfflineWorker<S, F> {
  /// A freshly registered generation; nothing is intercepted until it is activated.
  pub fn new(settings: WorkerSettings, store: Arc<S>, fetcher: F) -> Self {
    let router = Router::for_settings(&settings);
    let (clients, _) = broadcast::channel(16);

    Self {
      settings,
      router,
      store,
      fetcher,
      pending: Arc::new(MemoryPendingStore::new()),
      notifier: Arc::new(LogNotifier),
      clients,
      state: Mutex::new(WorkerState {
        lifecycle: LifecycleState::Parsed,
        skip_waiting: false,
        clients_claimed: false,
      }),
    }
  }

  /// Pick up a generation installed and activated by an earlier process.
  ///
  /// The worker starts `Activated` if the store already holds this
  /// generation's static partition, `Parsed` otherwise.
  pub fn resume(settings: WorkerSettings, store: Arc<S>, fetcher: F) -> Result<Self> {
    let static_partition = settings.generation.partition(PartitionKind::Static);
    let installed = store.partitions()?.contains(&static_partition);

    let worker = Self::new(settings, store, fetcher);
    if installed {
      worker.update_state(|state| {
        state.lifecycle = LifecycleState::Activated;
        state.clients_claimed = true;
      })?;
    }
    Ok(worker)
  }

  /// Use a persistent queue for background sync.
  pub fn with_pending(mut self, pending: Arc<dyn PendingStore>) -> Self {
    self.pending = pending;
    self
  }

  /// Use a specific notification sink for push events.
  pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn settings(&self) -> &WorkerSettings {
    &self.settings
  }

  pub fn router(&self) -> &Router {
    &self.router
  }

  pub fn pending(&self) -> &Arc<dyn PendingStore> {
    &self.pending
  }

  /// Register a consumer for broadcasts.
  pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
    self.clients.subscribe()
  }

  pub fn lifecycle(&self) -> LifecycleState {
    self
      .state
      .lock()
      .map(|s| s.lifecycle)
      .unwrap_or(LifecycleState::Redundant)
  }

  /// Whether the waiting phase has been skipped.
  pub fn skip_waiting_requested(&self) -> bool {
    self.state.lock().map(|s| s.skip_waiting).unwrap_or(false)
  }

  /// Whether activation took control of open consumers.
  pub fn clients_claimed(&self) -> bool {
    self.state.lock().map(|s| s.clients_claimed).unwrap_or(false)
  }

  fn update_state<R>(&self, f: impl FnOnce(&mut WorkerState) -> R) -> Result<R> {
    let mut state = self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(f(&mut state))
  }

  /// Search the current generation's partitions for `key`.
  fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
    for partition in self.settings.generation.current() {
      if let Some(cached) = self.store.get(&partition, key)? {
        return Ok(Some(cached));
      }
    }
    Ok(None)
  }

  /// The offline document, if it made it into the cache.
  fn offline_fallback(&self) -> Result<Option<CachedResponse>> {
    self.lookup(&RequestKey::for_url(&self.settings.offline_page))
  }

  /// Send to every subscribed consumer; returns how many received it.
  fn broadcast(&self, message: Broadcast) -> usize {
    self.clients.send(message).unwrap_or(0)
  }
}
