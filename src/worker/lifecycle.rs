//! Install and activate: bring a generation online and retire older ones.

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::fmt;
use tracing::{error, info};

use super::OfflineWorker;
use crate::cache::{CacheStore, PartitionKind};
use crate::net::{Fetcher, Request};

/// Lifecycle of one cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  /// Registered, install not started
  Parsed,
  /// Manifest being fetched
  Installing,
  /// Manifest stored, waiting to activate
  Installed,
  /// Pruning older generations
  Activating,
  /// Intercepting fetches
  Activated,
  /// Install failed; this generation never becomes active
  Redundant,
}

impl LifecycleState {
  pub fn can_intercept_fetch(&self) -> bool {
    matches!(self, LifecycleState::Activated)
  }
}

impl fmt::Display for LifecycleState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LifecycleState::Parsed => write!(f, "parsed"),
      LifecycleState::Installing => write!(f, "installing"),
      LifecycleState::Installed => write!(f, "installed"),
      LifecycleState::Activating => write!(f, "activating"),
      LifecycleState::Activated => write!(f, "activated"),
      LifecycleState::Redundant => write!(f, "redundant"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
  pub partition: String,
  pub cached: usize,
  /// Activate right away instead of waiting for consumers to close
  pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
  /// Older partitions of ours that were removed
  pub deleted: Vec<String>,
  /// Consumers now controlled by this generation
  pub claimed: usize,
}

impl<S: CacheStore, F: Fetcher> OfflineWorker<S, F> {
  /// Fetch the whole manifest and store it in the static partition as one batch.
  ///
  /// If any asset cannot be fetched (transport error or non-2xx) nothing is
  /// written, the generation becomes `Redundant`, and whatever generation was
  /// active before stays in control.
  pub async fn handle_install(&self) -> Result<InstallReport> {
    let partition = self.settings.generation.partition(PartitionKind::Static);
    self.update_state(|state| state.lifecycle = LifecycleState::Installing)?;
    info!(
      version = self.settings.generation.version(),
      assets = self.settings.manifest.len(),
      "Installing"
    );

    let fetches = self.settings.manifest.iter().map(|url| async move {
      let request = Request::get(url.clone());
      let response = self.fetcher.fetch(&request).await?;
      if !response.is_ok() {
        return Err(eyre!(
          "Manifest asset {} returned status {}",
          url,
          response.status
        ));
      }
      Ok::<_, color_eyre::Report>((request.key(), response))
    });

    let stored = match try_join_all(fetches).await {
      Ok(entries) => self.store.put_all(&partition, &entries).map(|_| entries.len()),
      Err(e) => Err(e),
    };

    let cached = match stored {
      Ok(cached) => cached,
      Err(e) => {
        error!(version = self.settings.generation.version(), "Install failed: {}", e);
        self.update_state(|state| state.lifecycle = LifecycleState::Redundant)?;
        return Err(eyre!("Install failed: {}", e));
      }
    };

    self.update_state(|state| {
      state.lifecycle = LifecycleState::Installed;
      state.skip_waiting = true;
    })?;
    info!(%partition, cached, "Installed");

    Ok(InstallReport {
      partition,
      cached,
      skip_waiting: true,
    })
  }

  /// Delete every partition of ours that is not current, then claim consumers.
  ///
  /// Only an `Installed` generation (or an already `Activated` one, which
  /// just prunes again) may activate. Partitions outside the naming scheme
  /// are never touched.
  pub async fn handle_activate(&self) -> Result<ActivateReport> {
    let previous = self.update_state(|state| {
      let previous = state.lifecycle;
      if matches!(previous, LifecycleState::Installed | LifecycleState::Activated) {
        state.lifecycle = LifecycleState::Activating;
      }
      previous
    })?;
    match previous {
      LifecycleState::Installed | LifecycleState::Activated => {}
      LifecycleState::Redundant => {
        return Err(eyre!(
          "Generation {} failed to install and cannot be activated",
          self.settings.generation.version()
        ));
      }
      other => {
        return Err(eyre!(
          "Generation {} is {} and must be installed before activation",
          self.settings.generation.version(),
          other
        ));
      }
    }
    info!(version = self.settings.generation.version(), "Activating");

    let mut deleted = Vec::new();
    for name in self.store.partitions()? {
      if !self.settings.generation.is_stale(&name) {
        continue;
      }
      info!(partition = %name, "Deleting old cache");
      if self.store.delete_partition(&name)? {
        deleted.push(name);
      }
    }

    self.update_state(|state| {
      state.lifecycle = LifecycleState::Activated;
      state.clients_claimed = true;
    })?;
    let claimed = self.clients.receiver_count();
    info!(deleted = deleted.len(), claimed, "Activated");

    Ok(ActivateReport { deleted, claimed })
  }
}
