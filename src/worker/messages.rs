//! Consumer messages in, broadcasts out.

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::lifecycle::LifecycleState;
use super::OfflineWorker;
use crate::cache::{CacheStore, PartitionKind};
use crate::net::{Fetcher, Request};

/// Messages a consumer can post to the cache manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
  /// Activate a waiting generation now
  SkipWaiting,
  /// Add these URLs to the dynamic partition
  CacheUrls {
    #[serde(default)]
    urls: Vec<String>,
  },
}

impl ClientMessage {
  /// Parse a posted message; anything unrecognized is `None`.
  pub fn parse(data: &serde_json::Value) -> Option<Self> {
    serde_json::from_value(data.clone()).ok()
  }
}

/// Messages the cache manager sends to every consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Broadcast {
  SyncComplete { message: String },
}

impl<S: CacheStore, F: Fetcher> OfflineWorker<S, F> {
  /// Handle a message posted by a consumer. Unknown messages are ignored.
  pub async fn handle_message(&self, data: &serde_json::Value) -> Result<()> {
    let Some(message) = ClientMessage::parse(data) else {
      debug!(%data, "Ignoring unrecognized message");
      return Ok(());
    };

    match message {
      ClientMessage::SkipWaiting => {
        let waiting = self.update_state(|state| {
          state.skip_waiting = true;
          state.lifecycle == LifecycleState::Installed
        })?;
        info!(waiting, "Skip waiting requested");
        if waiting {
          self.handle_activate().await?;
        }
        Ok(())
      }
      ClientMessage::CacheUrls { urls } => self.cache_urls(&urls).await,
    }
  }

  /// Fetch every URL and store them in the dynamic partition as one batch.
  async fn cache_urls(&self, urls: &[String]) -> Result<()> {
    let partition = self.settings.generation.partition(PartitionKind::Dynamic);
    let requests = urls
      .iter()
      .map(|url| self.settings.resolve(url).map(Request::get))
      .collect::<Result<Vec<_>>>()?;

    let fetches = requests.iter().map(|request| async move {
      let response = self.fetcher.fetch(request).await?;
      if !response.is_ok() {
        return Err(eyre!("{} returned status {}", request.url, response.status));
      }
      Ok::<_, color_eyre::Report>((request.key(), response))
    });
    let entries = try_join_all(fetches).await?;

    self.store.put_all(&partition, &entries)?;
    info!(%partition, count = entries.len(), "Cached requested URLs");
    Ok(())
  }
}
