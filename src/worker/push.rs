//! Push messages rendered as notifications.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::OfflineWorker;
use crate::cache::CacheStore;
use crate::net::Fetcher;

/// JSON body of a push message. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
  pub title: Option<String>,
  pub body: Option<String>,
  pub tag: Option<String>,
  pub url: Option<String>,
}

impl PushPayload {
  /// Parse raw push data. Missing or malformed data yields an empty payload.
  pub fn parse(data: Option<&[u8]>) -> Self {
    let Some(bytes) = data else {
      return Self::default();
    };
    serde_json::from_slice(bytes).unwrap_or_else(|e| {
      warn!("Malformed push payload: {}", e);
      Self::default()
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
  pub action: String,
  pub title: String,
  pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub tag: String,
  /// URL opened by the "open" action
  pub data: String,
  pub actions: Vec<NotificationAction>,
}

/// Platform notification sink.
pub trait Notifier: Send + Sync {
  fn show(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn show(&self, notification: &Notification) -> Result<()> {
    info!(
      title = %notification.title,
      body = %notification.body,
      tag = %notification.tag,
      url = %notification.data,
      "Notification"
    );
    Ok(())
  }
}

impl<S: CacheStore, F: Fetcher> OfflineWorker<S, F> {
  /// Build a notification from push data and hand it to the notifier.
  pub async fn handle_push(&self, data: Option<&[u8]>) -> Result<Notification> {
    info!("Push received");
    let payload = PushPayload::parse(data);
    let push = &self.settings.push;

    let notification = Notification {
      title: payload.title.unwrap_or_else(|| push.default_title.clone()),
      body: payload.body.unwrap_or_else(|| push.default_body.clone()),
      icon: push.icon.clone(),
      badge: push.badge.clone(),
      tag: payload.tag.unwrap_or_else(|| "default".to_string()),
      data: payload.url.unwrap_or_else(|| "/".to_string()),
      actions: vec![
        NotificationAction {
          action: "open".to_string(),
          title: "View".to_string(),
          icon: "/assets/icons/action-view.png".to_string(),
        },
        NotificationAction {
          action: "close".to_string(),
          title: "Close".to_string(),
          icon: "/assets/icons/action-close.png".to_string(),
        },
      ],
    };

    self.notifier.show(&notification)?;
    Ok(notification)
  }

  /// The notification is closed either way; "open" also yields the URL to navigate to.
  pub fn handle_notification_click(
    &self,
    action: Option<&str>,
    notification: &Notification,
  ) -> Option<String> {
    match action {
      Some("open") => Some(notification.data.clone()),
      _ => None,
    }
  }
}
