use serde::{Deserialize, Serialize};

/// A stored or freshly fetched response: status, headers and the full body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
  pub status: u16,
  pub status_text: String,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl ResponseSnapshot {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      status_text: String::new(),
      headers: Vec::new(),
      body: body.into(),
    }
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }

  pub fn with_status_text(mut self, text: &str) -> Self {
    self.status_text = text.to_string();
    self
  }

  /// 2xx
  pub fn is_ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Case-insensitive header lookup.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  /// Returned when network-first has neither network nor cache for a non-navigation.
  pub fn network_error() -> Self {
    Self::new(408, "Network error")
      .with_status_text("Request Timeout")
      .with_header("Content-Type", "text/plain")
  }

  /// Returned when an image is neither cached nor fetchable.
  pub fn image_not_found() -> Self {
    Self::new(404, Vec::new()).with_status_text("Image not found")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_synthetic_responses() {
    let timeout = ResponseSnapshot::network_error();
    assert_eq!(timeout.status, 408);
    assert!(!timeout.is_ok());
    assert_eq!(timeout.header("content-type"), Some("text/plain"));
    assert_eq!(timeout.body, b"Network error");

    let missing = ResponseSnapshot::image_not_found();
    assert_eq!(missing.status, 404);
    assert!(missing.body.is_empty());
  }

  #[test]
  fn test_is_ok_range() {
    assert!(ResponseSnapshot::new(200, "").is_ok());
    assert!(ResponseSnapshot::new(204, "").is_ok());
    assert!(!ResponseSnapshot::new(304, "").is_ok());
    assert!(!ResponseSnapshot::new(500, "").is_ok());
  }
}
