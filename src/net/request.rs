use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use sha2::{Digest, Sha256};
use url::Url;

/// What the consumer intends to do with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
  #[default]
  Other,
  Document,
  Image,
}

/// How the request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
  #[default]
  Cors,
  /// Full-page navigation
  Navigate,
}

/// An outgoing request as seen by the fetch interceptor.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub destination: Destination,
  pub mode: RequestMode,
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

impl Request {
  /// A plain GET.
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      destination: Destination::Other,
      mode: RequestMode::Cors,
      headers: Vec::new(),
      body: None,
    }
  }

  /// Parse `url` and build a GET for it.
  pub fn get_str(url: &str) -> Result<Self> {
    let url = Url::parse(url).map_err(|e| eyre!("Invalid URL {}: {}", url, e))?;
    Ok(Self::get(url))
  }

  /// A POST carrying a JSON body.
  pub fn post_json(url: Url, payload: &serde_json::Value) -> Result<Self> {
    let body =
      serde_json::to_vec(payload).map_err(|e| eyre!("Failed to serialize payload: {}", e))?;
    Ok(Self {
      method: Method::POST,
      url,
      destination: Destination::Other,
      mode: RequestMode::Cors,
      headers: vec![("Content-Type".to_string(), "application/json".to_string())],
      body: Some(body),
    })
  }

  /// Mark this request as a full-page navigation.
  pub fn navigate(mut self) -> Self {
    self.mode = RequestMode::Navigate;
    self.destination = Destination::Document;
    self
  }

  /// Mark this request as an image load.
  pub fn image(mut self) -> Self {
    self.destination = Destination::Image;
    self
  }

  pub fn is_navigation(&self) -> bool {
    self.mode == RequestMode::Navigate
  }

  /// Only safe retrievals over http(s) are intercepted.
  pub fn is_interceptable(&self) -> bool {
    self.method == Method::GET && matches!(self.url.scheme(), "http" | "https")
  }

  pub fn key(&self) -> RequestKey {
    RequestKey::new(&self.method, &self.url)
  }
}

/// Identity of a cached request: method plus absolute URL, fragment stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
  identity: String,
  hash: String,
}

impl RequestKey {
  pub fn new(method: &Method, url: &Url) -> Self {
    let mut url = url.clone();
    url.set_fragment(None);
    let identity = format!("{} {}", method.as_str(), url);

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Self { identity, hash }
  }

  /// Key for a GET of `url`.
  pub fn for_url(url: &Url) -> Self {
    Self::new(&Method::GET, url)
  }

  /// Human-readable identity, e.g. "GET https://host/path".
  pub fn identity(&self) -> &str {
    &self.identity
  }

  /// Hex digest used as the storage key.
  pub fn hash(&self) -> &str {
    &self.hash
  }
}
