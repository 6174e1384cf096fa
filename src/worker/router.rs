//! Request classification: an ordered list of (matcher, strategy) routes.

use std::collections::HashSet;
use std::fmt;
use url::Url;

use super::WorkerSettings;
use crate::net::{Destination, Request};

/// Retrieval policy for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Cache, then network; new responses go to the static partition
  CacheFirst,
  /// Network, then cache; new responses go to the dynamic partition
  NetworkFirst,
  /// Like `CacheFirst` but uses the image partition and degrades to a 404
  CacheFirstImages,
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Strategy::CacheFirst => write!(f, "cache-first"),
      Strategy::NetworkFirst => write!(f, "network-first"),
      Strategy::CacheFirstImages => write!(f, "cache-first-images"),
    }
  }
}

/// Predicate half of a route.
#[derive(Debug, Clone)]
pub enum Matcher {
  /// URL (fragment stripped) is one of these exactly
  Exact(HashSet<String>),
  /// URL path starts with any of these
  PathPrefix(Vec<String>),
  /// Request destination equals this
  Destination(Destination),
}

impl Matcher {
  pub fn matches(&self, request: &Request) -> bool {
    match self {
      Matcher::Exact(urls) => urls.contains(&normalize(&request.url)),
      Matcher::PathPrefix(prefixes) => {
        let path = request.url.path();
        prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
      }
      Matcher::Destination(destination) => request.destination == *destination,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Route {
  pub name: &'static str,
  pub matcher: Matcher,
  pub strategy: Strategy,
}

/// Routes are evaluated in order; the first match wins, otherwise the fallback applies.
#[derive(Debug, Clone)]
pub struct Router {
  routes: Vec<Route>,
  fallback: Strategy,
}

impl Router {
  pub fn new(routes: Vec<Route>, fallback: Strategy) -> Self {
    Self { routes, fallback }
  }

  /// Static manifest, then API routes, then images; network-first for the rest.
  pub fn for_settings(settings: &WorkerSettings) -> Self {
    let manifest = settings.manifest.iter().map(normalize).collect();

    Self::new(
      vec![
        Route {
          name: "static-manifest",
          matcher: Matcher::Exact(manifest),
          strategy: Strategy::CacheFirst,
        },
        Route {
          name: "api",
          matcher: Matcher::PathPrefix(settings.api_routes.clone()),
          strategy: Strategy::NetworkFirst,
        },
        Route {
          name: "images",
          matcher: Matcher::Destination(Destination::Image),
          strategy: Strategy::CacheFirstImages,
        },
      ],
      Strategy::NetworkFirst,
    )
  }

  pub fn routes(&self) -> &[Route] {
    &self.routes
  }

  /// Route name (or "default") and strategy for a request.
  pub fn classify(&self, request: &Request) -> (&'static str, Strategy) {
    self
      .routes
      .iter()
      .find(|route| route.matcher.matches(request))
      .map(|route| (route.name, route.strategy))
      .unwrap_or(("default", self.fallback))
  }
}

fn normalize(url: &Url) -> String {
  let mut url = url.clone();
  url.set_fragment(None);
  url.to_string()
}
