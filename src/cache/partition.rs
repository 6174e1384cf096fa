//! Partition naming for a cache generation.

/// The three partition categories a generation owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
  /// Install-time manifest and cache-first assets
  Static,
  /// Network-first responses and `CACHE_URLS` additions
  Dynamic,
  /// Cache-first images
  Images,
}

impl PartitionKind {
  pub const ALL: [PartitionKind; 3] = [
    PartitionKind::Static,
    PartitionKind::Dynamic,
    PartitionKind::Images,
  ];

  fn suffix(&self) -> &'static str {
    match self {
      PartitionKind::Static => "static",
      PartitionKind::Dynamic => "dynamic",
      PartitionKind::Images => "images",
    }
  }
}

/// A cache generation: the version token plus the prefix that marks partitions as ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
  prefix: String,
  version: String,
}

impl Generation {
  pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      prefix: prefix.into(),
      version: version.into(),
    }
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  /// e.g. "freightflow-v1.0.0-static"
  pub fn partition(&self, kind: PartitionKind) -> String {
    format!("{}-{}", self.version, kind.suffix())
  }

  /// Current partition names, in lookup order.
  pub fn current(&self) -> Vec<String> {
    PartitionKind::ALL
      .iter()
      .map(|kind| self.partition(*kind))
      .collect()
  }

  /// Whether `name` follows this manager's naming scheme (any generation).
  pub fn owns(&self, name: &str) -> bool {
    name.starts_with(&self.prefix)
  }

  /// Whether `name` is one of this generation's partitions.
  pub fn is_current(&self, name: &str) -> bool {
    PartitionKind::ALL
      .iter()
      .any(|kind| self.partition(*kind) == name)
  }

  /// Ours, but from another generation.
  pub fn is_stale(&self, name: &str) -> bool {
    self.owns(name) && !self.is_current(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn generation() -> Generation {
    Generation::new("freightflow-", "freightflow-v1.0.0")
  }

  #[test]
  fn test_partition_names() {
    let gen = generation();
    assert_eq!(
      gen.current(),
      vec![
        "freightflow-v1.0.0-static",
        "freightflow-v1.0.0-dynamic",
        "freightflow-v1.0.0-images",
      ]
    );
  }

  #[test]
  fn test_stale_detection() {
    let gen = generation();
    assert!(gen.is_stale("freightflow-v0.9.0-static"));
    assert!(gen.is_stale("freightflow-scratch"));
    assert!(!gen.is_stale("freightflow-v1.0.0-images"));
    assert!(!gen.is_stale("workbox-precache-v2"));
    assert!(!gen.owns("other-app-v1-static"));
  }
}
