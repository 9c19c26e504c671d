//! Configuration for an enumeration run

use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::models::DirectoryAddress;
use crate::pool::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_WORKER_COUNT};

/// Traversal strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Strategy {
    /// Single-threaded depth-first walk
    Sequential,
    /// One concurrent task per directory node
    FanOut,
    /// Fixed pool of workers draining a shared queue
    WorkerPool {
        /// Number of worker threads
        workers: usize,
    },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::WorkerPool {
            workers: DEFAULT_WORKER_COUNT,
        }
    }
}

impl Strategy {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::FanOut => "fan-out",
            Strategy::WorkerPool { .. } => "worker-pool",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::WorkerPool { workers } => write!(f, "{} ({} workers)", self.as_str(), workers),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

/// Configuration for the scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Root directory to enumerate
    pub root: String,

    /// Whether to descend into subdirectories
    /// If false, only entries directly in the root are reported
    pub recursive: bool,

    /// Traversal strategy
    pub strategy: Strategy,

    /// Capacity of the worker-pool output channel
    pub channel_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            recursive: true,
            strategy: Strategy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ScanConfig {
    /// Create a new config for the given root
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Create a config builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::new()
    }

    /// Check the config and return the root address.
    ///
    /// Rejects an empty or whitespace root.
    pub fn validate(&self) -> Result<DirectoryAddress, ScanError> {
        if self.root.trim().is_empty() {
            return Err(ScanError::invalid_argument("Root path must not be empty"));
        }
        Ok(DirectoryAddress::new(self.root.as_str()))
    }

    /// Get the effective number of pool workers
    pub fn effective_workers(&self) -> usize {
        match self.strategy {
            Strategy::WorkerPool { workers } => workers.max(1),
            _ => 1,
        }
    }
}

/// Builder for ScanConfig
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directory
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Enable or disable recursive scanning
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.config.recursive = enabled;
        self
    }

    /// Set the traversal strategy
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Use the worker pool with `workers` threads
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.strategy = Strategy::WorkerPool { workers };
        self
    }

    /// Set the worker-pool output channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Build the config
    pub fn build(self) -> ScanConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanErrorKind;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert!(config.root.is_empty());
        assert!(config.recursive);
        assert_eq!(config.strategy, Strategy::WorkerPool { workers: 10 });
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .root("C:\\data\\")
            .recursive(false)
            .strategy(Strategy::FanOut)
            .channel_capacity(16)
            .build();

        assert_eq!(config.strategy, Strategy::FanOut);
        assert!(!config.recursive);
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.validate().unwrap().path(), "C:\\data");
    }

    #[test]
    fn test_validate_rejects_blank_root() {
        for root in ["", "   ", "\t"] {
            let err = ScanConfig::new(root).validate().unwrap_err();
            assert_eq!(err.kind, ScanErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_effective_workers() {
        let config = ScanConfig::builder().workers(0).build();
        assert_eq!(config.effective_workers(), 1);

        let config = ScanConfig::builder().workers(8).build();
        assert_eq!(config.effective_workers(), 8);

        let config = ScanConfig::builder().strategy(Strategy::Sequential).build();
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&Strategy::WorkerPool { workers: 4 }).unwrap();
        assert_eq!(json, r#"{"kind":"worker_pool","workers":4}"#);
        let back: Strategy = serde_json::from_str(r#"{"kind":"fan_out"}"#).unwrap();
        assert_eq!(back, Strategy::FanOut);
    }
}
