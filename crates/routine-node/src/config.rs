//! Node configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Runtime configuration of the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Listen address.
    pub addr: SocketAddr,

    /// Title used when a compile request carries none.
    pub default_title: String,

    /// Runs kept in memory; the oldest is evicted beyond this.
    pub max_runs: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            default_title: "Generated Template".to_string(),
            max_runs: 256,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `ROUTINE_ADDR`, `ROUTINE_DEFAULT_TITLE` and
    /// `ROUTINE_MAX_RUNS`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("ROUTINE_ADDR") {
            match v.trim().parse::<SocketAddr>() {
                Ok(addr) => cfg.addr = addr,
                Err(_) => warn!(value = %v, "Ignoring invalid ROUTINE_ADDR"),
            }
        }
        if let Ok(v) = std::env::var("ROUTINE_DEFAULT_TITLE") {
            if !v.trim().is_empty() {
                cfg.default_title = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("ROUTINE_MAX_RUNS") {
            match v.trim().parse::<usize>() {
                Ok(n) => cfg.max_runs = n.max(1),
                Err(_) => warn!(value = %v, "Ignoring invalid ROUTINE_MAX_RUNS"),
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.addr.port(), 3000);
        assert_eq!(cfg.max_runs, 256);
    }
}
