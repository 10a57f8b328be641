use std::path::PathBuf;

use crate::lifecycle::DecisionPolicy;

/// Runtime settings, read from `CONSULTGRID_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    /// Compact the account log once this many of its frames have been
    /// superseded by later writes.
    pub compact_threshold: u64,
    pub decision_policy: DecisionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            metrics_port: None,
            compact_threshold: 1000,
            decision_policy: DecisionPolicy::Strict,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Unset or unparsable values fall back to the defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: var("CONSULTGRID_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            metrics_port: var("CONSULTGRID_METRICS_PORT").and_then(|s| s.parse().ok()),
            compact_threshold: var("CONSULTGRID_COMPACT_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compact_threshold),
            decision_policy: match var("CONSULTGRID_DECISION_POLICY").map(|s| s.parse::<DecisionPolicy>()) {
                Some(Ok(policy)) => policy,
                Some(Err(e)) => {
                    tracing::warn!("{e}, using {:?}", defaults.decision_policy);
                    defaults.decision_policy
                }
                None => defaults.decision_policy,
            },
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("accounts.wal")
    }

    pub fn blob_root(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(from_map(&[]), Config::default());
    }

    #[test]
    fn reads_every_variable() {
        let cfg = from_map(&[
            ("CONSULTGRID_DATA_DIR", "/var/lib/consultgrid"),
            ("CONSULTGRID_METRICS_PORT", "9100"),
            ("CONSULTGRID_COMPACT_THRESHOLD", "50"),
            ("CONSULTGRID_DECISION_POLICY", "Idempotent"),
        ]);
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/consultgrid"));
        assert_eq!(cfg.metrics_port, Some(9100));
        assert_eq!(cfg.compact_threshold, 50);
        assert_eq!(cfg.decision_policy, DecisionPolicy::Idempotent);
        assert_eq!(cfg.wal_path(), PathBuf::from("/var/lib/consultgrid/accounts.wal"));
    }

    #[test]
    fn garbage_falls_back() {
        let cfg = from_map(&[
            ("CONSULTGRID_METRICS_PORT", "http"),
            ("CONSULTGRID_COMPACT_THRESHOLD", "-1"),
            ("CONSULTGRID_DECISION_POLICY", "lenient"),
        ]);
        assert_eq!(cfg.metrics_port, None);
        assert_eq!(cfg.compact_threshold, 1000);
        assert_eq!(cfg.decision_policy, DecisionPolicy::Strict);
    }
}
