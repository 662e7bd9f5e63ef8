use std::path::PathBuf;
use std::time::Duration;

use crate::session::RetryPolicy;

pub const STATE_PATH_VAR: &str = "FLEETMX_STATE_PATH";
pub const SAVE_ATTEMPTS_VAR: &str = "FLEETMX_SAVE_ATTEMPTS";
pub const SAVE_RETRY_DELAY_VAR: &str = "FLEETMX_SAVE_RETRY_DELAY_MS";

const DEFAULT_STATE_PATH: &str = "state/maintenance_data.json";
const DEFAULT_SAVE_ATTEMPTS: u32 = 3;
const DEFAULT_SAVE_RETRY_DELAY_MS: u64 = 800;

/// Where state lives and how hard to try when saving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub state_path: PathBuf,
    pub save_attempts: u32,
    pub save_retry_delay: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            save_attempts: DEFAULT_SAVE_ATTEMPTS,
            save_retry_delay: Duration::from_millis(DEFAULT_SAVE_RETRY_DELAY_MS),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys use defaults; unparsable ones
    /// are logged and use defaults too.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let state_path = lookup(STATE_PATH_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.state_path);

        let save_attempts = parse_or(&lookup, SAVE_ATTEMPTS_VAR, DEFAULT_SAVE_ATTEMPTS)
            .max(1);
        let delay_ms = parse_or(&lookup, SAVE_RETRY_DELAY_VAR, DEFAULT_SAVE_RETRY_DELAY_MS);

        Self {
            state_path,
            save_attempts,
            save_retry_delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.save_attempts, self.save_retry_delay)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "invalid setting; using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = StoreConfig::from_lookup(lookup_from(&[]));
        assert_eq!(cfg, StoreConfig::default());
        assert_eq!(cfg.state_path, PathBuf::from("state/maintenance_data.json"));
        assert_eq!(cfg.retry_policy().max_attempts, 3);
        assert_eq!(cfg.retry_policy().delay, Duration::from_millis(800));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = StoreConfig::from_lookup(lookup_from(&[
            (STATE_PATH_VAR, "/tmp/fleet.json"),
            (SAVE_ATTEMPTS_VAR, "5"),
            (SAVE_RETRY_DELAY_VAR, " 10 "),
        ]));
        assert_eq!(cfg.state_path, PathBuf::from("/tmp/fleet.json"));
        assert_eq!(cfg.save_attempts, 5);
        assert_eq!(cfg.save_retry_delay, Duration::from_millis(10));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let cfg = StoreConfig::from_lookup(lookup_from(&[
            (SAVE_ATTEMPTS_VAR, "many"),
            (SAVE_RETRY_DELAY_VAR, "-1"),
        ]));
        assert_eq!(cfg.save_attempts, 3);
        assert_eq!(cfg.save_retry_delay, Duration::from_millis(800));

        let zero = StoreConfig::from_lookup(lookup_from(&[(SAVE_ATTEMPTS_VAR, "0")]));
        assert_eq!(zero.save_attempts, 1);
    }
}
