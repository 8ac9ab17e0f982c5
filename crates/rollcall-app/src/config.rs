//! Cache configuration loaded from `.rollcall/cache.toml`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use time::Duration;

const CONFIG_DIR: &str = ".rollcall";
const CONFIG_FILE: &str = "cache.toml";

/// Score contributed by a check-in unless configured otherwise.
pub const DEFAULT_CHECKIN_SCORE: i64 = 100;

/// Where the cache layer runs.
///
/// A client always prefers a network round trip over cached partitions. A
/// server-rendering context trusts partitions until their TTL expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
    /// Interactive client.
    #[default]
    Client,
    /// Server-side rendering.
    Server,
}

/// Top-level cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Execution context driving the fetch policy.
    #[serde(default)]
    pub context: ExecutionContext,
    /// Partition lifetimes.
    #[serde(default)]
    pub ttl: TtlConfig,
    /// Score written by a check-in.
    #[serde(default = "default_checkin_score")]
    pub checkin_score: i64,
    /// Snapshot file for the durable stores.
    #[serde(default)]
    pub persist_path: Option<PathBuf>,
}

const fn default_checkin_score() -> i64 {
    DEFAULT_CHECKIN_SCORE
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            context: ExecutionContext::default(),
            ttl: TtlConfig::default(),
            checkin_score: DEFAULT_CHECKIN_SCORE,
            persist_path: None,
        }
    }
}

impl CacheConfig {
    /// Configuration for the given context with default lifetimes.
    #[must_use]
    pub fn for_context(context: ExecutionContext) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    /// Load `.rollcall/cache.toml` under `workdir`; defaults when absent.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed, or validated.
    pub fn from_workdir(workdir: impl AsRef<Path>) -> Result<Self> {
        Self::from_path(workdir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load an explicit config file; defaults when absent.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed, or validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.ttl.ensure_positive()?;
        if self.checkin_score <= 0 {
            bail!("checkin_score must be positive, got {}", self.checkin_score);
        }
        Ok(())
    }
}

/// Partition lifetimes in seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TtlConfig {
    /// Member partitions.
    #[serde(default = "default_members_secs")]
    pub members_secs: u64,
    /// Session partitions.
    #[serde(default = "default_sessions_secs")]
    pub sessions_secs: u64,
    /// History partitions.
    #[serde(default = "default_history_secs")]
    pub history_secs: u64,
}

const fn default_members_secs() -> u64 {
    180
}

const fn default_sessions_secs() -> u64 {
    300
}

const fn default_history_secs() -> u64 {
    300
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            members_secs: default_members_secs(),
            sessions_secs: default_sessions_secs(),
            history_secs: default_history_secs(),
        }
    }
}

impl TtlConfig {
    /// Lifetime of member partitions.
    #[must_use]
    pub fn members(&self) -> Duration {
        secs(self.members_secs)
    }

    /// Lifetime of session partitions.
    #[must_use]
    pub fn sessions(&self) -> Duration {
        secs(self.sessions_secs)
    }

    /// Lifetime of history partitions.
    #[must_use]
    pub fn history(&self) -> Duration {
        secs(self.history_secs)
    }

    fn ensure_positive(&self) -> Result<()> {
        for (name, value) in [
            ("members_secs", self.members_secs),
            ("sessions_secs", self.sessions_secs),
            ("history_secs", self.history_secs),
        ] {
            if value == 0 {
                bail!("ttl.{name} must be greater than zero");
            }
        }
        Ok(())
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(dir: &Path, body: &str) -> Result<()> {
        let cfg_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&cfg_dir)?;
        let mut file = fs::File::create(cfg_dir.join(CONFIG_FILE))?;
        writeln!(file, "{body}")?;
        Ok(())
    }

    #[test]
    fn missing_config_returns_defaults() -> Result<()> {
        let dir = tempdir()?;
        let cfg = CacheConfig::from_workdir(dir.path())?;
        assert_eq!(cfg.context, ExecutionContext::Client);
        assert_eq!(cfg.ttl.members(), Duration::minutes(3));
        assert_eq!(cfg.ttl.sessions(), Duration::minutes(5));
        assert_eq!(cfg.ttl.history(), Duration::minutes(5));
        assert_eq!(cfg.checkin_score, 100);
        assert!(cfg.persist_path.is_none());
        Ok(())
    }

    #[test]
    fn load_server_context_with_partial_ttl() -> Result<()> {
        let dir = tempdir()?;
        write_config(
            dir.path(),
            "context = \"server\"\npersist_path = \"state.json\"\n[ttl]\nmembers_secs = 60",
        )?;
        let cfg = CacheConfig::from_workdir(dir.path())?;
        assert_eq!(cfg.context, ExecutionContext::Server);
        assert_eq!(cfg.ttl.members(), Duration::minutes(1));
        assert_eq!(cfg.ttl.sessions(), Duration::minutes(5));
        assert_eq!(cfg.persist_path, Some(PathBuf::from("state.json")));
        Ok(())
    }

    #[test]
    fn zero_ttl_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "[ttl]\nhistory_secs = 0")?;
        let Err(err) = CacheConfig::from_workdir(dir.path()) else {
            panic!("zero ttl should error");
        };
        assert!(err.to_string().contains("ttl.history_secs"));
        Ok(())
    }

    #[test]
    fn non_positive_checkin_score_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "checkin_score = 0")?;
        let Err(err) = CacheConfig::from_workdir(dir.path()) else {
            panic!("zero score should error");
        };
        assert!(err.to_string().contains("checkin_score"));
        Ok(())
    }
}
