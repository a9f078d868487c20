//! Runner configuration loaded from the calling process's environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable naming the cluster credentials file.
pub const KUBECONFIG_VAR: &str = "KUBECONFIG";

/// Environment variable holding the process search path.
pub const PATH_VAR: &str = "PATH";

/// Cluster client used when `CLUSTER_CLIENT` is not set.
pub const DEFAULT_CLIENT: &str = "oc";

/// Immutable settings shared by every runner and observer.
///
/// Child processes see exactly [`RunnerConfig::env`] and nothing else from
/// the parent environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Directory every command is started in.
    pub working_dir: PathBuf,
    /// Environment passed to child processes. Always holds `KUBECONFIG` and `PATH`.
    pub env: BTreeMap<String, String>,
    /// Cluster client program (`oc`, `kubectl`).
    pub client: String,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var             | Required | Default               |
    /// |---------------------|----------|-----------------------|
    /// | `KUBECONFIG`        | yes      | --                    |
    /// | `PATH`              | yes      | --                    |
    /// | `CLUSTER_CLIENT`    | no       | `oc`                  |
    /// | `SHIPCHECK_WORKDIR` | no       | current directory     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RunnerConfig::from_env`] but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kubeconfig = lookup(KUBECONFIG_VAR).ok_or(ConfigError::MissingVar(KUBECONFIG_VAR))?;
        let path = lookup(PATH_VAR).ok_or(ConfigError::MissingVar(PATH_VAR))?;

        let working_dir = match lookup("SHIPCHECK_WORKDIR") {
            Some(dir) => validate_dir(Path::new(&dir))?,
            None => std::env::current_dir().map_err(|source| ConfigError::InvalidWorkingDir {
                path: ".".to_string(),
                source,
            })?,
        };

        let client = lookup("CLUSTER_CLIENT")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT.to_string());

        let mut env = BTreeMap::new();
        env.insert(KUBECONFIG_VAR.to_string(), kubeconfig);
        env.insert(PATH_VAR.to_string(), path);

        Ok(Self {
            working_dir,
            env,
            client,
        })
    }

    /// Add or replace a child-process environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = client.into();
        self
    }
}

fn validate_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    let metadata = std::fs::metadata(dir).map_err(|source| ConfigError::InvalidWorkingDir {
        path: dir.display().to_string(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ConfigError::InvalidWorkingDir {
            path: dir.display().to_string(),
            source: std::io::Error::other("not a directory"),
        });
    }
    Ok(dir.to_path_buf())
}
