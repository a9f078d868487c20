use std::path::PathBuf;

use anyhow::Context;

const DEFAULT_NAMESPACE: &str = "shipwright-smoke";

const DEFAULT_TEKTON_MANIFEST: &str =
    "https://storage.googleapis.com/tekton-releases/pipeline/previous/v0.30.0/release.yaml";

const DEFAULT_SHIPWRIGHT_MANIFEST: &str =
    "https://github.com/shipwright-io/build/releases/download/v0.6.0/release.yaml";

const DEFAULT_STRATEGIES_MANIFEST: &str =
    "https://github.com/shipwright-io/build/releases/download/v0.6.0/sample-strategies.yaml";

/// Settings for the install smoke scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// Project the scenario runs in (created when missing).
    pub namespace: String,
    /// Directory the JSON report is written to, if any.
    pub output_dir: Option<PathBuf>,
    pub tekton_manifest: String,
    pub shipwright_manifest: String,
    pub strategies_manifest: String,
    /// Timeout handed to client-side `wait` calls.
    pub wait_timeout_secs: u64,
}

impl SmokeConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                         |
    /// |-----------------------------|---------------------------------|
    /// | `TEST_NAMESPACE`            | `shipwright-smoke`              |
    /// | `OUTPUT_DIR`                | unset (no report file)          |
    /// | `TEKTON_MANIFEST_URL`       | Tekton Pipelines v0.30.0        |
    /// | `SHIPWRIGHT_MANIFEST_URL`   | Shipwright Build v0.6.0         |
    /// | `SHIPWRIGHT_STRATEGIES_URL` | Shipwright v0.6.0 strategies    |
    /// | `WAIT_TIMEOUT_SECS`         | `300`                           |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let wait_timeout_secs = match non_empty("WAIT_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("WAIT_TIMEOUT_SECS must be a valid u64, got {v:?}"))?,
            None => 300,
        };

        Ok(Self {
            namespace: non_empty("TEST_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.into()),
            output_dir: non_empty("OUTPUT_DIR").map(PathBuf::from),
            tekton_manifest: non_empty("TEKTON_MANIFEST_URL")
                .unwrap_or_else(|| DEFAULT_TEKTON_MANIFEST.into()),
            shipwright_manifest: non_empty("SHIPWRIGHT_MANIFEST_URL")
                .unwrap_or_else(|| DEFAULT_SHIPWRIGHT_MANIFEST.into()),
            strategies_manifest: non_empty("SHIPWRIGHT_STRATEGIES_URL")
                .unwrap_or_else(|| DEFAULT_STRATEGIES_MANIFEST.into()),
            wait_timeout_secs,
        })
    }
}
