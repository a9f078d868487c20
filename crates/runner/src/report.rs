//! Scenario report written to `OUTPUT_DIR`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const REPORT_FILE: &str = "shipcheck-report.json";

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmokeReport {
    pub namespace: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub passed: bool,
    pub steps: Vec<StepResult>,
}

impl SmokeReport {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            started_at: Utc::now(),
            finished_at: None,
            passed: true,
            steps: Vec::new(),
        }
    }

    /// Record the outcome of one step and hand the error back so the caller
    /// can stop at the first failure.
    pub fn step(&mut self, name: &str, result: anyhow::Result<String>) -> anyhow::Result<()> {
        match result {
            Ok(detail) => {
                tracing::info!(step = name, "Step passed");
                self.steps.push(StepResult {
                    name: name.to_string(),
                    passed: true,
                    detail,
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!(step = name, error = %format!("{e:#}"), "Step failed");
                self.passed = false;
                self.steps.push(StepResult {
                    name: name.to_string(),
                    passed: false,
                    detail: format!("{e:#}"),
                });
                Err(e.context(format!("step '{name}' failed")))
            }
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Write the report as pretty JSON into `dir`, creating it if needed.
    pub async fn write_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(REPORT_FILE);
        let body = serde_json::to_vec_pretty(self).context("serializing report")?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}
