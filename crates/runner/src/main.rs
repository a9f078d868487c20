//! `shipcheck` -- install smoke check for Tekton + Shipwright.
//!
//! Drives the cluster client through the install scenario and exits
//! non-zero when any step fails.
//!
//! # Environment variables
//!
//! | Variable         | Required | Default            | Description                          |
//! |------------------|----------|--------------------|--------------------------------------|
//! | `KUBECONFIG`     | yes      | --                 | Cluster credentials file             |
//! | `PATH`           | yes      | --                 | Search path for the cluster client   |
//! | `CLUSTER_CLIENT` | no       | `oc`               | Cluster client program               |
//! | `TEST_NAMESPACE` | no       | `shipwright-smoke` | Project the scenario runs in         |
//! | `OUTPUT_DIR`     | no       | --                 | Where `shipcheck-report.json` goes   |
//!
//! See [`config::SmokeConfig::from_env`] for the manifest overrides.

mod config;
mod report;
mod scenario;

use shipcheck_core::{ResourceObserver, SystemRunner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::SmokeConfig;
use crate::scenario::InstallScenario;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shipcheck=info,shipcheck_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runner = SystemRunner::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid runner configuration");
        std::process::exit(2);
    });

    let config = SmokeConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %format!("{e:#}"), "Invalid smoke configuration");
        std::process::exit(2);
    });

    tracing::info!(
        client = %runner.config().client,
        namespace = %config.namespace,
        working_dir = %runner.config().working_dir.display(),
        "Starting install smoke check",
    );

    let observer = ResourceObserver::new(runner);
    let report = InstallScenario::new(&observer, &config).run().await;

    if let Some(dir) = &config.output_dir {
        match report.write_to(dir).await {
            Ok(path) => tracing::info!(path = %path.display(), "Report written"),
            Err(e) => tracing::error!(error = %format!("{e:#}"), "Failed to write report"),
        }
    }

    let passed_steps = report.steps.iter().filter(|s| s.passed).count();
    if report.passed {
        tracing::info!(steps = passed_steps, "Install smoke check passed");
    } else {
        tracing::error!(
            passed = passed_steps,
            total = report.steps.len(),
            "Install smoke check failed",
        );
        std::process::exit(1);
    }
}
