//! The Tekton + Shipwright install scenario, one step after another.

use anyhow::{anyhow, bail, Context};
use shipcheck_core::{CommandRunner, Project, ResourceObserver, WaitFor};

use crate::config::SmokeConfig;
use crate::report::SmokeReport;

const TEKTON_NAMESPACE: &str = "tekton-pipelines";
const TEKTON_DEPLOYMENTS: [&str; 2] = ["tekton-pipelines-controller", "tekton-pipelines-webhook"];

const SHIPWRIGHT_NAMESPACE: &str = "shipwright-build";
const SHIPWRIGHT_CONTROLLER: &str = "shipwright-build-controller";

/// Objects the Shipwright release manifest must create, with the namespace
/// to look in for namespaced kinds.
const SHIPWRIGHT_RESOURCES: [(&str, Option<&str>); 11] = [
    ("namespace/shipwright-build", None),
    (
        "role.rbac.authorization.k8s.io/shipwright-build-controller",
        Some(SHIPWRIGHT_NAMESPACE),
    ),
    (
        "clusterrole.rbac.authorization.k8s.io/shipwright-build-controller",
        None,
    ),
    (
        "clusterrolebinding.rbac.authorization.k8s.io/shipwright-build-controller",
        None,
    ),
    (
        "rolebinding.rbac.authorization.k8s.io/shipwright-build-controller",
        Some(SHIPWRIGHT_NAMESPACE),
    ),
    (
        "serviceaccount/shipwright-build-controller",
        Some(SHIPWRIGHT_NAMESPACE),
    ),
    (
        "deployment.apps/shipwright-build-controller",
        Some(SHIPWRIGHT_NAMESPACE),
    ),
    (
        "customresourcedefinition.apiextensions.k8s.io/buildruns.shipwright.io",
        None,
    ),
    (
        "customresourcedefinition.apiextensions.k8s.io/builds.shipwright.io",
        None,
    ),
    (
        "customresourcedefinition.apiextensions.k8s.io/buildstrategies.shipwright.io",
        None,
    ),
    (
        "customresourcedefinition.apiextensions.k8s.io/clusterbuildstrategies.shipwright.io",
        None,
    ),
];

pub struct InstallScenario<'a, R> {
    observer: &'a ResourceObserver<R>,
    config: &'a SmokeConfig,
}

impl<'a, R: CommandRunner> InstallScenario<'a, R> {
    pub fn new(observer: &'a ResourceObserver<R>, config: &'a SmokeConfig) -> Self {
        Self { observer, config }
    }

    /// Run every step, stopping at the first failure.
    pub async fn run(&self) -> SmokeReport {
        let mut report = SmokeReport::new(&self.config.namespace);
        if let Err(e) = self.run_steps(&mut report).await {
            tracing::error!(error = %format!("{e:#}"), "Install scenario stopped");
        }
        report.finish()
    }

    async fn run_steps(&self, report: &mut SmokeReport) -> anyhow::Result<()> {
        report.step("cluster is reachable", self.check_connectivity().await)?;
        report.step("project is used", self.use_project().await)?;

        report.step(
            "tekton is installed",
            self.apply(&self.config.tekton_manifest).await,
        )?;
        for deployment in TEKTON_DEPLOYMENTS {
            report.step(
                &format!("{deployment} is available"),
                self.wait_available(deployment, TEKTON_NAMESPACE).await,
            )?;
        }

        report.step(
            "shipwright deployment is installed",
            self.apply(&self.config.shipwright_manifest).await,
        )?;
        for (resource, namespace) in SHIPWRIGHT_RESOURCES {
            report.step(
                &format!("{resource} is created"),
                self.resource_exists(resource, namespace).await,
            )?;
        }

        report.step(
            "shipwright-build-controller deployment is available",
            self.wait_available(SHIPWRIGHT_CONTROLLER, SHIPWRIGHT_NAMESPACE)
                .await,
        )?;
        report.step(
            "shipwright-build-controller pod is running",
            self.pod_running(SHIPWRIGHT_CONTROLLER, SHIPWRIGHT_NAMESPACE)
                .await,
        )?;

        report.step(
            "shipwright strategies are installed",
            self.apply(&self.config.strategies_manifest).await,
        )?;
        report.step(
            "cluster build strategies are listed",
            self.cluster_build_strategies().await,
        )?;
        Ok(())
    }

    async fn check_connectivity(&self) -> anyhow::Result<String> {
        if self.observer.is_resource_in("project/default").await {
            Ok("connected to cluster".to_string())
        } else {
            bail!("cannot read project/default; check KUBECONFIG and cluster login")
        }
    }

    async fn use_project(&self) -> anyhow::Result<String> {
        let project = Project::new(&self.config.namespace, self.observer.runner());
        if project.is_present().await {
            return Ok(format!("project {} already present", project.name()));
        }

        tracing::info!(project = %project.name(), "Project is not present, creating it");
        if project.create().await {
            Ok(format!("project {} created", project.name()))
        } else {
            bail!("project {} could not be created", project.name())
        }
    }

    async fn apply(&self, manifest: &str) -> anyhow::Result<String> {
        self.observer
            .apply(manifest)
            .await
            .ok_or_else(|| anyhow!("applying {manifest} failed"))
    }

    async fn wait_available(&self, deployment: &str, namespace: &str) -> anyhow::Result<String> {
        let wait = WaitFor::new("deployment", deployment)
            .in_namespace(namespace)
            .timeout_seconds(self.config.wait_timeout_secs);
        let result = self.observer.wait_for(&wait).await;
        if result.success() {
            Ok(result.output.trim().to_string())
        } else {
            bail!(
                "deployment {deployment} not available (exit {}): {}",
                result.exit_code,
                result.output.trim()
            )
        }
    }

    async fn resource_exists(
        &self,
        resource: &str,
        namespace: Option<&str>,
    ) -> anyhow::Result<String> {
        let present = match namespace {
            Some(ns) => self.observer.is_resource_in_namespace(resource, ns).await,
            None => self.observer.is_resource_in(resource).await,
        };
        if present {
            Ok(format!("{resource} found"))
        } else {
            bail!("{resource} not found")
        }
    }

    async fn pod_running(&self, name_prefix: &str, namespace: &str) -> anyhow::Result<String> {
        let pod = self
            .observer
            .wait_for_pod(name_prefix, namespace)
            .await
            .context("listing pods")?
            .ok_or_else(|| anyhow!("no pod matching {name_prefix} in {namespace}"))?;

        if self
            .observer
            .check_pod_status(&pod, namespace, "Running")
            .await
        {
            Ok(format!("pod {pod} is Running"))
        } else {
            bail!("pod {pod} is not Running")
        }
    }

    async fn cluster_build_strategies(&self) -> anyhow::Result<String> {
        let list = self
            .observer
            .get_cluster_resource_list("cbs")
            .await
            .context("listing cluster build strategies")?;
        if list.trim().is_empty() {
            bail!("no cluster build strategies installed")
        }
        Ok(list)
    }
}
