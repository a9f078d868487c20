//! Typed queries, mutations and waits against cluster resources.
//!
//! Every operation builds a [`ClusterCommand`] and hands it to a
//! [`CommandRunner`]. Results follow one contract per category:
//!
//! - read queries return `Result`; a non-zero exit is
//!   [`ObserverError::CommandFailed`],
//! - mutations return `Option<String>`; a non-zero exit is `None`,
//! - waits return `bool` or the raw [`CommandOutput`] and never fail.

use std::time::Duration;

use regex::Regex;

use crate::command::{ClusterCommand, CommandOutput};
use crate::error::ObserverError;
use crate::poll::{self, PollSpec, RetryPolicy, WaitFor};
use crate::runner::CommandRunner;

/// Pause after changing a workload's environment so the rollout can start.
const SET_ENV_SETTLE: Duration = Duration::from_secs(3);

/// Poll settings for deployment condition checks.
const DEPLOYMENT_POLL: PollSpec = PollSpec::from_secs(5, 300);

/// Poll settings for [`ResourceObserver::wait_for_pod`].
const POD_SEARCH_POLL: PollSpec = PollSpec::from_secs(5, 60);

/// Timeout handed to the client for deployment config waits.
const DEPLOYMENT_CONFIG_WAIT_SECS: u64 = 300;

/// Label selecting the Jenkins master pod.
const JENKINS_MASTER_SELECTOR: &str = "deploymentconfig=jenkins";

const ITEM_NAMES: &str = "{.items[*].metadata.name}";

/// Wraps a [`CommandRunner`] with cluster-resource semantics.
#[derive(Debug, Clone)]
pub struct ResourceObserver<R> {
    runner: R,
    retry: RetryPolicy,
    status_poll: PollSpec,
}

impl<R: CommandRunner> ResourceObserver<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            retry: RetryPolicy::default(),
            status_poll: PollSpec::default(),
        }
    }

    /// Override the retry policy used when a read asks for retries.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the poll settings used by [`ResourceObserver::check_pod_status`].
    pub fn with_status_poll(mut self, spec: PollSpec) -> Self {
        self.status_poll = spec;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn client(&self) -> ClusterCommand {
        ClusterCommand::new(self.runner.client())
    }

    // -----------------------------------------------------------------------
    // Read queries
    // -----------------------------------------------------------------------

    /// Run a read query; a non-zero exit becomes an error.
    async fn query(&self, command: ClusterCommand) -> Result<String, ObserverError> {
        let result = self.runner.run(&command, None).await;
        ensure_success(&command, result)
    }

    /// Space-separated names of all `resource_plural` in `namespace`.
    pub async fn get_resource_list(
        &self,
        resource_plural: &str,
        namespace: &str,
    ) -> Result<String, ObserverError> {
        let cmd = self
            .client()
            .arg("get")
            .arg(resource_plural)
            .namespace(namespace)
            .jsonpath(ITEM_NAMES);
        self.query(cmd).await
    }

    /// Space-separated names of a cluster-scoped resource kind.
    pub async fn get_cluster_resource_list(
        &self,
        resource_plural: &str,
    ) -> Result<String, ObserverError> {
        let cmd = self.client().arg("get").arg(resource_plural).jsonpath(ITEM_NAMES);
        self.query(cmd).await
    }

    pub async fn get_pod_list(&self, namespace: &str) -> Result<String, ObserverError> {
        self.get_resource_list("pods", namespace).await
    }

    /// Tabular `get <kind> -n <namespace>` output.
    async fn get_table(&self, kind: &str, namespace: &str) -> Result<String, ObserverError> {
        self.query(self.client().arg("get").arg(kind).namespace(namespace))
            .await
    }

    pub async fn get_configmap(&self, namespace: &str) -> Result<String, ObserverError> {
        self.get_table("cm", namespace).await
    }

    pub async fn get_deployment_config(&self, namespace: &str) -> Result<String, ObserverError> {
        self.get_table("dc", namespace).await
    }

    pub async fn get_service(&self, namespace: &str) -> Result<String, ObserverError> {
        self.get_table("svc", namespace).await
    }

    pub async fn get_service_account(&self, namespace: &str) -> Result<String, ObserverError> {
        self.get_table("sa", namespace).await
    }

    pub async fn get_role_binding(&self, namespace: &str) -> Result<String, ObserverError> {
        self.get_table("rolebinding", namespace).await
    }

    pub async fn get_route(&self, name: &str, namespace: &str) -> Result<String, ObserverError> {
        self.query(self.client().args(["get", "route", name]).namespace(namespace))
            .await
    }

    pub async fn get_route_host(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<String, ObserverError> {
        let cmd = self
            .client()
            .args(["get", "route", name])
            .namespace(namespace)
            .jsonpath("{.status.ingress[0].host}");
        self.query(cmd).await
    }

    pub async fn get_deployment_env_info(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<String, ObserverError> {
        let cmd = self
            .client()
            .args(["get", "deploy", name])
            .namespace(namespace)
            .jsonpath("{.spec.template.spec.containers[0].env}");
        self.query(cmd).await
    }

    pub async fn get_deployment_env_from_info(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<String, ObserverError> {
        let cmd = self
            .client()
            .args(["get", "deploy", name])
            .namespace(namespace)
            .jsonpath("{.spec.template.spec.containers[0].envFrom}");
        self.query(cmd).await
    }

    /// Whether `get <resource>` succeeds. `resource` may be `kind` or `kind/name`.
    pub async fn is_resource_in(&self, resource: &str) -> bool {
        self.runner
            .run(&self.client().arg("get").arg(resource), None)
            .await
            .success()
    }

    /// Like [`ResourceObserver::is_resource_in`], scoped to a namespace.
    pub async fn is_resource_in_namespace(&self, resource: &str, namespace: &str) -> bool {
        self.runner
            .run(
                &self.client().arg("get").arg(resource).namespace(namespace),
                None,
            )
            .await
            .success()
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    pub async fn search_resource_in_namespace(
        &self,
        resource_plural: &str,
        name_pattern: &str,
        namespace: &str,
    ) -> Result<Option<String>, ObserverError> {
        tracing::debug!(
            resource = resource_plural,
            pattern = name_pattern,
            namespace,
            "Searching resources",
        );
        let list = self.get_resource_list(resource_plural, namespace).await?;
        if list.trim().is_empty() {
            tracing::debug!(resource = resource_plural, namespace, "Resource list is empty");
            return Ok(None);
        }
        search_item_in_list(&list, name_pattern)
    }

    pub async fn search_pod_in_namespace(
        &self,
        pod_name_pattern: &str,
        namespace: &str,
    ) -> Result<Option<String>, ObserverError> {
        self.search_resource_in_namespace("pods", pod_name_pattern, namespace)
            .await
    }

    /// Search for a pod every 5 s for up to 60 s.
    pub async fn wait_for_pod(
        &self,
        pod_name_pattern: &str,
        namespace: &str,
    ) -> Result<Option<String>, ObserverError> {
        self.wait_for_pod_with(pod_name_pattern, namespace, POD_SEARCH_POLL)
            .await
    }

    /// Search once, then up to `spec.attempts()` more times with
    /// `spec.interval` between searches.
    pub async fn wait_for_pod_with(
        &self,
        pod_name_pattern: &str,
        namespace: &str,
        spec: PollSpec,
    ) -> Result<Option<String>, ObserverError> {
        if let Some(pod) = self
            .search_pod_in_namespace(pod_name_pattern, namespace)
            .await?
        {
            return Ok(Some(pod));
        }
        for _ in 0..spec.attempts() {
            tokio::time::sleep(spec.interval).await;
            if let Some(pod) = self
                .search_pod_in_namespace(pod_name_pattern, namespace)
                .await?
            {
                return Ok(Some(pod));
            }
        }
        tracing::warn!(pattern = pod_name_pattern, namespace, "Pod did not appear");
        Ok(None)
    }

    /// Name of the single pod carrying the Jenkins deployment config label.
    pub async fn get_master_pod(&self, namespace: &str) -> Result<String, ObserverError> {
        let cmd = self
            .client()
            .args(["get", "pods", "-l", JENKINS_MASTER_SELECTOR])
            .namespace(namespace)
            .jsonpath(ITEM_NAMES);
        let names = self.query(cmd).await?;
        let pods: Vec<&str> = names.split_whitespace().collect();
        match pods.as_slice() {
            [pod] => Ok(pod.to_string()),
            _ => Err(ObserverError::UnexpectedPodCount {
                selector: JENKINS_MASTER_SELECTOR.to_string(),
                namespace: namespace.to_string(),
                count: pods.len(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Status polling
    // -----------------------------------------------------------------------

    fn pod_phase(&self, pod_name: &str, namespace: &str) -> ClusterCommand {
        self.client()
            .args(["get", "pod", pod_name])
            .namespace(namespace)
            .jsonpath("{.status.phase}")
    }

    /// Poll the pod phase until it reads `wait_for_status` (usually `Running`).
    pub async fn check_pod_status(
        &self,
        pod_name: &str,
        namespace: &str,
        wait_for_status: &str,
    ) -> bool {
        let cmd = self.pod_phase(pod_name, namespace);
        poll::run_wait_for_status(&self.runner, &cmd, wait_for_status, self.status_poll)
            .await
            .found
    }

    /// Current pod phase, or `None` if the query failed.
    pub async fn get_pod_status(&self, pod_name: &str, namespace: &str) -> Option<String> {
        let result = self
            .runner
            .run(&self.pod_phase(pod_name, namespace), None)
            .await;
        tracing::debug!(
            pod = pod_name,
            output = %result.output,
            exit_code = result.exit_code,
            "Got pod status",
        );
        result.success().then_some(result.output)
    }

    /// Poll the deployment's condition statuses every 5 s for up to 300 s
    /// until `wait_for_status` (usually `True`) shows up.
    pub async fn check_for_deployment_status(
        &self,
        deployment_name: &str,
        namespace: &str,
        wait_for_status: &str,
    ) -> bool {
        let cmd = self
            .client()
            .args(["get", "deployment", deployment_name])
            .namespace(namespace)
            .jsonpath("{.status.conditions[*].status}");
        poll::run_wait_for_status(&self.runner, &cmd, wait_for_status, DEPLOYMENT_POLL)
            .await
            .found
    }

    /// Block in the client until the deployment config meets `condition`.
    pub async fn check_for_deployment_config_status(
        &self,
        dc_name: &str,
        namespace: &str,
        condition: &str,
    ) -> CommandOutput {
        let wait = WaitFor::new("dc", dc_name)
            .in_namespace(namespace)
            .condition(condition)
            .timeout_seconds(DEPLOYMENT_CONFIG_WAIT_SECS);
        poll::run_wait_for(&self.runner, &wait).await
    }

    /// Generic client-side wait.
    pub async fn wait_for(&self, wait: &WaitFor) -> CommandOutput {
        poll::run_wait_for(&self.runner, wait).await
    }

    // -----------------------------------------------------------------------
    // Structured extraction with retry
    // -----------------------------------------------------------------------

    fn get_one(&self, resource_type: &str, name: &str, namespace: &str) -> ClusterCommand {
        self.client()
            .args(["get", resource_type, name])
            .namespace(namespace)
    }

    fn retry_policy(&self, retry: bool) -> RetryPolicy {
        if retry {
            self.retry
        } else {
            RetryPolicy::NONE
        }
    }

    /// Evaluate a jsonpath template against one resource.
    pub async fn get_resource_info_by_jsonpath(
        &self,
        resource_type: &str,
        name: &str,
        namespace: &str,
        json_path: &str,
        retry: bool,
    ) -> Result<String, ObserverError> {
        let cmd = self
            .get_one(resource_type, name, namespace)
            .jsonpath(json_path);
        let result = poll::run_with_retry(&self.runner, &cmd, None, self.retry_policy(retry)).await;
        ensure_success(&cmd, result)
    }

    /// Evaluate a `jq` expression against one resource's JSON.
    ///
    /// The resource JSON is fetched first, then fed to `jq -rc` on stdin.
    /// Both steps are retried together.
    pub async fn get_resource_info_by_jq(
        &self,
        resource_type: &str,
        name: &str,
        namespace: &str,
        jq_expression: &str,
        retry: bool,
    ) -> Result<String, ObserverError> {
        let policy = self.retry_policy(retry);
        let get = self.get_one(resource_type, name, namespace).output("json");
        let jq = ClusterCommand::new("jq").arg("-rc").arg(jq_expression);

        let mut retries = 0u32;
        loop {
            let fetched = self.runner.run(&get, None).await;
            let (cmd, result) = if fetched.success() {
                let filtered = self.runner.run(&jq, Some(&fetched.output)).await;
                (&jq, filtered)
            } else {
                (&get, fetched)
            };

            if result.success() || retries >= policy.retries {
                return ensure_success(cmd, result).map(|out| out.trim_end_matches('\n').to_string());
            }

            retries += 1;
            tracing::warn!(
                command = %cmd,
                exit_code = result.exit_code,
                retry = retries,
                "jq extraction failed, retrying",
            );
            tokio::time::sleep(policy.pause).await;
        }
    }

    /// Fetch one resource as JSON and resolve a JSON pointer
    /// (e.g. `/status/readyReplicas`). Strings come back unquoted.
    pub async fn get_resource_json_field(
        &self,
        resource_type: &str,
        name: &str,
        namespace: &str,
        pointer: &str,
        retry: bool,
    ) -> Result<String, ObserverError> {
        let cmd = self.get_one(resource_type, name, namespace).output("json");
        let result = poll::run_with_retry(&self.runner, &cmd, None, self.retry_policy(retry)).await;
        let body = ensure_success(&cmd, result)?;

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|source| ObserverError::InvalidJson {
                command: cmd.to_string(),
                source,
            })?;

        match value.pointer(pointer) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(ObserverError::FieldNotFound {
                kind: resource_type.to_string(),
                name: name.to_string(),
                pointer: pointer.to_string(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Run a mutation; a non-zero exit becomes `None`.
    async fn mutate(&self, command: ClusterCommand, input: Option<&str>) -> Option<String> {
        let result = self.runner.run(&command, input).await;
        if result.success() {
            tracing::info!(command = %command, "Command applied");
            Some(result.output)
        } else {
            tracing::warn!(
                command = %command,
                exit_code = result.exit_code,
                output = %result.output.trim(),
                "Command failed",
            );
            None
        }
    }

    /// `apply -f <manifest>`; `manifest` may be a path or URL.
    pub async fn apply(&self, manifest: &str) -> Option<String> {
        self.mutate(self.client().args(["apply", "-f", manifest]), None)
            .await
    }

    pub async fn create_from_yaml(&self, manifest: &str) -> Option<String> {
        self.mutate(self.client().args(["create", "-f", manifest]), None)
            .await
    }

    pub async fn new_app(&self, template_name: &str, namespace: &str) -> Option<String> {
        self.mutate(
            self.client().args(["new-app", template_name]).namespace(namespace),
            None,
        )
        .await
    }

    pub async fn new_app_with_params(
        &self,
        template_name: &str,
        params_file: &str,
    ) -> Option<String> {
        self.mutate(
            self.client()
                .args(["new-app", template_name])
                .arg(format!("--param-file={params_file}")),
            None,
        )
        .await
    }

    pub async fn new_app_from_file(&self, file_url: &str, namespace: &str) -> Option<String> {
        self.mutate(
            self.client()
                .args(["new-app", "-f", file_url])
                .namespace(namespace),
            None,
        )
        .await
    }

    pub async fn start_build(&self, build_config: &str, namespace: &str) -> Option<String> {
        self.mutate(
            self.client()
                .args(["start-build", build_config])
                .namespace(namespace),
            None,
        )
        .await
    }

    /// `exec <pod> -c <container> <cmd...>`.
    pub async fn exec_container_in_pod(
        &self,
        container_name: &str,
        pod_name: &str,
        container_cmd: &[&str],
    ) -> Option<String> {
        self.mutate(
            self.client()
                .args(["exec", pod_name, "-c", container_name])
                .args(container_cmd.iter().copied()),
            None,
        )
        .await
    }

    /// `exec <pod> -- <cmd...>`.
    pub async fn exec_in_pod(&self, pod_name: &str, container_cmd: &[&str]) -> Option<String> {
        self.mutate(
            self.client()
                .args(["exec", pod_name, "--"])
                .args(container_cmd.iter().copied()),
            None,
        )
        .await
    }

    /// Render a template with `process -f` and create the result via `create -f -`.
    pub async fn process_template(&self, file_path: &str) -> Option<String> {
        let rendered = self
            .mutate(self.client().args(["process", "-f", file_path]), None)
            .await?;
        self.mutate(self.client().args(["create", "-f", "-"]), Some(&rendered))
            .await
    }

    pub async fn delete(
        &self,
        resource_type: &str,
        resource: &str,
        namespace: &str,
    ) -> Option<String> {
        self.mutate(
            self.client()
                .args(["delete", resource_type, resource])
                .namespace(namespace),
            None,
        )
        .await
    }

    /// `scale --replicas=<n> rc/<controller> -n <namespace>`.
    pub async fn scale_replicas(
        &self,
        namespace: &str,
        replicas: u32,
        replication_controller: &str,
    ) -> Option<String> {
        self.mutate(
            self.client()
                .arg("scale")
                .arg(format!("--replicas={replicas}"))
                .arg(format!("rc/{replication_controller}"))
                .namespace(namespace),
            None,
        )
        .await
    }

    /// Expose a service as a route named after it. True when the client
    /// reports `<service> exposed`.
    pub async fn expose_service_route(&self, service_name: &str, namespace: &str) -> bool {
        let cmd = self
            .client()
            .arg("expose")
            .arg(format!("svc/{service_name}"))
            .namespace(namespace)
            .arg(format!("--name={service_name}"));
        let result = self.runner.run(&cmd, None).await;
        let exposed = format!(r"{}\s+exposed", regex::escape(service_name));
        Regex::new(&exposed)
            .map(|re| re.is_match(&result.output))
            .unwrap_or(false)
    }

    /// Set one environment variable on a deployment config, then give the
    /// rollout a moment to start.
    pub async fn set_env_for_deployment_config(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<String, ObserverError> {
        let cmd = self
            .client()
            .namespace(namespace)
            .args(["set", "env"])
            .arg(format!("dc/{name}"))
            .arg(format!("{key}={value}"));
        tracing::info!(command = %cmd, "Setting deployment config env");
        let output = self.query(cmd).await?;
        tokio::time::sleep(SET_ENV_SETTLE).await;
        Ok(output)
    }
}

/// First whitespace-separated item of `list` that `pattern` matches at
/// its start.
pub fn search_item_in_list(list: &str, pattern: &str) -> Result<Option<String>, ObserverError> {
    let re = Regex::new(&format!("^(?:{pattern})"))?;
    let found = list
        .split_whitespace()
        .find(|item| re.is_match(item))
        .map(str::to_string);

    match &found {
        Some(item) => tracing::debug!(item = %item, "Item matched"),
        None => tracing::debug!(pattern, "No item matched"),
    }
    Ok(found)
}

fn ensure_success(command: &ClusterCommand, result: CommandOutput) -> Result<String, ObserverError> {
    if result.success() {
        Ok(result.output)
    } else {
        Err(ObserverError::CommandFailed {
            command: command.to_string(),
            exit_code: result.exit_code,
            output: result.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tokio::time::Instant;

    use super::*;
    use crate::testing::ScriptedRunner;

    fn observer(runner: ScriptedRunner) -> ResourceObserver<ScriptedRunner> {
        ResourceObserver::new(runner)
    }

    #[test]
    fn search_returns_first_match() {
        let found = search_item_in_list("pod-a-1 pod-b-2", "pod-a.*").expect("valid pattern");
        assert_eq!(found.as_deref(), Some("pod-a-1"));
    }

    #[test]
    fn search_empty_list_is_none() {
        let found = search_item_in_list("", "x").expect("valid");
        assert_eq!(found, None);
    }

    #[test]
    fn search_without_match_is_none() {
        let found = search_item_in_list("foo", "bar").expect("valid");
        assert_eq!(found, None);
    }

    #[test]
    fn search_is_anchored_at_item_start() {
        let found =
            search_item_in_list("tekton-pipelines-webhook-1 webhook-2", "webhook").expect("valid");
        assert_eq!(found.as_deref(), Some("webhook-2"));
    }

    #[test]
    fn search_rejects_bad_pattern() {
        let result = search_item_in_list("a b", "(");
        assert_matches!(result, Err(ObserverError::InvalidPattern(_)));
    }

    #[tokio::test]
    async fn resource_list_uses_jsonpath_names() {
        let obs = observer(ScriptedRunner::new().then("build-a build-b", 0));
        let list = obs.get_pod_list("shipwright-build").await.expect("list");
        assert_eq!(list, "build-a build-b");

        let calls = obs.runner().calls();
        assert_eq!(
            calls[0].command.to_string(),
            "oc get pods -n shipwright-build -o 'jsonpath={.items[*].metadata.name}'"
        );
    }

    #[tokio::test]
    async fn cluster_resource_list_has_no_namespace() {
        let obs = observer(ScriptedRunner::new().then("buildah kaniko", 0));
        let list = obs.get_cluster_resource_list("cbs").await.expect("list");
        assert_eq!(list, "buildah kaniko");
        assert_eq!(
            obs.runner().calls()[0].command.args,
            vec!["get", "cbs", "-o", "jsonpath={.items[*].metadata.name}"]
        );
    }

    #[tokio::test]
    async fn tabular_listings_use_short_kinds() {
        let obs = observer(ScriptedRunner::new().when("oc get ", "NAME AGE", 0));
        obs.get_configmap("ns").await.expect("cm");
        obs.get_deployment_config("ns").await.expect("dc");
        obs.get_service("ns").await.expect("svc");
        obs.get_service_account("ns").await.expect("sa");
        obs.get_role_binding("ns").await.expect("rolebinding");
        obs.get_route("jenkins", "ns").await.expect("route");

        let kinds: Vec<String> = obs
            .runner()
            .calls()
            .into_iter()
            .map(|c| c.command.args[1].clone())
            .collect();
        assert_eq!(kinds, vec!["cm", "dc", "svc", "sa", "rolebinding", "route"]);
    }

    #[tokio::test]
    async fn jsonpath_reads_use_expected_templates() {
        let obs = observer(
            ScriptedRunner::new()
                .then("jenkins-ci.apps.example.com", 0)
                .then("[{\"name\":\"A\",\"value\":\"b\"}]", 0)
                .then("", 1),
        );
        assert_eq!(
            obs.get_route_host("jenkins", "ci").await.expect("host"),
            "jenkins-ci.apps.example.com"
        );
        obs.get_deployment_env_info("app", "ci").await.expect("env");
        assert!(obs.get_deployment_env_from_info("app", "ci").await.is_err());

        let calls = obs.runner().calls();
        assert_eq!(calls[0].command.args[6], "jsonpath={.status.ingress[0].host}");
        assert_eq!(
            calls[1].command.args[6],
            "jsonpath={.spec.template.spec.containers[0].env}"
        );
        assert_eq!(
            calls[2].command.args[6],
            "jsonpath={.spec.template.spec.containers[0].envFrom}"
        );
    }

    #[tokio::test]
    async fn app_and_build_mutations() {
        let obs = observer(ScriptedRunner::new().when("oc ", "--> Success", 0));
        assert!(obs.new_app("jenkins-persistent", "ci").await.is_some());
        assert!(obs
            .new_app_with_params("ruby-helloworld-sample", "helloworld.params")
            .await
            .is_some());
        assert!(obs.new_app_from_file("app.yaml", "ci").await.is_some());
        assert!(obs.start_build("ruby-sample-build", "ci").await.is_some());

        let calls = obs.runner().calls();
        assert_eq!(calls[0].command.args, vec!["new-app", "jenkins-persistent", "-n", "ci"]);
        assert_eq!(
            calls[1].command.args,
            vec!["new-app", "ruby-helloworld-sample", "--param-file=helloworld.params"]
        );
        assert_eq!(calls[2].command.args, vec!["new-app", "-f", "app.yaml", "-n", "ci"]);
        assert_eq!(calls[3].command.args, vec!["start-build", "ruby-sample-build", "-n", "ci"]);
    }

    #[tokio::test]
    async fn resource_list_failure_is_error() {
        let obs = observer(ScriptedRunner::new().then("Forbidden", 1));
        let result = obs.get_resource_list("pods", "kube-system").await;
        assert_matches!(result, Err(ObserverError::CommandFailed { exit_code: 1, .. }));
    }

    #[tokio::test]
    async fn search_pod_in_empty_namespace() {
        let obs = observer(ScriptedRunner::new().then("", 0));
        let found = obs
            .search_pod_in_namespace("shipwright-build-controller.*", "shipwright-build")
            .await
            .expect("query");
        assert_eq!(found, None);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_pod_polls_until_present() {
        let obs = observer(
            ScriptedRunner::new()
                .then("", 0)
                .then("other-1", 0)
                .then("other-1 shipwright-build-controller-5d9f", 0),
        );
        let start = Instant::now();

        let pod = obs
            .wait_for_pod("shipwright-build-controller", "shipwright-build")
            .await
            .expect("query");

        assert_eq!(pod.as_deref(), Some("shipwright-build-controller-5d9f"));
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_pod_gives_up_after_initial_search_and_attempts() {
        let obs = observer(ScriptedRunner::new().when("get pods", "", 0));
        let start = Instant::now();
        let pod = obs
            .wait_for_pod_with("missing", "ns", PollSpec::from_secs(5, 20))
            .await
            .expect("query");
        assert_eq!(pod, None);
        assert_eq!(obs.runner().call_count(), 5);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn is_resource_in_follows_exit_code() {
        let obs = observer(
            ScriptedRunner::new()
                .when("namespace/shipwright-build", "NAME STATUS", 0)
                .when("namespace/missing", "NotFound", 1),
        );
        assert!(obs.is_resource_in("namespace/shipwright-build").await);
        assert!(!obs.is_resource_in("namespace/missing").await);
    }

    #[tokio::test(start_paused = true)]
    async fn check_pod_status_polls_phase() {
        let obs = observer(ScriptedRunner::new().then("Pending", 0).then("Running", 0));
        assert!(obs.check_pod_status("build-1", "ns", "Running").await);
        assert_eq!(
            obs.runner().calls()[0].command.args,
            vec!["get", "pod", "build-1", "-n", "ns", "-o", "jsonpath={.status.phase}"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deployment_status_times_out() {
        let obs = observer(ScriptedRunner::new().when("get deployment", "False False", 0));
        let start = Instant::now();
        assert!(
            !obs.check_for_deployment_status("tekton-pipelines-webhook", "tekton-pipelines", "True")
                .await
        );
        assert_eq!(obs.runner().call_count(), 60);
        assert_eq!(start.elapsed(), Duration::from_secs(295));
    }

    #[tokio::test]
    async fn get_pod_status_absent_on_failure() {
        let obs = observer(ScriptedRunner::new().then("Running", 0).then("NotFound", 1));
        assert_eq!(obs.get_pod_status("p", "ns").await.as_deref(), Some("Running"));
        assert_eq!(obs.get_pod_status("p", "ns").await, None);
    }

    #[tokio::test]
    async fn deployment_config_wait_uses_given_name() {
        let obs = observer(ScriptedRunner::new().then("condition met", 0));
        let result = obs
            .check_for_deployment_config_status("jenkins", "ci", "condition=Available")
            .await;
        assert!(result.success());
        let args = &obs.runner().calls()[0].command.args;
        assert_eq!(args[3], "dc");
        assert_eq!(args[4], "jenkins");
        assert_eq!(args[2], "--timeout=300s");
    }

    #[tokio::test(start_paused = true)]
    async fn jsonpath_with_retry_recovers() {
        let obs = observer(
            ScriptedRunner::new()
                .then("error", 1)
                .then("error", 1)
                .then("error", 1)
                .then("0", 0),
        );
        let value = obs
            .get_resource_info_by_jsonpath(
                "deployment",
                "tekton-pipelines-controller",
                "tekton-pipelines",
                "{.status.unavailableReplicas}",
                true,
            )
            .await
            .expect("recovers");
        assert_eq!(value, "0");
        assert_eq!(obs.runner().call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn jsonpath_with_retry_exhausts() {
        let obs = observer(ScriptedRunner::new().when("get deployment", "NotFound", 1));
        let result = obs
            .get_resource_info_by_jsonpath("deployment", "x", "ns", "{.status}", true)
            .await;
        assert_matches!(result, Err(ObserverError::CommandFailed { .. }));
        assert_eq!(obs.runner().call_count(), 6);
    }

    #[tokio::test]
    async fn jsonpath_without_retry_fails_fast() {
        let obs = observer(ScriptedRunner::new().when("get deployment", "NotFound", 1));
        let result = obs
            .get_resource_info_by_jsonpath("deployment", "x", "ns", "{.status}", false)
            .await;
        assert!(result.is_err());
        assert_eq!(obs.runner().call_count(), 1);
    }

    #[tokio::test]
    async fn jq_feeds_json_on_stdin_and_trims() {
        let obs = observer(
            ScriptedRunner::new()
                .when("-o json", r#"{"status":{"phase":"Running"}}"#, 0)
                .when("jq", "Running\n", 0),
        );
        let value = obs
            .get_resource_info_by_jq("pod", "p", "ns", ".status.phase", false)
            .await
            .expect("jq");
        assert_eq!(value, "Running");

        let calls = obs.runner().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].command.args, vec!["-rc", ".status.phase"]);
        assert_eq!(
            calls[1].input.as_deref(),
            Some(r#"{"status":{"phase":"Running"}}"#)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn jq_retries_failed_fetch() {
        let obs = observer(
            ScriptedRunner::new()
                .when("jq", "3", 0)
                .then("connection refused", 1)
                .then("{}", 0),
        );
        let value = obs
            .get_resource_info_by_jq("deployment", "d", "ns", ".spec.replicas", true)
            .await
            .expect("jq");
        assert_eq!(value, "3");
        assert_eq!(obs.runner().call_count(), 3);
    }

    #[tokio::test]
    async fn json_field_resolves_pointer() {
        let body = r#"{"status":{"readyReplicas":2,"conditions":[{"type":"Available","status":"True"}]}}"#;
        let obs = observer(ScriptedRunner::new().when("-o json", body, 0));

        let ready = obs
            .get_resource_json_field("deployment", "d", "ns", "/status/readyReplicas", false)
            .await
            .expect("field");
        assert_eq!(ready, "2");

        let available = obs
            .get_resource_json_field("deployment", "d", "ns", "/status/conditions/0/status", false)
            .await
            .expect("field");
        assert_eq!(available, "True");

        let missing = obs
            .get_resource_json_field("deployment", "d", "ns", "/spec/paused", false)
            .await;
        assert_matches!(missing, Err(ObserverError::FieldNotFound { .. }));
    }

    #[tokio::test]
    async fn json_field_rejects_non_json() {
        let obs = observer(ScriptedRunner::new().when("-o json", "not json", 0));
        let result = obs
            .get_resource_json_field("deployment", "d", "ns", "/status", false)
            .await;
        assert_matches!(result, Err(ObserverError::InvalidJson { .. }));
    }

    #[tokio::test]
    async fn mutations_return_output_or_none() {
        let obs = observer(
            ScriptedRunner::new()
                .then("deployment.apps/tekton-pipelines-controller created", 0)
                .then("error: the path \"missing.yaml\" does not exist", 1),
        );
        assert_eq!(
            obs.apply("release.yaml").await.as_deref(),
            Some("deployment.apps/tekton-pipelines-controller created")
        );
        assert_eq!(obs.create_from_yaml("missing.yaml").await, None);
    }

    #[tokio::test]
    async fn scale_command_shape() {
        let obs = observer(ScriptedRunner::new().then("replicationcontroller/jenkins-1 scaled", 0));
        assert!(obs.scale_replicas("ci", 2, "jenkins-1").await.is_some());
        assert_eq!(
            obs.runner().calls()[0].command.args,
            vec!["scale", "--replicas=2", "rc/jenkins-1", "-n", "ci"]
        );
    }

    #[tokio::test]
    async fn exec_passes_command_words() {
        let obs = observer(ScriptedRunner::new().then("ok", 0).then("ok", 0));
        obs.exec_container_in_pod("jnlp", "jenkins-1-abc", &["ls", "/var"])
            .await;
        obs.exec_in_pod("jenkins-1-abc", &["cat", "/etc/hostname"])
            .await;
        let calls = obs.runner().calls();
        assert_eq!(
            calls[0].command.args,
            vec!["exec", "jenkins-1-abc", "-c", "jnlp", "ls", "/var"]
        );
        assert_eq!(
            calls[1].command.args,
            vec!["exec", "jenkins-1-abc", "--", "cat", "/etc/hostname"]
        );
    }

    #[tokio::test]
    async fn process_template_pipes_rendered_objects() {
        let obs = observer(
            ScriptedRunner::new()
                .when("process", "{\"kind\":\"List\"}", 0)
                .when("create", "route.route.openshift.io/app created", 0),
        );
        let out = obs.process_template("template.yaml").await;
        assert_eq!(out.as_deref(), Some("route.route.openshift.io/app created"));
        let calls = obs.runner().calls();
        assert_eq!(calls[1].command.args, vec!["create", "-f", "-"]);
        assert_eq!(calls[1].input.as_deref(), Some("{\"kind\":\"List\"}"));
    }

    #[tokio::test]
    async fn process_template_stops_when_render_fails() {
        let obs = observer(ScriptedRunner::new().when("process", "error", 1));
        assert_eq!(obs.process_template("bad.yaml").await, None);
        assert_eq!(obs.runner().call_count(), 1);
    }

    #[tokio::test]
    async fn delete_failure_is_none() {
        let obs = observer(ScriptedRunner::new().then("NotFound", 1));
        assert_eq!(obs.delete("build", "b1", "ns").await, None);
    }

    #[tokio::test]
    async fn expose_route_matches_output() {
        let obs = observer(
            ScriptedRunner::new()
                .then("route.route.openshift.io/jenkins exposed", 0)
                .then("Error from server (AlreadyExists)", 1),
        );
        assert!(obs.expose_service_route("jenkins", "ci").await);
        assert!(!obs.expose_service_route("jenkins", "ci").await);
    }

    #[tokio::test(start_paused = true)]
    async fn set_env_waits_after_success() {
        let obs = observer(ScriptedRunner::new().then("deploymentconfig.apps.openshift.io/jenkins updated", 0));
        let start = Instant::now();
        obs.set_env_for_deployment_config("jenkins", "ci", "JAVA_OPTS", "-Xmx1g")
            .await
            .expect("set env");
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(
            obs.runner().calls()[0].command.args,
            vec!["-n", "ci", "set", "env", "dc/jenkins", "JAVA_OPTS=-Xmx1g"]
        );
    }

    #[tokio::test]
    async fn set_env_failure_is_error() {
        let obs = observer(ScriptedRunner::new().then("not found", 1));
        let result = obs
            .set_env_for_deployment_config("jenkins", "ci", "A", "b")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn master_pod_requires_exactly_one() {
        let obs = observer(
            ScriptedRunner::new()
                .then("jenkins-1-abc", 0)
                .then("jenkins-1-abc jenkins-1-def", 0)
                .then("", 0),
        );
        assert_eq!(obs.get_master_pod("ci").await.expect("one"), "jenkins-1-abc");
        assert_matches!(
            obs.get_master_pod("ci").await,
            Err(ObserverError::UnexpectedPodCount { count: 2, .. })
        );
        assert_matches!(
            obs.get_master_pod("ci").await,
            Err(ObserverError::UnexpectedPodCount { count: 0, .. })
        );
    }
}
