//! Project (namespace) bootstrap.
//!
//! Outcomes are read from the client's human-readable messages, so this is
//! the part most sensitive to client output changes.

use regex::Regex;

use crate::command::ClusterCommand;
use crate::runner::CommandRunner;

/// A named project, checked and created through a [`CommandRunner`].
#[derive(Debug)]
pub struct Project<'a, R> {
    name: String,
    runner: &'a R,
}

impl<'a, R: CommandRunner> Project<'a, R> {
    pub fn new(name: impl Into<String>, runner: &'a R) -> Self {
        Self {
            name: name.into(),
            runner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn client(&self) -> ClusterCommand {
        ClusterCommand::new(self.runner.client())
    }

    /// Create the project with `new-project`.
    ///
    /// True when the client switched to it or was already on it. If it
    /// already exists elsewhere, switches to it and returns that result.
    pub async fn create(&self) -> bool {
        let result = self
            .runner
            .run(&self.client().arg("new-project").arg(&self.name), None)
            .await;

        if self.now_using(&result.output) || self.already_on(&result.output) {
            return true;
        }
        if self.already_exists(&result.output) {
            return self.switch_to().await;
        }

        tracing::warn!(
            project = %self.name,
            output = %result.output.trim(),
            "Unexpected output while creating project",
        );
        false
    }

    /// Whether the namespace exists.
    pub async fn is_present(&self) -> bool {
        self.runner
            .run(&self.client().args(["get", "ns"]).arg(&self.name), None)
            .await
            .success()
    }

    /// Make this the client's current project.
    pub async fn switch_to(&self) -> bool {
        let result = self
            .runner
            .run(&self.client().arg("project").arg(&self.name), None)
            .await;

        if self.now_using(&result.output) || self.already_on(&result.output) {
            return true;
        }

        tracing::warn!(
            project = %self.name,
            output = %result.output.trim(),
            "Unexpected output while switching project",
        );
        false
    }

    fn now_using(&self, output: &str) -> bool {
        self.matches(r#"Now using project "{}"\son\sserver"#, output)
    }

    fn already_on(&self, output: &str) -> bool {
        self.matches(r#"Already\son\sproject\s"{}"\son\sserver"#, output)
    }

    fn already_exists(&self, output: &str) -> bool {
        self.matches(r#"project\.project\.openshift\.io\s"{}"\salready exists"#, output)
    }

    /// `template` holds one `{}` where the escaped project name goes.
    fn matches(&self, template: &str, output: &str) -> bool {
        let pattern = template.replacen("{}", &regex::escape(&self.name), 1);
        Regex::new(&pattern)
            .map(|re| re.is_match(output))
            .unwrap_or(false)
    }
}
