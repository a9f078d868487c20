//! In-memory [`CommandRunner`] for exercising observers without a cluster.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::command::{ClusterCommand, CommandOutput};
use crate::runner::CommandRunner;

/// A recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub command: ClusterCommand,
    pub input: Option<String>,
}

/// Replays canned outputs and records every call.
///
/// Lookup order per call: the first rule whose needle occurs in the
/// rendered command, then the next queued output, then a failing
/// "unexpected command" result.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    client: String,
    rules: Vec<(String, CommandOutput)>,
    queue: Mutex<VecDeque<CommandOutput>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            client: "oc".to_string(),
            ..Default::default()
        }
    }

    /// Queue one output, consumed by the next call that no rule matches.
    pub fn then(self, output: &str, exit_code: i32) -> Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(CommandOutput {
                output: output.to_string(),
                exit_code,
            });
        }
        self
    }

    /// Answer every command containing `needle` with the same output.
    pub fn when(mut self, needle: &str, output: &str, exit_code: i32) -> Self {
        self.rules.push((
            needle.to_string(),
            CommandOutput {
                output: output.to_string(),
                exit_code,
            },
        ));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &ClusterCommand, input: Option<&str>) -> CommandOutput {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                command: command.clone(),
                input: input.map(str::to_string),
            });
        }

        let rendered = command.to_string();
        if let Some((_, output)) = self
            .rules
            .iter()
            .find(|(needle, _)| rendered.contains(needle.as_str()))
        {
            return output.clone();
        }

        let queued = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        queued.unwrap_or_else(|| CommandOutput {
            output: format!("unexpected command: {rendered}"),
            exit_code: 1,
        })
    }

    fn client(&self) -> &str {
        &self.client
    }
}
