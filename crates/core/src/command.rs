//! Typed command construction and invocation results.
//!
//! Commands are an argument vector, never a shell string, so resource
//! names and query expressions are passed to the client verbatim.

use std::fmt;

use serde::Serialize;

/// A single program invocation: program name plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ClusterCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `-n <namespace>`.
    pub fn namespace(self, namespace: &str) -> Self {
        self.arg("-n").arg(namespace)
    }

    /// Append `-o jsonpath=<template>`.
    pub fn jsonpath(self, template: &str) -> Self {
        self.arg("-o").arg(format!("jsonpath={template}"))
    }

    /// Append `-o <format>`.
    pub fn output(self, format: &str) -> Self {
        self.arg("-o").arg(format)
    }
}

impl fmt::Display for ClusterCommand {
    /// Shell-quoted rendering, for logs and error messages only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Standard output followed by standard error, decoded as UTF-8 (lossy).
    pub output: String,
    /// Process exit code (`-1` if killed by a signal, `127` if it never started).
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
