/// Configuration problems detected before any command is run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} needs to be set in the environment")]
    MissingVar(&'static str),

    #[error("Working directory is not usable: {path}: {source}")]
    InvalidWorkingDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures reported by read queries against the cluster.
///
/// Mutating operations never produce these; they return `None` instead.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error("Command `{command}` failed with exit code {exit_code}: {output}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Output of `{command}` is not valid JSON: {source}")]
    InvalidJson {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Field {pointer} not found in {kind}/{name}")]
    FieldNotFound {
        kind: String,
        name: String,
        pointer: String,
    },

    #[error("Expected exactly one pod matching {selector} in {namespace}, found {count}")]
    UnexpectedPodCount {
        selector: String,
        namespace: String,
        count: usize,
    },
}
