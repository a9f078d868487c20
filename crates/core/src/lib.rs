//! Cluster command execution and resource observation for install smoke
//! checks.
//!
//! [`runner`] spawns the cluster client, [`poll`] adds fixed-interval
//! polling and retry, and [`observer`] and [`project`] turn command output
//! into typed answers about cluster resources.

pub mod command;
pub mod config;
pub mod error;
pub mod observer;
pub mod poll;
pub mod project;
pub mod runner;
pub mod subprocess;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use command::{ClusterCommand, CommandOutput};
pub use config::RunnerConfig;
pub use error::{ConfigError, ObserverError};
pub use observer::ResourceObserver;
pub use poll::{PollOutcome, PollSpec, RetryPolicy, WaitFor};
pub use project::Project;
pub use runner::{CommandRunner, SystemRunner};
