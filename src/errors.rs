use std::{fmt, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse '{key}': {details}")]
    ParseError { key: String, details: String },
    #[error("At least one seed host is required")]
    NoHosts,
    #[error("Username and password must be supplied together")]
    IncompleteCredentials,
}

/// Server round trips that run under the socket timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Ping,
    ListDatabases,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Ping => f.write_str("ping"),
            Operation::ListDatabases => f.write_str("listDatabases"),
        }
    }
}

/// Everything that can go wrong while bringing the replica-set connection up.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("Invalid client options: {0}")]
    InvalidOptions(#[source] mongodb::error::Error),
    #[error("Failed to connect to MongoDB: {0}")]
    Connection(#[source] mongodb::error::Error),
    #[error("Failed to list databases: {0}")]
    ListDatabases(#[source] mongodb::error::Error),
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: Operation,
        after: Duration,
    },
}

impl BootstrapError {
    /// True for failures that happened before the server answered a ping.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            BootstrapError::Connection(_)
                | BootstrapError::Timeout {
                    operation: Operation::Ping,
                    ..
                }
        )
    }
}
