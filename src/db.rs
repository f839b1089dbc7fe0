//! # Database connection module
//!
//! [`Connection`] is the live link to the replica set. It wraps the driver
//! client, so cloning it is cheap and every clone shares the same pool.
//!
//! ## Usage
//!
//! Components that need the database take a `Connection` (or a
//! [`Bootstrapper`](crate::bootstrap::Bootstrapper) to read it from) as an
//! argument instead of reaching for global state.

use std::{ops::Deref, time::Duration};

use mongodb::{Client, bson::doc};

use crate::errors::{BootstrapError, Operation};

pub const ADMIN_DATABASE: &str = "admin";

#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    socket_timeout: Option<Duration>,
}

impl Connection {
    pub fn new(client: Client, socket_timeout: Option<Duration>) -> Self {
        Self {
            client,
            socket_timeout,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn socket_timeout(&self) -> Option<Duration> {
        self.socket_timeout
    }

    /// Round trip to the server, bounded by server selection and the socket timeout.
    pub async fn ping(&self) -> Result<(), BootstrapError> {
        let admin = self.client.database(ADMIN_DATABASE);

        self.bounded(Operation::Ping, async {
            admin.run_command(doc! { "ping": 1 }).await.map(|_| ())
        })
        .await?
        .map_err(BootstrapError::Connection)
    }

    /// Runs `operation` under the configured socket timeout, if any.
    pub(crate) async fn bounded<F, T>(
        &self,
        operation: Operation,
        fut: F,
    ) -> Result<T, BootstrapError>
    where
        F: Future<Output = T>,
    {
        match self.socket_timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| BootstrapError::Timeout { operation, after }),
            None => Ok(fut.await),
        }
    }

    /// Gracefully closes the pool. Other clones of this connection become unusable.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

impl Deref for Connection {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl From<Client> for Connection {
    fn from(client: Client) -> Self {
        Self::new(client, None)
    }
}
