//! # Database bootstrapper
//!
//! Brings the replica-set connection up once at startup, prints the
//! databases the connected identity can see, and keeps the live
//! [`Connection`] for whoever was handed this [`Bootstrapper`].
//!
//! ```text
//! Uninitialized -> Connecting -> Connected
//!                             -> Failed
//! ```
//!
//! `Connected` and `Failed` are terminal for a given attempt. Calling
//! [`Bootstrapper::initialize`] again starts a fresh, independent attempt
//! whose outcome replaces the stored handle. Only the most recently started
//! attempt may settle the state; an older attempt finishing late is ignored.

use std::{
    io::{self, Write},
    sync::{Arc, RwLock},
};

use mongodb::Client;
use tracing::{debug, error, info, warn};

use crate::{
    config::MongoConfig,
    db::Connection,
    errors::BootstrapError,
    listing::{list_databases, write_listing},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Connecting,
    Connected,
    Failed,
}

#[derive(Debug)]
struct Slot {
    state: BootstrapState,
    handle: Option<Connection>,
    attempts: u64,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            state: BootstrapState::Uninitialized,
            handle: None,
            attempts: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Bootstrapper {
    config: MongoConfig,
    slot: Arc<RwLock<Slot>>,
}

impl Bootstrapper {
    pub fn new(config: MongoConfig) -> Self {
        Self {
            config,
            slot: Arc::new(RwLock::new(Slot::default())),
        }
    }

    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Connects, prints the database listing to stdout, and stores the handle.
    pub async fn initialize(&self) -> Result<Connection, BootstrapError> {
        self.initialize_to(&mut io::stdout()).await
    }

    /// Same as [`initialize`](Self::initialize) but writes the listing to `out`.
    ///
    /// Nothing is written unless both the connection and the listing succeed.
    pub async fn initialize_to<W: Write>(&self, out: &mut W) -> Result<Connection, BootstrapError> {
        let attempt = self.begin_attempt();

        info!(
            attempt,
            uri = %self.config.connection_string(),
            "Processing connection to MongoDB"
        );

        match self.connect_and_list(out).await {
            Ok(connection) => {
                if !self.settle(attempt, Some(connection.clone())) {
                    debug!(attempt, "Newer attempt started, not storing this connection");
                }
                Ok(connection)
            }
            Err(e) => {
                error!(attempt, error = %e, "MongoDB bootstrap failed");
                self.settle(attempt, None);
                Err(e)
            }
        }
    }

    /// Moves to `Connecting` and returns the new attempt's number.
    fn begin_attempt(&self) -> u64 {
        match self.slot.write() {
            Ok(mut slot) => {
                slot.state = BootstrapState::Connecting;
                slot.attempts += 1;
                slot.attempts
            }
            Err(_) => 0,
        }
    }

    /// Records the outcome of `attempt`, unless a newer attempt has started since.
    ///
    /// `Some` means connected, `None` means failed. Returns whether the outcome was stored.
    fn settle(&self, attempt: u64, handle: Option<Connection>) -> bool {
        let Ok(mut slot) = self.slot.write() else {
            return false;
        };
        if slot.attempts != attempt {
            return false;
        }

        slot.state = match handle {
            Some(_) => BootstrapState::Connected,
            None => BootstrapState::Failed,
        };
        slot.handle = handle;
        true
    }

    async fn connect_and_list<W: Write>(&self, out: &mut W) -> Result<Connection, BootstrapError> {
        let options = self.config.client_options().await?;
        let client = Client::with_options(options).map_err(BootstrapError::InvalidOptions)?;
        let connection = Connection::new(client, self.config.socket_timeout);

        connection.ping().await?;
        info!("Successfully connected to MongoDB");

        let databases = list_databases(&connection).await?;
        if let Err(e) = write_listing(out, &databases) {
            warn!(error = %e, "Failed to write database listing");
        }

        Ok(connection)
    }

    /// The live handle, or `None` until an [`initialize`](Self::initialize) call has succeeded.
    pub fn handle(&self) -> Option<Connection> {
        self.slot.read().ok()?.handle.clone()
    }

    pub fn state(&self) -> BootstrapState {
        self.slot
            .read()
            .map(|slot| slot.state)
            .unwrap_or(BootstrapState::Failed)
    }

    /// Number of connection attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.slot.read().map(|slot| slot.attempts).unwrap_or(0)
    }

    /// Drops the stored handle and closes its pool.
    pub async fn shutdown(&self) {
        let handle = match self.slot.write() {
            Ok(mut slot) => {
                slot.state = BootstrapState::Uninitialized;
                slot.handle.take()
            }
            Err(_) => None,
        };

        if let Some(connection) = handle {
            info!("Closing MongoDB connection");
            connection.shutdown().await;
        }
    }
}
