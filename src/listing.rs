use std::io::{self, Write};

use serde::Serialize;
use tracing::debug;

use crate::{
    db::Connection,
    errors::{BootstrapError, Operation},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSummary {
    pub name: String,
    pub size_on_disk: u64,
    pub empty: bool,
}

impl From<mongodb::results::DatabaseSpecification> for DatabaseSummary {
    fn from(spec: mongodb::results::DatabaseSpecification) -> Self {
        Self {
            name: spec.name,
            size_on_disk: spec.size_on_disk,
            empty: spec.empty,
        }
    }
}

/// Runs the admin listing command and keeps the server's ordering.
pub async fn list_databases(connection: &Connection) -> Result<Vec<DatabaseSummary>, BootstrapError> {
    let specs = connection
        .bounded(Operation::ListDatabases, async {
            connection.client().list_databases().await
        })
        .await?
        .map_err(BootstrapError::ListDatabases)?;

    debug!(count = specs.len(), "listDatabases returned");

    Ok(specs.into_iter().map(DatabaseSummary::from).collect())
}

/// Writes the `Databases:` header followed by one ` - <name>` line each.
pub fn write_listing<W: Write>(out: &mut W, databases: &[DatabaseSummary]) -> io::Result<()> {
    writeln!(out, "Databases:")?;
    for database in databases {
        writeln!(out, " - {}", database.name)?;
    }
    out.flush()
}
