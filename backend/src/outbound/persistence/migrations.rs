//! Embedded schema migrations, applied at startup.

use diesel::{Connection, ConnectionError, PgConnection, RunQueryDsl};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use super::pool::SchemaName;

/// Migrations compiled from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while bringing the schema up to date.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The migration connection could not be opened.
    #[error("failed to connect for migrations: {0}")]
    Connect(#[from] ConnectionError),
    /// Creating or selecting the configured schema failed.
    #[error("failed to prepare schema {schema}: {source}")]
    Schema {
        schema: String,
        #[source]
        source: diesel::result::Error,
    },
    /// A migration failed to apply.
    #[error("failed to apply migrations: {message}")]
    Apply { message: String },
    /// The blocking migration task did not complete.
    #[error("migration task failed: {message}")]
    Join { message: String },
}

/// Apply pending migrations on a dedicated blocking connection.
///
/// With a schema set, the schema is created if missing and the migrations
/// run inside it.
pub async fn apply_migrations(
    conninfo: &str,
    schema: Option<&SchemaName>,
) -> Result<(), MigrationError> {
    let conninfo = conninfo.to_owned();
    let schema = schema.cloned();
    tokio::task::spawn_blocking(move || apply_blocking(&conninfo, schema.as_ref()))
        .await
        .map_err(|err| MigrationError::Join {
            message: err.to_string(),
        })?
}

fn apply_blocking(conninfo: &str, schema: Option<&SchemaName>) -> Result<(), MigrationError> {
    let mut connection = PgConnection::establish(conninfo)?;
    if let Some(schema) = schema {
        for statement in [
            format!("CREATE SCHEMA IF NOT EXISTS {}", schema.quoted()),
            format!("SET search_path TO {}", schema.quoted()),
        ] {
            diesel::sql_query(statement)
                .execute(&mut connection)
                .map_err(|source| MigrationError::Schema {
                    schema: schema.to_string(),
                    source,
                })?;
        }
    }
    connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| MigrationError::Apply {
            message: err.to_string(),
        })?;
    Ok(())
}
