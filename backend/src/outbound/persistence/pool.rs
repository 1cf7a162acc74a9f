//! Async-safe connection pool for Diesel PostgreSQL connections.
//!
//! Wraps `diesel-async` and `bb8`. Transactions check out an owned connection
//! and keep it until they finish; a connection dropped with a transaction
//! still open is discarded by the pool rather than reused, so the server
//! rolls the transaction back when the socket closes.

use std::fmt;
use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Failed to check out a connection from the pool.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },

    /// Failed to build the connection pool.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },

    /// The configured schema is not a plain SQL identifier.
    #[error("invalid schema name: {name:?}")]
    InvalidSchema { name: String },
}

impl PoolError {
    /// Create a checkout error with the given message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Create a build error with the given message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

/// PostgreSQL schema the tables live in.
///
/// Restricted to unquoted identifier syntax so it can be spliced into
/// `SET search_path` and `CREATE SCHEMA` statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaName(String);

impl SchemaName {
    const MAX_LEN: usize = 63;

    /// Validate a schema name.
    ///
    /// # Examples
    /// ```
    /// use urlredir::outbound::persistence::SchemaName;
    ///
    /// assert!(SchemaName::new("urlredir_test").is_ok());
    /// assert!(SchemaName::new("public; DROP TABLE urls").is_err());
    /// ```
    pub fn new(raw: &str) -> Result<Self, PoolError> {
        let mut chars = raw.chars();
        let valid_start = chars
            .next()
            .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
        let valid_rest = chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if valid_start && valid_rest && raw.len() <= Self::MAX_LEN {
            Ok(Self(raw.to_owned()))
        } else {
            Err(PoolError::InvalidSchema {
                name: raw.to_owned(),
            })
        }
    }

    /// Double-quoted form for SQL statements.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Borrow the bare name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration for the database connection pool.
///
/// # Example
///
/// ```ignore
/// let config = PoolConfig::new("host=localhost dbname=urlredir")
///     .with_max_size(20)
///     .with_schema(Some(SchemaName::new("urlredir")?));
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    conninfo: String,
    max_size: u32,
    min_idle: Option<u32>,
    connection_timeout: Duration,
    schema: Option<SchemaName>,
}

impl PoolConfig {
    /// Create a configuration for `conninfo`, a libpq keyword/value string or
    /// `postgres://` URL.
    ///
    /// Defaults: 10 connections, none kept idle, 30 second checkout timeout,
    /// server default search path.
    pub fn new(conninfo: impl Into<String>) -> Self {
        Self {
            conninfo: conninfo.into(),
            max_size: 10,
            min_idle: None,
            connection_timeout: Duration::from_secs(30),
            schema: None,
        }
    }

    /// Set the maximum number of connections in the pool.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the connection checkout timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Run every transaction against `schema`.
    pub fn with_schema(mut self, schema: Option<SchemaName>) -> Self {
        self.schema = schema;
        self
    }

    /// Connection string.
    pub fn conninfo(&self) -> &str {
        &self.conninfo
    }

    /// Schema transactions are pinned to, if any.
    pub fn schema(&self) -> Option<&SchemaName> {
        self.schema.as_ref()
    }
}

/// Async connection pool for PostgreSQL via Diesel.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
    schema: Option<SchemaName>,
}

impl DbPool {
    /// Create a new connection pool with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Build` if the pool cannot be constructed.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.conninfo);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self {
            inner: pool,
            schema: config.schema,
        })
    }

    /// Check out a connection that is not tied to the pool's lifetime.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Checkout` if a connection cannot be obtained within
    /// the configured timeout.
    pub async fn checkout(&self) -> Result<PooledConnection<'static, AsyncPgConnection>, PoolError> {
        self.inner
            .get_owned()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }

    /// Schema transactions are pinned to, if any.
    pub fn schema(&self) -> Option<&SchemaName> {
        self.schema.as_ref()
    }
}
