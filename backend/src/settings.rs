//! Runtime settings loaded via OrthoConfig.
//!
//! Values come from `--flags`, `URLREDIR_*` environment variables and config
//! files. Raw fields stay optional; the accessors apply defaults and validate.

use std::net::{AddrParseError, SocketAddr};

use actix_web::http::header::HeaderName;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::domain::Identity;
use crate::middleware::IdentitySource;
use crate::outbound::persistence::{PoolError, SchemaName};

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_STATIC_USER: &str = "test";
const REDACTED: &str = "<redacted>";

/// Settings that fail validation.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid listen address {value:?}: {source}")]
    Listen {
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("invalid database schema: {0}")]
    Schema(#[from] PoolError),
    #[error("invalid header name {value:?} for {setting}")]
    Header { setting: &'static str, value: String },
}

/// Configuration for the redirector process.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "URLREDIR")]
pub struct AppSettings {
    /// Address to bind the HTTP server to.
    pub listen: Option<String>,
    /// PostgreSQL connection string; the in-memory store is used when unset.
    pub db_conninfo: Option<String>,
    /// Schema holding the tables.
    pub db_schema: Option<String>,
    /// Upper bound on pooled connections.
    pub db_max_connections: Option<u32>,
    /// Header a trusted proxy puts the client address in.
    pub real_ip_header: Option<String>,
    /// Header a trusted proxy puts the authenticated user in.
    pub remote_user_header: Option<String>,
    /// User every request acts as when no header is configured.
    pub static_user: Option<String>,
}

fn header_name(setting: &'static str, raw: Option<&str>) -> Result<Option<HeaderName>, SettingsError> {
    raw.filter(|value| !value.is_empty())
        .map(|value| {
            HeaderName::from_bytes(value.as_bytes()).map_err(|_| SettingsError::Header {
                setting,
                value: value.to_owned(),
            })
        })
        .transpose()
}

impl AppSettings {
    /// Socket address to bind, defaulting to `0.0.0.0:8080`.
    pub fn listen(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.listen.as_deref().unwrap_or(DEFAULT_LISTEN);
        raw.parse().map_err(|source| SettingsError::Listen {
            value: raw.to_owned(),
            source,
        })
    }

    /// Connection string, if persistence is configured.
    pub fn db_conninfo(&self) -> Option<&str> {
        self.db_conninfo.as_deref().filter(|value| !value.is_empty())
    }

    /// Validated schema name.
    pub fn db_schema(&self) -> Result<Option<SchemaName>, SettingsError> {
        Ok(self
            .db_schema
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(SchemaName::new)
            .transpose()?)
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    /// Header trusted for the client address.
    pub fn real_ip_header(&self) -> Result<Option<HeaderName>, SettingsError> {
        header_name("real_ip_header", self.real_ip_header.as_deref())
    }

    /// Where request identities come from: the remote-user header when
    /// configured, otherwise the static user.
    pub fn identity_source(&self) -> Result<IdentitySource, SettingsError> {
        match header_name("remote_user_header", self.remote_user_header.as_deref())? {
            Some(header) => Ok(IdentitySource::Header(header)),
            None => Ok(IdentitySource::Static(Identity::from_raw(
                self.static_user.as_deref().unwrap_or(DEFAULT_STATIC_USER),
            ))),
        }
    }

    /// Effective configuration as published on the debug endpoint.
    pub fn debug_view(&self) -> Value {
        json!({
            "listen": self.listen.as_deref().unwrap_or(DEFAULT_LISTEN),
            "db_conninfo": self.db_conninfo().map(|_| REDACTED),
            "db_schema": self.db_schema,
            "db_max_connections": self.db_max_connections(),
            "real_ip_header": self.real_ip_header,
            "remote_user_header": self.remote_user_header,
            "static_user": self.static_user.as_deref().unwrap_or(DEFAULT_STATIC_USER),
        })
    }
}
