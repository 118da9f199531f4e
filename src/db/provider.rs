//! Backend selection.
//!
//! PostgreSQL goes through the sqlx pool; Vertica gets its own session driver
//! because PostgreSQL's type catalog does not exist there.

use crate::db::connection::{ConnectionSource, SqlConnection};
use crate::db::pool::{PgConnectionProvider, PgSession};
use crate::db::vertica::{VerticaConnectionProvider, VerticaSession};
use crate::error::DbResult;
use crate::models::{Backend, ConnectionSettings, QueryOutcome, QueryParam};
use std::time::Duration;
use tracing::{error, info};

/// Connection provider for whichever backend the settings name.
#[derive(Debug, Clone)]
pub enum DatabaseProvider {
    Postgres(PgConnectionProvider),
    Vertica(VerticaConnectionProvider),
}

impl DatabaseProvider {
    /// Configure the provider for `settings.backend` without connecting.
    pub fn connect_lazy(settings: ConnectionSettings, query_timeout: Duration) -> DbResult<Self> {
        match settings.backend {
            Backend::Postgres => {
                PgConnectionProvider::connect_lazy(settings, query_timeout).map(Self::Postgres)
            }
            Backend::Vertica => {
                VerticaConnectionProvider::new(settings, query_timeout).map(Self::Vertica)
            }
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        match self {
            Self::Postgres(provider) => provider.settings(),
            Self::Vertica(provider) => provider.settings(),
        }
    }

    /// Run `SELECT 1` once and log the outcome. Never fails startup.
    pub async fn check_connectivity(&self) -> bool {
        let result = async {
            let mut conn = self.acquire().await?;
            conn.execute("SELECT 1", &[]).await
        }
        .await;

        let settings = self.settings();
        match result {
            Ok(_) => {
                info!(backend = %settings.backend, "Database connection verified");
                true
            }
            Err(e) => {
                error!(
                    backend = %settings.backend,
                    url = %settings.masked_url(),
                    error = %e,
                    "Database connection check failed"
                );
                false
            }
        }
    }
}

impl ConnectionSource for DatabaseProvider {
    type Connection = DatabaseSession;

    fn backend(&self) -> Backend {
        match self {
            Self::Postgres(provider) => provider.backend(),
            Self::Vertica(provider) => provider.backend(),
        }
    }

    fn masked_url(&self) -> String {
        match self {
            Self::Postgres(provider) => provider.masked_url(),
            Self::Vertica(provider) => provider.masked_url(),
        }
    }

    async fn acquire(&self) -> DbResult<DatabaseSession> {
        match self {
            Self::Postgres(provider) => provider.acquire().await.map(DatabaseSession::Postgres),
            Self::Vertica(provider) => provider.acquire().await.map(DatabaseSession::Vertica),
        }
    }

    async fn close(&self) {
        match self {
            Self::Postgres(provider) => provider.close().await,
            Self::Vertica(provider) => provider.close().await,
        }
    }
}

/// A connection acquired from a [`DatabaseProvider`].
pub enum DatabaseSession {
    Postgres(PgSession),
    Vertica(VerticaSession),
}

impl SqlConnection for DatabaseSession {
    async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<QueryOutcome> {
        match self {
            Self::Postgres(session) => session.execute(sql, params).await,
            Self::Vertica(session) => session.execute(sql, params).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backend_picks_the_driver() {
        let postgres = ConnectionSettings::new(Backend::Postgres, "127.0.0.1", Some(1));
        let provider = DatabaseProvider::connect_lazy(postgres, Duration::from_secs(1)).unwrap();
        assert!(matches!(provider, DatabaseProvider::Postgres(_)));
        assert_eq!(provider.backend(), Backend::Postgres);
        provider.close().await;

        let vertica = ConnectionSettings::new(Backend::Vertica, "127.0.0.1", Some(1));
        let provider = DatabaseProvider::connect_lazy(vertica, Duration::from_secs(1)).unwrap();
        assert!(matches!(provider, DatabaseProvider::Vertica(_)));
        assert_eq!(provider.backend(), Backend::Vertica);
        assert_eq!(provider.settings().port, 1);
        provider.close().await;
    }

    #[tokio::test]
    async fn test_connectivity_check_reports_closed_provider() {
        let settings = ConnectionSettings::new(Backend::Vertica, "127.0.0.1", Some(1));
        let provider = DatabaseProvider::connect_lazy(settings, Duration::from_secs(1)).unwrap();
        provider.close().await;
        assert!(!provider.check_connectivity().await);
    }
}
