//! PostgreSQL test databases for integration tests.
//!
//! Each `TestDatabase` starts a fresh Testcontainers PostgreSQL instance with
//! all migrations applied, so tests never share state.

#![allow(clippy::duplicate_mod)]

use campus_auth::config::DatabaseConfig;
use campus_auth::storage::{create_pool, DbPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

/// A test database that lives as long as its container.
pub struct TestDatabase {
    pub pool: DbPool,
    _container: ContainerAsync<Postgres>,
}

impl TestDatabase {
    /// Start a container and apply migrations. `prefix` only labels failures.
    pub async fn new(prefix: &str) -> Self {
        let container = Postgres::default().start().await.unwrap_or_else(|e| {
            panic!("Failed to start PostgreSQL container for {}: {}", prefix, e)
        });

        let host = container
            .get_host()
            .await
            .unwrap_or_else(|e| panic!("Failed to get container host for {}: {}", prefix, e));
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .unwrap_or_else(|e| panic!("Failed to get container port for {}: {}", prefix, e));

        let config = DatabaseConfig {
            url: format!("postgresql://postgres:postgres@{}:{}/postgres", host, port),
            auto_migrate: true,
            max_connections: 8,
            min_connections: 1,
            ..Default::default()
        };

        let pool = create_pool(&config)
            .await
            .unwrap_or_else(|e| panic!("Failed to create pool for {}: {}", prefix, e));

        Self { pool, _container: container }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}
