use crate::{Error, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use serde::{Deserialize, Serialize};
use tokio_postgres::{NoTls, Row};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub max_pool_size: usize,
}

impl DatabaseConfig {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            max_pool_size: 16,
        }
    }

    pub fn postgres(connection_string: impl Into<String>) -> Self {
        Self::new(connection_string)
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }
}

/// Pooled connection handle to PostgreSQL. Owned exclusively by whichever
/// logical operation is currently borrowing it from the pool; release back
/// on drop per deadpool semantics.
#[derive(Debug)]
pub struct Database {
    pub pool: Pool,
}

impl Database {
    pub async fn init(config: DatabaseConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .connection_string
            .parse()
            .map_err(|e| Error::config(format!("invalid connection string: {}", e)))?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(config.max_pool_size)
            .build()
            .map_err(|e| Error::connection(format!("failed to create connection pool: {}", e)))?;

        debug!(
            max_size = config.max_pool_size,
            "postgresql connection pool established"
        );

        Ok(Self { pool })
    }

    pub async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Send + Sync)],
    ) -> Result<u64> {
        let client = self.pool.get().await?;
        let sync_params = to_sync_params(params);
        let rows = client.execute(sql, &sync_params).await?;
        Ok(rows)
    }

    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Send + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.pool.get().await?;
        let sync_params = to_sync_params(params);
        let rows = client.query(sql, &sync_params).await?;
        Ok(rows)
    }

    pub async fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Send + Sync)],
    ) -> Result<Row> {
        let client = self.pool.get().await?;
        let sync_params = to_sync_params(params);
        let row = client.query_one(sql, &sync_params).await?;
        Ok(row)
    }

    pub async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Send + Sync)],
    ) -> Result<Option<Row>> {
        let client = self.pool.get().await?;
        let sync_params = to_sync_params(params);
        let row = client.query_opt(sql, &sync_params).await?;
        Ok(row)
    }

    /// Run `work` inside a single transaction, committing on `Ok` and rolling
    /// back on `Err` or panic-unwind. Migrations apply their whole action
    /// sequence through one call to this so a failing step leaves the
    /// previous snapshot canonical.
    pub async fn with_transaction<F, Fut, T>(&self, work: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a deadpool_postgres::Transaction<'a>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut client = self.pool.get().await?;
        let txn = client.transaction().await?;
        let result = work(&txn).await;
        match result {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let _ = txn.rollback().await;
                Err(err)
            }
        }
    }
}

fn to_sync_params<'a>(
    params: &'a [&(dyn tokio_postgres::types::ToSql + Send + Sync)],
) -> Vec<&'a (dyn tokio_postgres::types::ToSql + Sync)> {
    params
        .iter()
        .map(|p| *p as &(dyn tokio_postgres::types::ToSql + Sync))
        .collect()
}
