//! MySQL / PostgreSQL datastore through `sqlx`.
//!
//! Workers are plain OS threads, so the async driver is driven synchronously:
//! the store owns a small multi-thread `tokio` runtime and every call is a
//! `block_on` on it. The connection pool is an [`AnyPool`], which picks the
//! driver from the DSN scheme (`mysql://` or `postgres://`); the [`SqlDialect`]
//! supplies the matching placeholder syntax.
//!
//! # Feature Flag
//!
//! This module requires the `sql` feature.

use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use sqlx::{Any, Transaction};
use tokio::runtime::Runtime;
use tracing::debug;

use super::dialect::SqlDialect;
use super::{CounterStore, CounterTx, Record, StoreError};

/// Connections are recycled after this long.
const CONN_MAX_LIFETIME: Duration = Duration::from_secs(3 * 60);

/// A [`CounterStore`] backed by a SQL server.
pub struct SqlStore {
    pool: AnyPool,
    runtime: Runtime,
    dialect: &'static dyn SqlDialect,
}

impl SqlStore {
    /// Connects a pool of at most `max_connections` connections to `dsn`.
    pub fn connect(
        dsn: &str,
        dialect: &'static dyn SqlDialect,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(2)
            .thread_name("contesa-sql")
            .build()
            .map_err(|e| StoreError::driver("start sql runtime", e))?;

        let pool = runtime
            .block_on(
                AnyPoolOptions::new()
                    .max_connections(max_connections.max(1))
                    .max_lifetime(CONN_MAX_LIFETIME)
                    .connect(dsn),
            )
            .map_err(|e| StoreError::driver("connect", e))?;

        debug!(dialect = dialect.name(), max_connections, "connected pool");
        Ok(SqlStore {
            pool,
            runtime,
            dialect,
        })
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.dialect
    }
}

impl CounterStore for SqlStore {
    fn begin(&self) -> Result<Box<dyn CounterTx + '_>, StoreError> {
        let tx = self
            .runtime
            .block_on(self.pool.begin())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Box::new(SqlTx { store: self, tx }))
    }

    fn load_ids(&self) -> Result<Vec<String>, StoreError> {
        self.runtime
            .block_on(sqlx::query_scalar::<_, String>(self.dialect.select_ids()).fetch_all(&self.pool))
            .map_err(|e| StoreError::driver("select ids", e))
    }

    fn records(&self) -> Result<Vec<Record>, StoreError> {
        let rows = self
            .runtime
            .block_on(
                sqlx::query_as::<_, (String, i64)>(self.dialect.select_records())
                    .fetch_all(&self.pool),
            )
            .map_err(|e| StoreError::driver("select records", e))?;
        Ok(rows
            .into_iter()
            .map(|(id, counter)| Record { id, counter })
            .collect())
    }

    fn reset(&self, records: &[Record]) -> Result<(), StoreError> {
        let dialect = self.dialect;
        self.runtime.block_on(async {
            sqlx::query(dialect.drop_table())
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::driver("drop table", e))?;
            sqlx::query(dialect.create_table())
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::driver("create table", e))?;
            for record in records {
                sqlx::query(dialect.insert_record())
                    .bind(record.id.clone())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StoreError::driver("insert record", e))?;
            }
            Ok(())
        })
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.runtime
            .block_on(sqlx::query("SELECT 1").execute(&self.pool))
            .map(|_| ())
            .map_err(|e| StoreError::driver("ping", e))
    }
}

struct SqlTx<'a> {
    store: &'a SqlStore,
    tx: Transaction<'static, Any>,
}

impl CounterTx for SqlTx<'_> {
    fn lock_counter(&mut self, id: &str) -> Result<i64, StoreError> {
        let sql = self.store.dialect.lock_counter();
        let tx = &mut self.tx;
        let counter = self.store.runtime.block_on(
            sqlx::query_scalar::<_, i64>(sql)
                .bind(id.to_owned())
                .fetch_optional(&mut **tx),
        );
        match counter {
            Ok(Some(counter)) => Ok(counter),
            Ok(None) => Err(StoreError::NotFound { id: id.to_owned() }),
            Err(e) => Err(StoreError::driver("lock counter", e)),
        }
    }

    fn write_counter(&mut self, id: &str, value: i64) -> Result<(), StoreError> {
        let sql = self.store.dialect.write_counter();
        let tx = &mut self.tx;
        self.store
            .runtime
            .block_on(
                sqlx::query(sql)
                    .bind(value)
                    .bind(id.to_owned())
                    .execute(&mut **tx),
            )
            .map(|_| ())
            .map_err(|e| StoreError::driver("write counter", e))
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let SqlTx { store, tx } = *self;
        store
            .runtime
            .block_on(tx.commit())
            .map_err(|e| StoreError::driver("commit", e))
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let SqlTx { store, tx } = *self;
        store
            .runtime
            .block_on(tx.rollback())
            .map_err(|e| StoreError::driver("rollback", e))
    }
}
