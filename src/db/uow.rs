//! Unit-of-work coordinator
//!
//! Groups one or more labelled store connections so that every write issued
//! through them commits or rolls back together. One logical operation may span
//! several physical connections, though in practice a single connection under
//! the [`PRIMARY`] label is typical.

use sqlx::{pool::PoolConnection, PgConnection, PgPool, Postgres};

use crate::{Error, Result};

/// Label used by the services for their single registry connection.
pub const PRIMARY: &str = "registry";

#[derive(Default)]
pub struct UnitOfWork {
    connections: Vec<(String, PoolConnection<Postgres>)>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a connection from `pool`, open a transaction on it, and
    /// register it under `label`. Calling `begin` again for an
    /// already-registered label is a no-op.
    pub async fn begin(&mut self, label: &str, pool: &PgPool) -> Result<()> {
        if self.connections.iter().any(|(l, _)| l == label) {
            return Ok(());
        }

        let mut conn = pool.acquire().await.map_err(Error::Database)?;
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(Error::Database)?;

        self.connections.push((label.to_string(), conn));
        Ok(())
    }

    pub fn is_registered(&self, label: &str) -> bool {
        self.connections.iter().any(|(l, _)| l == label)
    }

    /// The connection registered under `label`.
    pub fn connection(&mut self, label: &str) -> Result<&mut PgConnection> {
        self.connections
            .iter_mut()
            .find(|(l, _)| l == label)
            .map(|(_, conn)| &mut **conn)
            .ok_or_else(|| Error::Internal(format!("no connection registered under '{label}'")))
    }

    /// Commit every registered connection, in registration order, and clear
    /// the registration set. The first failure aborts and propagates;
    /// connections not yet committed roll back when returned to the pool.
    pub async fn commit(&mut self) -> Result<()> {
        for (_, conn) in &mut self.connections {
            sqlx::query("COMMIT")
                .execute(&mut **conn)
                .await
                .map_err(Error::Database)?;
        }
        self.connections.clear();
        Ok(())
    }

    /// Roll back every registered connection and clear the registration set.
    /// Per-connection rollback failures are logged and swallowed so they do
    /// not mask the error that triggered the rollback.
    pub async fn rollback(&mut self) {
        for (label, conn) in &mut self.connections {
            if let Err(e) = sqlx::query("ROLLBACK").execute(&mut **conn).await {
                tracing::warn!(label = %label, error = %e, "Rollback failed; discarding connection");
            }
        }
        self.connections.clear();
    }
}
