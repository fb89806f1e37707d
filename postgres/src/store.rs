//! Pool-backed store and transaction handle.

use showgrid_core::{
    EventRecord, EventSelector, Include, ListQuery, NewEvent, NewShow, ShowCatalog, ShowFilter,
    ShowPatch, ShowRecord, ShowStore, ShowTransaction, StoreError,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::Mutex;

use crate::{classify, queries};

/// `PostgreSQL`-backed implementation of [`ShowStore`].
///
/// Direct calls auto-commit on a pooled connection; [`ShowStore::begin`]
/// opens a transaction whose handle speaks the same catalog contract.
#[derive(Clone)]
pub struct PgShowStore {
    pool: PgPool,
}

impl PgShowStore {
    /// Connect to the given database URL with a small default pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Service`] if the connection cannot be
    /// established.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(classify)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `shows` and `events` tables if they do not exist.
    ///
    /// `events.show_id` deliberately carries no foreign key: the service
    /// layer owns the association and deletes shows before their events
    /// within one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(classify)?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS shows (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT
            )
            ",
        )
        .execute(&mut *conn)
        .await
        .map_err(classify)?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                show_id TEXT,
                kind TEXT NOT NULL
            )
            ",
        )
        .execute(&mut *conn)
        .await
        .map_err(classify)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_show_id ON events(show_id)")
            .execute(&mut *conn)
            .await
            .map_err(classify)?;

        tracing::debug!("show catalog schema is in place");
        Ok(())
    }
}

impl ShowCatalog for PgShowStore {
    fn count_shows(
        &self,
        filter: Option<ShowFilter>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            queries::count_shows(&mut conn, filter.as_ref()).await
        })
    }

    fn find_shows(
        &self,
        query: ListQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ShowRecord>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            queries::find_shows(&mut conn, &query).await
        })
    }

    fn find_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            queries::find_show(&mut conn, &id, include).await
        })
    }

    fn create_show(
        &self,
        data: NewShow,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<ShowRecord, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            queries::create_show(&mut conn, data, include).await
        })
    }

    fn update_show(
        &self,
        id: &str,
        patch: ShowPatch,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            queries::update_show(&mut conn, &id, patch, include).await
        })
    }

    fn delete_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            queries::delete_show(&mut conn, &id, include).await
        })
    }

    fn find_events(
        &self,
        selector: EventSelector,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<EventRecord>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            queries::find_events(&mut conn, &selector).await
        })
    }

    fn create_events(
        &self,
        rows: Vec<NewEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            queries::create_events(&mut conn, rows).await
        })
    }

    fn delete_events(
        &self,
        ids: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            queries::delete_events(&mut conn, &ids).await
        })
    }
}

impl ShowStore for PgShowStore {
    fn begin(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn ShowTransaction>, StoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let tx = self.pool.begin().await.map_err(classify)?;
            Ok(Box::new(PgShowTransaction { tx: Mutex::new(tx) }) as Box<dyn ShowTransaction>)
        })
    }
}

/// An open transaction on a [`PgShowStore`].
///
/// Dropped without [`ShowTransaction::commit`], the underlying transaction
/// rolls back when the connection returns to the pool.
pub struct PgShowTransaction {
    tx: Mutex<Transaction<'static, Postgres>>,
}

impl ShowCatalog for PgShowTransaction {
    fn count_shows(
        &self,
        filter: Option<ShowFilter>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.tx.lock().await;
            queries::count_shows(&mut tx, filter.as_ref()).await
        })
    }

    fn find_shows(
        &self,
        query: ListQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ShowRecord>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.tx.lock().await;
            queries::find_shows(&mut tx, &query).await
        })
    }

    fn find_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut tx = self.tx.lock().await;
            queries::find_show(&mut tx, &id, include).await
        })
    }

    fn create_show(
        &self,
        data: NewShow,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<ShowRecord, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.tx.lock().await;
            queries::create_show(&mut tx, data, include).await
        })
    }

    fn update_show(
        &self,
        id: &str,
        patch: ShowPatch,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut tx = self.tx.lock().await;
            queries::update_show(&mut tx, &id, patch, include).await
        })
    }

    fn delete_show(
        &self,
        id: &str,
        include: Include,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShowRecord>, StoreError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut tx = self.tx.lock().await;
            queries::delete_show(&mut tx, &id, include).await
        })
    }

    fn find_events(
        &self,
        selector: EventSelector,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<EventRecord>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.tx.lock().await;
            queries::find_events(&mut tx, &selector).await
        })
    }

    fn create_events(
        &self,
        rows: Vec<NewEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.tx.lock().await;
            queries::create_events(&mut tx, rows).await
        })
    }

    fn delete_events(
        &self,
        ids: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.tx.lock().await;
            queries::delete_events(&mut tx, &ids).await
        })
    }
}

impl ShowTransaction for PgShowTransaction {
    fn commit(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>> {
        Box::pin(async move {
            self.tx.into_inner().commit().await.map_err(classify)
        })
    }

    fn rollback(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>> {
        Box::pin(async move {
            self.tx.into_inner().rollback().await.map_err(classify)
        })
    }
}
