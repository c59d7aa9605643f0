use chrono::Utc;
use sqlx::SqlitePool;

use common::Result;

/// Chat IDs that receive signal broadcasts.
#[derive(Clone)]
pub struct RecipientStore {
    db: SqlitePool,
}

impl RecipientStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Apply the workspace migrations to `db`.
    pub async fn migrate(db: &SqlitePool) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(db)
            .await
            .map_err(|e| common::Error::Database(e.into()))
    }

    /// Subscribe `chat_id`. Returns `false` if it was already subscribed.
    pub async fn add(&self, chat_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO recipients (chat_id, subscribed_at) VALUES (?1, ?2)
             ON CONFLICT(chat_id) DO NOTHING",
        )
        .bind(chat_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Unsubscribe `chat_id`. Returns `false` if it was not subscribed.
    pub async fn remove(&self, chat_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipients WHERE chat_id = ?1")
            .bind(chat_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All subscribed chat IDs, oldest subscription first.
    pub async fn list(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT chat_id FROM recipients ORDER BY subscribed_at ASC, chat_id ASC",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }

    pub async fn count(&self) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipients")
            .fetch_one(&self.db)
            .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> RecipientStore {
        // One connection so every query sees the same in-memory database.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        RecipientStore::migrate(&db).await.unwrap();
        RecipientStore::new(db)
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let store = store().await;
        assert!(store.add(42).await.unwrap());
        assert!(!store.add(42).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_reports_membership() {
        let store = store().await;
        store.add(1).await.unwrap();
        assert!(store.remove(1).await.unwrap());
        assert!(!store.remove(1).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_returns_all_recipients() {
        let store = store().await;
        for id in [7, -100123, 9] {
            store.add(id).await.unwrap();
        }
        let mut ids = store.list().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![-100123, 7, 9]);
    }
}
