use std::future::Future;

use tracing::instrument;

use crate::prelude::*;

pub use locks::*;

mod locks;

pub type StoreError = DatabaseError;

/// Existence checks against the content catalog.
pub trait ContentCatalog {
    fn content_exists(
        &self,
        content_id: ContentId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Durable storage of watch positions, one record per (user, content) pair.
pub trait PositionStore {
    fn get_watch_position(
        &self,
        user_id: UserId,
        content_id: ContentId,
    ) -> impl Future<Output = Result<Option<PlaybackTimestamp>, StoreError>> + Send;

    /// Inserts the record for the pair or overwrites its timestamp in place.
    fn upsert_watch_position(
        &self,
        user_id: UserId,
        content_id: ContentId,
        timestamp: PlaybackTimestamp,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl ContentCatalog for Database {
    #[instrument(skip(self))]
    async fn content_exists(&self, content_id: ContentId) -> Result<bool, StoreError> {
        let found: Vec<surrealdb::sql::Thing> = self
            .sql("SELECT VALUE id FROM type::thing('contents', $content)")
            .bind(("content", content_id))
            .fetch_first()
            .await?;

        Ok(!found.is_empty())
    }
}

impl PositionStore for Database {
    #[instrument(skip(self))]
    async fn get_watch_position(
        &self,
        user_id: UserId,
        content_id: ContentId,
    ) -> Result<Option<PlaybackTimestamp>, StoreError> {
        self.sql("SELECT VALUE timestamp FROM type::thing('watch_positions', [$user, $content])")
            .bind(("user", user_id))
            .bind(("content", content_id))
            .fetch_first()
            .await
    }

    #[instrument(skip(self))]
    async fn upsert_watch_position(
        &self,
        user_id: UserId,
        content_id: ContentId,
        timestamp: PlaybackTimestamp,
    ) -> Result<(), StoreError> {
        self.sql(
            "UPDATE type::thing('watch_positions', [$user, $content]) \
             SET user_id = $user, content_id = $content, timestamp = $timestamp, updated_at = time::now()",
        )
        .bind(("user", user_id))
        .bind(("content", content_id))
        .bind(("timestamp", timestamp))
        .execute()
        .await?;

        tracing::debug!(%user_id, %content_id, %timestamp, "stored watch position");
        Ok(())
    }
}
