use std::time::Duration;

use tracing::instrument;

use crate::auth::{AuthError, IdentityProvider, MissingTokenSnafu};
use crate::prelude::*;
use crate::store::{ContentCatalog, PairLocks, PositionStore, StoreError};

pub use request::*;
pub use session::*;

mod request;
mod session;

/// What a single sync request did to the stored watch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// First contact for the pair, a position of `00:00:00` was created.
    Seeded(PlaybackTimestamp),
    /// The stored position was overwritten with the reported one.
    Updated(PlaybackTimestamp),
    /// The stored position was read and left untouched.
    Fetched(PlaybackTimestamp),
    /// The referenced content is not in the catalog, nothing was read or written.
    ContentNotFound,
}

impl SyncOutcome {
    /// The authoritative position after the request, if the content exists.
    pub fn timestamp(self) -> Option<PlaybackTimestamp> {
        match self {
            Self::Seeded(timestamp) | Self::Updated(timestamp) | Self::Fetched(timestamp) => {
                Some(timestamp)
            }
            Self::ContentNotFound => None,
        }
    }
}

/// Shared state behind every sync session: the collaborators a session talks to and the lock table for
/// watch positions.
#[derive(Debug)]
pub struct SyncService<A, C, P> {
    identity: A,
    catalog: C,
    positions: P,
    locks: PairLocks,
    idle_timeout: Option<Duration>,
}

impl<A, C, P> SyncService<A, C, P>
where
    A: IdentityProvider + Sync,
    C: ContentCatalog + Sync,
    P: PositionStore + Sync,
{
    pub fn new(identity: A, catalog: C, positions: P) -> Self {
        Self {
            identity,
            catalog,
            positions,
            locks: PairLocks::new(),
            idle_timeout: None,
        }
    }

    /// Close sessions that stay silent for longer than `timeout`. `None` waits forever.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    pub async fn authenticate(&self, token: Option<&str>) -> Result<UserIdentity, AuthError> {
        let token = token.context(MissingTokenSnafu)?;
        self.identity.validate_token(token).await
    }

    /// Applies one request for `user_id`.
    ///
    /// The read and the following write happen under the pair's lock. A pair without a record is always seeded at
    /// `00:00:00`, even when the request carried a timestamp.
    #[instrument(skip_all, fields(%user_id, content_id = %request.content_id))]
    pub async fn sync(
        &self,
        user_id: UserId,
        request: SyncRequest,
    ) -> Result<SyncOutcome, StoreError> {
        let SyncRequest {
            content_id,
            timestamp,
        } = request;

        if !self.catalog.content_exists(content_id).await? {
            return Ok(SyncOutcome::ContentNotFound);
        }

        let _guard = self.locks.lock(user_id, content_id).await;
        let current = self
            .positions
            .get_watch_position(user_id, content_id)
            .await?;

        let outcome = match (current, timestamp) {
            (Some(_), Some(reported)) => {
                self.positions
                    .upsert_watch_position(user_id, content_id, reported)
                    .await?;
                SyncOutcome::Updated(reported)
            }
            (Some(stored), None) => SyncOutcome::Fetched(stored),
            (None, _) => {
                self.positions
                    .upsert_watch_position(user_id, content_id, PlaybackTimestamp::ZERO)
                    .await?;
                SyncOutcome::Seeded(PlaybackTimestamp::ZERO)
            }
        };

        tracing::debug!(?outcome, "synced watch position");
        Ok(outcome)
    }
}
