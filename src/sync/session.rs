use std::error::Error as StdError;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt as _, Stream, StreamExt as _};
use tracing::instrument;

use super::{BinaryFrameSnafu, RequestError, SyncRequest, SyncService};
use crate::auth::{AuthError, IdentityProvider};
use crate::prelude::*;
use crate::store::{ContentCatalog, PositionStore, StoreError};

/// A websocket transport failure, whatever the socket implementation.
pub type TransportError = Box<dyn StdError + Send + Sync>;

pub const INVALID_TOKEN: &str = "Invalid token";
pub const CONTENT_NOT_FOUND: &str = "Content not found";

/// Result of handling one inbound frame.
#[derive(Debug)]
pub enum Step {
    Continue,
    Close(CloseReason),
}

/// Why a sync session ended.
#[derive(Debug)]
pub enum CloseReason {
    PeerClosed,
    IdleTimeout,
    Failed(SessionError),
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("could not authenticate the session: {source}"))]
    Unauthorized { source: AuthError },

    #[snafu(display("received a malformed sync request: {source}"))]
    MalformedRequest { source: RequestError },

    #[snafu(display("content {content_id} does not exist"))]
    ContentNotFound { content_id: ContentId },

    #[snafu(display("failed to access watch positions: {source}"))]
    Store { source: StoreError },

    #[snafu(display("websocket transport failed: {source}"))]
    Transport { source: TransportError },
}

impl SessionError {
    /// The text sent to the peer before closing, if this failure has one.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized { .. } => Some(INVALID_TOKEN),
            Self::ContentNotFound { .. } => Some(CONTENT_NOT_FOUND),
            _ => None,
        }
    }
}

impl CloseReason {
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Failed(error) => error.notice(),
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            Self::PeerClosed => tracing::info!("peer closed the sync session"),
            Self::IdleTimeout => tracing::info!("closing idle sync session"),
            Self::Failed(error @ (SessionError::Store { .. } | SessionError::Transport { .. })) => {
                tracing::error!(error = %error, "sync session failed")
            }
            Self::Failed(error) => tracing::warn!(error = %error, "closing sync session"),
        }
    }
}

impl<A, C, P> SyncService<A, C, P>
where
    A: IdentityProvider + Sync,
    C: ContentCatalog + Sync,
    P: PositionStore + Sync,
{
    /// Drives one connection from handshake to close.
    ///
    /// The transport is already accepted at this point; the token is checked first and the rest of the session is
    /// bound to the resulting user. The connection is always closed from this side before returning.
    #[instrument(skip_all, fields(user_id = tracing::field::Empty))]
    pub async fn serve<Tx, Rx, E>(&self, token: Option<String>, mut tx: Tx, mut rx: Rx) -> CloseReason
    where
        Tx: Sink<Message> + Unpin,
        Tx::Error: StdError + Send + Sync + 'static,
        Rx: Stream<Item = Result<Message, E>> + Unpin,
        E: StdError + Send + Sync + 'static,
    {
        let reason = match self.authenticate(token.as_deref()).await {
            Ok(user) => {
                tracing::Span::current().record("user_id", tracing::field::display(user.id));
                tracing::info!("sync session opened");

                let mut session = Session {
                    service: self,
                    user,
                    tx: &mut tx,
                    rx: &mut rx,
                };
                session.run().await
            }
            Err(source) => CloseReason::Failed(SessionError::Unauthorized { source }),
        };

        reason.log();
        close(&mut tx, &reason).await;
        reason
    }
}

struct Session<'a, A, C, P, Tx, Rx> {
    service: &'a SyncService<A, C, P>,
    user: UserIdentity,
    tx: &'a mut Tx,
    rx: &'a mut Rx,
}

impl<A, C, P, Tx, Rx, E> Session<'_, A, C, P, Tx, Rx>
where
    A: IdentityProvider + Sync,
    C: ContentCatalog + Sync,
    P: PositionStore + Sync,
    Tx: Sink<Message> + Unpin,
    Tx::Error: StdError + Send + Sync + 'static,
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    E: StdError + Send + Sync + 'static,
{
    async fn run(&mut self) -> CloseReason {
        loop {
            let step = match self.next_frame().await {
                Ok(Some(frame)) => self
                    .handle(frame)
                    .await
                    .unwrap_or_else(|error| Step::Close(CloseReason::Failed(error))),
                Ok(None) => Step::Close(CloseReason::PeerClosed),
                Err(reason) => Step::Close(reason),
            };

            if let Step::Close(reason) = step {
                return reason;
            }
        }
    }

    async fn next_frame(&mut self) -> Result<Option<Message>, CloseReason> {
        let frame = match self.service.idle_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.rx.next())
                .await
                .map_err(|_| CloseReason::IdleTimeout)?,
            None => self.rx.next().await,
        };

        match frame {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(error)) => Err(CloseReason::Failed(SessionError::Transport {
                source: error.into(),
            })),
            None => Ok(None),
        }
    }

    async fn handle(&mut self, frame: Message) -> Result<Step, SessionError> {
        let text = match frame {
            Message::Text(text) => text,
            Message::Binary(_) => {
                return BinaryFrameSnafu.fail().context(MalformedRequestSnafu);
            }
            // pongs are sent by the transport
            Message::Ping(_) | Message::Pong(_) => return Ok(Step::Continue),
            Message::Close(_) => return Ok(Step::Close(CloseReason::PeerClosed)),
        };

        let request = SyncRequest::parse(&text).context(MalformedRequestSnafu)?;
        let content_id = request.content_id;

        let outcome = self
            .service
            .sync(self.user.id, request)
            .await
            .context(StoreSnafu)?;

        let timestamp = outcome
            .timestamp()
            .context(ContentNotFoundSnafu { content_id })?;

        self.send(timestamp.to_string()).await?;
        Ok(Step::Continue)
    }

    async fn send(&mut self, text: String) -> Result<(), SessionError> {
        self.tx
            .send(Message::Text(text))
            .await
            .map_err(|error| SessionError::Transport {
                source: error.into(),
            })
    }
}

async fn close<Tx>(tx: &mut Tx, reason: &CloseReason)
where
    Tx: Sink<Message> + Unpin,
    Tx::Error: StdError + Send + Sync + 'static,
{
    if let Some(notice) = reason.notice() {
        if let Err(error) = tx.send(Message::Text(notice.to_string())).await {
            tracing::debug!(%error, notice, "could not deliver closing notice");
        }
    }

    // the peer may already be gone, a failed close is not worth reporting
    let _ = tx.send(Message::Close(None)).await;
    let _ = tx.close().await;
}
