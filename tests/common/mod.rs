#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::StreamExt as _;
use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use tokio::task::JoinHandle;

use tv_backend::api::SyncChannel;
use tv_backend::auth::{Authenticator, Claims, IdentityProvider};
use tv_backend::database::Database;
use tv_backend::model::{ContentId, PlaybackTimestamp, UserId};
use tv_backend::store::{ContentCatalog, PositionStore};
use tv_backend::sync::{CloseReason, SyncService};

pub const SECRET: &str = "correct horse battery staple";

pub const INA: (i64, &str) = (1, "ina@example.com");
pub const MABELLE: (i64, &str) = (2, "mabelle@example.com");
pub const BIG_BUCK_BUNNY: i64 = 12;
pub const SINTEL: i64 = 13;
pub const MISSING_CONTENT: i64 = 999_999;

const FIXTURES: &str = "
    CREATE type::thing('users', 1) SET email = 'ina@example.com', role = 'user';
    CREATE type::thing('users', 2) SET email = 'mabelle@example.com';
    CREATE type::thing('contents', 12) SET title = 'Big Buck Bunny', duration = '00:09:56';
    CREATE type::thing('contents', 13) SET title = 'Sintel', duration = '00:14:48';
";

pub async fn database() -> Database {
    let db = Database::in_memory().await.unwrap();
    db.sql(FIXTURES).execute().await.unwrap();
    db
}

pub fn authenticator(db: &Database) -> Authenticator {
    Authenticator::new(SecretString::new(SECRET.into()), Algorithm::HS256, db.clone())
}

/// A database with two users and two pieces of content, plus a sync service on top of it.
pub struct Harness {
    pub db: Database,
    pub service: Arc<SyncChannel>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_idle_timeout(None).await
    }

    pub async fn with_idle_timeout(idle_timeout: Option<Duration>) -> Self {
        let db = database().await;
        let service = SyncService::new(authenticator(&db), db.clone(), db.clone())
            .with_idle_timeout(idle_timeout);

        Self {
            db,
            service: Arc::new(service),
        }
    }

    pub fn token(&self, email: &str) -> String {
        token_for(&self.db, email)
    }

    pub fn connect(&self, token: Option<String>) -> Client {
        connect(self.service.clone(), token)
    }

    pub fn connect_as(&self, (_, email): (i64, &str)) -> Client {
        self.connect(Some(self.token(email)))
    }

    pub async fn stored(&self, user_id: i64, content_id: i64) -> Option<PlaybackTimestamp> {
        self.db
            .get_watch_position(UserId(user_id), ContentId(content_id))
            .await
            .unwrap()
    }

    pub async fn record_count(&self) -> usize {
        let ids: Vec<surrealdb::sql::Thing> = self
            .db
            .sql("SELECT VALUE id FROM watch_positions")
            .fetch_first()
            .await
            .unwrap();
        ids.len()
    }
}

pub fn token_for(db: &Database, email: &str) -> String {
    authenticator(db)
        .encode(&Claims::expiring_in(email, chrono::Duration::minutes(15)))
        .unwrap()
}

/// The client end of an in-memory sync connection.
pub struct Client {
    outbound: Option<UnboundedSender<Result<Message, axum::Error>>>,
    inbound: UnboundedReceiver<Message>,
    session: JoinHandle<CloseReason>,
}

/// Runs a session on its own task, wired to a pair of in-memory channels instead of a socket.
pub fn connect<A, C, P>(service: Arc<SyncService<A, C, P>>, token: Option<String>) -> Client
where
    A: IdentityProvider + Send + Sync + 'static,
    C: ContentCatalog + Send + Sync + 'static,
    P: PositionStore + Send + Sync + 'static,
{
    let (client_tx, server_rx) = mpsc::unbounded();
    let (server_tx, client_rx) = mpsc::unbounded();

    let session = tokio::spawn(async move { service.serve(token, server_tx, server_rx).await });

    Client {
        outbound: Some(client_tx),
        inbound: client_rx,
        session,
    }
}

impl Client {
    pub fn send(&self, frame: Message) {
        self.outbound
            .as_ref()
            .expect("client already hung up")
            .unbounded_send(Ok(frame))
            .expect("session stopped reading");
    }

    /// Makes the next read on the server side fail, as a dropped socket would.
    pub fn break_transport(&self, message: &str) {
        let error = std::io::Error::new(std::io::ErrorKind::ConnectionReset, message.to_string());
        self.outbound
            .as_ref()
            .expect("client already hung up")
            .unbounded_send(Err(axum::Error::new(error)))
            .expect("session stopped reading");
    }

    pub fn send_text(&self, text: impl Into<String>) {
        self.send(Message::Text(text.into()));
    }

    pub fn send_json(&self, value: serde_json::Value) {
        self.send_text(value.to_string());
    }

    pub async fn recv(&mut self) -> Option<Message> {
        tokio::time::timeout(Duration::from_secs(5), self.inbound.next())
            .await
            .expect("session did not answer in time")
    }

    pub async fn recv_text(&mut self) -> String {
        match self.recv().await {
            Some(Message::Text(text)) => text,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    /// Sends a request and waits for the reply text.
    pub async fn request(&mut self, value: serde_json::Value) -> String {
        self.send_json(value);
        self.recv_text().await
    }

    /// Asserts the server closed the connection without sending anything else, and returns why.
    pub async fn closed(mut self) -> CloseReason {
        match self.recv().await {
            Some(Message::Close(None)) => {}
            other => panic!("expected a close frame, got {other:?}"),
        }
        assert!(
            self.recv().await.is_none(),
            "nothing should follow the close frame"
        );

        self.session.await.unwrap()
    }

    /// Hangs up from the client side and waits for the session to wind down.
    pub async fn hang_up(mut self) -> CloseReason {
        self.outbound.take();
        self.closed().await
    }
}
