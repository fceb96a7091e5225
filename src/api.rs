use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

pub use state::*;

mod state;

pub fn create_router(app: App) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/sync/ws", get(sync::connect))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

#[derive(Debug, Serialize)]
pub struct Greeting {
    pub message: &'static str,
}

pub async fn root() -> Json<Greeting> {
    Json(Greeting {
        message: "Hello World",
    })
}

pub mod sync {
    use axum::extract::ws::WebSocketUpgrade;
    use axum::extract::{Query, State};
    use axum::response::Response;
    use futures::StreamExt as _;
    use serde::Deserialize;
    use tracing::instrument;

    use super::App;

    #[derive(Debug, Deserialize)]
    pub struct ConnectParams {
        pub token: Option<String>,
    }

    /// Upgrades to the watch-position sync channel. The token is checked once the socket is open, so that a
    /// rejected peer still receives the `Invalid token` notice.
    #[instrument(skip_all)]
    pub async fn connect(
        State(app): State<App>,
        Query(params): Query<ConnectParams>,
        upgrade: WebSocketUpgrade,
    ) -> Response {
        upgrade.on_upgrade(move |socket| async move {
            let (tx, rx) = socket.split();
            app.serve(params.token, tx, rx).await;
        })
    }
}
