//! Local JSON status endpoint.
//!
//! Serves three operations, all O(1) and strictly against [`SharedState`]:
//! the greeting, the display-message update, and the latest reading. The
//! register transport is never touched from here.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::reading::SharedState;

/// Body shape shared by `GET /` and `POST /display`.
#[derive(Debug, Serialize, Deserialize)]
struct DisplayBody {
    msg: String,
}

/// Create the HTTP router.
fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(greeting_handler))
        .route("/display", post(display_handler))
        .route("/data", get(data_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for `GET /`.
async fn greeting_handler(State(state): State<SharedState>) -> Json<DisplayBody> {
    Json(DisplayBody {
        msg: state.display(),
    })
}

/// Handler for `POST /display`.
///
/// A malformed or missing body is rejected by the extractor as a client
/// error before this runs, leaving the message unchanged.
async fn display_handler(
    State(state): State<SharedState>,
    Json(body): Json<DisplayBody>,
) -> Json<DisplayBody> {
    state.set_display(body.msg.clone());
    Json(body)
}

/// Handler for `GET /data`.
async fn data_handler(State(state): State<SharedState>) -> Json<Value> {
    match state.reading() {
        Some(reading) => Json(json!(reading)),
        None => Json(json!({})),
    }
}

/// The status server. Answers strictly from [`SharedState`].
pub struct StatusServer {
    state: SharedState,
}

impl StatusServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve on an already-bound listener until the shutdown signal flips.
    ///
    /// Binding happens in the caller so that a bind failure is fatal at
    /// startup instead of being swallowed inside a task.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.state);

        match listener.local_addr() {
            Ok(addr) => info!(addr = %addr, "Status server listening"),
            Err(_) => info!("Status server listening"),
        }

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("Status server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("Status server error: {}", e))?;

        info!("Status server stopped");
        Ok(())
    }
}
