use crate::core::ScheduleEvent;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use voicehub_proto::state::{DisplaySnapshot, DisplayStore};

#[derive(Clone)]
struct HttpState {
    store: Arc<DisplayStore>,
    event_tx: mpsc::Sender<ScheduleEvent>,
}

/// Routes for display surfaces: poll the current text, ask for a refresh.
pub fn router(store: Arc<DisplayStore>, event_tx: mpsc::Sender<ScheduleEvent>) -> Router {
    Router::new()
        .route("/api/display", get(get_display))
        .route("/api/refresh", get(refresh).post(refresh))
        .layer(CorsLayer::permissive())
        .with_state(HttpState { store, event_tx })
}

pub fn start_server(
    bind_address: String,
    port: u16,
    store: Arc<DisplayStore>,
    event_tx: mpsc::Sender<ScheduleEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(store, event_tx);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_display(State(state): State<HttpState>) -> Json<DisplaySnapshot> {
    Json(state.store.get().await)
}

async fn refresh(State(state): State<HttpState>) -> StatusCode {
    info!("HTTP API: refresh requested");
    if state.event_tx.send(ScheduleEvent::Refresh).await.is_err() {
        error!("Failed to send refresh request");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::ACCEPTED
}
