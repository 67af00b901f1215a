//! Local HTTP viewer for the annotated stream.
//!
//! Serves the most recent annotated frame and the monitor state over
//! loopback so a browser tab can act as the display surface:
//! - GET /frame returns the latest JPEG (204 while no frame is live)
//! - GET /state returns status, alert color, and warning flag
//! - GET /health is a liveness probe
//!
//! The poller feeds this module through a [`ViewerSink`]; the HTTP side
//! only ever reads.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::capture::SessionOutcome;
use crate::poller::FrameSink;
use crate::transport::FramePacket;
use crate::vision::EmotionLabel;

/// Viewer configuration
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ViewerConfig {
    /// Create a new viewer configuration
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// State shared between the poller-side sink and the HTTP handlers.
pub struct ViewerShared {
    /// Latest published JPEG, if a session is live
    latest_frame: Mutex<Option<Vec<u8>>>,
    /// Wire index of the alert label
    alert: AtomicU8,
    /// Sustained-negative warning flag
    warning: AtomicBool,
    /// Whether frames are currently arriving
    streaming: AtomicBool,
    /// Frames presented since startup
    frames: AtomicU64,
}

impl ViewerShared {
    pub fn new() -> Self {
        Self {
            latest_frame: Mutex::new(None),
            alert: AtomicU8::new(EmotionLabel::NoFace.index()),
            warning: AtomicBool::new(false),
            streaming: AtomicBool::new(false),
            frames: AtomicU64::new(0),
        }
    }

    pub fn alert_label(&self) -> EmotionLabel {
        EmotionLabel::from_index(self.alert.load(Ordering::SeqCst))
            .unwrap_or(EmotionLabel::NoFace)
    }
}

impl Default for ViewerShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Feeds the viewer from the display poller.
pub struct ViewerSink {
    shared: Arc<ViewerShared>,
}

impl ViewerSink {
    pub fn new(shared: Arc<ViewerShared>) -> Self {
        Self { shared }
    }
}

impl FrameSink for ViewerSink {
    fn present(&mut self, packet: &FramePacket, _frame: &image::RgbImage, alert: EmotionLabel) {
        *self.shared.latest_frame.lock().unwrap() = Some(packet.jpeg.clone());
        self.shared.alert.store(alert.index(), Ordering::SeqCst);
        self.shared
            .warning
            .store(packet.info.warning, Ordering::SeqCst);
        self.shared.streaming.store(true, Ordering::SeqCst);
        self.shared.frames.fetch_add(1, Ordering::SeqCst);
    }

    fn show_warning(&mut self) {
        self.shared.warning.store(true, Ordering::SeqCst);
    }

    fn hide_warning(&mut self) {
        self.shared.warning.store(false, Ordering::SeqCst);
    }

    fn session_over(&mut self, _outcome: &SessionOutcome) {
        // The surface goes blank between sessions.
        *self.shared.latest_frame.lock().unwrap() = None;
        self.shared.streaming.store(false, Ordering::SeqCst);
        self.shared.warning.store(false, Ordering::SeqCst);
        self.shared
            .alert
            .store(EmotionLabel::NoFace.index(), Ordering::SeqCst);
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Monitor state response
#[derive(Serialize)]
pub struct StateResponse {
    pub status: String,
    pub alert: String,
    pub alert_color: String,
    pub warning: bool,
    pub frames: u64,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /state
async fn state(State(shared): State<Arc<ViewerShared>>) -> Json<StateResponse> {
    let label = shared.alert_label();
    let status = if shared.streaming.load(Ordering::SeqCst) {
        "streaming"
    } else {
        "idle"
    };
    Json(StateResponse {
        status: status.to_string(),
        alert: label.as_str().to_string(),
        alert_color: label.color_hex().to_string(),
        warning: shared.warning.load(Ordering::SeqCst),
        frames: shared.frames.load(Ordering::SeqCst),
    })
}

/// GET /frame
async fn frame(State(shared): State<Arc<ViewerShared>>) -> Response {
    let latest = shared.latest_frame.lock().unwrap().clone();
    match latest {
        Some(jpeg) => ([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Run the viewer HTTP server
pub async fn run(
    config: ViewerConfig,
    shared: Arc<ViewerShared>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let app = Router::new()
        .route("/health", get(health))
        .route("/frame", get(frame))
        .route("/state", get(state))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(shared);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Viewer listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Viewer shutdown signal received");
            })
            .await
        {
            tracing::error!("Viewer error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
