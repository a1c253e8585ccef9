//! WebSocket gateway server built on axum.

use super::GatewayConfig;
use super::connection::ConnectionManager;
use crate::config::SessionConfig;
use crate::fleet::FleetService;
use crate::output::{ChannelSink, CmdStatus, OutputFormatter};
use crate::session::Session;
use axum::{
    Router,
    extract::{
        ConnectInfo, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Writers get at least this long to flush when a connection ends.
const MIN_FLUSH_WAIT: Duration = Duration::from_millis(100);

/// State shared by every connection of one gateway.
pub struct GatewayState {
    fleet: Arc<dyn FleetService>,
    config: GatewayConfig,
    session_defaults: SessionConfig,
    connections: Mutex<ConnectionManager>,
    started_at: Instant,
    shutdown: CancellationToken,
}

/// Thread-safe shared gateway reference for axum handlers.
pub type SharedGateway = Arc<GatewayState>;

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("config", &self.config)
            .field("session_defaults", &self.session_defaults)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl GatewayState {
    pub fn new(
        fleet: Arc<dyn FleetService>,
        config: GatewayConfig,
        session_defaults: SessionConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let connections = Mutex::new(ConnectionManager::new(config.max_connections));
        Self {
            fleet,
            config,
            session_defaults,
            connections,
            started_at: Instant::now(),
            shutdown,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Uptime in seconds since the gateway was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub async fn active_connections(&self) -> usize {
        self.connections.lock().await.active_count()
    }

    /// A fresh session writing to `out`, in the configured initial modes.
    pub fn new_session(&self, out: Arc<OutputFormatter>) -> Session {
        Session::new(
            Arc::clone(&self.fleet),
            out,
            self.session_defaults.auto_discovery,
        )
    }

    /// Write the goodbye to every live connection. Returns how many were
    /// still waiting for one.
    pub async fn say_goodbye(&self) -> usize {
        let outputs = self.connections.lock().await.snapshot();
        outputs.iter().filter(|out| out.goodbye()).count()
    }
}

/// Build an axum Router with `/ws` and `/health` routes.
pub fn router(shared: SharedGateway) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(gw): State<SharedGateway>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, gw, peer.to_string()))
}

/// Health check endpoint.
async fn health_handler(State(gw): State<SharedGateway>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "connections": gw.active_connections().await,
        "uptime_secs": gw.uptime_secs(),
    });
    axum::Json(body)
}

/// Serve one console session over a WebSocket connection.
async fn handle_socket(socket: WebSocket, gw: SharedGateway, peer: String) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(gw.config.outbound_queue.max(1));

    // Single writer: replies and log deliveries all pass through here.
    let mut writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            tracing::info!("--> {}", text.trim_end());
            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                tracing::debug!("client went away while sending");
                break;
            }
        }
        let _ = sender.close().await;
    });

    let out = Arc::new(OutputFormatter::new(
        ChannelSink::new(tx),
        gw.session_defaults.json,
    ));
    let conn_id = gw
        .connections
        .lock()
        .await
        .add_connection(&peer, Arc::clone(&out));

    match conn_id {
        Some(conn_id) => {
            tracing::info!(peer = %peer, connection = %conn_id, "client connected");
            let session = gw.new_session(Arc::clone(&out));
            serve_session(&gw, conn_id, session, &out, &mut receiver).await;
            let active = {
                let mut connections = gw.connections.lock().await;
                connections.remove_connection(&conn_id);
                connections.active_count()
            };
            tracing::info!(peer = %peer, active, "client disconnected");
        }
        None => {
            tracing::warn!(peer = %peer, "connection refused, gateway at capacity");
            out.error(
                "connect",
                "server at maximum connections",
                CmdStatus::GenericError,
                "",
            );
        }
    }

    // The writer drains once the last sender (held by the formatter) is gone.
    drop(out);
    let wait = Duration::from_millis(gw.config.goodbye_grace_ms).max(MIN_FLUSH_WAIT);
    if tokio::time::timeout(wait, &mut writer).await.is_err() {
        tracing::debug!(peer = %peer, "writer did not drain in time");
        writer.abort();
    }
}

/// Read frames and run each as a command line until the client leaves, the
/// session quits or the gateway shuts down.
async fn serve_session(
    gw: &SharedGateway,
    conn_id: Uuid,
    session: Session,
    out: &Arc<OutputFormatter>,
    receiver: &mut futures::stream::SplitStream<WebSocket>,
) {
    let mut session = Some(session);
    loop {
        let frame = tokio::select! {
            _ = gw.shutdown.cancelled() => {
                out.goodbye();
                break;
            }
            frame = receiver.next() => frame,
        };
        let line = match frame {
            Some(Ok(WsMessage::Text(text))) => text.to_string(),
            Some(Ok(WsMessage::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::warn!(connection = %conn_id, error = %e, "connection lost");
                break;
            }
        };
        tracing::info!("<-- {line}");
        gw.connections.lock().await.touch(&conn_id);

        let Some(mut current) = session.take() else {
            break;
        };
        let ran = tokio::task::spawn_blocking(move || {
            let status = current.execute_line(&line);
            (current, status)
        })
        .await;
        match ran {
            Ok((current, status)) => {
                tracing::debug!(connection = %conn_id, ?status, "command finished");
                if current.exit_requested() {
                    out.goodbye();
                    tracing::info!(connection = %conn_id, "quit received, shutting down");
                    gw.shutdown.cancel();
                    break;
                }
                session = Some(current);
            }
            Err(e) => {
                tracing::error!(connection = %conn_id, error = %e, "command task failed");
                break;
            }
        }
    }
}

/// Start the gateway server on the configured address.
///
/// Runs until the gateway's shutdown token is cancelled, then says goodbye to
/// every connected client and gives the frames the configured grace period.
pub async fn run(gw: SharedGateway) -> Result<(), std::io::Error> {
    let addr = gw.config().bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "websocket gateway listening");

    let app = router(Arc::clone(&gw)).into_make_service_with_connect_info::<SocketAddr>();
    let on_shutdown = Arc::clone(&gw);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            on_shutdown.shutdown.cancelled().await;
            let notified = on_shutdown.say_goodbye().await;
            tracing::info!(notified, "shutdown requested, goodbye sent to clients");
        })
        .await?;

    tokio::time::sleep(Duration::from_millis(gw.config().goodbye_grace_ms)).await;
    tracing::info!("websocket gateway stopped");
    Ok(())
}
