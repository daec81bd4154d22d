//! HTTP transport
//!
//! Exposes the publisher over two GET routes:
//! - `/notify?message=...`: rate limited per caller, then published
//! - `/healthz`: liveness probe, never rate limited
//!
//! The rate limiter and the publisher do not know about each other; they are
//! composed here, in the `notify` handler.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::broker::Publisher;
use crate::config::ServerSettings;
use crate::ratelimit::WindowRateLimiter;
use crate::transport::message::{NotifyParams, NotifyResponse};
use crate::utils::Result;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<Publisher>,
    pub limiter: Arc<WindowRateLimiter>,
    pub trust_forwarded_headers: bool,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/notify", get(notify))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn notify(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<NotifyParams>,
) -> (StatusCode, Json<NotifyResponse>) {
    let identity = client_identity(&headers, peer, state.trust_forwarded_headers);

    if state.limiter.check_limit(&identity) {
        warn!(%identity, "rejected notification: too many requests");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(NotifyResponse::too_many_requests()),
        );
    }

    let message = params.into_message();
    state.publisher.publish(&message);
    info!(%identity, topic = state.publisher.topic(), "accepted notification");

    (
        StatusCode::OK,
        Json(NotifyResponse::Accepted {
            topic: state.publisher.topic().to_string(),
            message,
        }),
    )
}

async fn healthz() -> &'static str {
    "ok"
}

/// Picks the key the rate limiter counts this caller under.
///
/// Forwarding headers are only honoured when the service sits behind a
/// proxy that sets them (`trust_forwarded_headers`); otherwise any caller
/// could pick its own identity.
pub fn client_identity(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_headers: bool) -> String {
    if trust_forwarded_headers {
        if let Some(forwarded_for) = headers.get("x-forwarded-for")
            && let Ok(forwarded_str) = forwarded_for.to_str()
            && let Some(first_ip) = forwarded_str.split(',').next()
            && !first_ip.trim().is_empty()
        {
            return first_ip.trim().to_string();
        }

        if let Some(real_ip) = headers.get("x-real-ip")
            && let Ok(ip_str) = real_ip.to_str()
            && !ip_str.trim().is_empty()
        {
            return ip_str.trim().to_string();
        }
    }

    peer.ip().to_canonical().to_string()
}

/// Binds the HTTP listener. Only called once configuration is known good.
pub async fn bind(settings: &ServerSettings) -> Result<TcpListener> {
    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP listening on :{}", listener.local_addr()?.port());
    Ok(listener)
}

/// Serves requests until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
