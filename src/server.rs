//! HTTP surface: `POST /convert` plus CORS, body limit, request tracing and
//! an optional static directory for the browser front-end.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ErrorBody;
use crate::relay::ConversionRelay;

/// Inbound `/convert` body.
#[derive(Debug, Default, Deserialize)]
pub struct ConvertRequest {
    #[serde(rename = "cssCode", default)]
    pub css_code: Option<String>,
}

/// Build the application router.
pub fn router(relay: Arc<ConversionRelay>, config: &ServerConfig) -> Result<Router> {
    let mut router = Router::new()
        .route("/convert", post(convert))
        .with_state(relay);

    if let Some(dir) = &config.public_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    Ok(router
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(config)?)
        .layer(TraceLayer::new_for_http()))
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("listening on http://{}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

/// Any origin when none are configured; otherwise exactly the listed ones.
fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if config.allowed_origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin: {:?}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(cors.allow_origin(origins))
}

async fn convert(
    State(relay): State<Arc<ConversionRelay>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Response {
    // An unreadable body is treated like a missing cssCode, except when it is
    // simply too big.
    let css_code = match payload {
        Ok(Json(request)) => request.css_code,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("request body over the size limit");
            let body = ErrorBody {
                error: "CSS input is too large".to_string(),
                details: None,
            };
            return (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response();
        }
        Err(rejection) => {
            debug!("unreadable request body: {}", rejection.body_text());
            None
        }
    };

    match relay.convert(css_code.as_deref()).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}
