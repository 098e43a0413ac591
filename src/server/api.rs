use crate::audio;
use crate::cli::Args;
use crate::models::chat::{ ChatRequest, ChatRequestBody, ChatResponseBody, ErrorBody };
use crate::relay::{ ChatRelay, RelayError };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ DefaultBodyLimit, State, Query, rejection::{ JsonRejection, QueryRejection } },
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use serde::{ Deserialize, Serialize };
use tower::ServiceBuilder;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

#[derive(Deserialize, Default)]
pub struct ChatQuery {
    /// `wav` asks for raw PCM audio to be wrapped in a WAV container.
    pub audio: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    upstream_configured: bool,
    persona: String,
    greeting: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ChatRelay>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { error: message.to_string() })).into_response()
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::MissingCredential =>
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Google API Key is missing"),
            RelayError::EmptyMessage =>
                error_response(StatusCode::BAD_REQUEST, "Message must not be empty"),
            RelayError::Generation(_) =>
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process chat request"),
        }
    }
}

pub fn create_router(relay: Arc<ChatRelay>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(cors).layer(DefaultBodyLimit::max(max_body_bytes)))
        .with_state(AppState { relay })
}

pub async fn start_http_server(
    relay: Arc<ChatRelay>,
    args: Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = args.server_addr.parse::<SocketAddr>()?;
    let app = create_router(relay, args.max_body_bytes);

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("Missing TLS certificate or key path".into());
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("Starting HTTPS API server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        info!("Starting HTTP API server on: http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
        })?;
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn chat_handler(
    State(state): State<AppState>,
    query: Result<Query<ChatQuery>, QueryRejection>,
    body: Result<Json<ChatRequestBody>, JsonRejection>,
) -> Response {
    // Missing credential outranks any problem with the request itself.
    if !state.relay.is_configured() {
        error!("Rejecting chat request: upstream API key is missing");
        return RelayError::MissingCredential.into_response();
    }

    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => {
            warn!("Rejected chat query string: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, "Invalid query string");
        }
    };

    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Rejected oversized chat request body: {}", rejection.body_text());
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
        Err(rejection) => {
            warn!("Rejected chat request body: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let mut resp = match state.relay.respond(ChatRequest::from(body)).await {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };

    if query.audio.as_deref().is_some_and(|f| f.eq_ignore_ascii_case("wav")) {
        resp.audio = resp.audio.map(|a| match audio::wav_inline_audio(&a) {
            Ok(wav) => wav,
            Err(e) => {
                warn!("Could not wrap audio as WAV, returning it unchanged: {}", e);
                a
            }
        });
    }

    (StatusCode::OK, Json(ChatResponseBody::from(resp))).into_response()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let persona = state.relay.persona();
    Json(HealthResponse {
        status: "ok",
        upstream_configured: state.relay.is_configured(),
        persona: persona.name.clone(),
        greeting: persona.greeting.clone(),
    })
}
