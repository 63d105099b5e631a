use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use server::AppState;
use server::auth::token::TokenCodec;
use server::database::schema::open_database;
use server::handlers::http::routes::build_api_router;
use server::handlers::http::utils::{deliver_error_json, full};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = shared::config::load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    // validate_config already guaranteed this resolves and is long enough.
    let secret = config
        .auth
        .resolved_session_secret()
        .context("Session secret is not configured")?;

    let db = open_database(&config.database.path, config.server.max_connections as u32)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;
    info!("Database ready at {}", config.database.path);

    let codec = TokenCodec::new(
        &secret,
        Duration::from_secs(config.auth.token_expiry_secs()),
    );

    let state = AppState {
        db,
        codec: Arc::new(codec),
        config: Arc::new(config),
    };

    let router = Arc::new(build_api_router());

    let addr = state.config.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                error!("Failed to accept connection: {}", err);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let router = Arc::clone(&router);
        let state = state.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let router = Arc::clone(&router);
                let state = state.clone();
                async move {
                    let response = match router.route(req, state).await {
                        Ok(response) => response,
                        Err(err) => {
                            error!("Handler error: {:#}", err);
                            internal_error_response()
                        }
                    };
                    Ok::<_, Infallible>(response)
                }
            });

            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, service)
                .await
            {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

/// Last-resort 500. Never panics: if even the JSON helper fails, fall back
/// to a hand-assembled response.
fn internal_error_response()
-> Response<http_body_util::combinators::BoxBody<bytes::Bytes, Infallible>> {
    deliver_error_json(
        "INTERNAL_ERROR",
        "An internal error occurred",
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .unwrap_or_else(|_| {
        let mut response =
            Response::new(full(r#"{"status":"error","code":"INTERNAL_ERROR"}"#));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
