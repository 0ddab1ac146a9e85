use crate::secrets::Secrets;
use anyhow::{Context, Result};
use axum::{extract::Request, middleware, middleware::Next, response::Response, Router};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::info;

/// Client-side configuration artifact, regenerated on every server start.
pub const CONFIG_ARTIFACT: &str = "config.js";

/// Renders the client configuration script with the API key baked in.
pub fn render_config_js(api_key: &str) -> String {
    format!(
        "// Configuration for the Expense Logger app\n\
         const config = {{\n\
         \x20   HUGGINGFACE: {{\n\
         \x20       API_KEY: '{api_key}',\n\
         \x20       MODEL: 'mistralai/Mistral-7B-Instruct-v0.2',\n\
         \x20       MAX_RETRIES: 3,\n\
         \x20       RATE_LIMIT_COOLDOWN: 60000,\n\
         \x20   }},\n\
         \x20   APP: {{\n\
         \x20       VERSION: '{version}',\n\
         \x20       CACHE_KEY: 'classificationCache',\n\
         \x20   }}\n\
         }};\n\
         window.appConfig = config;\n",
        version = env!("CARGO_PKG_VERSION"),
    )
}

/// Writes `config.js` into `dir`. Failure here is fatal for server startup.
pub fn write_config_artifact(dir: &Path, secrets: &Secrets) -> Result<()> {
    let path = dir.join(CONFIG_ARTIFACT);
    fs::write(&path, render_config_js(&secrets.api_key))
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!("Created {}", CONFIG_ARTIFACT);
    Ok(())
}

/// Serves the working directory with a wildcard CORS allow-origin on every
/// response. No routing, no request bodies, no auth.
pub async fn serve(port: u16) -> Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let serve_dir = ServeDir::new(".").append_index_html_on_directories(true);

    let app = Router::new()
        .fallback_service(serve_dir)
        .layer(cors)
        .layer(middleware::from_fn(log_request));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Server running at http://localhost:{port}");
    info!("Press Ctrl+C to stop the server");

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let version = request.version();
    info!("Request: {} {} {:?}", method, path, version);
    next.run(request).await
}
