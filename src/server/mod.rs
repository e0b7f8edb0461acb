/// HTTP API Server module for the console
/// Thin axum layer over `core::Console`

#[cfg(feature = "server")]
pub mod routes;

#[cfg(feature = "server")]
pub mod handlers;

#[cfg(feature = "server")]
pub mod error;

#[cfg(feature = "server")]
pub mod static_files;

#[cfg(feature = "server")]
pub mod auth;

#[cfg(feature = "server")]
pub use routes::create_router;

#[cfg(feature = "server")]
use std::sync::Arc;

#[cfg(feature = "server")]
use crate::core::Console;

/// Shared by every handler
#[cfg(feature = "server")]
#[derive(Clone)]
pub struct AppState {
    pub console: Arc<Console>,
    pub api_token: Option<Arc<str>>,
    pub max_upload_bytes: usize,
}

#[cfg(feature = "server")]
impl AppState {
    pub fn new(console: Console, api_token: Option<String>, max_upload_bytes: usize) -> Self {
        Self {
            console: Arc::new(console),
            api_token: api_token.map(Arc::from),
            max_upload_bytes,
        }
    }
}

#[cfg(feature = "server")]
pub async fn run(state: AppState, host: String, port: u16, enable_cors: bool) -> anyhow::Result<()> {
    use std::net::SocketAddr;
    use tracing::{info, warn};

    if state.api_token.is_none() {
        warn!("MONGO_CONSOLE_TOKEN not set - deploy, backup, restore and add-rule are open to anyone who can reach this port");
    }

    let auth_enabled = state.api_token.is_some();
    let app = create_router(state, enable_cors);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("🚀 Mongo Operations Console v{}", crate::cli::get_version());
    println!("   📍 Web UI: http://{}", addr);

    if auth_enabled {
        println!("   🔒 Auth:   Enabled (token required for mutating routes)");
    } else {
        println!("   ⚠️  Auth:   Disabled (no token)");
    }

    println!();
    println!("📚 API Endpoints:");
    println!("   POST /deploy    - Pull latest image and start/update the service");
    println!("   POST /backup    - Download a gzip archive of the database");
    println!("   POST /restore   - Restore from an uploaded archive (field: backupFile)");
    println!("   GET  /logs      - Last log lines");
    println!("   GET  /status    - Container status");
    println!("   POST /add-rule  - Allow an IP to reach the database port");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
