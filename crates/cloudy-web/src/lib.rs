mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use cloudy_storage::Storage;

pub use routes::files::download_filename;
pub use state::{AppState, ServerConfig};

/// Router serving local objects under `/{serve_files_url}/`.
pub fn build_router(storage: Storage) -> axum::Router {
    routes::build_router(Arc::new(AppState { storage }))
}

/// Start the file server and run until the listener fails.
pub async fn start_file_server(config: ServerConfig, storage: Storage) -> anyhow::Result<()> {
    let app = build_router(storage);

    let addr: SocketAddr = config.listen_addr.parse()?;
    tracing::info!("Starting file server on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
