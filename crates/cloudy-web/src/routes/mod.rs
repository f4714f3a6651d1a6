pub mod files;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use cloudy_core::types::ProviderType;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Route prefix for served files, or `None` when file serving is off.
///
/// Only local storage is served; cloud objects have their own URLs.
pub fn file_route(state: &AppState) -> Option<String> {
    let config = state.storage.config();
    if state.storage.driver().kind() != ProviderType::Local || !config.serve_files {
        return None;
    }
    let prefix = config.serve_files_url.trim().trim_matches('/');
    if prefix.is_empty() {
        tracing::warn!("cannot serve files: 'serve_files_url' is not set");
        return None;
    }
    Some(format!("/{prefix}/{{*name}}"))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();
    if let Some(route) = file_route(&state) {
        tracing::debug!(%route, "serving local files");
        router = router.route(&route, get(files::serve_file));
    }
    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
