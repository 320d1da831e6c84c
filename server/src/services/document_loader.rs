use std::path::{Path, PathBuf};
use std::time::SystemTime;

use countries_map_shared::document::MapDocument;
use countries_map_shared::error::LOADING_ERROR_MESSAGE;
use countries_map_shared::{ChartErrorCode, ChartErrorEvent, ChartEvent, svg};
use tracing::{info, warn};

use crate::config::document_reload_interval;
use crate::state::AppState;

/// What the loader last saw on disk.
#[derive(Debug, Default)]
pub struct DocumentWatch {
    last_modified: Option<SystemTime>,
    last_failure: Option<String>,
}

pub async fn run(state: AppState, path: PathBuf) {
    let mut interval = tokio::time::interval(document_reload_interval());
    let mut watch = DocumentWatch::default();

    // Load immediately on startup, then whenever the file changes
    loop {
        interval.tick().await;
        poll(&state, &path, &mut watch).await;
    }
}

/// Reload the base map if its modification time moved. Returns the event
/// published for this poll, if any.
///
/// A failure is published once; the same failure on later polls stays quiet
/// until the file changes or loads successfully.
pub async fn poll(state: &AppState, path: &Path, watch: &mut DocumentWatch) -> Option<ChartEvent> {
    let modified = match tokio::fs::metadata(path).await.and_then(|meta| meta.modified()) {
        Ok(modified) => modified,
        Err(e) => {
            watch.last_modified = None;
            return report_failure(state, watch, format!("failed to stat {}: {e}", path.display()));
        }
    };
    if watch.last_modified == Some(modified) {
        return None;
    }
    watch.last_modified = Some(modified);

    let document = match load_document(path).await {
        Ok(document) => document,
        Err(e) => return report_failure(state, watch, e),
    };

    let nodes = document.len();
    let event = state.map.write().await.attach_document(document);
    watch.last_failure = None;
    state.observability.record_document_load();
    state.observability.record_pass(&event);
    let seq = state.publish(&event);
    info!(seq, nodes, path = %path.display(), event = event.name(), "loaded base map");
    Some(event)
}

async fn load_document(path: &Path) -> Result<MapDocument, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    svg::parse(&text).map_err(|e| format!("failed to parse {}: {e}", path.display()))
}

fn report_failure(state: &AppState, watch: &mut DocumentWatch, message: String) -> Option<ChartEvent> {
    if watch.last_failure.as_deref() == Some(message.as_str()) {
        return None;
    }
    warn!(error = %message, "base map unavailable");
    state.observability.record_document_load_failure();
    let event = ChartEvent::Error(ChartErrorEvent {
        id: ChartErrorCode::Loading.into(),
        message: LOADING_ERROR_MESSAGE.to_owned(),
        detailed_message: Some(message.clone()),
    });
    watch.last_failure = Some(message);
    state.publish(&event);
    Some(event)
}
