use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::Utc;
use countries_map_shared::binder::BindSummary;
use countries_map_shared::{
    Bounds, Caption, ChartErrorEvent, ChartEvent, CountriesMap, CountryNameTable, CountryValue,
    Selection,
};
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::warn;

use crate::config::sse_broadcast_buffer;

pub type SharedMap = Arc<RwLock<CountriesMap<CountryNameTable>>>;

/// Pre-serialized SSE event, serialized once and shared by all clients via Arc.
#[derive(Debug, Clone)]
pub struct PreSerializedEvent {
    pub seq: u64,
    pub kind: &'static str,
    pub json: Arc<Bytes>,
}

#[derive(Serialize)]
struct EventEnvelope<'a> {
    seq: u64,
    timestamp: String,
    #[serde(flatten)]
    event: &'a ChartEvent,
}

/// Read-only view of the map served by `/api/state` and the initial SSE frame.
#[derive(Debug, Clone, Serialize)]
pub struct MapStateView {
    pub seq: u64,
    pub loading: bool,
    pub document_loaded: bool,
    pub country_count: usize,
    pub bounds: Bounds,
    pub selection: Option<Selection>,
    pub selection_value: Option<CountryValue>,
    pub caption: Option<Caption>,
    pub last_error: Option<ChartErrorEvent>,
    pub summary: Option<BindSummary>,
}

#[derive(Clone)]
pub struct AppState {
    pub map: SharedMap,
    pub next_seq: Arc<AtomicU64>,
    pub event_tx: broadcast::Sender<PreSerializedEvent>,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    render_passes_total: AtomicU64,
    render_failures_total: AtomicU64,
    select_events_total: AtomicU64,
    hover_requests_total: AtomicU64,
    svg_requests_total: AtomicU64,
    document_loads_total: AtomicU64,
    document_load_failures_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObservabilitySnapshot {
    pub render_passes_total: u64,
    pub render_failures_total: u64,
    pub select_events_total: u64,
    pub hover_requests_total: u64,
    pub svg_requests_total: u64,
    pub document_loads_total: u64,
    pub document_load_failures_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            render_passes_total: self.render_passes_total.load(Ordering::Relaxed),
            render_failures_total: self.render_failures_total.load(Ordering::Relaxed),
            select_events_total: self.select_events_total.load(Ordering::Relaxed),
            hover_requests_total: self.hover_requests_total.load(Ordering::Relaxed),
            svg_requests_total: self.svg_requests_total.load(Ordering::Relaxed),
            document_loads_total: self.document_loads_total.load(Ordering::Relaxed),
            document_load_failures_total: self
                .document_load_failures_total
                .load(Ordering::Relaxed),
        }
    }

    /// Count a render pass by its outcome event.
    pub fn record_pass(&self, event: &ChartEvent) {
        self.render_passes_total.fetch_add(1, Ordering::Relaxed);
        if matches!(event, ChartEvent::Error(_)) {
            self.render_failures_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_select(&self) {
        self.select_events_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hover(&self) {
        self.hover_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_svg_request(&self) {
        self.svg_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_document_load(&self) {
        self.document_loads_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_document_load_failure(&self) {
        self.document_load_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(names: CountryNameTable) -> Self {
        let (event_tx, _) = broadcast::channel(sse_broadcast_buffer());
        Self {
            map: Arc::new(RwLock::new(CountriesMap::new(names))),
            next_seq: Arc::new(AtomicU64::new(0)),
            event_tx,
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    /// Serialize `event` once, assign it the next sequence id and fan it out
    /// to every SSE subscriber. Returns the assigned sequence id.
    pub fn publish(&self, event: &ChartEvent) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let envelope = EventEnvelope {
            seq,
            timestamp: Utc::now().to_rfc3339(),
            event,
        };
        let json = match serde_json::to_vec(&envelope) {
            Ok(json) => Bytes::from(json),
            Err(e) => {
                warn!(seq, error = %e, "failed to serialize chart event");
                return seq;
            }
        };
        // No subscribers is not an error.
        let _ = self.event_tx.send(PreSerializedEvent {
            seq,
            kind: event.name(),
            json: Arc::new(json),
        });
        seq
    }

    pub async fn state_view(&self) -> MapStateView {
        let map = self.map.read().await;
        MapStateView {
            seq: self.next_seq.load(Ordering::Relaxed),
            loading: map.is_loading(),
            document_loaded: map.document().is_some(),
            country_count: map.countries().len(),
            bounds: map.bounds(),
            selection: map.selection().cloned(),
            selection_value: map.selection_value(),
            caption: map.caption(),
            last_error: map.last_error().cloned(),
            summary: map.summary(),
        }
    }
}
