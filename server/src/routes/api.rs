use std::fmt::Write as _;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use countries_map_shared::{ChartEvent, ChartSelectEvent, CountriesData, MapOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::state::{AppState, MapStateView, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const SVG_CONTENT_TYPE: &str = "image/svg+xml";

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HoverRequest {
    pub target: String,
    pub hovered: bool,
}

#[derive(Debug, Serialize)]
pub struct HoverResponse {
    /// Id of the country element whose highlight changed, if any.
    pub highlighted: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (document_loaded, countries, loading, summary) = {
        let map = state.map.read().await;
        (
            map.document().is_some(),
            map.countries().len(),
            map.is_loading(),
            map.summary(),
        )
    };
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "document_loaded": document_loaded,
        "countries": countries,
        "loading": loading,
        "summary": summary,
        "observability": {
            "render_passes_total": observability.render_passes_total,
            "render_failures_total": observability.render_failures_total,
            "select_events_total": observability.select_events_total,
            "hover_requests_total": observability.hover_requests_total,
            "svg_requests_total": observability.svg_requests_total,
            "document_loads_total": observability.document_loads_total,
            "document_load_failures_total": observability.document_load_failures_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (document_loaded, countries) = {
        let map = state.map.read().await;
        (map.document().is_some(), map.countries().len())
    };
    let body = render_prometheus_metrics(
        countries,
        document_loaded,
        state.observability.snapshot(),
    );

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    country_count: usize,
    document_loaded: bool,
    observability: ObservabilitySnapshot,
) -> String {
    let gauges = [
        (
            "countries_map_countries",
            "Current number of countries in the resolved map.",
            country_count as u64,
        ),
        (
            "countries_map_document_loaded",
            "Whether a base map document is attached (1 or 0).",
            u64::from(document_loaded),
        ),
    ];
    let counters = [
        (
            "countries_map_render_passes_total",
            "Total render passes.",
            observability.render_passes_total,
        ),
        (
            "countries_map_render_failures_total",
            "Total render passes that ended in an error event.",
            observability.render_failures_total,
        ),
        (
            "countries_map_select_events_total",
            "Total select events produced by clicks.",
            observability.select_events_total,
        ),
        (
            "countries_map_hover_requests_total",
            "Total pointer hover requests.",
            observability.hover_requests_total,
        ),
        (
            "countries_map_svg_requests_total",
            "Total /api/map.svg requests.",
            observability.svg_requests_total,
        ),
        (
            "countries_map_document_loads_total",
            "Total successful base map loads.",
            observability.document_loads_total,
        ),
        (
            "countries_map_document_load_failures_total",
            "Total failed base map loads.",
            observability.document_load_failures_total,
        ),
    ];

    let mut body = String::new();
    for (kind, metrics) in [("gauge", &gauges[..]), ("counter", &counters[..])] {
        for (name, help, value) in metrics {
            let _ = writeln!(body, "# HELP {name} {help}");
            let _ = writeln!(body, "# TYPE {name} {kind}");
            let _ = writeln!(body, "{name} {value}");
        }
    }
    body
}

/// Serve the painted map. The ETag is the CRC32 of the body, so unchanged
/// renders answer conditional requests with 304.
pub async fn get_map_svg(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.observability.record_svg_request();
    let Some(svg) = state.map.read().await.to_svg() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "map document not loaded").into_response();
    };
    let etag = svg_etag(svg.as_bytes());

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response("no-cache", Some(etag.as_str()));
    }

    let mut response = Response::new(Body::from(svg));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(SVG_CONTENT_TYPE));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Ok(etag_header) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

pub async fn get_state(State(state): State<AppState>) -> Json<MapStateView> {
    Json(state.state_view().await)
}

pub async fn put_data(
    State(state): State<AppState>,
    Json(data): Json<CountriesData>,
) -> Json<ChartEvent> {
    let count = data.len();
    let event = state.map.write().await.set_data(data);
    state.observability.record_pass(&event);
    let seq = state.publish(&event);
    info!(seq, countries = count, event = event.name(), "data replaced");
    Json(event)
}

pub async fn put_options(
    State(state): State<AppState>,
    Json(options): Json<MapOptions>,
) -> Json<ChartEvent> {
    let event = state.map.write().await.set_options(options);
    state.observability.record_pass(&event);
    let seq = state.publish(&event);
    info!(seq, event = event.name(), "options replaced");
    Json(event)
}

pub async fn post_select(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> Json<ChartSelectEvent> {
    let event = state
        .map
        .write()
        .await
        .click_element(request.target.as_deref());
    state.observability.record_select();
    let seq = state.publish(&ChartEvent::Select(event.clone()));
    debug!(seq, selected = event.selected, country = %event.country, "select");
    Json(event)
}

pub async fn post_hover(
    State(state): State<AppState>,
    Json(request): Json<HoverRequest>,
) -> Json<HoverResponse> {
    state.observability.record_hover();
    let highlighted = state
        .map
        .write()
        .await
        .hover_element(&request.target, request.hovered);
    Json(HoverResponse { highlighted })
}

fn svg_etag(body: &[u8]) -> String {
    format!("\"map-{:08x}\"", crc32fast::hash(body))
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
