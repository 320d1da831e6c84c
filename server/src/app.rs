use axum::Router;
use axum::routing::{get, post, put};
use tower_http::compression::CompressionLayer;

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics))
        .route("/api/map.svg", get(routes::api::get_map_svg))
        .route("/api/state", get(routes::api::get_state))
        .route("/api/data", put(routes::api::put_data))
        .route("/api/options", put(routes::api::put_options))
        .route("/api/select", post(routes::api::post_select))
        .route("/api/hover", post(routes::api::post_hover))
        .route("/api/events", get(routes::sse::map_events))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use countries_map_shared::CountryNameTable;
    use tower::ServiceExt;

    use super::build_app;
    use crate::state::AppState;

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let app = build_app(AppState::new(CountryNameTable::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/countries")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn write_routes_reject_wrong_methods() {
        let app = build_app(AppState::new(CountryNameTable::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/data")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn large_svg_responses_are_compressed_on_request() {
        let state = AppState::new(CountryNameTable::default());
        let mut markup = String::from("<svg>");
        for i in 0..200 {
            markup.push_str(&format!(r#"<path id="c{i}" class="landxx countryxx" d="M0 0"/>"#));
        }
        markup.push_str("</svg>");
        let document = countries_map_shared::svg::parse(&markup).expect("parse svg");
        state.map.write().await.attach_document(document);

        let response = build_app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/map.svg")
                    .header("accept-encoding", "gzip")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-encoding")
                .and_then(|value| value.to_str().ok()),
            Some("gzip")
        );
    }
}
