use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use packhouse_qc::{config::AppConfig, db, entities::crate_record, AppState};
use serde_json::Value;
use tower::ServiceExt;

/// Helper harness backed by an in-memory SQLite database (single connection,
/// so every request sees the same database).
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = packhouse_qc::app_router().with_state(state.clone());

        Self { router, state }
    }

    /// Send a request with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request should not fail at the transport level")
    }

    /// Send an urlencoded form post, as a browser would.
    pub async fn post_form(&self, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("failed to build form request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request should not fail at the transport level")
    }

    /// Current number of stored records, for no-mutation assertions.
    pub async fn record_count(&self) -> usize {
        self.state
            .services
            .crates
            .list_all()
            .await
            .expect("listing should succeed")
            .len()
    }

    /// Insert a record through the service, returning the stored row.
    pub async fn seed_crate(
        &self,
        puc: &str,
        farm_name: &str,
        commodity: &str,
        date_received: Option<&str>,
        weight: Option<&str>,
    ) -> crate_record::Model {
        let draft = packhouse_qc::services::crates::CrateDraft {
            puc: Some(puc.to_string()),
            farm_name: Some(farm_name.to_string()),
            commodity: Some(commodity.to_string()),
            date_received: date_received.map(str::to_string),
            weight: weight.map(str::to_string),
            ..Default::default()
        };
        self.state
            .services
            .crates
            .create(draft)
            .await
            .expect("seeding should succeed")
    }
}

/// Read a response body as parsed JSON.
pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}

/// Read a response body as UTF-8 text.
pub async fn read_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    String::from_utf8(bytes.to_vec()).expect("response body should be UTF-8")
}
