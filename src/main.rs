use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;
use db::{DayStore, PgDayStore};
use services::trend_cache::TrendCache;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DayStore>,
    pub config: Arc<Config>,
    pub trend_cache: TrendCache,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weightarc_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    // Database (migrations run on connect)
    let db = db::connect(&config.database_url)
        .await
        .expect("Failed to initialize database");

    let state = AppState {
        store: Arc::new(PgDayStore::new(db)),
        trend_cache: TrendCache::new(config.trend_max_lookback_months),
        config: config.clone(),
    };

    let app = build_router(state).layer(cors_layer(&config));

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/status", get(handlers::health::api_status));

    let protected_routes = Router::new()
        // Dashboard windows
        .route("/api/dashboard", get(handlers::dashboard::get_month))
        .route("/api/dashboard/range", get(handlers::dashboard::get_range))
        .route("/api/dashboard/summary", get(handlers::dashboard::get_summary))
        // Day edits
        .route(
            "/api/dashboard/update-day",
            post(handlers::dashboard::update_day),
        )
        .route("/api/days/:date", get(handlers::days::get_day))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        for o in &config.cors_extra_origins {
            if let Ok(hv) = o.parse::<axum::http::HeaderValue>() {
                origins.push(hv);
            }
        }
        origins
    };

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use auth::jwt::{create_token, TokenType};
    use db::memory::InMemoryDayStore;

    const SECRET: &str = "test-secret";

    fn test_state(store: InMemoryDayStore) -> AppState {
        AppState {
            store: Arc::new(store),
            config: Arc::new(Config {
                database_url: String::new(),
                host: "127.0.0.1".into(),
                port: 0,
                frontend_url: "http://localhost:3000".into(),
                cors_extra_origins: Vec::new(),
                jwt_secret: SECRET.into(),
                trend_max_lookback_months: 24,
            }),
            trend_cache: TrendCache::new(24),
        }
    }

    fn bearer(user: Uuid) -> String {
        format!("Bearer {}", create_token(user, TokenType::Access, 900, SECRET))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str, user: Uuid) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, bearer(user))
            .body(Body::empty())
            .unwrap()
    }

    fn update(user: Uuid, body: Value) -> Request<Body> {
        Request::post("/api/dashboard/update-day")
            .header(header::AUTHORIZATION, bearer(user))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_public_routes_need_no_token() {
        let app = build_router(test_state(InMemoryDayStore::new()));

        let (status, body) = send(
            app.clone(),
            Request::get("/api/status").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (status, body) = send(app, Request::get("/readyz").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["database"], "ok");
    }

    #[tokio::test]
    async fn test_dashboard_requires_access_token() {
        let app = build_router(test_state(InMemoryDayStore::new()));
        let user = Uuid::new_v4();

        let (status, body) = send(
            app.clone(),
            Request::get("/api/dashboard").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], 401);

        let refresh = create_token(user, TokenType::Refresh, 900, SECRET);
        let req = Request::get("/api/dashboard")
            .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let expired = create_token(user, TokenType::Access, -3600, SECRET);
        let req = Request::get("/api/dashboard")
            .header(header::AUTHORIZATION, format!("Bearer {expired}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_month_window_with_navigation() {
        let app = build_router(test_state(InMemoryDayStore::new()));

        let (status, body) = send(app, get("/api/dashboard?month=2025-01", Uuid::new_v4())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"].as_array().unwrap().len(), 31);
        assert_eq!(body["chart"]["labels"].as_array().unwrap().len(), 31);
        assert_eq!(body["current_month_name"], "January 2025");
        assert_eq!(body["prev_month"], "2024-12");
        assert_eq!(body["next_month"], "2025-02");
        assert_eq!(body["days"][0]["name"], "Wed, 1st");
    }

    #[tokio::test]
    async fn test_malformed_month_is_rejected() {
        let app = build_router(test_state(InMemoryDayStore::new()));

        let (status, body) = send(app, get("/api/dashboard?month=2025-1", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], 422);
    }

    #[tokio::test]
    async fn test_range_end_before_start_is_rejected() {
        let app = build_router(test_state(InMemoryDayStore::new()));

        let (status, _) = send(
            app,
            get(
                "/api/dashboard/range?start_date=2025-03-10&end_date=2025-03-01",
                Uuid::new_v4(),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_malformed_range_dates_get_json_422() {
        let app = build_router(test_state(InMemoryDayStore::new()));
        let user = Uuid::new_v4();

        for uri in [
            "/api/dashboard/range?start_date=2025-13-01&end_date=2025-03-01",
            "/api/dashboard/range?start_date=2025-03-01&end_date=soon",
            "/api/dashboard/range?start_date=2025-03-01",
        ] {
            let (status, body) = send(app.clone(), get(uri, user)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
            assert_eq!(body["error"]["code"], 422, "{uri}");
            assert!(body["error"]["message"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_malformed_update_body_and_day_path_get_json_422() {
        let app = build_router(test_state(InMemoryDayStore::new()));
        let user = Uuid::new_v4();

        let (status, body) = send(
            app.clone(),
            update(user, json!({ "date": "2025-03-01", "field": "mood", "value": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], 422);

        let (status, body) = send(app, get("/api/days/2025-02-30", user)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], 422);
    }

    #[tokio::test]
    async fn test_update_day_then_read_it_back() {
        let store = InMemoryDayStore::new();
        let app = build_router(test_state(store.clone()));
        let user = Uuid::new_v4();
        let date = Utc::now().date_naive() - Duration::days(1);

        let (status, body) = send(
            app.clone(),
            update(user, json!({ "date": date, "field": "weight", "value": "182.5" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send(
            app.clone(),
            update(user, json!({ "date": date, "field": "exercise_rung", "value": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app.clone(), get(&format!("/api/days/{date}"), user)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["weight"], 182.5);
        assert_eq!(body["effort_level"], 4);
        assert_eq!(body["notes"], Value::Null);

        // Other users see nothing.
        let (_, body) = send(app, get(&format!("/api/days/{date}"), Uuid::new_v4())).await;
        assert_eq!(body["weight"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_day_rejects_invalid_and_future_values() {
        let app = build_router(test_state(InMemoryDayStore::new()));
        let user = Uuid::new_v4();
        let today = Utc::now().date_naive();

        let (status, _) = send(
            app.clone(),
            update(user, json!({ "date": today, "field": "weight", "value": -1 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let tomorrow = today + Duration::days(1);
        let (status, body) = send(
            app,
            update(user, json!({ "date": tomorrow, "field": "notes", "value": "later" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["message"], "Future days cannot be edited");
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_seed() {
        let store = InMemoryDayStore::new();
        let app = build_router(test_state(store.clone()));
        let user = Uuid::new_v4();

        let month = "2025-02";
        store
            .put_weight(user, chrono::NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(), Some(200.0))
            .await;
        store
            .put_weight(user, chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), Some(200.0))
            .await;

        let (_, before) = send(app.clone(), get(&format!("/api/dashboard?month={month}"), user)).await;
        assert_eq!(before["days"][0]["trend"], 200.0);

        let (status, _) = send(
            app.clone(),
            update(user, json!({ "date": "2025-01-05", "field": "weight", "value": 190 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Seed is now 190: 190 + (200 - 190) / 10 = 191.
        let (_, after) = send(app, get(&format!("/api/dashboard?month={month}"), user)).await;
        assert_eq!(after["days"][0]["trend"], 191.0);
        assert_eq!(after["days"][0]["variation"], 9.0);
    }

    #[tokio::test]
    async fn test_summary_reports_streak_and_snapshot() {
        let store = InMemoryDayStore::new();
        let app = build_router(test_state(store.clone()));
        let user = Uuid::new_v4();
        let today = Utc::now().date_naive();

        store.put_weight(user, today - Duration::days(1), Some(180.0)).await;
        store.put_weight(user, today, Some(181.0)).await;

        let (status, body) = send(app, get("/api/dashboard/summary", user)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"].as_array().unwrap().len(), 30);
        assert_eq!(body["stats"]["tracking_streak"], 2);
        assert_eq!(body["stats"]["current_weight"], 181.0);
        assert_eq!(body["stats"]["total_days_logged"], 2);
        // The window opens on a day without data.
        assert_eq!(body["stats"]["thirty_day_change"], Value::Null);
    }
}
