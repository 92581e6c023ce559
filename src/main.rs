use axum::{
    debug_handler,
    extract::State,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use nestline::{relay, AppResult, AppState};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nestline=debug,info")),
        )
        .init();

    let database_url =
        dotenv::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:nestline.db?mode=rwc".to_owned());
    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&database_url)
        .await
        .unwrap();

    let store = relay::SqliteMessageStore::new(db_pool.clone());
    store.migrate().await.unwrap();

    let app_state = AppState {
        db_pool,
        relay: relay::Relay::new(store),
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .merge(relay::router())
        .layer(cors_layer())
        .with_state(app_state);

    let bind_addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:6060".to_owned());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    info!(addr = %bind_addr, "relay listening");
    axum::serve(listener, app).await.unwrap();
}

// comma-separated FRONTEND_URL, same contract the presentation clients
// already rely on
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = dotenv::var("FRONTEND_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_owned())
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
}

#[debug_handler]
async fn health(State(db_pool): State<SqlitePool>) -> AppResult<Json<Value>> {
    sqlx::query("SELECT 1").execute(&db_pool).await?;
    Ok(Json(json!({
        "status": "ok",
        "time": Utc::now().timestamp_millis(),
    })))
}
