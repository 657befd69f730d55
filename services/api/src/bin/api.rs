//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{HttpMailerAdapter, KeywordChatAdapter, LogisticRiskModel, PgAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, login_page_handler, logout_handler},
        middleware::require_auth,
        rest::{
            audit_logs_handler, book_appointment_handler, chat_history_handler,
            confirmation_handler, dashboard_handler, notify_handler, post_chat_message_handler,
            predictions_handler, reports_handler, schedule_form_handler, vehicle_health_handler,
            ApiDoc,
        },
        state::AppState,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::get,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(PgAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("Database migrations complete.");

    // --- 3. Load the Risk Model (fail fast on a bad artifact) ---
    info!("Loading risk model from {}...", config.model_path.display());
    let risk_model = LogisticRiskModel::from_path(&config.model_path, config.risk_threshold)
        .map_err(|e| ApiError::Model(e.to_string()))?;
    info!(
        "Risk model loaded (threshold {:.2}).",
        config.risk_threshold
    );

    // --- 4. Initialize the Remaining Service Adapters ---
    let chat_responder = Arc::new(KeywordChatAdapter::new());

    let mail_relay_url = config
        .mail_relay_url
        .clone()
        .ok_or_else(|| ApiError::Internal("MAIL_RELAY_URL is required".to_string()))?;
    let mailer = Arc::new(HttpMailerAdapter::new(
        mail_relay_url,
        config.mail_from.clone(),
    ));

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        risk_scorer: Arc::new(risk_model),
        chat_responder,
        mailer,
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/login", get(login_page_handler).post(login_handler))
        .route("/confirmation", get(confirmation_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/", get(dashboard_handler))
        .route("/logout", get(logout_handler))
        .route("/vehicle-health", get(vehicle_health_handler))
        .route("/predictions", get(predictions_handler))
        .route("/reports", get(reports_handler))
        .route(
            "/schedule/{vin}",
            get(schedule_form_handler).post(book_appointment_handler),
        )
        .route(
            "/chat/{vin}",
            get(chat_history_handler).post(post_chat_message_handler),
        )
        .route("/notify/{vin}", get(notify_handler))
        .route("/audit-logs", get(audit_logs_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
