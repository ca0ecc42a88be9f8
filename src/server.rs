//! # Server Configuration
//!
//! This module contains the application state, router setup, and server
//! lifecycle for the Maison Graph API.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::db;
use crate::graph::{
    ActivityNotifier, ConnectionLifecycle, IntroductionWorkflow, LoggingNotifier, MutualGraph,
    StrengthScorer,
};
use crate::handlers;
use crate::repositories::{ConnectionRepository, IntroductionRepository, UserRepository};
use crate::sweeper::ExpirySweeper;
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub notifier: Arc<dyn ActivityNotifier>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: DatabaseConnection) -> Self {
        Self {
            config,
            db,
            notifier: Arc::new(LoggingNotifier),
        }
    }

    fn db_arc(&self) -> Arc<DatabaseConnection> {
        Arc::new(self.db.clone())
    }

    /// Connection lifecycle manager over the shared store.
    pub fn lifecycle(&self) -> ConnectionLifecycle {
        ConnectionLifecycle::new(self.db_arc(), Arc::clone(&self.notifier))
    }

    /// Strength scorer over the shared store.
    pub fn scorer(&self) -> StrengthScorer {
        StrengthScorer::new(self.db_arc(), self.config.policy.clone())
    }

    /// Mutual-connection and suggestion engine over the shared store.
    pub fn mutual(&self) -> MutualGraph {
        MutualGraph::new(self.db_arc(), self.config.policy.clone())
    }

    /// Introduction brokering workflow over the shared store.
    pub fn introductions(&self) -> IntroductionWorkflow {
        IntroductionWorkflow::new(
            self.db_arc(),
            self.config.policy.clone(),
            Arc::clone(&self.notifier),
        )
    }

    pub fn connections(&self) -> ConnectionRepository {
        ConnectionRepository::new(self.db_arc())
    }

    pub fn introduction_repo(&self) -> IntroductionRepository {
        IntroductionRepository::new(self.db_arc())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.db_arc())
    }

    /// State over a fresh in-memory database; for tests that don't need a
    /// migrated schema.
    pub async fn for_tests(config: Arc<AppConfig>) -> Self {
        let db = sea_orm::Database::connect("sqlite::memory:")
            .await
            .expect("in-memory database connects");
        Self::new(config, db)
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let protected = Router::new()
        .route(
            "/connections",
            post(handlers::connections::create_connection)
                .get(handlers::connections::list_connections),
        )
        .route(
            "/connections/{id}/accept",
            put(handlers::connections::accept_connection),
        )
        .route(
            "/connections/{id}/reject",
            put(handlers::connections::reject_connection),
        )
        .route(
            "/connections/{id}",
            delete(handlers::connections::remove_connection),
        )
        .route(
            "/connections/{id}/interactions",
            put(handlers::connections::record_interaction),
        )
        .route(
            "/connections/{id}/strength/recalculate",
            post(handlers::connections::recalculate_strength),
        )
        .route(
            "/connections/status/{user_id}",
            get(handlers::connections::connection_status),
        )
        .route(
            "/connections/mutual/{user_id}",
            get(handlers::connections::mutual_connections),
        )
        .route(
            "/connections/suggestions",
            get(handlers::connections::suggestions),
        )
        .route(
            "/introductions",
            post(handlers::introductions::create_introduction)
                .get(handlers::introductions::list_introductions),
        )
        .route(
            "/introductions/{id}/respond",
            put(handlers::introductions::respond_introduction),
        )
        .route(
            "/introductions/{id}/target-response",
            put(handlers::introductions::target_response),
        )
        .route(
            "/introductions/{id}",
            delete(handlers::introductions::cancel_introduction),
        )
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .merge(protected)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::init_pool(&config).await?;
    migration::Migrator::up(&db, None).await?;

    let config = Arc::new(config);

    if config.profile == "dev" {
        crate::seeds::seed_dev_profiles(&db).await?;
    }

    let state = AppState::new(Arc::clone(&config), db.clone());
    let app = create_app(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    let shutdown = CancellationToken::new();

    let sweeper_handle = if config.sweeper.enabled {
        let sweeper = ExpirySweeper::new(Arc::clone(&config), Arc::new(db.clone()));
        let token = shutdown.clone();
        Some(tokio::spawn(async move { sweeper.run(token).await }))
    } else {
        None
    };

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
    }

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::connections::create_connection,
        crate::handlers::connections::list_connections,
        crate::handlers::connections::accept_connection,
        crate::handlers::connections::reject_connection,
        crate::handlers::connections::remove_connection,
        crate::handlers::connections::connection_status,
        crate::handlers::connections::mutual_connections,
        crate::handlers::connections::suggestions,
        crate::handlers::connections::record_interaction,
        crate::handlers::connections::recalculate_strength,
        crate::handlers::introductions::create_introduction,
        crate::handlers::introductions::list_introductions,
        crate::handlers::introductions::respond_introduction,
        crate::handlers::introductions::target_response,
        crate::handlers::introductions::cancel_introduction,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::connection::ConnectionStatus,
            crate::models::connection::StrengthTrend,
            crate::models::connection::PairStatus,
            crate::models::interaction_event::InteractionKind,
            crate::models::introduction_request::IntroductionStatus,
            crate::models::introduction_request::IntroductionPurpose,
            crate::models::user::VerificationTier,
            crate::error::ApiError,
            crate::handlers::connections::ConnectionDto,
            crate::handlers::connections::CreateConnectionRequestDto,
            crate::handlers::connections::ConnectionsResponse,
            crate::handlers::connections::PairStatusDto,
            crate::handlers::connections::DeletedResponse,
            crate::handlers::connections::MutualConnectionsResponse,
            crate::handlers::connections::SuggestionDto,
            crate::handlers::connections::SuggestionsResponse,
            crate::handlers::connections::RecordInteractionDto,
            crate::handlers::introductions::IntroductionDto,
            crate::handlers::introductions::IntroducerResponseDto,
            crate::handlers::introductions::IntroductionMessageDto,
            crate::handlers::introductions::TargetResponseDto,
            crate::handlers::introductions::RespondAction,
            crate::handlers::introductions::CreateIntroductionDto,
            crate::handlers::introductions::RespondIntroductionDto,
            crate::handlers::introductions::TargetResponseRequestDto,
            crate::handlers::introductions::IntroductionsResponse,
        )
    ),
    info(
        title = "Maison Graph API",
        description = "Relationship graph engine for the Maison professional network",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
