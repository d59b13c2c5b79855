use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod extract;
mod llm;
mod middleware;
mod routes;
mod sessions;
mod state;
mod store;
mod user;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Trener API",
        version = "0.1.0",
        description = "Conversational workout and nutrition tracker: daily notes, chat turns and plan checklists."
    ),
    paths(
        routes::health::health_check,
        routes::notes::get_note,
        routes::notes::put_note,
        routes::notes::append_note,
        routes::classify::classify,
        routes::turn::run_turn,
        routes::workout_plan::today_checklist,
        routes::workout_plan::update_set_state,
        routes::workout_plan::parse_plan_text,
        routes::plans::generate_plan,
        routes::profile::get_profile,
        routes::profile::update_profile,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::notes::NoteBody,
        routes::classify::ClassifyRequest,
        routes::classify::ClassifyResponse,
        routes::turn::TurnBody,
        routes::turn::TurnResponse,
        routes::workout_plan::ParsePlanRequest,
        routes::plans::GeneratePlanRequest,
        routes::plans::GeneratedPlan,
        trener_core::error::ApiError,
        trener_core::notes::Note,
        trener_core::notes::NoteKind,
        trener_core::notes::NoteWrite,
        trener_core::notes::WriteMode,
        trener_core::mode::ModeHint,
        trener_core::intent::Intent,
        trener_core::intent::IntentScores,
        trener_core::plan::ParsedPlan,
        trener_core::plan::PlanParseStrategy,
        trener_core::plan::ExerciseEntry,
        trener_core::plan::SetEntry,
        trener_core::checklist::Checklist,
        trener_core::checklist::ChecklistExercise,
        trener_core::checklist::ChecklistSet,
        trener_core::checklist::SetProgress,
        trener_core::checklist::SetStateUpdate,
        trener_core::profile::UserProfile,
        trener_core::profile::ProfileUpdate,
    )),
    tags(
        (name = "notes", description = "Daily notes per kind"),
        (name = "turns", description = "Conversational turns and plan generation"),
        (name = "workout-plan", description = "Plan parsing and set checklist"),
        (name = "profile", description = "Training profile and goals"),
        (name = "system", description = "Service health")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trener_api=debug,trener_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    if config.llm.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; turns will degrade to fallback replies");
    }
    let generator =
        llm::ChatCompletionsClient::new(config.llm.clone()).expect("Failed to build HTTP client");

    let port = config.port;
    tracing::info!(
        model = %config.llm.model,
        timezone = %config.timezone,
        plan_parser = %config.plan_parse_strategy,
        "configuration loaded"
    );

    let app_state = state::AppState {
        notes: store::PgNoteStore::new(pool.clone()),
        db: pool,
        config: Arc::new(config),
        generator: Arc::new(generator),
        sessions: Arc::new(sessions::SessionStore::new()),
    };

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::notes::router().layer(middleware::rate_limit::standard_layer()))
        .merge(routes::classify::router().layer(middleware::rate_limit::standard_layer()))
        .merge(routes::workout_plan::router().layer(middleware::rate_limit::standard_layer()))
        .merge(routes::profile::router().layer(middleware::rate_limit::standard_layer()))
        .merge(routes::turn::router().layer(middleware::rate_limit::generation_layer()))
        .merge(routes::plans::router().layer(middleware::rate_limit::generation_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::cors::build_cors_layer()),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Trener API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
