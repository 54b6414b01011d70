use axum::Router;
use axum::http::HeaderName;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware;
use crate::middleware::request_id::{MakeRequestUuidV7, REQUEST_ID_HEADER, scope_request_id};
use crate::routes;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Merlin API",
        version = "0.1.0",
        description = "Identity brokering and per-user records (preferences, goal, commitments, session summaries) for the Merlin companion."
    ),
    paths(
        routes::health::liveness,
        routes::health::health_check,
        routes::auth::signup,
        routes::auth::login,
        routes::auth::reset_password,
        routes::preferences::set_preferences,
        routes::preferences::get_preferences,
        routes::goals::set_goal,
        routes::goals::get_goal,
        routes::commitments::add_commitment,
        routes::commitments::get_commitments,
        routes::sessions::save_session,
        routes::sessions::latest_summary,
    ),
    components(schemas(
        merlin_core::error::ApiError,
        merlin_core::identity::NormalizedAuth,
        merlin_core::identity::PublicUser,
        merlin_core::identity::PublicSession,
        merlin_core::records::PreferenceFields,
        merlin_core::records::PreferenceRecord,
        merlin_core::records::CommitmentRecord,
        routes::SuccessResponse,
        routes::health::HealthResponse,
        routes::auth::SignupRequest,
        routes::auth::LoginRequest,
        routes::auth::ResetPasswordRequest,
        routes::preferences::PreferencesResponse,
        routes::goals::SetGoalRequest,
        routes::goals::SetGoalResponse,
        routes::goals::GoalResponse,
        routes::commitments::AddCommitmentRequest,
        routes::sessions::SaveSessionRequest,
        routes::sessions::SummaryResponse,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

/// Every route, without cross-cutting layers or state.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::preferences::router())
        .merge(routes::goals::router())
        .merge(routes::commitments::router())
        .merge(routes::sessions::router())
}

/// The served application: routes, OpenAPI docs, tracing, request ids, CORS.
pub fn build(state: AppState, cors_origins: &[String]) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(router().with_state(state))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuidV7))
                .layer(axum::middleware::from_fn(scope_request_id))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(middleware::cors::build_cors_layer(cors_origins)),
        )
}
