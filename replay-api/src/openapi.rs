//! OpenAPI documentation configuration

use utoipa::OpenApi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Replay API",
        version = "2026.10.1",
        description = "Interactive console sessions on top of a one-shot code execution backend. Every response is wrapped in { success, data, error }.",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Replay Contributors")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "sessions", description = "Run programs and feed them input line by line"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        handlers::create_session_handler,
        handlers::get_session_handler,
        handlers::delete_session_handler,
        handlers::run_handler,
        handlers::input_handler,
        handlers::health_handler,
    ),
    components(
        schemas(
            RunRequest,
            InputRequest,
            ApiError,
            SessionView,
            HealthCheck,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon for API key authentication
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-API-Key"),
                    ),
                ),
            );
        }
    }
}
