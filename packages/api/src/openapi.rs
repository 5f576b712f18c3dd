use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

/// Security scheme modifier to add authentication methods
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        // Session bearer token minted by the auth service
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HyperDX Ingestion Control Plane",
        description = "Tenant-scoped ingestion credentials, shard assignment, \
                       storage provisioning, and collector configuration. \
                       The OpAMP endpoint is binary and not described here."
    ),
    paths(
        crate::routes::health::health,
        crate::routes::health::db_health,
        crate::routes::teams::create_team::create_team,
        crate::routes::teams::list_teams::list_teams,
        crate::routes::ingestion_tokens::list_tokens::list_tokens,
        crate::routes::ingestion_tokens::create_token::create_token,
        crate::routes::ingestion_tokens::rotate_token::rotate_token,
        crate::routes::ingestion_tokens::revoke_token::revoke_token,
        crate::routes::ingestion_tokens::assign_shard::assign_shard,
        crate::routes::sources::list_sources::list_sources,
        crate::routes::sources::get_source::get_source,
        crate::routes::sources::update_source::update_source,
        crate::routes::sources::delete_source::delete_source,
    ),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "teams", description = "Tenant lifecycle"),
        (name = "ingestion-tokens", description = "Ingestion credential lifecycle"),
        (name = "sources", description = "Canonical query-time sources")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;
