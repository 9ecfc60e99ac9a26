// routes.rs - Router assembly for the three security tiers
//
// axum applies the last `.layer` first, so each tier lists its middleware
// innermost to outermost: user validation, tenant validation, then JWT.

use axum::{
    http::{HeaderValue, StatusCode},
    middleware::from_fn,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{
    jwt_auth_middleware, require_root_middleware, validate_tenant_middleware, validate_user_middleware,
};

pub fn app() -> Router {
    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected_routes())
        .merge(elevated_routes())
        .layer(cors_layer());

    if config::config().api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }
    app
}

fn public_routes() -> Router {
    use public::auth;

    Router::new()
        .route("/auth/login/:tenant/:user", post(auth::login_post))
        .route("/auth/refresh", post(auth::refresh_post))
}

fn protected_routes() -> Router {
    use protected::*;

    Router::new()
        .route("/api/auth/whoami", get(whoami_get))
        .route("/api/auth/sudo", post(sudo_post))
        .route("/api/users", get(users_list).post(user_create))
        .route("/api/users/:id", patch(user_update).delete(user_delete))
        .route("/api/members", get(members_list).post(member_create))
        .route("/api/members/find", post(members_find))
        .route(
            "/api/members/:id",
            get(member_get).patch(member_update).delete(member_delete),
        )
        .route("/api/members/:id/roles", get(roles_list).post(role_grant))
        .route("/api/members/:id/roles/:role", delete(role_revoke))
        .route("/api/members/:id/exits", get(member_exits))
        .route("/api/members/:id/audit", get(member_audit))
        .route("/api/members/:id/giving/summary", get(member_giving_summary))
        .route("/api/leaders", get(leaders_list))
        .route("/api/cell-groups", get(cell_groups_list).post(cell_group_create))
        .route(
            "/api/cell-groups/:id",
            get(cell_group_get).patch(cell_group_update).delete(cell_group_delete),
        )
        .route("/api/cell-groups/:id/members", get(cell_members_list).post(cell_member_add))
        .route("/api/cell-groups/:id/members/:member_id", delete(cell_member_remove))
        .route("/api/exits", get(exits_list).post(exit_create))
        .route("/api/exits/:id", get(exit_get).patch(exit_update))
        .route("/api/exits/:id/reinstate", post(exit_reinstate))
        .route("/api/giving", get(gifts_list).post(gift_create))
        .route("/api/giving/:id", get(gift_get).patch(gift_update).delete(gift_delete))
        .route("/api/prayer-requests", get(prayer_list).post(prayer_create))
        .route(
            "/api/prayer-requests/:id",
            get(prayer_get).patch(prayer_update).delete(prayer_delete),
        )
        .layer(from_fn(validate_user_middleware))
        .layer(from_fn(validate_tenant_middleware))
        .layer(from_fn(jwt_auth_middleware))
}

fn elevated_routes() -> Router {
    use elevated::root::tenant;

    Router::new()
        .route("/api/root/tenants", get(tenant::tenant_list).post(tenant::tenant_create))
        .route("/api/root/tenants/:name", get(tenant::tenant_show).delete(tenant::tenant_delete))
        .route("/api/root/tenants/:name/restore", post(tenant::tenant_restore))
        .layer(from_fn(require_root_middleware))
        .layer(from_fn(validate_user_middleware))
        .layer(from_fn(validate_tenant_middleware))
        .layer(from_fn(jwt_auth_middleware))
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Flock API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant church management API",
            "endpoints": {
                "public_auth": "/auth/login/:tenant/:user, /auth/refresh",
                "auth": "/api/auth/whoami, /api/auth/sudo",
                "users": "/api/users[/:id]",
                "members": "/api/members[/:id], /api/members/find",
                "leaders": "/api/leaders, /api/members/:id/roles",
                "cell_groups": "/api/cell-groups[/:id][/members]",
                "exits": "/api/exits[/:id][/reinstate]",
                "giving": "/api/giving[/:id]",
                "prayer": "/api/prayer-requests[/:id]",
                "root": "/api/root/tenants[/:name] (requires sudo)",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn index_is_public() {
        let (status, body) = send(Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Flock API");
    }

    #[tokio::test]
    async fn protected_and_elevated_tiers_require_a_token() {
        for uri in ["/api/members", "/api/cell-groups/abc", "/api/root/tenants"] {
            let (status, body) = send(Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["code"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn expired_token_is_rejected_before_any_database_access() {
        let mut claims = crate::auth::Claims::new(
            "grace-chapel".into(),
            "tenant_0123456789abcdef".into(),
            "pastor.j".into(),
            uuid::Uuid::new_v4(),
            crate::types::AccessLevel::Full,
        );
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = crate::auth::generate_jwt(&claims).unwrap();

        let request = Request::get("/api/members")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
