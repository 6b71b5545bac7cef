//! Entity CRUD routes built from the schema model.
//! Each entity gets static paths bound to its own CrudService, so handlers never look entities up.

use crate::handlers::entity::{create, delete as delete_handler, list, patch, read, replace};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

fn entity_router(service: CrudService) -> Router {
    let base = format!("/{}", service.entity().route_path);
    let item = format!("{}/:id", base);
    Router::new()
        .route(&base, get(list).post(create))
        .route(&item, get(read).put(replace).patch(patch).delete(delete_handler))
        .with_state(service)
}

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn entity_routes(state: AppState) -> Router {
    let mut router = Router::new();
    for service in state.crud_services() {
        tracing::debug!(path = %service.entity().route_path, entity = %service.entity().entity_name, "routes bound");
        router = router.merge(entity_router(service));
    }
    router
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(cors_layer())
}
