//! `/openapi.json` and `/openapi-private.json`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::aggregator::{Audience, SchemaAggregator};
use crate::identity::{BasicCredentials, Credential};

pub const PUBLIC_DOCS_PATH: &str = "/openapi.json";
pub const PRIVATE_DOCS_PATH: &str = "/openapi-private.json";

#[derive(Clone)]
pub struct DocsState {
    pub aggregator: Arc<SchemaAggregator>,
    pub credentials: BasicCredentials,
}

pub fn docs_router(state: DocsState) -> Router {
    Router::new()
        .route(PUBLIC_DOCS_PATH, get(public_schema))
        .route(PRIVATE_DOCS_PATH, get(private_schema))
        .with_state(state)
        .layer(docs_cors_layer())
}

fn docs_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600))
}

async fn public_schema(State(state): State<DocsState>) -> Response {
    serve(&state.aggregator, Audience::Public).await
}

async fn private_schema(State(state): State<DocsState>, headers: HeaderMap) -> Response {
    let credential = Credential::from_headers(&headers);
    if !state.credentials.matches(credential.as_ref()) {
        tracing::debug!("rejected private OpenAPI request");
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"401\"")],
            "Authentication required",
        )
            .into_response();
    }
    serve(&state.aggregator, Audience::Privileged).await
}

async fn serve(aggregator: &SchemaAggregator, audience: Audience) -> Response {
    match aggregator.get_schema(audience).await {
        Ok(doc) => Json(doc.as_ref()).into_response(),
        Err(err) => err.into_response(),
    }
}
