use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use crate::aggregator::SchemaAggregator;
use crate::config::{Environment, GatewayConfig};
use crate::docs_router::{docs_router, DocsState, PUBLIC_DOCS_PATH};
use crate::error::{Error, Result};
use crate::identity::IdentityResolver;
use crate::openapi_utils::BaseTemplate;
use crate::registry::LocalRegistry;
use crate::rest_router_builder::ActionRoutes;
use crate::trigger::{spawn_invalidation_listener, spawn_route_refresher};

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// A wired gateway: docs routes, action routes and the topology listeners.
pub struct Gateway {
    pub router: Router,
    pub aggregator: Arc<SchemaAggregator>,
    pub routes: Arc<ActionRoutes>,
    pub invalidation: JoinHandle<()>,
    pub route_refresh: JoinHandle<()>,
}

/// Wires the gateway for the services currently in `registry`.
///
/// Must run inside a tokio runtime.
pub fn build_gateway(
    config: &GatewayConfig,
    registry: Arc<LocalRegistry>,
    template: BaseTemplate,
) -> Result<Gateway> {
    let mut aggregator = SchemaAggregator::new(registry.clone(), template);
    if let Some(dir) = config.schema_output_dir() {
        aggregator = aggregator.with_output_dir(dir);
    }
    let aggregator = Arc::new(aggregator);
    let invalidation = spawn_invalidation_listener(aggregator.clone(), registry.subscribe());

    let resolver: Arc<dyn IdentityResolver> = Arc::new(config.identity_resolver()?);
    let routes = Arc::new(ActionRoutes::new(registry.clone(), Some(resolver))?);
    let route_refresh = spawn_route_refresher(routes.clone(), registry.subscribe());

    // Dispatches through whatever routes are mounted when the request arrives.
    let dispatch = {
        let routes = routes.clone();
        tower::service_fn(move |req: Request<Body>| routes.router().oneshot(req))
    };
    let mut api = match config.api_prefix.trim_end_matches('/') {
        "" => Router::new().fallback_service(dispatch),
        prefix => Router::new().nest_service(prefix, dispatch),
    };
    if config.environment != Environment::Production {
        api = api.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    let docs = docs_router(DocsState {
        aggregator: aggregator.clone(),
        credentials: config.private_docs_credentials(),
    });

    Ok(Gateway {
        router: docs.merge(api),
        aggregator,
        routes,
        invalidation,
        route_refresh,
    })
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: &GatewayConfig, gateway: Gateway) -> Result<()> {
    let address = config.bind_address()?;
    let listener = TcpListener::bind(address)
        .await
        .map_err(|err| Error::Configuration(format!("cannot bind {address}: {err}")))?;

    tracing::info!("🚀 Server running at http://{address}{}", config.api_prefix);
    tracing::info!("📜 OpenAPI docs available at http://{address}{PUBLIC_DOCS_PATH}");

    axum::serve(listener, gateway.router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    gateway.invalidation.abort();
    gateway.route_refresh.abort();
    Ok(())
}
