use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::{FromRequestParts, Path};
use axum::http::{header, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::{Json, Router};
use serde_json::{Map, Value};

use crate::auth::{authorize, ActionAuthPolicy};
use crate::error::{Error, Result};
use crate::fragment::{Method, RouteKey};
use crate::handler::{ActionContext, ActionHandler};
use crate::identity::{Credential, IdentityResolver};
use crate::registry::{LocalRegistry, ServiceDefinition, Visibility};

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Merges query string, JSON body and path parameters into one object.
///
/// Path parameters are applied last so the route always decides which
/// resource is addressed. Query values stay strings.
async fn extract_and_merge_params(req: Request<Body>) -> Result<Value> {
    let (mut parts, body) = req.into_parts();

    let mut merged = Map::new();
    if let Some(query) = parts.uri.query() {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|err| Error::Validation(format!("invalid query string: {err}")))?;
        merged.extend(pairs.into_iter().map(|(k, v)| (k, Value::String(v))));
    }

    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));
    if is_json {
        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|err| Error::Validation(format!("failed to read request body: {err}")))?;
        if !bytes.is_empty() {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(fields)) => merged.extend(fields),
                Ok(_) => return Err(Error::Validation("JSON body must be an object".into())),
                Err(err) => return Err(Error::Validation(format!("invalid JSON body: {err}"))),
            }
        }
    }

    if let Ok(Path(path_params)) =
        Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await
    {
        merged.extend(path_params.into_iter().map(|(k, v)| (k, Value::String(v))));
    }

    Ok(Value::Object(merged))
}

/// One mounted action.
struct ActionRoute {
    full_name: String,
    policy: Option<ActionAuthPolicy>,
    handler: ActionHandler,
    resolver: Option<Arc<dyn IdentityResolver>>,
}

impl ActionRoute {
    async fn dispatch(&self, req: Request<Body>) -> Response {
        let identity = match (Credential::from_headers(req.headers()), &self.resolver) {
            (Some(credential), Some(resolver)) => resolver.resolve(&credential).await,
            _ => None,
        };

        if let Err(err) = authorize(self.policy.as_ref(), identity.as_ref()).into_result() {
            tracing::debug!(action = %self.full_name, "call denied: {err}");
            return err.into_response();
        }

        let params = match extract_and_merge_params(req).await {
            Ok(params) => params,
            Err(err) => return err.into_response(),
        };
        let ctx = ActionContext::new(params).with_identity(identity);
        match (self.handler)(ctx).await {
            Ok(value) => Json(value).into_response(),
            Err(err) => err.into_response(),
        }
    }
}

/// Mounts the published actions of a set of services as REST routes.
#[derive(Default, Clone)]
pub struct RestRouterBuilder {
    services: Vec<Arc<ServiceDefinition>>,
    resolver: Option<Arc<dyn IdentityResolver>>,
}

impl RestRouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(mut self, services: impl IntoIterator<Item = Arc<ServiceDefinition>>) -> Self {
        self.services.extend(services);
        self
    }

    pub fn identity_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<Router> {
        let mut routes: BTreeMap<String, MethodRouter> = BTreeMap::new();
        let mut seen: HashSet<(String, Method)> = HashSet::new();

        for service in &self.services {
            for action in &service.descriptor.actions {
                if action.visibility != Visibility::Published {
                    continue;
                }
                if action.rest.is_empty() {
                    continue;
                }
                let full_name = format!("{}.{}", service.descriptor.name, action.name);
                let Some(handler) = service.handler_for(&action.name) else {
                    tracing::warn!(action = %full_name, "published action has no handler");
                    continue;
                };
                let route = Arc::new(ActionRoute {
                    full_name: full_name.clone(),
                    policy: action.auth.clone(),
                    handler: handler.clone(),
                    resolver: self.resolver.clone(),
                });

                for rest in &action.rest {
                    let key: RouteKey = rest.parse().map_err(|err| {
                        Error::Configuration(format!("route of `{full_name}`: {err}"))
                    })?;
                    if !seen.insert((key.path.clone(), key.method)) {
                        return Err(Error::Configuration(format!(
                            "route `{key}` of `{full_name}` is already bound"
                        )));
                    }

                    let route = route.clone();
                    let route_handler = move |req: Request<Body>| {
                        let route = route.clone();
                        async move { route.dispatch(req).await }
                    };

                    tracing::info!(action = %full_name, route = %key, "mounted action");
                    let method_router = routes.remove(&key.path).unwrap_or_default();
                    routes.insert(key.path.clone(), method_router.on(key.method.filter(), route_handler));
                }
            }
        }

        Ok(routes
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| router.route(&path, method_router)))
    }
}

/// The action routes of a [`LocalRegistry`], remounted on every [`refresh`](Self::refresh).
pub struct ActionRoutes {
    registry: Arc<LocalRegistry>,
    resolver: Option<Arc<dyn IdentityResolver>>,
    current: ArcSwap<Router>,
}

impl ActionRoutes {
    pub fn new(
        registry: Arc<LocalRegistry>,
        resolver: Option<Arc<dyn IdentityResolver>>,
    ) -> Result<Self> {
        let router = mount(&registry, resolver.clone())?;
        Ok(Self {
            registry,
            resolver,
            current: ArcSwap::from_pointee(router),
        })
    }

    /// Remounts the registry's current actions. On error the previous routes stay in place.
    pub fn refresh(&self) -> Result<()> {
        let router = mount(&self.registry, self.resolver.clone())?;
        self.current.store(Arc::new(router));
        tracing::debug!("action routes refreshed");
        Ok(())
    }

    /// The routes as of now.
    pub fn router(&self) -> Router {
        self.current.load_full().as_ref().clone()
    }
}

fn mount(registry: &LocalRegistry, resolver: Option<Arc<dyn IdentityResolver>>) -> Result<Router> {
    let mut builder = RestRouterBuilder::new().services(registry.definitions());
    if let Some(resolver) = resolver {
        builder = builder.identity_resolver(resolver);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn merges_path_query_and_body() {
        let req = Request::builder()
            .method("POST")
            .uri("/products?price=10&name=from-query")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"from-body"}"#))
            .unwrap();
        let params = extract_and_merge_params(req).await.unwrap();
        assert_eq!(params["price"], "10");
        assert_eq!(params["name"], "from-body");
    }

    #[tokio::test]
    async fn rejects_non_object_bodies() {
        let req = Request::builder()
            .uri("/products")
            .header("content-type", "application/json")
            .body(Body::from("[1,2]"))
            .unwrap();
        let err = extract_and_merge_params(req).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
