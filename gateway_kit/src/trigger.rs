//! Turns topology changes into schema invalidations and route refreshes.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::aggregator::SchemaAggregator;
use crate::registry::TopologyEvent;
use crate::rest_router_builder::ActionRoutes;

/// Runs `on_change` for every topology event. Missed events count as a
/// change. The task ends when the sender side is dropped.
fn spawn_topology_listener<F>(mut events: broadcast::Receiver<TopologyEvent>, on_change: F) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::debug!(?event, "topology changed");
                    on_change();
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "topology listener lagged");
                    on_change();
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Calls [`SchemaAggregator::invalidate`] on every topology change.
pub fn spawn_invalidation_listener(
    aggregator: Arc<SchemaAggregator>,
    events: broadcast::Receiver<TopologyEvent>,
) -> JoinHandle<()> {
    spawn_topology_listener(events, move || aggregator.invalidate())
}

/// Remounts the action routes on every topology change.
pub fn spawn_route_refresher(
    routes: Arc<ActionRoutes>,
    events: broadcast::Receiver<TopologyEvent>,
) -> JoinHandle<()> {
    spawn_topology_listener(events, move || {
        if let Err(err) = routes.refresh() {
            tracing::warn!(error = %err, "keeping previous action routes");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi_utils::BaseTemplate;
    use crate::registry::{LocalRegistry, ServiceDefinition, ServiceDescriptor};
    use std::time::Duration;

    #[tokio::test]
    async fn registration_marks_schema_stale() {
        let registry = Arc::new(LocalRegistry::new());
        let aggregator = Arc::new(SchemaAggregator::new(registry.clone(), BaseTemplate::default()));
        let listener = spawn_invalidation_listener(aggregator.clone(), registry.subscribe());

        aggregator.get_schema(crate::aggregator::Audience::Public).await.unwrap();
        assert!(aggregator.is_fresh());

        registry.register(ServiceDefinition::new(ServiceDescriptor::new("products")));
        tokio::time::timeout(Duration::from_secs(1), async {
            while aggregator.is_fresh() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("listener did not invalidate");

        drop(registry);
        listener.abort();
    }

    #[tokio::test]
    async fn listener_exits_when_sender_is_dropped() {
        let (tx, rx) = broadcast::channel(4);
        let registry = Arc::new(LocalRegistry::new());
        let aggregator = Arc::new(SchemaAggregator::new(registry, BaseTemplate::default()));
        let listener = spawn_invalidation_listener(aggregator.clone(), rx);

        tx.send(TopologyEvent::Registered("a".into())).unwrap();
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .expect("listener still running")
            .unwrap();
        assert!(!aggregator.is_fresh());
    }

    #[tokio::test]
    async fn registration_mounts_new_routes() {
        use crate::handler::action_handler;
        use crate::registry::ActionDescriptor;
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let registry = Arc::new(LocalRegistry::new());
        let routes = Arc::new(ActionRoutes::new(registry.clone(), None).unwrap());
        let refresher = spawn_route_refresher(routes.clone(), registry.subscribe());

        let status = |routes: Arc<ActionRoutes>| async move {
            let request = Request::builder().uri("/orders").body(Body::empty()).unwrap();
            routes.router().oneshot(request).await.unwrap().status()
        };
        assert_eq!(status(routes.clone()).await, StatusCode::NOT_FOUND);

        registry.register(
            ServiceDefinition::new(
                ServiceDescriptor::new("orders").action(ActionDescriptor::new("list").rest("GET /orders")),
            )
            .with_handler("list", action_handler(|_| async { Ok(serde_json::json!([])) })),
        );
        tokio::time::timeout(Duration::from_secs(1), async {
            while status(routes.clone()).await != StatusCode::OK {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("routes were not refreshed");

        refresher.abort();
    }
}
