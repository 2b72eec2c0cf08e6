//! Service descriptors and the registry query surface used by the aggregator
//! and the gateway.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use crate::auth::ActionAuthPolicy;
use crate::error::Result;
use crate::fragment::{ActionFragment, ServiceFragment};
use crate::handler::{ActionHandler, BoxFuture};

/// Whether the gateway exposes an action over HTTP. Only `Published` actions
/// are mounted; visibility does not affect documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Published,
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    pub name: String,
    pub auth: Option<ActionAuthPolicy>,
    pub visibility: Visibility,
    /// Gateway routes, `"<METHOD> <path>"`.
    pub rest: Vec<String>,
    pub openapi: Option<ActionFragment>,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth: None,
            visibility: Visibility::default(),
            rest: Vec::new(),
            openapi: None,
        }
    }

    pub fn auth(mut self, policy: ActionAuthPolicy) -> Self {
        self.auth = Some(policy);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Binds the action to one more gateway route.
    pub fn rest(mut self, route: impl Into<String>) -> Self {
        self.rest.push(route.into());
        self
    }

    pub fn openapi(mut self, fragment: impl Into<ActionFragment>) -> Self {
        self.openapi = Some(fragment.into());
        self
    }

    /// The effective policy; an undeclared policy counts as disabled.
    pub fn auth_policy(&self) -> ActionAuthPolicy {
        self.auth.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceSettings {
    pub openapi: Option<ServiceFragment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub settings: ServiceSettings,
    pub actions: Vec<ActionDescriptor>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: ServiceSettings::default(),
            actions: Vec::new(),
        }
    }

    pub fn openapi(mut self, fragment: ServiceFragment) -> Self {
        self.settings.openapi = Some(fragment);
        self
    }

    pub fn action(mut self, action: ActionDescriptor) -> Self {
        self.actions.push(action);
        self
    }

    pub fn find_action(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|action| action.name == name)
    }
}

/// Read-only view of the live services.
///
/// Implementations must enumerate services and their actions in a stable order.
pub trait ServiceRegistry: Send + Sync {
    fn list_services(&self, with_actions: bool) -> BoxFuture<'_, Result<Vec<ServiceDescriptor>>>;
}

/// A descriptor together with the handlers implementing its actions.
#[derive(Clone)]
pub struct ServiceDefinition {
    pub descriptor: ServiceDescriptor,
    handlers: HashMap<String, ActionHandler>,
}

impl ServiceDefinition {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self {
            descriptor,
            handlers: HashMap::new(),
        }
    }

    pub fn with_handler(mut self, action: impl Into<String>, handler: ActionHandler) -> Self {
        self.handlers.insert(action.into(), handler);
        self
    }

    pub fn handler_for(&self, action: &str) -> Option<&ActionHandler> {
        self.handlers.get(action)
    }
}

impl std::fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        handlers.sort();
        f.debug_struct("ServiceDefinition")
            .field("descriptor", &self.descriptor)
            .field("handlers", &handlers)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyEvent {
    Registered(String),
    Unregistered(String),
}

/// In-process registry. Publishes a [`TopologyEvent`] for every change.
pub struct LocalRegistry {
    services: RwLock<Vec<Arc<ServiceDefinition>>>,
    events: broadcast::Sender<TopologyEvent>,
}

impl Default for LocalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            services: RwLock::new(Vec::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TopologyEvent> {
        self.events.subscribe()
    }

    /// Adds a service, replacing one with the same name in place.
    pub fn register(&self, definition: ServiceDefinition) {
        let name = definition.descriptor.name.clone();
        {
            let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
            let definition = Arc::new(definition);
            match services.iter_mut().find(|s| s.descriptor.name == name) {
                Some(slot) => *slot = definition,
                None => services.push(definition),
            }
        }
        tracing::info!(service = %name, "service registered");
        let _ = self.events.send(TopologyEvent::Registered(name));
    }

    pub fn unregister(&self, name: &str) -> bool {
        let removed = {
            let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
            let before = services.len();
            services.retain(|s| s.descriptor.name != name);
            services.len() != before
        };
        if removed {
            tracing::info!(service = %name, "service unregistered");
            let _ = self.events.send(TopologyEvent::Unregistered(name.to_string()));
        }
        removed
    }

    pub fn definitions(&self) -> Vec<Arc<ServiceDefinition>> {
        self.services.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ServiceRegistry for LocalRegistry {
    fn list_services(&self, with_actions: bool) -> BoxFuture<'_, Result<Vec<ServiceDescriptor>>> {
        let descriptors = self
            .definitions()
            .iter()
            .map(|definition| {
                let mut descriptor = definition.descriptor.clone();
                if !with_actions {
                    descriptor.actions.clear();
                }
                descriptor
            })
            .collect();
        Box::pin(async move { Ok(descriptors) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, actions: &[&str]) -> ServiceDefinition {
        let descriptor = actions
            .iter()
            .fold(ServiceDescriptor::new(name), |svc, action| svc.action(ActionDescriptor::new(*action)));
        ServiceDefinition::new(descriptor)
    }

    #[tokio::test]
    async fn enumeration_follows_registration_and_declaration_order() {
        let registry = LocalRegistry::new();
        registry.register(service("products", &["create", "list", "get"]));
        registry.register(service("api", &[]));
        registry.register(service("products", &["list"]));

        let services = registry.list_services(true).await.unwrap();
        let names: Vec<_> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["products", "api"]);
        assert_eq!(services[0].actions.len(), 1);

        let bare = registry.list_services(false).await.unwrap();
        assert!(bare.iter().all(|s| s.actions.is_empty()));
    }

    #[tokio::test]
    async fn changes_are_published() {
        let registry = LocalRegistry::new();
        let mut events = registry.subscribe();
        registry.register(service("products", &[]));
        assert!(registry.unregister("products"));
        assert!(!registry.unregister("products"));

        assert_eq!(events.recv().await.unwrap(), TopologyEvent::Registered("products".into()));
        assert_eq!(events.recv().await.unwrap(), TopologyEvent::Unregistered("products".into()));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn undeclared_auth_is_disabled() {
        let action = ActionDescriptor::new("list");
        assert_eq!(action.auth_policy(), ActionAuthPolicy::Disabled);
        assert_eq!(action.visibility, Visibility::Published);
    }
}
