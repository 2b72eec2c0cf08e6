//! The products service: an in-memory catalogue exposed as gateway actions.

use std::sync::Arc;

use gateway_kit::action_handler;
use gateway_kit::auth::ActionAuthPolicy;
use gateway_kit::registry::{ActionDescriptor, ServiceDefinition, ServiceDescriptor};

pub mod dtos;
pub mod handlers;
pub mod openapi;
pub mod store;

use store::ProductStore;

pub const SERVICE_NAME: &str = "products";

fn protected() -> ActionAuthPolicy {
    ActionAuthPolicy::required(["Basic", "Bearer"])
}

/// Describes the service's actions and binds them to `store`.
pub fn products_service(store: Arc<ProductStore>) -> ServiceDefinition {
    let descriptor = ServiceDescriptor::new(SERVICE_NAME)
        .openapi(openapi::service_fragment())
        .action(
            ActionDescriptor::new("list")
                .auth(ActionAuthPolicy::Disabled)
                .rest("GET /products")
                .openapi(openapi::list_fragment()),
        )
        .action(
            ActionDescriptor::new("get")
                .auth(ActionAuthPolicy::Disabled)
                .rest("GET /products/:id")
                .openapi(openapi::get_fragment()),
        )
        .action(
            ActionDescriptor::new("create")
                .auth(protected())
                .rest("POST /products")
                .openapi(openapi::create_fragment()),
        )
        .action(
            ActionDescriptor::new("update")
                .auth(protected())
                .rest("PUT /products/:id")
                .rest("PATCH /products/:id")
                .openapi(openapi::update_fragments()),
        )
        .action(
            ActionDescriptor::new("remove")
                .auth(protected())
                .rest("DELETE /products/:id")
                .openapi(openapi::remove_fragment()),
        );

    ServiceDefinition::new(descriptor)
        .with_handler("list", {
            let store = store.clone();
            action_handler(move |ctx| handlers::list_products(store.clone(), ctx))
        })
        .with_handler("get", {
            let store = store.clone();
            action_handler(move |ctx| handlers::get_product(store.clone(), ctx))
        })
        .with_handler("create", {
            let store = store.clone();
            action_handler(move |ctx| handlers::create_product(store.clone(), ctx))
        })
        .with_handler("update", {
            let store = store.clone();
            action_handler(move |ctx| handlers::update_product(store.clone(), ctx))
        })
        .with_handler("remove", {
            let store = store.clone();
            action_handler(move |ctx| handlers::remove_product(store.clone(), ctx))
        })
}
