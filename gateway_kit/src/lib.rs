//! # Gateway Kit - OpenAPI aggregation and authorization for service gateways
//!
//! `gateway_kit` sits between independently registered services and an HTTP
//! gateway built on `axum`.
//!
//! ## Core Features:
//!
//! - **`SchemaAggregator`**: collects the documentation fragments declared by
//!   every service and action in a [`ServiceRegistry`](registry::ServiceRegistry)
//!   and merges them into two OpenAPI documents, a public (bearer-only) one and
//!   a privileged one. Documents are cached until the registry topology changes.
//!
//! - **`authorize`**: the per-request allow/deny decision over an action's
//!   declared [`ActionAuthPolicy`](auth::ActionAuthPolicy) and the resolved
//!   caller [`Identity`](identity::Identity).
//!
//! - **`ActionRoutes`** and **`docs_router`**: the HTTP boundary, mounting
//!   published actions (remounted whenever the registry changes) and serving `/openapi.json` and `/openapi-private.json`.
//!

pub mod aggregator;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod docs_router;
pub mod error;
pub mod fragment;
pub mod handler;
pub mod identity;
pub mod merge;
pub mod openapi_utils;
pub mod params;
pub mod registry;
pub mod rest_router_builder;
pub mod trigger;

pub use aggregator::{Audience, SchemaAggregator, SchemaSnapshot};
pub use auth::{authorize, ActionAuthPolicy, AuthDecision};
pub use error::{Error, Result};
pub use fragment::{ActionFragment, DocFragment, SecurityRequirement, ServiceFragment};
pub use handler::{action_handler, ActionContext, ActionHandler};
pub use identity::{Credential, Identity};
pub use rest_router_builder::ActionRoutes;
pub use registry::{ActionDescriptor, LocalRegistry, ServiceDefinition, ServiceDescriptor, ServiceRegistry};

// Re-exported so services can build fragments without a direct dependency.
pub use utoipa;
