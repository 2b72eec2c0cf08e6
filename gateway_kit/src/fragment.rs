//! Documentation fragments contributed by services and their actions.
//!
//! Fragments are plain data: the aggregator reads and merges them, never
//! mutates them.

use std::fmt;
use std::str::FromStr;

use axum::routing::MethodFilter;
use serde::{Deserialize, Serialize};
use utoipa::openapi::path::{Operation, OperationBuilder, Parameter, PathItem};
use utoipa::openapi::request_body::RequestBody;
use utoipa::openapi::security::SecurityRequirement as OpenApiSecurityRequirement;
use utoipa::openapi::{Components, Paths, RefOr, Response, Responses, Server, Tag};

use crate::error::Error;

pub const BEARER_AUTH: &str = "bearerAuth";
pub const BASIC_AUTH: &str = "basicAuth";

/// Credential scheme an operation needs, as named in `components.securitySchemes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SecurityScheme {
    BearerAuth,
    BasicAuth,
    Other(String),
}

impl SecurityScheme {
    pub fn as_str(&self) -> &str {
        match self {
            SecurityScheme::BearerAuth => BEARER_AUTH,
            SecurityScheme::BasicAuth => BASIC_AUTH,
            SecurityScheme::Other(name) => name,
        }
    }
}

impl From<String> for SecurityScheme {
    fn from(name: String) -> Self {
        match name.as_str() {
            BEARER_AUTH => SecurityScheme::BearerAuth,
            BASIC_AUTH => SecurityScheme::BasicAuth,
            _ => SecurityScheme::Other(name),
        }
    }
}

impl From<SecurityScheme> for String {
    fn from(scheme: SecurityScheme) -> Self {
        scheme.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRequirement {
    pub scheme: SecurityScheme,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl SecurityRequirement {
    pub fn new(scheme: SecurityScheme) -> Self {
        Self {
            scheme,
            scopes: Vec::new(),
        }
    }

    pub fn bearer() -> Self {
        Self::new(SecurityScheme::BearerAuth)
    }

    pub fn basic() -> Self {
        Self::new(SecurityScheme::BasicAuth)
    }

    pub fn is_bearer(&self) -> bool {
        self.scheme == SecurityScheme::BearerAuth
    }

    pub fn to_openapi(&self) -> OpenApiSecurityRequirement {
        OpenApiSecurityRequirement::new(self.scheme.as_str(), self.scopes.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
            Method::Patch => "patch",
            Method::Trace => "trace",
        }
    }

    pub fn filter(&self) -> MethodFilter {
        match self {
            Method::Get => MethodFilter::GET,
            Method::Put => MethodFilter::PUT,
            Method::Post => MethodFilter::POST,
            Method::Delete => MethodFilter::DELETE,
            Method::Options => MethodFilter::OPTIONS,
            Method::Head => MethodFilter::HEAD,
            Method::Patch => MethodFilter::PATCH,
            Method::Trace => MethodFilter::TRACE,
        }
    }

    /// The operation slot for this method on a path item.
    pub fn slot<'a>(&self, item: &'a mut PathItem) -> &'a mut Option<Operation> {
        match self {
            Method::Get => &mut item.get,
            Method::Put => &mut item.put,
            Method::Post => &mut item.post,
            Method::Delete => &mut item.delete,
            Method::Options => &mut item.options,
            Method::Head => &mut item.head,
            Method::Patch => &mut item.patch,
            Method::Trace => &mut item.trace,
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "get" => Method::Get,
            "put" => Method::Put,
            "post" => Method::Post,
            "delete" => Method::Delete,
            "options" => Method::Options,
            "head" => Method::Head,
            "patch" => Method::Patch,
            "trace" => Method::Trace,
            other => {
                return Err(Error::SchemaCompilation(format!(
                    "unsupported HTTP method `{other}`"
                )))
            }
        })
    }
}

/// A parsed `"<HTTP_METHOD> <path>"` routing key.
///
/// Paths gain a leading `/` and `:param` segments become `{param}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: Method,
    pub path: String,
}

impl FromStr for RouteKey {
    type Err = Error;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let mut parts = key.split_whitespace();
        let (Some(method), Some(path), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::SchemaCompilation(format!(
                "malformed routing key `{key}`, expected `<METHOD> <path>`"
            )));
        };
        let method = method.parse()?;
        let path = normalize_path(path);
        if path == "/" && key.split_whitespace().nth(1) != Some("/") {
            return Err(Error::SchemaCompilation(format!("empty path in routing key `{key}`")));
        }
        Ok(RouteKey { method, path })
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method.as_str().to_uppercase(), self.path)
    }
}

fn normalize_path(raw: &str) -> String {
    let segments: Vec<String> = raw
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.strip_prefix(':') {
            Some(param) => format!("{{{param}}}"),
            None => segment.to_string(),
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// One route binding of an action's documentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocFragment {
    /// Routing key, e.g. `"post products"`. Stripped from the emitted operation.
    #[serde(rename = "$path", default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: Responses,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

impl DocFragment {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: Some(route.into()),
            ..Default::default()
        }
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn request_body(mut self, body: RequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn response(mut self, status: impl Into<String>, response: impl Into<RefOr<Response>>) -> Self {
        self.responses.responses.insert(status.into(), response.into());
        self
    }

    pub fn security(mut self, requirement: SecurityRequirement) -> Self {
        self.security.get_or_insert_with(Vec::new).push(requirement);
        self
    }

    /// False when the fragment declares security but none of it is `bearerAuth`.
    pub fn is_bearer_visible(&self) -> bool {
        match &self.security {
            Some(list) if !list.is_empty() => list.iter().any(SecurityRequirement::is_bearer),
            _ => true,
        }
    }

    /// Splits the fragment into its routing key and the operation to emit.
    pub fn compile(&self) -> Result<(RouteKey, Operation), Error> {
        let route = self.route.as_deref().ok_or_else(|| {
            Error::SchemaCompilation(format!(
                "fragment `{}` has no routing key",
                self.summary.as_deref().unwrap_or("<unnamed>")
            ))
        })?;
        let key: RouteKey = route.parse()?;

        let mut operation = OperationBuilder::new().build();
        operation.operation_id = self.operation_id.clone();
        operation.summary = self.summary.clone();
        operation.description = self.description.clone();
        operation.tags = (!self.tags.is_empty()).then(|| self.tags.clone());
        operation.parameters = (!self.parameters.is_empty()).then(|| self.parameters.clone());
        operation.request_body = self.request_body.clone();
        operation.responses = self.responses.clone();
        operation.security = self
            .security
            .as_ref()
            .map(|list| list.iter().map(SecurityRequirement::to_openapi).collect());
        Ok((key, operation))
    }
}

/// An action's documentation: one binding, or several for an action bound
/// to more than one route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionFragment {
    Many(Vec<DocFragment>),
    One(DocFragment),
}

impl ActionFragment {
    pub fn bindings(&self) -> &[DocFragment] {
        match self {
            ActionFragment::One(fragment) => std::slice::from_ref(fragment),
            ActionFragment::Many(fragments) => fragments,
        }
    }
}

impl From<DocFragment> for ActionFragment {
    fn from(fragment: DocFragment) -> Self {
        ActionFragment::One(fragment)
    }
}

impl From<Vec<DocFragment>> for ActionFragment {
    fn from(fragments: Vec<DocFragment>) -> Self {
        ActionFragment::Many(fragments)
    }
}

/// Service-level documentation merged into the document root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Paths>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_keys_parse_case_insensitively_and_normalize_paths() {
        let key: RouteKey = "post products".parse().unwrap();
        assert_eq!(key.method, Method::Post);
        assert_eq!(key.path, "/products");

        let key: RouteKey = "GET /products/:id".parse().unwrap();
        assert_eq!(key.method, Method::Get);
        assert_eq!(key.path, "/products/{id}");
        assert_eq!(key.to_string(), "GET /products/{id}");

        let root: RouteKey = "get /".parse().unwrap();
        assert_eq!(root.path, "/");
    }

    #[test]
    fn malformed_routing_keys_are_compilation_errors() {
        for key in ["products", "fetch /products", "get /a /b", "", "post //"] {
            let err = key.parse::<RouteKey>().unwrap_err();
            assert!(matches!(err, Error::SchemaCompilation(_)), "key {key:?}");
        }
    }

    #[test]
    fn compile_strips_routing_key() {
        let fragment = DocFragment::new("put products/:id")
            .summary("Update Product")
            .tag("Products")
            .security(SecurityRequirement::bearer());
        let (key, operation) = fragment.compile().unwrap();
        assert_eq!(key.path, "/products/{id}");

        let json = serde_json::to_value(&operation).unwrap();
        assert!(json.get("$path").is_none());
        assert_eq!(json["summary"], "Update Product");
        assert_eq!(json["tags"][0], "Products");
        assert!(json["security"][0].get("bearerAuth").is_some());
    }

    #[test]
    fn fragment_without_route_fails_to_compile() {
        let err = DocFragment::default().summary("orphan").compile().unwrap_err();
        assert!(err.to_string().contains("orphan"));
    }

    #[test]
    fn bearer_visibility_follows_declared_security() {
        assert!(DocFragment::new("get a").is_bearer_visible());
        assert!(DocFragment::new("get a")
            .security(SecurityRequirement::basic())
            .security(SecurityRequirement::bearer())
            .is_bearer_visible());
        assert!(!DocFragment::new("get a")
            .security(SecurityRequirement::basic())
            .is_bearer_visible());
    }

    #[test]
    fn action_fragments_accept_object_or_list_form() {
        let one: ActionFragment =
            serde_json::from_value(serde_json::json!({ "$path": "get products" })).unwrap();
        assert_eq!(one.bindings().len(), 1);

        let many: ActionFragment = serde_json::from_value(serde_json::json!([
            { "$path": "put products/:id" },
            { "$path": "patch products/:id" }
        ]))
        .unwrap();
        let routes: Vec<_> = many.bindings().iter().filter_map(|f| f.route.as_deref()).collect();
        assert_eq!(routes, ["put products/:id", "patch products/:id"]);
    }
}
