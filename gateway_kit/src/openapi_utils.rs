use utoipa::openapi::schema::{ObjectBuilder, Type};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::external_docs::ExternalDocsBuilder;
use utoipa::openapi::{
    self, ComponentsBuilder, ContactBuilder, ContentBuilder, Ref, RefOr,
    ResponseBuilder, Schema, ServerBuilder,
};

use crate::fragment::{BASIC_AUTH, BEARER_AUTH};

/// Fixed part of every generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTemplate {
    pub title: String,
    pub version: String,
    pub description: String,
    /// `(url, description)` pairs.
    pub servers: Vec<(String, String)>,
    pub contact_email: Option<String>,
    pub terms_of_service: Option<String>,
    pub external_docs: Option<String>,
}

impl Default for BaseTemplate {
    fn default() -> Self {
        Self {
            title: "API Documentation".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: String::new(),
            servers: vec![("/api".to_string(), "Local Server".to_string())],
            contact_email: None,
            terms_of_service: None,
            external_docs: None,
        }
    }
}

fn string_schema() -> RefOr<Schema> {
    RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(Type::String).build()))
}

/// Builds the base document: metadata, servers, security schemes and the
/// shared error schema and responses.
pub fn build_base_document(template: &BaseTemplate) -> openapi::OpenApi {
    let mut info = openapi::InfoBuilder::new()
        .title(template.title.as_str())
        .version(template.version.as_str())
        .description(Some(template.description.as_str()))
        .terms_of_service(template.terms_of_service.as_deref());
    if let Some(email) = &template.contact_email {
        info = info.contact(Some(ContactBuilder::new().email(Some(email.as_str())).build()));
    }

    let error_schema = ObjectBuilder::new()
        .schema_type(Type::Object)
        .required("message")
        .property("status", string_schema())
        .property("message", string_schema())
        .description(Some("This general error structure is used throughout this API."))
        .build();

    let components = ComponentsBuilder::new()
        .schema("Error", RefOr::T(Schema::Object(error_schema)))
        .response(
            "UnauthorizedErrorToken",
            ResponseBuilder::new()
                .description("Access token is missing or invalid, request new one")
                .build(),
        )
        .response(
            "UnauthorizedErrorBasic",
            ResponseBuilder::new()
                .description("Authentication information is missing or invalid")
                .build(),
        )
        .response("404", ResponseBuilder::new().description("Entity not found.").build())
        .response(
            "500",
            ResponseBuilder::new()
                .description("Internal Error.")
                .content(
                    "application/json",
                    ContentBuilder::new()
                        .schema(Some(RefOr::Ref(Ref::from_schema_name("Error"))))
                        .build(),
                )
                .build(),
        )
        .security_scheme(
            BEARER_AUTH,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        )
        .security_scheme(
            BASIC_AUTH,
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
        )
        .build();

    let servers: Vec<_> = template
        .servers
        .iter()
        .map(|(url, description)| {
            ServerBuilder::new()
                .url(url.as_str())
                .description(Some(description.as_str()))
                .build()
        })
        .collect();

    let mut doc = openapi::OpenApiBuilder::new()
        .info(info.build())
        .servers((!servers.is_empty()).then_some(servers))
        .components(Some(components))
        .paths(openapi::Paths::new())
        .build();

    if let Some(url) = &template.external_docs {
        doc.external_docs = Some(
            ExternalDocsBuilder::new()
                .url(url.as_str())
                .description(Some("Find more info here"))
                .build(),
        );
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_document_declares_schemes_and_shared_errors() {
        let template = BaseTemplate {
            title: "PRODUCTS API Documentation".into(),
            external_docs: Some("https://docs.example.com".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(build_base_document(&template)).unwrap();

        assert_eq!(json["info"]["title"], "PRODUCTS API Documentation");
        assert_eq!(json["servers"][0]["url"], "/api");
        let schemes = &json["components"]["securitySchemes"];
        assert_eq!(schemes["bearerAuth"]["scheme"], "bearer");
        assert_eq!(schemes["bearerAuth"]["bearerFormat"], "JWT");
        assert_eq!(schemes["basicAuth"]["scheme"], "basic");
        assert_eq!(json["components"]["schemas"]["Error"]["required"][0], "message");
        assert_eq!(
            json["components"]["responses"]["500"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Error"
        );
        assert_eq!(json["externalDocs"]["url"], "https://docs.example.com");
        assert_eq!(json["paths"], serde_json::json!({}));
    }
}
