//! Documentation fragments contributed by the products service.

use gateway_kit::fragment::{DocFragment, SecurityRequirement, ServiceFragment};
use gateway_kit::utoipa::openapi::path::{Parameter, ParameterBuilder, ParameterIn};
use gateway_kit::utoipa::openapi::request_body::{RequestBody, RequestBodyBuilder};
use gateway_kit::utoipa::openapi::schema::{ArrayBuilder, ObjectBuilder, Schema, Type};
use gateway_kit::utoipa::openapi::tag::TagBuilder;
use gateway_kit::utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, Ref, RefOr, Required, Response, ResponseBuilder,
};

use crate::dtos::{CreateProduct, Product, ProductUpdate};

const TAG: &str = "Products";

pub fn service_fragment() -> ServiceFragment {
    ServiceFragment {
        components: Some(
            ComponentsBuilder::new()
                .schema_from::<Product>()
                .schema_from::<CreateProduct>()
                .schema_from::<ProductUpdate>()
                .build(),
        ),
        tags: vec![TagBuilder::new()
            .name(TAG)
            .description(Some("Product catalogue"))
            .build()],
        ..Default::default()
    }
}

fn json_body(schema: &str) -> RequestBody {
    RequestBodyBuilder::new()
        .required(Some(Required::True))
        .content(
            "application/json",
            ContentBuilder::new()
                .schema(Some(Ref::from_schema_name(schema)))
                .build(),
        )
        .build()
}

fn product_response(description: &str) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content(
            "application/json",
            ContentBuilder::new()
                .schema(Some(Ref::from_schema_name("Product")))
                .build(),
        )
        .build()
}

fn shared_response(name: &str) -> RefOr<Response> {
    Ref::new(format!("#/components/responses/{name}")).into()
}

fn id_parameter() -> Parameter {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .description(Some("Product identifier"))
        .schema(Some(ObjectBuilder::new().schema_type(Type::String)))
        .build()
}

fn page_parameter(name: &str, description: &str) -> Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .description(Some(description))
        .schema(Some(ObjectBuilder::new().schema_type(Type::Integer)))
        .build()
}

pub fn list_fragment() -> DocFragment {
    let list = ResponseBuilder::new().description("Products").content(
        "application/json",
        ContentBuilder::new()
            .schema(Some(
                ArrayBuilder::new().items(RefOr::<Schema>::from(Ref::from_schema_name("Product"))),
            ))
            .build(),
    );
    DocFragment::new("get products")
        .operation_id("listProducts")
        .summary("List all products")
        .tag(TAG)
        .parameter(page_parameter("offset", "Number of products to skip"))
        .parameter(page_parameter("limit", "Maximum number of products"))
        .response("200", list.build())
        .response("500", shared_response("500"))
}

pub fn get_fragment() -> DocFragment {
    DocFragment::new("get products/:id")
        .operation_id("getProduct")
        .summary("Get a product by its ID")
        .tag(TAG)
        .parameter(id_parameter())
        .response("200", product_response("The product"))
        .response("404", shared_response("404"))
}

pub fn create_fragment() -> DocFragment {
    DocFragment::new("post products")
        .operation_id("createProduct")
        .summary("Create a product")
        .tag(TAG)
        .request_body(json_body("CreateProduct"))
        .response("200", product_response("The created product"))
        .response("401", shared_response("UnauthorizedErrorToken"))
        .security(SecurityRequirement::bearer())
}

/// One binding per method: `PUT` and `PATCH` share the handler.
pub fn update_fragments() -> Vec<DocFragment> {
    ["put", "patch"]
        .into_iter()
        .map(|method| {
            DocFragment::new(format!("{method} products/:id"))
                .operation_id(format!("{method}Product"))
                .summary("Update a product")
                .tag(TAG)
                .parameter(id_parameter())
                .request_body(json_body("ProductUpdate"))
                .response("200", product_response("The updated product"))
                .response("401", shared_response("UnauthorizedErrorBasic"))
                .response("404", shared_response("404"))
                .security(SecurityRequirement::basic())
                .security(SecurityRequirement::bearer())
        })
        .collect()
}

/// Basic-only, so it appears in the privileged document alone.
pub fn remove_fragment() -> DocFragment {
    DocFragment::new("delete products/:id")
        .operation_id("removeProduct")
        .summary("Remove a product")
        .tag(TAG)
        .parameter(id_parameter())
        .response("200", product_response("The removed product"))
        .response("401", shared_response("UnauthorizedErrorBasic"))
        .response("404", shared_response("404"))
        .security(SecurityRequirement::basic())
}
