//! Typed deep merge over the OpenAPI document model.
//!
//! Maps merge key by key down to the node kinds below, lists concatenate,
//! and leaf nodes (schemas, responses, scalars) are replaced by the later
//! value.

use std::collections::BTreeMap;

use utoipa::openapi::path::{Operation, PathItem};
use utoipa::openapi::security::SecurityScheme;
use utoipa::openapi::{Components, OpenApi, Paths, RefOr};

use crate::fragment::ServiceFragment;

pub trait DeepMerge {
    fn deep_merge(&mut self, other: Self);
}

impl<K: Ord, V: DeepMerge> DeepMerge for BTreeMap<K, V> {
    fn deep_merge(&mut self, other: Self) {
        for (key, value) in other {
            match self.get_mut(&key) {
                Some(existing) => existing.deep_merge(value),
                None => {
                    self.insert(key, value);
                }
            }
        }
    }
}

impl<T> DeepMerge for Vec<T> {
    fn deep_merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<T: DeepMerge> DeepMerge for Option<T> {
    fn deep_merge(&mut self, other: Self) {
        let Some(value) = other else { return };
        match self {
            Some(existing) => existing.deep_merge(value),
            None => *self = Some(value),
        }
    }
}

impl<T> DeepMerge for RefOr<T> {
    fn deep_merge(&mut self, other: Self) {
        *self = other;
    }
}

impl DeepMerge for SecurityScheme {
    fn deep_merge(&mut self, other: Self) {
        *self = other;
    }
}

impl DeepMerge for Operation {
    fn deep_merge(&mut self, other: Self) {
        *self = other;
    }
}

impl DeepMerge for Components {
    fn deep_merge(&mut self, other: Self) {
        self.schemas.deep_merge(other.schemas);
        self.responses.deep_merge(other.responses);
        self.security_schemes.deep_merge(other.security_schemes);
    }
}

impl DeepMerge for PathItem {
    fn deep_merge(&mut self, other: Self) {
        if other.summary.is_some() {
            self.summary = other.summary;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
        self.parameters.deep_merge(other.parameters);
        self.servers.deep_merge(other.servers);
        self.get.deep_merge(other.get);
        self.put.deep_merge(other.put);
        self.post.deep_merge(other.post);
        self.delete.deep_merge(other.delete);
        self.options.deep_merge(other.options);
        self.head.deep_merge(other.head);
        self.patch.deep_merge(other.patch);
        self.trace.deep_merge(other.trace);
    }
}

impl DeepMerge for Paths {
    fn deep_merge(&mut self, other: Self) {
        self.paths.deep_merge(other.paths);
    }
}

/// Merges a service-level fragment into the document root.
pub fn merge_service_fragment(doc: &mut OpenApi, fragment: &ServiceFragment) {
    let fragment = fragment.clone();
    doc.components.deep_merge(fragment.components);
    if let Some(paths) = fragment.paths {
        doc.paths.deep_merge(paths);
    }
    if !fragment.tags.is_empty() {
        doc.tags.get_or_insert_with(Vec::new).extend(fragment.tags);
    }
    if !fragment.servers.is_empty() {
        doc.servers.get_or_insert_with(Vec::new).extend(fragment.servers);
    }
    if !fragment.security.is_empty() {
        doc.security
            .get_or_insert_with(Vec::new)
            .extend(fragment.security.iter().map(|req| req.to_openapi()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::SecurityRequirement;
    use utoipa::openapi::schema::{ObjectBuilder, Type};
    use utoipa::openapi::{ComponentsBuilder, OpenApiBuilder, ResponseBuilder, Schema};
    use utoipa::openapi::tag::TagBuilder;

    fn schema(ty: Type) -> RefOr<Schema> {
        RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(ty).build()))
    }

    #[test]
    fn maps_merge_lists_concatenate_leaves_replace() {
        let mut doc = OpenApiBuilder::new()
            .components(Some(
                ComponentsBuilder::new()
                    .schema("Error", schema(Type::Object))
                    .schema("Id", schema(Type::String))
                    .response("404", ResponseBuilder::new().description("Entity not found.").build())
                    .build(),
            ))
            .tags(Some(vec![TagBuilder::new().name("Core").build()]))
            .build();

        let fragment = ServiceFragment {
            components: Some(
                ComponentsBuilder::new()
                    .schema("Id", schema(Type::Integer))
                    .schema("Product", schema(Type::Object))
                    .build(),
            ),
            tags: vec![TagBuilder::new().name("Products").build()],
            security: vec![SecurityRequirement::bearer()],
            ..Default::default()
        };
        merge_service_fragment(&mut doc, &fragment);

        let json = serde_json::to_value(&doc).unwrap();
        let schemas = &json["components"]["schemas"];
        assert_eq!(schemas["Error"]["type"], "object");
        assert_eq!(schemas["Id"]["type"], "integer");
        assert_eq!(schemas["Product"]["type"], "object");
        assert_eq!(json["components"]["responses"]["404"]["description"], "Entity not found.");

        let tags: Vec<_> = json["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(tags, ["Core", "Products"]);
        assert!(json["security"][0].get("bearerAuth").is_some());
    }

    #[test]
    fn option_merge_takes_value_when_target_is_empty() {
        let mut target: Option<Vec<u8>> = None;
        target.deep_merge(Some(vec![1]));
        target.deep_merge(None);
        target.deep_merge(Some(vec![2, 3]));
        assert_eq!(target, Some(vec![1, 2, 3]));
    }
}
