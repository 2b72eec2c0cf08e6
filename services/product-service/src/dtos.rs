use gateway_kit::params;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Represents a product in the catalogue. Names are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "id": "prod-001", "name": "Desk Lamp", "category": "Lighting", "price": 39.9 }))]
pub struct Product {
    pub id: String,
    /// Product title
    pub name: String,
    /// Product category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Product price
    pub price: f64,
}

/// Payload for creating a product. Fields may come from the query string or a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(deserialize_with = "params::number")]
    pub price: f64,
}

/// DTO for updating a product. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "params::optional_number")]
    pub price: Option<f64>,
}

/// Path parameter shared by the single-product actions.
#[derive(Debug, Deserialize)]
pub struct ProductId {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default, deserialize_with = "params::optional_usize")]
    pub offset: Option<usize>,
    #[serde(default, deserialize_with = "params::optional_usize")]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_category_is_omitted() {
        let product = Product {
            id: "prod-001".to_string(),
            name: "Test Product".to_string(),
            category: None,
            price: 10.50,
        };

        let json_value = serde_json::to_value(&product).unwrap();
        assert_eq!(json_value, json!({ "id": "prod-001", "name": "Test Product", "price": 10.5 }));
    }

    #[test]
    fn create_payload_is_strict() {
        let ok: CreateProduct = serde_json::from_str(r#"{"name":"Lamp","price":12}"#).unwrap();
        assert_eq!(ok.price, 12.0);
        assert_eq!(ok.category, None);
        assert!(serde_json::from_str::<CreateProduct>(r#"{"name":"Lamp","price":1,"stock":3}"#).is_err());
        assert!(serde_json::from_str::<CreateProduct>(r#"{"name":"Lamp"}"#).is_err());
        assert!(serde_json::from_str::<CreateProduct>(r#"{"name":7,"price":1}"#).is_err());
    }

    #[test]
    fn query_string_values_are_accepted() {
        let from_query: CreateProduct =
            serde_json::from_value(json!({ "name": "2024", "category": "XXXX", "price": "123" })).unwrap();
        assert_eq!(from_query.name, "2024");
        assert_eq!(from_query.price, 123.0);

        let page: ListQuery = serde_json::from_value(json!({ "offset": "1", "limit": "5" })).unwrap();
        assert_eq!((page.offset, page.limit), (Some(1), Some(5)));
        assert!(serde_json::from_value::<CreateProduct>(json!({ "name": "Lamp", "price": "cheap" })).is_err());
    }
}
