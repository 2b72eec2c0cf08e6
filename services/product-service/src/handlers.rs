use std::sync::Arc;

use gateway_kit::{ActionContext, Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dtos::{CreateProduct, ListQuery, ProductId, ProductUpdate};
use crate::store::ProductStore;

fn params<T: DeserializeOwned>(ctx: &ActionContext) -> Result<T> {
    serde_json::from_value(ctx.params.clone()).map_err(|err| Error::Validation(err.to_string()))
}

/// List products, optionally paginated with `offset` and `limit`.
pub async fn list_products(store: Arc<ProductStore>, ctx: ActionContext) -> Result<Value> {
    let query: ListQuery = params(&ctx)?;
    Ok(serde_json::to_value(store.list(query.offset.unwrap_or(0), query.limit))?)
}

/// Get a product by its ID
pub async fn get_product(store: Arc<ProductStore>, ctx: ActionContext) -> Result<Value> {
    let ProductId { id } = params(&ctx)?;
    Ok(serde_json::to_value(store.get(&id)?)?)
}

pub async fn create_product(store: Arc<ProductStore>, ctx: ActionContext) -> Result<Value> {
    let payload: CreateProduct = params(&ctx)?;
    let product = store.create(payload)?;
    tracing::info!(
        id = %product.id,
        caller = ctx.identity.as_ref().map(|identity| identity.id.as_str()).unwrap_or("-"),
        "product created"
    );
    Ok(serde_json::to_value(product)?)
}

/// Update a product. Serves both `PUT` and `PATCH`.
pub async fn update_product(store: Arc<ProductStore>, ctx: ActionContext) -> Result<Value> {
    let ProductId { id } = params(&ctx)?;
    let changes: ProductUpdate = params(&ctx)?;
    Ok(serde_json::to_value(store.update(&id, changes)?)?)
}

pub async fn remove_product(store: Arc<ProductStore>, ctx: ActionContext) -> Result<Value> {
    let ProductId { id } = params(&ctx)?;
    Ok(serde_json::to_value(store.remove(&id)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_and_update_read_the_id_from_params() {
        let store = Arc::new(ProductStore::seeded());

        let product = get_product(store.clone(), ActionContext::new(json!({ "id": "prod-002" })))
            .await
            .unwrap();
        assert_eq!(product["name"], "Office Chair");

        let ctx = ActionContext::new(json!({ "id": "prod-001", "name": "Renamed" }));
        let updated = update_product(store.clone(), ctx).await.unwrap();
        assert_eq!(updated["name"], "Renamed");
        assert_eq!(updated["price"], 39.9);
        assert_eq!(updated["category"], "Lighting");
    }

    #[tokio::test]
    async fn malformed_params_are_validation_errors() {
        let store = Arc::new(ProductStore::new());
        let err = create_product(store.clone(), ActionContext::new(json!({ "name": "Lamp" })))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = get_product(store, ActionContext::new(json!({}))).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn list_honors_pagination() {
        let store = Arc::new(ProductStore::seeded());
        let page = list_products(store, ActionContext::new(json!({ "offset": "1", "limit": "1" })))
            .await
            .unwrap();
        assert_eq!(page.as_array().map(Vec::len), Some(1));
        assert_eq!(page[0]["id"], "prod-002");
    }
}
