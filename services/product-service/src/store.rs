use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use gateway_kit::{Error, Result};

use crate::dtos::{CreateProduct, Product, ProductUpdate};

/// In-memory product catalogue, kept in insertion order.
#[derive(Debug, Default)]
pub struct ProductStore {
    products: RwLock<Vec<Product>>,
    next_id: AtomicU64,
}

impl ProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding two sample products.
    pub fn seeded() -> Self {
        let samples = [
            ("Desk Lamp", "Lighting", 39.9),
            ("Office Chair", "Furniture", 149.99),
        ];
        let products: Vec<Product> = samples
            .into_iter()
            .enumerate()
            .map(|(i, (name, category, price))| Product {
                id: product_id(i as u64 + 1),
                name: name.to_string(),
                category: Some(category.to_string()),
                price,
            })
            .collect();
        Self {
            next_id: AtomicU64::new(products.len() as u64),
            products: RwLock::new(products),
        }
    }

    pub fn list(&self, offset: usize, limit: Option<usize>) -> Vec<Product> {
        let products = self.products.read().unwrap_or_else(|e| e.into_inner());
        products
            .iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<Product> {
        self.products
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|product| product.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    pub fn create(&self, payload: CreateProduct) -> Result<Product> {
        let name = validate_name(&payload.name)?;
        validate_price(payload.price)?;

        let mut products = self.products.write().unwrap_or_else(|e| e.into_inner());
        ensure_unique(&products, name, None)?;
        let product = Product {
            id: product_id(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            name: name.to_string(),
            category: payload.category,
            price: payload.price,
        };
        products.push(product.clone());
        tracing::debug!(id = %product.id, "product created");
        Ok(product)
    }

    pub fn update(&self, id: &str, changes: ProductUpdate) -> Result<Product> {
        let name = changes.name.as_deref().map(validate_name).transpose()?;
        if let Some(price) = changes.price {
            validate_price(price)?;
        }

        let mut products = self.products.write().unwrap_or_else(|e| e.into_inner());
        if let Some(name) = name {
            ensure_unique(&products, name, Some(id))?;
        }
        let product = products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or_else(|| not_found(id))?;
        if let Some(name) = name {
            product.name = name.to_string();
        }
        if changes.category.is_some() {
            product.category = changes.category;
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        Ok(product.clone())
    }

    pub fn remove(&self, id: &str) -> Result<Product> {
        let mut products = self.products.write().unwrap_or_else(|e| e.into_inner());
        let index = products
            .iter()
            .position(|product| product.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(products.remove(index))
    }
}

fn not_found(id: &str) -> Error {
    Error::NotFound(format!("product `{id}` does not exist"))
}

fn product_id(n: u64) -> String {
    format!("prod-{n:03}")
}

/// Returns the trimmed name.
fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("`name` must not be empty".into()));
    }
    Ok(name)
}

/// `except` is the product being renamed, which may keep its own name.
fn ensure_unique(products: &[Product], name: &str, except: Option<&str>) -> Result<()> {
    let taken = products
        .iter()
        .any(|product| product.name == name && Some(product.id.as_str()) != except);
    if taken {
        return Err(Error::Validation(format!("a product named `{name}` already exists")));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::Validation("`price` must be a non-negative number".into()));
    }
    Ok(())
}
