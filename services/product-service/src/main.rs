use std::sync::Arc;

use anyhow::Context;
use gateway_kit::aggregator::Audience;
use gateway_kit::bootstrap::{build_gateway, init_tracing, serve};
use gateway_kit::config::GatewayConfig;
use gateway_kit::openapi_utils::BaseTemplate;
use gateway_kit::registry::LocalRegistry;
use product_service::products_service;
use product_service::store::ProductStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::load().context("invalid gateway configuration")?;
    init_tracing();

    let registry = Arc::new(LocalRegistry::new());
    registry.register(products_service(Arc::new(ProductStore::seeded())));

    let template = BaseTemplate {
        title: "Product Service API".to_string(),
        description: "Products behind the API gateway".to_string(),
        servers: vec![(config.api_prefix.clone(), "Local Server".to_string())],
        ..BaseTemplate::default()
    };
    let gateway = build_gateway(&config, registry, template)?;

    if config.print_openapi {
        let doc = gateway.aggregator.get_schema(Audience::Public).await?;
        println!("{}", doc.to_pretty_json()?);
        return Ok(());
    }

    serve(&config, gateway).await?;
    Ok(())
}
