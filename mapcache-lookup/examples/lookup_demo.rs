//! Walk through cache-backed record lookups against an in-process server
//!
//! Run with: cargo run -p mapcache-lookup --example lookup_demo
//! Set RUST_LOG=debug to see each lookup step.

use mapcache::{ClientConfig, JsonSerializer, MapCacheClient, MemoryServer, StringSerializer};
use mapcache_lookup::{
    CacheRecordLookupService, Coordinates, JsonRecordReader, LookupConfig, LookupService,
    ServiceRegistry,
};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server = MemoryServer::new();
    let client = Arc::new(
        MapCacheClient::enable(ClientConfig::from_env()?, Arc::new(server.transport())).await?,
    );

    let json = JsonSerializer::<serde_json::Value>::new();
    client
        .put("user:1", &json!({"name": "Ada", "langs": ["rust", "ml"]}), &StringSerializer, &json)
        .await?;
    client
        .put("user:2", &json!([{"name": "Grace"}, {"name": "ignored"}]), &StringSerializer, &json)
        .await?;
    client
        .put("user:3", "not a record", &StringSerializer, &StringSerializer)
        .await?;

    let mut registry = ServiceRegistry::new();
    registry
        .register_client(client.clone())
        .register_reader("json-reader", Arc::new(JsonRecordReader::infer()));

    let config = LookupConfig::builder()
        .cache_service(client.name())
        .key_field("user")
        .build();
    let service = CacheRecordLookupService::enable(&config, &registry)?;

    for user in ["user:1", "user:2", "user:3", "user:4"] {
        let coordinates = Coordinates::from([("user".to_string(), user.to_string())]);
        match service.lookup(&coordinates).await {
            Ok(Some(record)) => println!("{user}: {record}"),
            Ok(None) => println!("{user}: not cached"),
            Err(e) => println!("{user}: lookup failed: {e}"),
        }
    }

    println!("{}", server.stats());
    client.close().await?;
    Ok(())
}
