//! Integration tests for cache-backed record lookups
//!
//! These tests cover:
//! - Present, absent and malformed cache entries
//! - Coordinate validation
//! - Transport failures surfacing as lookup failures
//! - Enabling through the service registry
//! - Concurrent lookups

use mapcache::{CacheError, ClientConfig, MapCacheClient, MemoryServer, MemoryTransport, StringSerializer};
use mapcache_lookup::{
    CacheRecordLookupService, Coordinates, FieldType, FieldValue, JsonRecordReader, LookupConfig,
    LookupFailure, LookupService, ParseError, RecordField, RecordSchema, ServiceRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn key(value: &str) -> Coordinates {
    Coordinates::from([("key".to_string(), value.to_string())])
}

async fn enabled_client(transport: Arc<MemoryTransport>) -> Arc<MapCacheClient> {
    let config = ClientConfig::builder()
        .name("lookup-tests")
        .communications_timeout(Duration::from_secs(5))
        .build();

    Arc::new(MapCacheClient::enable(config, transport).await.unwrap())
}

async fn service_for(server: &MemoryServer) -> CacheRecordLookupService {
    let client = enabled_client(Arc::new(server.transport())).await;
    CacheRecordLookupService::new(client, Arc::new(JsonRecordReader::infer()))
}

#[tokio::test]
async fn test_present_key_yields_record() {
    let server = MemoryServer::new();
    server.insert("myKey", r#"{"myKey1":"myValue1"}"#);
    let service = service_for(&server).await;

    let record = service.lookup(&key("myKey")).await.unwrap().unwrap();
    assert_eq!(record.get_as_string("myKey1"), Some("myValue1".to_string()));
    assert_eq!(record.schema().len(), 1);
}

#[tokio::test]
async fn test_absent_key_yields_none() {
    let server = MemoryServer::new();
    let service = service_for(&server).await;

    let result = assert_ok!(service.lookup(&key("absentKey")).await);
    assert!(result.is_none());
}

#[tokio::test]
async fn test_missing_or_empty_key_is_invalid_input() {
    let server = MemoryServer::new();
    let service = service_for(&server).await;

    let err = assert_err!(service.lookup(&Coordinates::new()).await);
    assert!(matches!(err, LookupFailure::InvalidInput(_)));

    let err = assert_err!(service.lookup(&key("")).await);
    assert!(matches!(err, LookupFailure::InvalidInput(_)));

    assert_eq!(server.stats().hits + server.stats().misses, 0);
}

#[tokio::test]
async fn test_malformed_payload_is_parse_failure() {
    let server = MemoryServer::new();
    server.insert("badKey", "{not json");
    let service = service_for(&server).await;

    let err = assert_err!(service.lookup(&key("badKey")).await);
    match err {
        LookupFailure::Parse { key, source } => {
            assert_eq!(key, "badKey");
            assert!(matches!(source, ParseError::Malformed(_)));
        }
        other => panic!("expected parse failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_payload_shapes() {
    let server = MemoryServer::new();
    server.insert("array", r#"[{"n":1},{"n":2}]"#);
    server.insert("empty-array", "[]");
    server.insert("scalar", "42");
    let service = service_for(&server).await;

    let record = service.lookup(&key("array")).await.unwrap().unwrap();
    assert_eq!(record.get_as_i64("n"), Some(1));

    let err = assert_err!(service.lookup(&key("empty-array")).await);
    assert!(matches!(
        err,
        LookupFailure::Parse { source: ParseError::NoRecord, .. }
    ));

    let err = assert_err!(service.lookup(&key("scalar")).await);
    assert!(matches!(
        err,
        LookupFailure::Parse { source: ParseError::NotARecord(_), .. }
    ));
}

#[tokio::test]
async fn test_severed_connection_is_transport_failure() {
    let server = MemoryServer::new();
    server.insert("myKey", r#"{"myKey1":"myValue1"}"#);
    let transport = Arc::new(server.transport());
    let client = enabled_client(transport.clone()).await;
    let service = CacheRecordLookupService::new(client, Arc::new(JsonRecordReader::infer()));

    assert_ok!(service.lookup(&key("myKey")).await);

    transport.sever();

    let err = assert_err!(service.lookup(&key("myKey")).await);
    assert!(err.is_transport());
    assert!(matches!(
        err,
        LookupFailure::Cache(CacheError::ConnectionError(_))
    ));
}

#[tokio::test]
async fn test_closed_client_fails_lookup() {
    let server = MemoryServer::new();
    let client = enabled_client(Arc::new(server.transport())).await;
    let service =
        CacheRecordLookupService::new(client.clone(), Arc::new(JsonRecordReader::infer()));

    client.close().await.unwrap();

    let err = assert_err!(service.lookup(&key("myKey")).await);
    assert!(matches!(err, LookupFailure::Cache(CacheError::Closed(_))));
}

#[tokio::test]
async fn test_fixed_schema_reader() {
    let server = MemoryServer::new();
    server.insert("order", r#"{"id":"17","total":"9.5","extra":true}"#);

    let schema = RecordSchema::new(vec![
        RecordField::new("id", FieldType::Int).required(),
        RecordField::new("total", FieldType::Float),
        RecordField::new("note", FieldType::String),
    ]);
    let client = enabled_client(Arc::new(server.transport())).await;
    let service = CacheRecordLookupService::new(client, Arc::new(JsonRecordReader::with_schema(schema)));

    let record = service.lookup(&key("order")).await.unwrap().unwrap();
    assert_eq!(record.get("id"), Some(&FieldValue::Int(17)));
    assert_eq!(record.get_as_f64("total"), Some(9.5));
    assert_eq!(record.get("note"), Some(&FieldValue::Null));
    assert_eq!(record.get("extra"), None);
}

#[tokio::test]
async fn test_enable_through_registry() {
    let server = MemoryServer::new();
    server.insert("c-1", r#"{"tier":"gold"}"#);

    let config = ClientConfig::builder().name("customers").build();
    let client = MapCacheClient::enable(config, Arc::new(server.transport()))
        .await
        .unwrap();

    let mut registry = ServiceRegistry::new();
    registry
        .register_client(Arc::new(client))
        .register_reader("json", Arc::new(JsonRecordReader::infer()));

    let config = LookupConfig::builder()
        .cache_service("customers")
        .record_reader("json")
        .key_field("customer")
        .build();
    let service = CacheRecordLookupService::enable(&config, &registry).unwrap();
    assert_eq!(service.key_field(), "customer");
    assert!(service.required_keys().contains("customer"));

    let coordinates = Coordinates::from([("customer".to_string(), "c-1".to_string())]);
    let record = service.lookup(&coordinates).await.unwrap().unwrap();
    assert_eq!(record.get_as_string("tier"), Some("gold".to_string()));

    let missing = LookupConfig::builder()
        .cache_service("orders")
        .record_reader("json")
        .build();
    let err = assert_err!(CacheRecordLookupService::enable(&missing, &registry));
    assert!(matches!(err, LookupFailure::ServiceNotFound { .. }));

    let invalid = LookupConfig::builder().key_field("").build();
    let err = assert_err!(CacheRecordLookupService::enable(&invalid, &registry));
    assert!(matches!(err, LookupFailure::ConfigError(_)));
}

#[tokio::test]
async fn test_lookup_sees_values_written_by_clients() {
    let server = MemoryServer::new();
    let service = service_for(&server).await;
    let writer = enabled_client(Arc::new(server.transport())).await;

    assert!(service.lookup(&key("live")).await.unwrap().is_none());

    writer
        .put("live", r#"{"v":1}"#, &StringSerializer, &StringSerializer)
        .await
        .unwrap();
    let record = service.lookup(&key("live")).await.unwrap().unwrap();
    assert_eq!(record.get_as_i64("v"), Some(1));

    writer
        .put("live", r#"{"v":2}"#, &StringSerializer, &StringSerializer)
        .await
        .unwrap();
    let record = service.lookup(&key("live")).await.unwrap().unwrap();
    assert_eq!(record.get_as_i64("v"), Some(2));
}

#[tokio::test]
async fn test_concurrent_lookups() {
    let server = MemoryServer::new();
    for i in 0..16 {
        server.insert(format!("k{i}"), format!(r#"{{"index":{i}}}"#));
    }
    let service = Arc::new(service_for(&server).await);

    let handles = (0..32).map(|i| {
        let service = service.clone();
        tokio::spawn(async move { (i, service.lookup(&key(&format!("k{i}"))).await) })
    });

    for joined in futures::future::join_all(handles).await {
        let (i, result) = joined.unwrap();
        let result = result.unwrap();
        if i < 16 {
            assert_eq!(result.unwrap().get_as_i64("index"), Some(i));
        } else {
            assert!(result.is_none());
        }
    }
}
