use std::sync::Arc;
use std::time::Duration;

use searchcake_bulk::{BulkBuffer, PendingOperation, BULK_PATH, DEFAULT_BULK_SIZE};
use searchcake_http::{ConnectionConfig, HttpConnection};
use serde_json::{json, Value};
use test_helper::MockSearchServer;

fn command_lines(body: &str) -> Vec<Value> {
    body.lines()
        .map(|line| serde_json::from_str(line).expect("Decode bulk line."))
        .collect()
}

#[tokio::test]
async fn test_bulk_request_wire_format() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let server = MockSearchServer::start().await?;
    server.route("POST", BULK_PATH, 200, json!({"took": 3, "items": []}));

    let connection = Arc::new(HttpConnection::connect(ConnectionConfig::new([
        server.address(),
    ]))?);
    let buffer = BulkBuffer::new(connection, DEFAULT_BULK_SIZE);

    buffer.stage_index(
        PendingOperation::index("tweets", "tweet", json!({"id": 1}))
            .with_id("1")
            .with_parent("user-1"),
    )?;
    buffer.stage_delete(PendingOperation::delete("tweets", "tweet", "2").with_version(4))?;

    let response = buffer.force_flush().await?.expect("A request should be sent.");
    assert_eq!(response["took"], 3);

    let requests = server.requests_to(BULK_PATH);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(
        requests[0].content_type.as_deref(),
        Some("application/x-ndjson")
    );
    assert!(requests[0].body.ends_with('\n'));
    assert_eq!(
        command_lines(&requests[0].body),
        vec![
            json!({"index": {"_index": "tweets", "_type": "tweet", "_id": "1", "_parent": "user-1"}}),
            json!({"id": 1}),
            json!({"delete": {"_index": "tweets", "_type": "tweet", "_id": "2", "_version": 4}}),
        ],
    );

    Ok(())
}

#[tokio::test]
async fn test_staging_during_flush_starts_new_batch() -> anyhow::Result<()> {
    let server = MockSearchServer::start().await?;
    server.route_with_delay(
        "POST",
        BULK_PATH,
        Duration::from_millis(300),
        json!({"items": []}),
    );

    let connection = Arc::new(HttpConnection::connect(ConnectionConfig::new([
        server.address(),
    ]))?);
    let buffer = Arc::new(BulkBuffer::new(connection, DEFAULT_BULK_SIZE));
    buffer.stage_index(PendingOperation::index("tweets", "tweet", json!({"id": 1})))?;

    let in_flight = {
        let buffer = buffer.clone();
        tokio::spawn(async move { buffer.force_flush().await })
    };

    while server.requests_to(BULK_PATH).is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    buffer.stage_index(PendingOperation::index("tweets", "tweet", json!({"id": 2})))?;
    assert_eq!(buffer.len(), 1);

    in_flight.await??;
    assert_eq!(buffer.len(), 1, "The in flight flush must not clear new operations.");

    buffer.force_flush().await?;

    let requests = server.requests_to(BULK_PATH);
    assert_eq!(requests.len(), 2);
    assert_eq!(command_lines(&requests[0].body)[1], json!({"id": 1}));
    assert_eq!(command_lines(&requests[1].body)[1], json!({"id": 2}));
    assert_eq!(requests[1].body.lines().count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_engine_error_surfaces_from_flush() -> anyhow::Result<()> {
    let server = MockSearchServer::start().await?;
    server.route(
        "POST",
        BULK_PATH,
        400,
        json!({"status": 400, "error": "ElasticSearchIllegalArgumentException[Malformed action/metadata line [1]]"}),
    );

    let connection = Arc::new(HttpConnection::connect(ConnectionConfig::new([
        server.address(),
    ]))?);
    let buffer = BulkBuffer::new(connection, DEFAULT_BULK_SIZE);
    buffer.stage_index(PendingOperation::index("tweets", "tweet", json!({})))?;

    let err = buffer.force_flush().await.expect_err("Flush should fail.");
    assert!(err.to_string().contains("Malformed action/metadata line"));
    assert!(buffer.is_empty());

    Ok(())
}
