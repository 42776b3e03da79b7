use std::sync::Arc;
use std::time::Duration;

use searchcake_http::{
    Connection,
    ConnectionConfig,
    EngineErrorKind,
    EsError,
    HttpConnection,
    ManualClock,
    Method,
    Params,
    RequestBody,
};
use serde_json::json;
use test_helper::MockSearchServer;

fn connect(servers: &[String]) -> HttpConnection {
    HttpConnection::connect_with_clock(
        ConnectionConfig::new(servers),
        Arc::new(ManualClock::new()),
    )
    .expect("Create connection.")
}

#[tokio::test]
async fn test_execute_success() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let server = MockSearchServer::start().await?;
    server.route(
        "GET",
        "/_cluster/health",
        200,
        json!({"cluster_name": "c1", "status": "green"}),
    );

    let connection = connect(&[server.address()]);
    let params = Params::new().with("level", "indices").with("timeout", "30s");
    let health = connection
        .execute(Method::GET, "/_cluster/health", None, Some(&params))
        .await?;
    assert_eq!(health["status"], "green");

    let requests = server.requests_to("/_cluster/health");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].query.as_deref(), Some("level=indices&timeout=30s"));
    assert!(requests[0].body.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_execute_sends_json_body() -> anyhow::Result<()> {
    let server = MockSearchServer::start().await?;
    server.route("PUT", "/tweets", 200, json!({"ok": true, "acknowledged": true}));

    let connection = connect(&[server.address()]);
    let settings = json!({"settings": {"number_of_shards": 1}});
    let result = connection
        .execute(
            Method::PUT,
            "/tweets",
            Some(RequestBody::Json(settings.clone())),
            None,
        )
        .await?;
    assert_eq!(result["acknowledged"], true);

    let requests = server.requests_to("/tweets");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].json(), settings);
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));

    Ok(())
}

#[tokio::test]
async fn test_execute_classifies_engine_errors() -> anyhow::Result<()> {
    let server = MockSearchServer::start().await?;
    server.route(
        "DELETE",
        "/tweets",
        404,
        json!({"status": 404, "error": "IndexMissingException[[tweets] missing]"}),
    );
    server.route(
        "GET",
        "/tweets/tweet/1",
        404,
        json!({"ok": true, "_index": "tweets", "exists": false}),
    );

    let connection = connect(&[server.address()]);

    let err = connection
        .execute(Method::DELETE, "/tweets", None, None)
        .await
        .expect_err("Delete of missing index should fail.");
    let engine = err.engine().expect("Error should be an engine error.");
    assert_eq!(engine.kind, EngineErrorKind::IndexMissing);
    assert_eq!(engine.status, 404);
    assert_eq!(engine.message, "[tweets] missing");

    let err = connection
        .execute(Method::GET, "/tweets/tweet/1", None, None)
        .await
        .expect_err("Missing document should fail.");
    assert!(err.is_not_found());

    Ok(())
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let addr = test_helper::get_unused_addr();
    let connection = connect(&[addr.to_string()]);

    let err = connection
        .execute(Method::GET, "/", None, None)
        .await
        .expect_err("Nothing should be listening.");
    assert!(err.is_transport(), "Unexpected error: {err:?}");

    let snapshot = connection.servers();
    assert_eq!(snapshot.live.len(), 1, "A failed request should not mark the server dead.");
}

#[tokio::test]
async fn test_request_timeout() -> anyhow::Result<()> {
    let server = MockSearchServer::start().await?;
    server.route_with_delay("GET", "/slow", Duration::from_secs(5), json!({"ok": true}));

    let cfg = ConnectionConfig::new([server.address()])
        .with_timeout(Duration::from_millis(100));
    let connection = HttpConnection::connect(cfg)?;

    let err = connection
        .execute(Method::GET, "/slow", None, None)
        .await
        .expect_err("Request should time out.");
    assert!(matches!(err, EsError::Timeout(_)));

    Ok(())
}

#[tokio::test]
async fn test_dead_servers_are_skipped() -> anyhow::Result<()> {
    let server = MockSearchServer::start().await?;
    let unused = test_helper::get_unused_addr().to_string();

    let clock = ManualClock::new();
    let connection = HttpConnection::connect_with_clock(
        ConnectionConfig::new([server.address(), unused.clone()]),
        Arc::new(clock.clone()),
    )?;
    connection.mark_dead(&unused.parse()?);

    for _ in 0..10 {
        connection.execute(Method::GET, "/", None, None).await?;
    }
    assert_eq!(server.requests().len(), 10);

    Ok(())
}
