use std::sync::Arc;
use std::time::Duration;

use searchcake_http::{ConnectionConfig, HttpConnection, ManualClock};
use searchcake_node::{DiscoveryLoop, DiscoveryStatistics, DEFAULT_DISCOVERY_INTERVAL};
use serde_json::json;
use test_helper::MockSearchServer;

async fn wait_for_ticks(stats: &DiscoveryStatistics, n: u64) {
    for _ in 0..500 {
        if stats.num_ticks() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Discovery did not reach {n} ticks, got {}", stats.num_ticks());
}

#[tokio::test]
async fn test_discovery_adds_cluster_members() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let server = MockSearchServer::start().await?;
    server.route(
        "GET",
        "/_cluster/nodes",
        200,
        json!({
            "cluster_name": "c1",
            "nodes": {"n1": {"http_address": "inet[/10.0.0.5:9200]"}}
        }),
    );

    let clock = Arc::new(ManualClock::new());
    let connection = Arc::new(HttpConnection::connect_with_clock(
        ConnectionConfig::new([server.address()]),
        clock.clone(),
    )?);

    let discovery =
        DiscoveryLoop::new(connection.clone(), clock, DEFAULT_DISCOVERY_INTERVAL);
    let num_added = discovery.tick().await?;
    assert_eq!(num_added, 1);

    let snapshot = connection.servers();
    assert_eq!(snapshot.live.len(), 2);
    assert!(snapshot.live.iter().any(|addr| addr.as_str() == "10.0.0.5:9200"));
    assert_eq!(discovery.cluster_name().as_deref(), Some("c1"));

    Ok(())
}

#[tokio::test]
async fn test_discovery_brackets_ipv6_and_skips_unusable_addresses() -> anyhow::Result<()> {
    let server = MockSearchServer::start().await?;
    server.route(
        "GET",
        "/_cluster/nodes",
        200,
        json!({
            "cluster_name": "c1",
            "nodes": {
                "n1": {"http_address": format!("inet[/{}]", server.address())},
                "n2": {"http_address": "inet[/0:0:0:0:0:0:0:1:9200]"},
                "n3": {"http_address": "inet[/not a host:9200]"},
            }
        }),
    );

    let clock = Arc::new(ManualClock::new());
    let connection = Arc::new(HttpConnection::connect_with_clock(
        ConnectionConfig::new([server.address()]),
        clock.clone(),
    )?);

    let discovery =
        DiscoveryLoop::new(connection.clone(), clock, DEFAULT_DISCOVERY_INTERVAL);
    let num_added = discovery.tick().await?;
    assert_eq!(num_added, 1, "Only the IPv6 node is new and usable.");
    assert_eq!(discovery.statistics().num_servers_added(), 1);

    let snapshot = connection.servers();
    assert_eq!(snapshot.live.len(), 2);
    assert!(snapshot
        .live
        .iter()
        .any(|addr| addr.base_url() == "http://[0:0:0:0:0:0:0:1]:9200"));

    Ok(())
}

#[tokio::test]
async fn test_failed_discovery_leaves_pool_unchanged() -> anyhow::Result<()> {
    let server = MockSearchServer::start().await?;
    server.route(
        "GET",
        "/_cluster/nodes",
        503,
        json!({"status": 503, "error": "ClusterBlockException[blocked by: [SERVICE_UNAVAILABLE]]"}),
    );

    let clock = Arc::new(ManualClock::new());
    let connection = Arc::new(HttpConnection::connect_with_clock(
        ConnectionConfig::new([server.address()]),
        clock.clone(),
    )?);

    let discovery =
        DiscoveryLoop::new(connection.clone(), clock, DEFAULT_DISCOVERY_INTERVAL);
    discovery
        .tick()
        .await
        .expect_err("Discovery should fail on an engine error.");

    let snapshot = connection.servers();
    assert_eq!(snapshot.live.len(), 1);
    assert!(snapshot.dead.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_discovery_loop_ticks_every_interval() -> anyhow::Result<()> {
    let server = MockSearchServer::start().await?;
    server.route(
        "GET",
        "/_cluster/nodes",
        200,
        json!({
            "cluster_name": "c1",
            "nodes": {"n1": {"http_address": "inet[/10.0.0.5:9200]"}}
        }),
    );

    let clock = Arc::new(ManualClock::new());
    let connection = Arc::new(HttpConnection::connect_with_clock(
        ConnectionConfig::new([server.address()]),
        clock.clone(),
    )?);

    let handle =
        DiscoveryLoop::new(connection, clock.clone(), DEFAULT_DISCOVERY_INTERVAL).start();
    let stats = handle.statistics();

    wait_for_ticks(&stats, 1).await;
    assert_eq!(handle.cluster_name().as_deref(), Some("c1"));

    // The loop is now sleeping on the clock.
    while clock.num_sleepers() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(stats.num_ticks(), 1);

    clock.advance(DEFAULT_DISCOVERY_INTERVAL);
    wait_for_ticks(&stats, 2).await;
    assert_eq!(server.requests_to("/_cluster/nodes").len(), 2);

    handle.kill();
    for _ in 0..100 {
        if handle.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(handle.is_finished());

    Ok(())
}
