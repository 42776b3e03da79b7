#[macro_use]
extern crate tracing;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use searchcake::{
    ClientBuilder,
    HealthLevel,
    HealthOptions,
    HealthStatus,
    PendingOperation,
};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args: Args = Args::parse();

    let mut builder = ClientBuilder::new(&args.servers)
        .with_retry_time(args.retry_time)
        .with_bulk_size(args.bulk_size)
        .with_discovery(!args.no_discovery)
        .with_discovery_interval(args.discovery_interval)
        .with_autorefresh(args.autorefresh);
    if let Some(timeout) = args.timeout {
        builder = builder.with_timeout(timeout);
    }

    let client = builder.connect().await?;

    match args.command {
        Command::Health { level, wait_for } => {
            let mut opts = HealthOptions::default().with_level(level.parse::<HealthLevel>()?);
            if let Some(status) = wait_for {
                opts = opts.wait_for_status(status.parse::<HealthStatus>()?);
            }
            print_json(&client.cluster_health(&opts).await?)?;
        },
        Command::Nodes => {
            print_json(&client.cluster_nodes(&[]).await?)?;
        },
        Command::Load {
            index,
            doc_type,
            file,
        } => {
            let start = Instant::now();
            let contents = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let mut num_docs = 0;
            for line in contents.lines().filter(|line| !line.trim().is_empty()) {
                let doc: Value = serde_json::from_str(line)
                    .with_context(|| format!("Invalid document on line {}", num_docs + 1))?;
                client
                    .bulk_index(PendingOperation::index(&index, &doc_type, doc))
                    .await?;
                num_docs += 1;
            }
            client.refresh(&[index.as_str()]).await?;

            info!(
                num_docs = num_docs,
                elapsed = %humantime::format_duration(start.elapsed()),
                "Loaded documents."
            );
        },
        Command::Search { index, query } => {
            let query: Value = serde_json::from_str(&query).context("Invalid query")?;
            print_json(&client.search(query, &[index.as_str()], &[]).await?)?;
        },
    }

    let bulk = client.bulk_statistics();
    let discovery = client.discovery_statistics();
    info!(
        num_flushes = bulk.num_flushes(),
        num_operations_sent = bulk.num_operations_sent(),
        num_discovery_ticks = discovery.num_ticks(),
        live_servers = client.servers().live.len(),
        "Done."
    );

    client.close().await;

    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long = "server", default_value = "127.0.0.1:9200")]
    /// The set of seed servers.
    ///
    /// Unless discovery is disabled, the rest of the cluster is learned from these.
    servers: Vec<String>,

    #[arg(long, value_parser = humantime::parse_duration)]
    /// The maximum time a single request may take.
    timeout: Option<Duration>,

    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    /// How long a dead server is excluded from selection.
    retry_time: Duration,

    #[arg(long, default_value_t = 400)]
    /// The number of staged documents which triggers a bulk request.
    bulk_size: usize,

    #[arg(long)]
    /// Only use the seed servers, never discover other cluster members.
    no_discovery: bool,

    #[arg(long, default_value = "5m", value_parser = humantime::parse_duration)]
    /// How often the cluster members are re-discovered.
    discovery_interval: Duration,

    #[arg(long)]
    /// Wait for the cluster to settle after each refresh.
    autorefresh: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the cluster health.
    Health {
        #[arg(long, default_value = "cluster")]
        level: String,
        #[arg(long)]
        /// Block until the cluster reaches this status.
        wait_for: Option<String>,
    },
    /// Print the cluster members.
    Nodes,
    /// Bulk load newline delimited JSON documents from a file.
    Load {
        #[arg(long)]
        index: String,
        #[arg(long = "type", default_value = "doc")]
        doc_type: String,
        file: PathBuf,
    },
    /// Run a search query against an index.
    Search {
        #[arg(long)]
        index: String,
        /// The query as a JSON document.
        query: String,
    },
}
