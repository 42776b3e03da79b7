use std::sync::Arc;
use std::time::Duration;

use searchcake_bulk::{BulkBuffer, DEFAULT_BULK_SIZE};
use searchcake_http::{
    Clock,
    Connection,
    ConnectionConfig,
    EsError,
    HttpConnection,
    SystemClock,
};
use searchcake_node::{DiscoveryLoop, DEFAULT_DISCOVERY_INTERVAL};

use crate::Client;

pub const DEFAULT_REFRESH_WAIT: Duration = Duration::from_secs(1);
pub static DEFAULT_INDEX: &str = "_all";

#[derive(Debug, Clone)]
/// The configuration of a [Client].
pub struct ClientConfig {
    /// The servers, timeout and dead server cooldown of the connection.
    pub connection: ConnectionConfig,
    /// The number of staged operations which triggers a bulk request.
    pub bulk_size: usize,
    /// Continuously discover the cluster members and add them to the pool.
    ///
    /// When disabled only the cluster name is fetched, once, on connect.
    pub discover: bool,
    pub discovery_interval: Duration,
    /// The indexes used when an operation is not given any.
    pub default_indexes: Vec<String>,
    /// Refresh the indexes before reads whenever writes have been staged.
    pub autorefresh: bool,
    /// How long to wait after a refresh before checking the cluster health.
    pub refresh_wait: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            bulk_size: DEFAULT_BULK_SIZE,
            discover: true,
            discovery_interval: DEFAULT_DISCOVERY_INTERVAL,
            default_indexes: vec![DEFAULT_INDEX.to_string()],
            autorefresh: false,
            refresh_wait: DEFAULT_REFRESH_WAIT,
        }
    }
}

/// Build a search client using the provided settings.
pub struct ClientBuilder {
    config: ClientConfig,
    clock: Arc<dyn Clock>,
}

impl ClientBuilder {
    /// Create a new client builder connecting to the given servers.
    pub fn new(servers: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self::from_config(ClientConfig {
            connection: ConnectionConfig::new(servers),
            ..Default::default()
        })
    }

    /// Create a new client builder from an existing config.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Set the timeout applied to every request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection.timeout = Some(timeout);
        self
    }

    /// Set how long a dead server is excluded from selection.
    pub fn with_retry_time(mut self, retry_time: Duration) -> Self {
        self.config.connection.retry_time = retry_time;
        self
    }

    /// Set the number of staged operations which triggers a bulk request.
    pub fn with_bulk_size(mut self, bulk_size: usize) -> Self {
        self.config.bulk_size = bulk_size;
        self
    }

    /// Enable or disable continuous cluster discovery.
    pub fn with_discovery(mut self, discover: bool) -> Self {
        self.config.discover = discover;
        self
    }

    pub fn with_discovery_interval(mut self, interval: Duration) -> Self {
        self.config.discovery_interval = interval;
        self
    }

    /// Set the indexes used when an operation is not given any.
    ///
    /// An empty list resets to `_all`.
    pub fn with_default_indexes(
        mut self,
        indexes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let indexes: Vec<String> = indexes.into_iter().map(Into::into).collect();
        self.config.default_indexes = if indexes.is_empty() {
            vec![DEFAULT_INDEX.to_string()]
        } else {
            indexes
        };
        self
    }

    pub fn with_autorefresh(mut self, autorefresh: bool) -> Self {
        self.config.autorefresh = autorefresh;
        self
    }

    pub fn with_refresh_wait(mut self, wait: Duration) -> Self {
        self.config.refresh_wait = wait;
        self
    }

    /// Set the clock driving cooldowns, discovery and the refresh wait.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Connects to the cluster over HTTP.
    pub async fn connect(self) -> Result<Client<HttpConnection>, EsError> {
        let connection = HttpConnection::connect_with_clock(
            self.config.connection.clone(),
            self.clock.clone(),
        )?;
        self.connect_with(Arc::new(connection)).await
    }

    /// Builds the client on top of an already established connection.
    ///
    /// The servers and timeout of the config are ignored, they are a
    /// concern of the connection itself.
    pub async fn connect_with<C: Connection>(
        self,
        connection: Arc<C>,
    ) -> Result<Client<C>, EsError> {
        let ClientConfig {
            bulk_size,
            discover,
            discovery_interval,
            default_indexes,
            autorefresh,
            refresh_wait,
            ..
        } = self.config;

        if bulk_size == 0 {
            return Err(EsError::InvalidParameter(
                "The bulk size must be at least 1.".to_string(),
            ));
        }

        let bulk = BulkBuffer::new(connection.clone(), bulk_size);
        let discovery =
            DiscoveryLoop::new(connection.clone(), self.clock.clone(), discovery_interval);

        let discovery_handle = if discover {
            Some(discovery.clone().start())
        } else {
            if let Err(e) = discovery.fetch_cluster_name().await {
                warn!(error = ?e, "Failed to fetch the cluster name.");
            }
            None
        };

        info!(
            bulk_size = bulk_size,
            discover = discover,
            autorefresh = autorefresh,
            default_indexes = ?default_indexes,
            "Search client is ready."
        );

        Ok(Client {
            connection,
            bulk,
            discovery,
            discovery_handle,
            clock: self.clock,
            default_indexes,
            autorefresh,
            refresh_wait,
        })
    }
}
