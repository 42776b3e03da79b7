use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use searchcake_http::{EsError, Params, Value};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
/// The level of detail returned by the cluster health endpoint.
pub enum HealthLevel {
    #[default]
    Cluster,
    Indices,
    Shards,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cluster => "cluster",
            Self::Indices => "indices",
            Self::Shards => "shards",
        }
    }
}

impl Display for HealthLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthLevel {
    type Err = EsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cluster" => Ok(Self::Cluster),
            "indices" => Ok(Self::Indices),
            "shards" => Ok(Self::Shards),
            other => Err(EsError::InvalidParameter(format!(
                "Invalid level: {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// The health status of the cluster or an index.
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl Display for HealthStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = EsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "red" => Ok(Self::Red),
            other => Err(EsError::InvalidParameter(format!(
                "Invalid wait_for_status: {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
/// Options for the cluster health request.
pub struct HealthOptions {
    pub indexes: Vec<String>,
    pub level: HealthLevel,
    pub wait_for_status: Option<HealthStatus>,
    pub wait_for_relocating_shards: Option<u32>,
    pub wait_for_nodes: Option<String>,
    /// How long the cluster may take to reach the awaited state.
    ///
    /// Only sent when one of the `wait_for_*` options is set.
    pub timeout: Duration,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            indexes: Vec::new(),
            level: HealthLevel::default(),
            wait_for_status: None,
            wait_for_relocating_shards: None,
            wait_for_nodes: None,
            timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

impl HealthOptions {
    pub fn with_level(mut self, level: HealthLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_indexes(
        mut self,
        indexes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.indexes = indexes.into_iter().map(Into::into).collect();
        self
    }

    pub fn wait_for_status(mut self, status: HealthStatus) -> Self {
        self.wait_for_status = Some(status);
        self
    }

    pub fn wait_for_relocating_shards(mut self, shards: u32) -> Self {
        self.wait_for_relocating_shards = Some(shards);
        self
    }

    pub fn wait_for_nodes(mut self, nodes: impl Into<String>) -> Self {
        self.wait_for_nodes = Some(nodes.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn is_waiting(&self) -> bool {
        self.wait_for_status.is_some()
            || self.wait_for_relocating_shards.is_some()
            || self.wait_for_nodes.is_some()
    }

    pub(crate) fn to_params(&self) -> Params {
        let mut params = Params::new().with("level", self.level);

        if let Some(status) = self.wait_for_status {
            params.insert("wait_for_status", status);
        }
        if let Some(shards) = self.wait_for_relocating_shards {
            params.insert("wait_for_relocating_shards", shards);
        }
        if let Some(nodes) = self.wait_for_nodes.as_ref() {
            params.insert("wait_for_nodes", nodes);
        }
        if self.is_waiting() {
            params.insert("timeout", format!("{}s", self.timeout.as_secs()));
        }

        params
    }
}

#[derive(Debug, Clone, Default)]
/// Sections to leave out of the cluster state response.
pub struct ClusterStateFilters {
    pub filter_nodes: bool,
    pub filter_routing_table: bool,
    pub filter_metadata: bool,
    pub filter_blocks: bool,
    /// Only include the metadata of these indices.
    pub filter_indices: Vec<String>,
}

impl ClusterStateFilters {
    pub(crate) fn to_params(&self) -> Params {
        let mut params = Params::new();
        let flags = [
            ("filter_nodes", self.filter_nodes),
            ("filter_routing_table", self.filter_routing_table),
            ("filter_metadata", self.filter_metadata),
            ("filter_blocks", self.filter_blocks),
        ];
        for (key, _) in flags.into_iter().filter(|(_, enabled)| *enabled) {
            params.insert(key, true);
        }

        if !self.filter_indices.is_empty() {
            params.insert("filter_indices", self.filter_indices.join(","));
        }

        params
    }
}

#[derive(Debug, Clone)]
/// Options for the optimize request.
pub struct OptimizeOptions {
    pub wait_for_merge: bool,
    pub max_num_segments: Option<u32>,
    pub only_expunge_deletes: bool,
    pub refresh: bool,
    pub flush: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            wait_for_merge: false,
            max_num_segments: None,
            only_expunge_deletes: false,
            refresh: true,
            flush: true,
        }
    }
}

impl OptimizeOptions {
    pub(crate) fn to_params(&self) -> Params {
        let mut params = Params::new()
            .with("wait_for_merge", self.wait_for_merge)
            .with("only_expunge_deletes", self.only_expunge_deletes)
            .with("refresh", self.refresh)
            .with("flush", self.flush);

        if let Some(segments) = self.max_num_segments {
            params.insert("max_num_segments", segments);
        }

        params
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AliasAction {
    Add,
    Remove,
}

impl AliasAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single change to the alias table.
pub struct AliasCommand {
    pub action: AliasAction,
    pub index: String,
    pub alias: String,
}

impl AliasCommand {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            action: AliasAction::Add,
            index: index.into(),
            alias: alias.into(),
        }
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            action: AliasAction::Remove,
            index: index.into(),
            alias: alias.into(),
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut command = serde_json::Map::new();
        command.insert(
            self.action.as_str().to_string(),
            serde_json::json!({"index": self.index, "alias": self.alias}),
        );
        Value::Object(command)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// The summary of an index, or of an alias across the indices it points to.
pub struct IndexInfo {
    pub num_docs: u64,
    /// The indices an alias points to, empty for a concrete index.
    pub alias_for: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// Information about the server and the state of its indices.
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Value,
    /// The full response of the root endpoint.
    pub all_info: Value,
    /// The status of all indices.
    pub status: Value,
}
