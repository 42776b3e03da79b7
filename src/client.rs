use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use searchcake_bulk::{BulkBuffer, BulkStatistics, OperationKind, PendingOperation};
use searchcake_http::{
    Clock,
    Connection,
    EngineErrorKind,
    EsError,
    HttpConnection,
    Method,
    Params,
    RequestBody,
    ServerSnapshot,
    Value,
};
use searchcake_node::{DiscoveryHandle, DiscoveryLoop, DiscoveryStatistics};
use serde_json::json;

use crate::options::{
    AliasCommand,
    ClusterStateFilters,
    HealthOptions,
    HealthStatus,
    IndexInfo,
    OptimizeOptions,
    ServerInfo,
};
use crate::utils::{join_names, make_path};

/// An asynchronous client for a search engine cluster.
///
/// Every operation is a thin wrapper issuing requests through the connection
/// or staging writes into the bulk buffer. Operations taking a list of
/// indexes fall back to the configured default indexes when given an empty
/// list.
pub struct Client<C: Connection = HttpConnection> {
    pub(crate) connection: Arc<C>,
    pub(crate) bulk: BulkBuffer<C>,
    pub(crate) discovery: DiscoveryLoop<C>,
    pub(crate) discovery_handle: Option<DiscoveryHandle>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) default_indexes: Vec<String>,
    pub(crate) autorefresh: bool,
    pub(crate) refresh_wait: Duration,
}

impl<C: Connection> Client<C> {
    #[inline]
    /// The connection requests are issued through.
    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    #[inline]
    /// The name of the cluster, once it has been learned.
    pub fn cluster_name(&self) -> Option<String> {
        self.discovery.cluster_name()
    }

    #[inline]
    pub fn default_indexes(&self) -> &[String] {
        &self.default_indexes
    }

    #[inline]
    /// The number of operations currently staged for the next bulk request.
    pub fn num_pending_operations(&self) -> usize {
        self.bulk.len()
    }

    #[inline]
    /// Returns false once a write has been made that has not been refreshed.
    pub fn is_refreshed(&self) -> bool {
        self.bulk.is_refreshed()
    }

    #[inline]
    /// Gets the live bulk buffer statistics.
    pub fn bulk_statistics(&self) -> BulkStatistics {
        self.bulk.statistics()
    }

    #[inline]
    /// Gets the live discovery statistics.
    pub fn discovery_statistics(&self) -> DiscoveryStatistics {
        self.discovery.statistics()
    }

    /// Stops discovery and closes the connection.
    ///
    /// Operations still staged in the bulk buffer are not sent.
    pub async fn close(&self) {
        if let Some(handle) = self.discovery_handle.as_ref() {
            handle.kill();
        }
        if !self.bulk.is_empty() {
            warn!(
                num_operations = self.bulk.len(),
                "Closing client with unsent bulk operations."
            );
        }
        self.connection.close().await;
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        params: Option<&Params>,
    ) -> Result<Value, EsError> {
        self.connection
            .execute(method, path, body.map(RequestBody::Json), params)
            .await
    }

    fn indexes_or_default(&self, indexes: &[&str]) -> String {
        if indexes.is_empty() {
            join_names(self.default_indexes.as_slice())
        } else {
            join_names(indexes)
        }
    }

    /// Makes staged writes visible before a read.
    async fn prepare_read(&self) -> Result<(), EsError> {
        if self.autorefresh && !self.bulk.is_refreshed() {
            self.refresh(&[]).await?;
        } else if !self.bulk.is_empty() {
            self.bulk.force_flush().await?;
        }
        Ok(())
    }

    // Documents

    /// Indexes a single document directly, bypassing the bulk buffer.
    pub async fn index(&self, op: PendingOperation) -> Result<Value, EsError> {
        let document = match (op.kind, op.document) {
            (OperationKind::Delete, _) => {
                return Err(EsError::InvalidParameter(
                    "Cannot index a delete operation.".to_string(),
                ))
            },
            (_, None) => {
                return Err(EsError::InvalidParameter(
                    "An index operation requires a document.".to_string(),
                ))
            },
            (_, Some(document)) => document,
        };

        let mut params = Params::new();
        if op.kind == OperationKind::Create {
            params.insert("op_type", "create");
        }
        if let Some(parent) = op.parent.as_ref() {
            params.insert("parent", parent);
        }
        if let Some(version) = op.version {
            params.insert("version", version);
        }

        let id = op.id.as_deref().unwrap_or_default();
        let method = if id.is_empty() {
            Method::POST
        } else {
            Method::PUT
        };
        let path = make_path([op.index.as_str(), op.doc_type.as_str(), id]);

        self.bulk.mark_dirty();
        self.send(method, &path, Some(document), Some(&params)).await
    }

    /// Stages an index or create operation, sending a bulk request if the buffer is full.
    pub async fn bulk_index(&self, op: PendingOperation) -> Result<Option<Value>, EsError> {
        self.bulk.stage_index(op)?;
        Ok(self.bulk.flush_if_full(false).await?)
    }

    /// Stages a delete operation, sending a bulk request if the buffer is full.
    pub async fn bulk_delete(&self, op: PendingOperation) -> Result<Option<Value>, EsError> {
        self.bulk.stage_delete(op)?;
        Ok(self.bulk.flush_if_full(false).await?)
    }

    /// Sends every staged operation now.
    pub async fn force_bulk(&self) -> Result<Option<Value>, EsError> {
        Ok(self.bulk.force_flush().await?)
    }

    /// Deletes a single document directly, bypassing the bulk buffer.
    pub async fn delete(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<Value, EsError> {
        let path = make_path([index, doc_type, id]);
        self.bulk.mark_dirty();
        self.send(Method::DELETE, &path, None, None).await
    }

    /// Gets a single document by id.
    pub async fn get(&self, index: &str, doc_type: &str, id: &str) -> Result<Value, EsError> {
        let path = make_path([index, doc_type, id]);
        self.send(Method::GET, &path, None, None).await
    }

    /// Runs a search query across the given indexes and document types.
    pub async fn search(
        &self,
        query: Value,
        indexes: &[&str],
        doc_types: &[&str],
    ) -> Result<Value, EsError> {
        self.prepare_read().await?;

        let path = make_path([
            self.indexes_or_default(indexes),
            join_names(doc_types),
            "_search".to_string(),
        ]);
        self.send(Method::POST, &path, Some(query), None).await
    }

    /// Counts the documents matching a query.
    pub async fn count(
        &self,
        query: Value,
        indexes: &[&str],
        doc_types: &[&str],
    ) -> Result<Value, EsError> {
        self.prepare_read().await?;

        let path = make_path([
            self.indexes_or_default(indexes),
            join_names(doc_types),
            "_count".to_string(),
        ]);
        self.send(Method::POST, &path, Some(query), None).await
    }

    // Indices

    /// Retrieves the status of one or more indexes.
    pub async fn status(&self, indexes: &[&str]) -> Result<Value, EsError> {
        let path = make_path([self.indexes_or_default(indexes), "_status".to_string()]);
        self.send(Method::GET, &path, None, None).await
    }

    /// Creates an index with optional settings.
    pub async fn create_index(
        &self,
        index: &str,
        settings: Option<Value>,
    ) -> Result<Value, EsError> {
        self.send(Method::PUT, &make_path([index]), settings, None)
            .await
    }

    /// Creates an index, treating an existing index as success.
    ///
    /// If the index already exists the body of the error response is returned.
    pub async fn create_index_if_missing(
        &self,
        index: &str,
        settings: Option<Value>,
    ) -> Result<Value, EsError> {
        match self.create_index(index, settings).await {
            Err(EsError::Engine(e)) if e.is_already_exists() => {
                debug!(index = index, "Index already exists.");
                Ok(e.body)
            },
            other => other,
        }
    }

    pub async fn delete_index(&self, index: &str) -> Result<Value, EsError> {
        self.send(Method::DELETE, &make_path([index]), None, None)
            .await
    }

    /// Deletes an index, treating a missing index as success.
    ///
    /// A missing index yields `null`, a generic not found yields the error body.
    pub async fn delete_index_if_exists(&self, index: &str) -> Result<Value, EsError> {
        match self.delete_index(index).await {
            Err(EsError::Engine(e)) if e.kind == EngineErrorKind::IndexMissing => {
                Ok(Value::Null)
            },
            Err(EsError::Engine(e)) if e.kind == EngineErrorKind::NotFound => Ok(e.body),
            other => other,
        }
    }

    /// Summarises every index by name, optionally including aliases.
    pub async fn get_indices(
        &self,
        include_aliases: bool,
    ) -> Result<BTreeMap<String, IndexInfo>, EsError> {
        let status = self.status(&["_all"]).await?;
        Ok(summarise_indices(&status, include_aliases))
    }

    pub async fn open_index(&self, index: &str) -> Result<Value, EsError> {
        self.send(Method::POST, &make_path([index, "_open"]), None, None)
            .await
    }

    pub async fn close_index(&self, index: &str) -> Result<Value, EsError> {
        self.send(Method::POST, &make_path([index, "_close"]), None, None)
            .await
    }

    /// Flushes the indexes to disk, sending any staged operations first.
    pub async fn flush(&self, indexes: &[&str], refresh: bool) -> Result<Value, EsError> {
        self.bulk.force_flush().await?;

        let path = make_path([self.indexes_or_default(indexes), "_flush".to_string()]);
        let params = if refresh {
            Params::new().with("refresh", true)
        } else {
            Params::new()
        };
        self.send(Method::POST, &path, None, Some(&params)).await
    }

    /// Makes every write to the indexes visible to searches.
    ///
    /// Staged operations are sent first. With autorefresh enabled this also
    /// waits for the configured refresh wait and then for the cluster to
    /// leave the red state.
    pub async fn refresh(&self, indexes: &[&str]) -> Result<Value, EsError> {
        let generation = self.bulk.dirty_generation();
        self.bulk.force_flush().await?;

        let path = make_path([self.indexes_or_default(indexes), "_refresh".to_string()]);
        let result = self.send(Method::POST, &path, None, None).await?;

        if self.autorefresh {
            self.clock.sleep(self.refresh_wait).await;
            let opts = HealthOptions::default().wait_for_status(HealthStatus::Yellow);
            self.cluster_health(&opts).await?;
        }

        self.bulk.mark_refreshed_if(generation);
        Ok(result)
    }

    /// Optimizes one or more indexes.
    pub async fn optimize(
        &self,
        indexes: &[&str],
        opts: &OptimizeOptions,
    ) -> Result<Value, EsError> {
        let generation = self.bulk.dirty_generation();
        let path = make_path([self.indexes_or_default(indexes), "_optimize".to_string()]);
        let result = self
            .send(Method::POST, &path, None, Some(&opts.to_params()))
            .await?;
        self.bulk.mark_refreshed_if(generation);
        Ok(result)
    }

    /// Runs the analysis process on a text, returning its tokens.
    pub async fn analyze(
        &self,
        text: &str,
        index: Option<&str>,
        analyzer: Option<&str>,
    ) -> Result<Value, EsError> {
        let path = make_path([index.unwrap_or_default(), "_analyze"]);
        let params = analyzer.map(|analyzer| Params::new().with("analyzer", analyzer));
        self.send(
            Method::POST,
            &path,
            Some(json!({ "text": text })),
            params.as_ref(),
        )
        .await
    }

    pub async fn gateway_snapshot(&self, indexes: &[&str]) -> Result<Value, EsError> {
        let path = make_path([
            self.indexes_or_default(indexes),
            "_gateway".to_string(),
            "snapshot".to_string(),
        ]);
        self.send(Method::POST, &path, None, None).await
    }

    /// Registers the mapping of a document type against the indexes.
    ///
    /// A mapping not already keyed by the document type is wrapped in one.
    pub async fn put_mapping(
        &self,
        doc_type: &str,
        mapping: Value,
        indexes: &[&str],
    ) -> Result<Value, EsError> {
        let path = make_path([
            self.indexes_or_default(indexes),
            doc_type.to_string(),
            "_mapping".to_string(),
        ]);
        let mapping = if mapping.get(doc_type).is_some() {
            mapping
        } else {
            let mut wrapped = serde_json::Map::new();
            wrapped.insert(doc_type.to_string(), mapping);
            Value::Object(wrapped)
        };

        self.bulk.mark_dirty();
        self.send(Method::PUT, &path, Some(mapping), None).await
    }

    pub async fn get_mapping(
        &self,
        doc_type: Option<&str>,
        indexes: &[&str],
    ) -> Result<Value, EsError> {
        let path = make_path([
            self.indexes_or_default(indexes),
            doc_type.unwrap_or_default().to_string(),
            "_mapping".to_string(),
        ]);
        self.send(Method::GET, &path, None, None).await
    }

    // Aliases

    /// Applies a set of alias changes atomically.
    pub async fn change_aliases(
        &self,
        commands: impl IntoIterator<Item = AliasCommand>,
    ) -> Result<Value, EsError> {
        let actions = commands
            .into_iter()
            .map(|cmd| cmd.to_json())
            .collect::<Vec<_>>();
        self.send(
            Method::POST,
            "/_aliases",
            Some(json!({ "actions": actions })),
            None,
        )
        .await
    }

    /// Points an alias at the given indexes, in addition to its current ones.
    pub async fn add_alias(&self, alias: &str, indexes: &[&str]) -> Result<Value, EsError> {
        self.change_aliases(indexes.iter().map(|index| AliasCommand::add(*index, alias)))
            .await
    }

    /// Removes an alias from the given indexes.
    pub async fn delete_alias(
        &self,
        alias: &str,
        indexes: &[&str],
    ) -> Result<Value, EsError> {
        self.change_aliases(
            indexes
                .iter()
                .map(|index| AliasCommand::remove(*index, alias)),
        )
        .await
    }

    /// The indexes an alias points to.
    ///
    /// Fails with an index missing error if the alias does not exist.
    pub async fn get_alias(&self, alias: &str) -> Result<Vec<String>, EsError> {
        let status = self.status(&[alias]).await?;
        let indices = status
            .get("indices")
            .and_then(Value::as_object)
            .map(|indices| indices.keys().cloned().collect())
            .unwrap_or_default();
        Ok(indices)
    }

    /// Points an alias at exactly the given indexes, replacing its current ones.
    ///
    /// Returns `None` if there was nothing to change.
    pub async fn set_alias(
        &self,
        alias: &str,
        indexes: &[&str],
    ) -> Result<Option<Value>, EsError> {
        let current = match self.get_alias(alias).await {
            Ok(current) => current,
            Err(e) if e.is_index_missing() => {
                return self.add_alias(alias, indexes).await.map(Some);
            },
            Err(e) => return Err(e),
        };

        let commands = current
            .iter()
            .map(|index| AliasCommand::remove(index.as_str(), alias))
            .chain(indexes.iter().map(|index| AliasCommand::add(*index, alias)))
            .collect::<Vec<_>>();

        if commands.is_empty() {
            return Ok(None);
        }
        self.change_aliases(commands).await.map(Some)
    }

    // Cluster

    /// Checks the current cluster health.
    pub async fn cluster_health(&self, opts: &HealthOptions) -> Result<Value, EsError> {
        let path = make_path([
            "_cluster".to_string(),
            "health".to_string(),
            join_names(opts.indexes.as_slice()),
        ]);
        self.send(Method::GET, &path, None, Some(&opts.to_params()))
            .await
    }

    /// Retrieves the cluster state, leaving out the filtered sections.
    pub async fn cluster_state(
        &self,
        filters: &ClusterStateFilters,
    ) -> Result<Value, EsError> {
        let params = filters.to_params();
        let params = if params.is_empty() {
            None
        } else {
            Some(&params)
        };
        self.send(Method::GET, "/_cluster/state", None, params)
            .await
    }

    /// Retrieves information on the given nodes, or every node if none are given.
    pub async fn cluster_nodes(&self, nodes: &[&str]) -> Result<Value, EsError> {
        let nodes = join_names(nodes);
        let path = make_path(["_cluster", "nodes", nodes.as_str()]);
        self.send(Method::GET, &path, None, None).await
    }

    /// Collects information about the server and the status of all indexes.
    pub async fn collect_info(&self) -> Result<ServerInfo, EsError> {
        let all_info = self.send(Method::GET, "/", None, None).await?;
        let status = self.status(&["_all"]).await?;

        Ok(ServerInfo {
            name: all_info
                .get("name")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            version: all_info.get("version").cloned().unwrap_or(Value::Null),
            all_info,
            status,
        })
    }
}

impl Client<HttpConnection> {
    /// A snapshot of the live and dead servers of the connection.
    pub fn servers(&self) -> ServerSnapshot {
        self.connection.servers()
    }
}

impl<C: Connection> Drop for Client<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.discovery_handle.take() {
            handle.kill();
        }
    }
}

fn summarise_indices(status: &Value, include_aliases: bool) -> BTreeMap<String, IndexInfo> {
    let mut result = BTreeMap::<String, IndexInfo>::new();
    let indices = match status.get("indices").and_then(Value::as_object) {
        Some(indices) => indices,
        None => return result,
    };

    for (name, info) in indices {
        let num_docs = info
            .pointer("/docs/num_docs")
            .and_then(Value::as_u64)
            .unwrap_or_default();

        result.entry(name.clone()).or_default().num_docs = num_docs;

        if !include_aliases {
            continue;
        }

        let aliases = info
            .get("aliases")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for alias in aliases.iter().filter_map(Value::as_str) {
            let entry = result.entry(alias.to_string()).or_default();
            entry.num_docs += num_docs;
            entry.alias_for.push(name.clone());
        }
    }

    result
}
