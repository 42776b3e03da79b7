use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::Value;
use smallvec::{smallvec, SmallVec};

use crate::BulkError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
/// The kind of mutation a [PendingOperation] performs.
pub enum OperationKind {
    /// Index a document, replacing any existing document with the same id.
    Index,
    /// Index a document, failing if a document with the same id exists.
    Create,
    /// Delete a document by id.
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }

    /// Returns true if the operation carries a document.
    pub fn has_document(&self) -> bool {
        !matches!(self, Self::Delete)
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A single mutation waiting to be sent as part of a bulk request.
pub struct PendingOperation {
    pub kind: OperationKind,
    pub index: String,
    pub doc_type: String,
    pub id: Option<String>,
    pub parent: Option<String>,
    pub version: Option<u64>,
    /// The document body, required for index and create operations.
    pub document: Option<Value>,
}

impl PendingOperation {
    /// An operation indexing `document`, the engine assigns an id unless one is set.
    pub fn index(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        document: Value,
    ) -> Self {
        Self {
            kind: OperationKind::Index,
            index: index.into(),
            doc_type: doc_type.into(),
            id: None,
            parent: None,
            version: None,
            document: Some(document),
        }
    }

    /// An operation creating `document`, failing if the id is already taken.
    pub fn create(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        document: Value,
    ) -> Self {
        Self {
            kind: OperationKind::Create,
            ..Self::index(index, doc_type, document)
        }
    }

    /// An operation deleting the document with the given id.
    pub fn delete(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            kind: OperationKind::Delete,
            index: index.into(),
            doc_type: doc_type.into(),
            id: Some(id.into()),
            parent: None,
            version: None,
            document: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Checks the operation carries everything its kind requires.
    pub fn validate(&self) -> Result<(), BulkError> {
        match self.kind {
            OperationKind::Delete if self.id.is_none() => Err(BulkError::MissingId),
            kind if kind.has_document() && self.document.is_none() => {
                Err(BulkError::MissingDocument(kind))
            },
            _ => Ok(()),
        }
    }

    /// Renders the operation as bulk request lines.
    ///
    /// This is the command line, followed by the document line for index and
    /// create operations. Optional metadata only appears if it was set.
    pub fn to_lines(&self) -> Result<SmallVec<[String; 2]>, BulkError> {
        self.validate()?;

        let meta = CommandMeta {
            index: &self.index,
            doc_type: &self.doc_type,
            id: self.id.as_deref(),
            parent: self.parent.as_deref(),
            version: self.version,
        };
        let command = match self.kind {
            OperationKind::Index => Command::Index(meta),
            OperationKind::Create => Command::Create(meta),
            OperationKind::Delete => Command::Delete(meta),
        };

        let command = serde_json::to_string(&command)?;
        match self.document.as_ref() {
            Some(doc) if self.kind.has_document() => {
                Ok(smallvec![command, serde_json::to_string(doc)?])
            },
            _ => Ok(smallvec![command]),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Command<'a> {
    Index(CommandMeta<'a>),
    Create(CommandMeta<'a>),
    Delete(CommandMeta<'a>),
}

#[derive(Serialize)]
struct CommandMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(rename = "_parent", skip_serializing_if = "Option::is_none")]
    parent: Option<&'a str>,
    #[serde(rename = "_version", skip_serializing_if = "Option::is_none")]
    version: Option<u64>,
}
