//! Requests against the `/data/` API namespace.

use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

use crate::api::Transport;
use crate::errors::CapError;

/// Server-side record for an uploaded datafile; `path` is assigned by
/// the server and feeds the static-asset URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteFile {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub file_role: String,
}

pub struct Datafiles<'a> {
    transport: &'a dyn Transport,
}

impl<'a> Datafiles<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Datafiles { transport }
    }

    /// All datafiles associated with a parent object, as raw JSON.
    pub async fn list(&self, parent_uuid: &str) -> Result<Value, CapError> {
        self.transport.get(&format!("data/list/{parent_uuid}")).await
    }

    /// Same listing, parsed into records. A response that is not a
    /// file list (e.g. a server error object) reads as empty.
    pub async fn list_files(&self, parent_uuid: &str) -> Result<Vec<RemoteFile>, CapError> {
        let raw = self.list(parent_uuid).await?;
        Ok(serde_json::from_value(raw).unwrap_or_default())
    }

    /// Multipart upload of a local file plus its metadata record.
    pub async fn upload(
        &self,
        file_path: &Path,
        file_role: &str,
        parent_uuid: &str,
        parent_type: &str,
        source: &str,
        license: &str,
    ) -> Result<Value, CapError> {
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let metadata = json!({
            "file_role": file_role,
            "file_name": file_name,
            "parent_uuid": parent_uuid,
            "parent_type": parent_type,
            "source": source,
            "license": license,
        });
        self.transport
            .post_upload("data/upload", file_path, metadata)
            .await
    }

    pub async fn remove(&self, uuid: &str) -> Result<Value, CapError> {
        self.transport
            .post("data/delete/", json!({ "uuid": uuid }))
            .await
    }
}
