//! Downloading the example datasets attached to a challenge's demo
//! assignment.

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::api::Transport;
use crate::datafiles::Datafiles;
use crate::errors::CapError;

pub struct Datasets<'a> {
    transport: &'a dyn Transport,
}

impl<'a> Datasets<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Datasets { transport }
    }

    /// Fetch every file of the challenge's demo assignment into
    /// `data_dir`, renaming the assignment uuid in each basename to
    /// `{name}_v{version}`.
    pub async fn download(&self, identifier: &str, data_dir: &Path) -> Result<Value, CapError> {
        let doc = self
            .transport
            .get(&format!("challenge/view/{identifier}"))
            .await?;
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CapError::client(doc.to_string()))?
            .to_string();
        let version = doc
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let assignment_uuid = doc
            .get("demo_assignment_uuid")
            .and_then(Value::as_str)
            .ok_or_else(|| CapError::client("challenge has no demo assignment"))?
            .to_string();
        let files = Datafiles::new(self.transport)
            .list_files(&assignment_uuid)
            .await?;
        let mut result = Vec::new();
        for file in &files {
            let bytes = self
                .transport
                .get_bytes(&format!("static/{}", file.path))
                .await?;
            let basename = file.path.rsplit('/').next().unwrap_or(&file.path);
            let pretty = basename.replace(&assignment_uuid, &format!("{name}_v{version}"));
            let local_path = data_dir.join(&pretty);
            fs::write(&local_path, &bytes).map_err(|e| {
                CapError::client(format!("could not write {}: {e}", local_path.display()))
            })?;
            info!(path = %local_path.display(), bytes = bytes.len(), "downloaded example file");
            result.push(json!({
                "file_role": file.file_role,
                "path": file.path,
                "local_path": local_path.display().to_string(),
            }));
        }
        Ok(Value::Array(result))
    }
}
