//! Document publishing pipeline: resolves identifiers, reconciles
//! support files, rewrites content and dispatches create/update/
//! upload/delete requests in a fixed multi-round sequence.
//!
//! Every entry point converts pipeline failures into a
//! `{_file, _exception}` record so a batch keeps going past one
//! failing file; errors are data here, not process failures.

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::{normalize_url, Transport};
use crate::datafiles::{Datafiles, RemoteFile};
use crate::document::{prep_input, DocHeader, Notes};
use crate::errors::CapError;
use crate::resolve::{inject_context, inject_context_notes, inject_support, prep_notes};
use crate::validations::{validate_collection, validate_naming, validate_notes};

/// Document actions dispatched through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocAction {
    Create,
    Publish,
    Obsolete,
    UploadPrimary,
    UploadSupport,
    Upload,
    Delete,
}

pub struct DocPipeline<'a> {
    transport: &'a dyn Transport,
    api_url: String,
    username: String,
}

impl<'a> DocPipeline<'a> {
    pub fn new(transport: &'a dyn Transport, api_url: &str, username: &str) -> Self {
        DocPipeline {
            transport,
            api_url: normalize_url(api_url),
            username: username.to_string(),
        }
    }

    /// Run one action for one document file; never errors, failures
    /// become `{_file, _exception}` records.
    pub async fn run(&self, action: DocAction, path: &Path, collection: &str) -> Value {
        let result = match action {
            DocAction::Create => self.try_create(path, collection).await,
            DocAction::Publish => self.try_update(path, collection, "publish").await,
            DocAction::Obsolete => self.try_update(path, collection, "obsolete").await,
            DocAction::UploadPrimary => self.try_upload_primary(path, collection).await,
            DocAction::UploadSupport => self.try_upload_support(path, collection).await,
            DocAction::Upload => self.try_upload(path, collection).await,
            DocAction::Delete => self.try_delete(path, collection).await,
        };
        match result {
            Ok(record) => record,
            Err(e) => exception_record(path, &e),
        }
    }

    /// Process files sequentially, in order; N inputs yield N records.
    pub async fn run_batch(
        &self,
        action: DocAction,
        files: &[PathBuf],
        collection: &str,
    ) -> Vec<Value> {
        let mut results = Vec::with_capacity(files.len());
        for path in files {
            info!(file = %path.display(), ?action, "processing document");
            results.push(self.run(action, path, collection).await);
        }
        results
    }

    /// Resolve `(collection, name[/version])` into the server's opaque
    /// document identifier. A response without a `uuid` carries the
    /// server's error detail.
    pub async fn doc_uuid(&self, collection: &str, identifier: &str) -> Result<String, CapError> {
        let result = self
            .transport
            .get(&format!("{collection}/update/{identifier}"))
            .await?;
        match result.get("uuid").and_then(Value::as_str) {
            Some(uuid) => Ok(uuid.to_string()),
            None => {
                let detail = match result.get("detail") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => result.to_string(),
                };
                Err(CapError::client(detail))
            }
        }
    }

    /// GET a document by uuid or `name/version`.
    pub async fn view(&self, collection: &str, identifier: &str) -> Result<Value, CapError> {
        self.transport
            .get(&format!("{collection}/view/{identifier}"))
            .await
    }

    async fn try_create(&self, path: &Path, collection: &str) -> Result<Value, CapError> {
        let (header, body) = prep_input(path, "")?;
        let header = validate_collection(header, collection)?;
        validate_naming(&header, path);
        let collection = declared(&header);
        let payload = to_payload(&body)?;
        let result = self
            .transport
            .post(&format!("{collection}/create/"), payload)
            .await?;
        Ok(prep_output(result, path))
    }

    async fn try_update(
        &self,
        path: &Path,
        collection: &str,
        action: &str,
    ) -> Result<Value, CapError> {
        let (header, mut body) = prep_input(path, action)?;
        let header = validate_collection(header, collection)?;
        let header = validate_notes(header)?;
        validate_naming(&header, path);
        let collection = declared(&header);
        // round 1 - resolve the document identifier
        let doc_uuid = self.doc_uuid(&collection, &doc_identifier(&header)).await?;
        // round 2 - identify available support files
        let file_list = self.remote_files(&doc_uuid).await?;
        // round 3 - rewrite the payload: substitute context values and
        // point support-file references at their uploaded URLs
        let base_dir = base_dir(path);
        body.content = inject_context(&body.content, &header.context, base_dir);
        body.content = inject_support(&body.content, &header.support, &file_list, &self.api_url);
        let notes = header.notes.clone().unwrap_or(Notes::Text(String::new()));
        let notes = inject_context_notes(&notes, &header.context, base_dir);
        let mut payload = to_payload(&body)?;
        payload["notes"] = json!(prep_notes(&notes));
        let result = self
            .transport
            .post(&format!("{collection}/update/{doc_uuid}"), payload)
            .await?;
        Ok(prep_output(result, path))
    }

    async fn try_upload_primary(&self, path: &Path, collection: &str) -> Result<Value, CapError> {
        let (header, _body) = prep_input(path, "")?;
        let header = validate_collection(header, collection)?;
        self.upload_primary_with(&header, path, None).await
    }

    async fn upload_primary_with(
        &self,
        header: &DocHeader,
        path: &Path,
        doc_uuid: Option<&str>,
    ) -> Result<Value, CapError> {
        let datafile = header
            .datafile
            .as_deref()
            .ok_or_else(|| CapError::client("missing datafile"))?;
        let source = header
            .datafile_source
            .as_deref()
            .ok_or_else(|| CapError::client("missing datafile_source"))?;
        let license = header
            .datafile_license
            .as_deref()
            .ok_or_else(|| CapError::client("missing datafile_license"))?;
        let collection = declared(header);
        // round 1 - fetch the latest identifier for the document
        let doc_uuid = match doc_uuid {
            Some(uuid) => uuid.to_string(),
            None => self.doc_uuid(&collection, &doc_identifier(header)).await?,
        };
        // round 2 - upload the datafile named in the header
        let datafile_path = base_dir(path).join(datafile);
        let result = Datafiles::new(self.transport)
            .upload(
                &datafile_path,
                "primary",
                &doc_uuid,
                &collection,
                source,
                license,
            )
            .await?;
        Ok(prep_output(result, &datafile_path))
    }

    async fn try_upload_support(&self, path: &Path, collection: &str) -> Result<Value, CapError> {
        let (header, _body) = prep_input(path, "")?;
        let header = validate_collection(header, collection)?;
        self.upload_support_with(&header, path, None).await
    }

    async fn upload_support_with(
        &self,
        header: &DocHeader,
        path: &Path,
        doc_uuid: Option<&str>,
    ) -> Result<Value, CapError> {
        let file_str = path.display().to_string();
        if header.support.is_empty() {
            return Ok(json!({ "_file": file_str, "_support": [] }));
        }
        let collection = declared(header);
        // round 1 - fetch the latest identifier for the document
        let doc_uuid = match doc_uuid {
            Some(uuid) => uuid.to_string(),
            None => self.doc_uuid(&collection, &doc_identifier(header)).await?,
        };
        // round 2 - fetch already uploaded support files
        let file_list = self.remote_files(&doc_uuid).await?;
        let existing: Vec<&str> = file_list.iter().map(|f| f.file_name.as_str()).collect();
        // round 3 - upload only the missing ones; one failed upload
        // does not abort its siblings
        let datafiles = Datafiles::new(self.transport);
        let base = base_dir(path);
        let mut uploads = Vec::new();
        for filename in &header.support {
            let support_path = base.join(filename);
            if existing.contains(&filename.as_str()) {
                uploads.push(json!({
                    "_file": support_path.display().to_string(),
                    "detail": "exists",
                }));
                continue;
            }
            let outcome = datafiles
                .upload(
                    &support_path,
                    "support",
                    &doc_uuid,
                    &collection,
                    &self.username,
                    "CC BY 4.0",
                )
                .await;
            uploads.push(match outcome {
                Ok(result) => prep_output(result, &support_path),
                Err(e) => exception_record(&support_path, &e),
            });
        }
        Ok(json!({ "_file": file_str, "uuid": doc_uuid, "_support": uploads }))
    }

    async fn try_upload(&self, path: &Path, collection: &str) -> Result<Value, CapError> {
        let (header, _body) = prep_input(path, "")?;
        let header = validate_collection(header, collection)?;
        let coll = declared(&header);
        // resolve the identifier once and share it across both uploads
        let doc_uuid = self.doc_uuid(&coll, &doc_identifier(&header)).await?;
        let primary = match self
            .upload_primary_with(&header, path, Some(doc_uuid.as_str()))
            .await
        {
            Ok(record) => record,
            Err(e) => exception_record(path, &e),
        };
        let support = match self
            .upload_support_with(&header, path, Some(doc_uuid.as_str()))
            .await
        {
            Ok(record) => record,
            Err(e) => exception_record(path, &e),
        };
        let support_items = support.get("_support").cloned().unwrap_or_else(|| json!([]));
        Ok(json!({
            "_file": path.display().to_string(),
            "uuid": doc_uuid,
            "_primary": primary,
            "_support": support_items,
        }))
    }

    async fn try_delete(&self, path: &Path, collection: &str) -> Result<Value, CapError> {
        // the action tag only satisfies the parser; the body is unused
        let (header, _body) = prep_input(path, "update")?;
        let header = validate_collection(header, collection)?;
        let collection = declared(&header);
        // round 1 - confirm the document exists
        self.doc_uuid(
            &collection,
            &format!("{}/{}", header.name, header.version),
        )
        .await?;
        // round 2 - delete is keyed by name and version, not uuid
        let body = json!({ "identifier": header.name, "version": header.version });
        let result = self
            .transport
            .post(&format!("{collection}/delete/"), body)
            .await?;
        Ok(prep_output(result, path))
    }

    async fn remote_files(&self, doc_uuid: &str) -> Result<Vec<RemoteFile>, CapError> {
        Datafiles::new(self.transport).list_files(doc_uuid).await
    }
}

/// The lower-cased collection after validation.
fn declared(header: &DocHeader) -> String {
    header.collection.clone().unwrap_or_default()
}

/// `name` alone, or `name/version` when a version is declared.
fn doc_identifier(header: &DocHeader) -> String {
    if header.version.is_empty() {
        header.name.clone()
    } else {
        format!("{}/{}", header.name, header.version)
    }
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

fn to_payload(body: &crate::document::DocBody) -> Result<Value, CapError> {
    serde_json::to_value(body)
        .map_err(|e| CapError::client(format!("could not encode request body: {e}")))
}

/// Tag a result record with the file it came from.
fn prep_output(result: Value, path: &Path) -> Value {
    let file_str = path.display().to_string();
    match result {
        Value::Object(mut map) => {
            map.insert("_file".to_string(), json!(file_str));
            Value::Object(map)
        }
        other => json!({ "_file": file_str, "result": other }),
    }
}

fn exception_record(path: &Path, error: &CapError) -> Value {
    json!({
        "_file": path.display().to_string(),
        "_exception": error.message(),
    })
}

/// Files to process: an explicit file, or every `.md` in a directory
/// except underscore-prefixed drafts, in sorted order.
pub fn collect_doc_files(
    file: Option<&Path>,
    dir: Option<&Path>,
) -> Result<Vec<PathBuf>, CapError> {
    if let Some(dir) = dir {
        let entries = fs::read_dir(dir)
            .map_err(|e| CapError::validation(format!("could not read {}: {e}", dir.display())))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "md"))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| !n.starts_with('_'))
            })
            .collect();
        files.sort();
        return Ok(files);
    }
    match file {
        Some(file) => Ok(vec![file.to_path_buf()]),
        None => Err(CapError::validation("either --file or --dir is required")),
    }
}
