//! Cross-checks applied before requests: CLI paths, collection
//! consistency, notes content, naming conventions, credentials.

use std::path::Path;
use tracing::warn;

use crate::credentials::CredentialsManager;
use crate::document::{DocHeader, Notes};
use crate::errors::CapError;
use crate::resolve::prep_notes;

/// Collections that must carry substantive notes.
const NOTES_REQUIRED: [&str; 3] = ["challenge", "resource", "image"];

pub fn validate_file(path: &Path) -> Result<(), CapError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CapError::validation(format!(
            "file does not exist: {}",
            path.display()
        )))
    }
}

pub fn validate_dir(path: &Path) -> Result<(), CapError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(CapError::validation(format!(
            "directory does not exist: {}",
            path.display()
        )))
    }
}

/// The header must declare a collection; it is lower-cased and must
/// agree with the collection supplied on the command line.
pub fn validate_collection(mut header: DocHeader, expected: &str) -> Result<DocHeader, CapError> {
    let declared = header
        .collection
        .as_deref()
        .ok_or_else(|| CapError::validation("header does not specify collection"))?
        .to_lowercase();
    if declared != expected.to_lowercase() {
        return Err(CapError::validation(format!(
            "inconsistent collection: '{expected}' and '{declared}'"
        )));
    }
    header.collection = Some(declared);
    Ok(header)
}

/// Missing notes default to an empty string. Challenge, resource and
/// image documents require more than 4 characters of coerced notes.
pub fn validate_notes(mut header: DocHeader) -> Result<DocHeader, CapError> {
    let notes = header.notes.clone().unwrap_or(Notes::Text(String::new()));
    let collection = header.collection.clone().unwrap_or_default();
    if NOTES_REQUIRED.contains(&collection.as_str()) && prep_notes(&notes).len() <= 4 {
        return Err(CapError::validation(format!(
            "notes too short for collection '{collection}'"
        )));
    }
    header.notes = Some(notes);
    Ok(header)
}

/// Warn (never fail) when the file name does not echo the document
/// name or version.
pub fn validate_naming(header: &DocHeader, path: &Path) {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let stem_norm = normalize(stem);
    let name_norm = normalize(&header.name);
    if !name_norm.is_empty() && !stem_norm.contains(&name_norm) {
        warn!(file = %path.display(), name = %header.name,
            "file name does not match document name");
    }
    let version_norm = normalize(&header.version);
    if !version_norm.is_empty() && !stem_norm.contains(&version_norm) {
        warn!(file = %path.display(), version = %header.version,
            "file name does not match document version");
    }
}

fn normalize(raw: &str) -> String {
    regex::Regex::new(r"[^a-z0-9]+")
        .unwrap()
        .replace_all(&raw.to_lowercase(), "")
        .to_string()
}

/// Enforce the credential precedence: an already-resolved token wins,
/// otherwise the prompt is the last resort. An empty token after all
/// sources fails the invocation.
pub fn validate_credentials<F>(
    credentials: &mut CredentialsManager,
    prompt: F,
) -> Result<(), CapError>
where
    F: FnOnce() -> Result<String, CapError>,
{
    if credentials.username().is_none() {
        return Err(CapError::validation("could not identify username"));
    }
    if credentials.token().is_none() {
        let token = prompt()?;
        if !token.is_empty() {
            credentials.set_token(&token);
        }
    }
    match credentials.token() {
        Some(token) if !token.is_empty() => Ok(()),
        _ => Err(CapError::validation(
            "could not identify authorization token",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn header(collection: Option<&str>) -> DocHeader {
        DocHeader {
            collection: collection.map(str::to_string),
            ..DocHeader::default()
        }
    }

    #[test]
    fn collection_must_be_declared() {
        let err = validate_collection(header(None), "blog").unwrap_err();
        assert!(err.message().contains("collection"));
    }

    #[test]
    fn collection_must_agree_with_cli() {
        let err = validate_collection(header(Some("resource")), "blog").unwrap_err();
        assert!(err.message().contains("inconsistent"));
    }

    #[test]
    fn collection_normalizes_to_lowercase() {
        let result = validate_collection(header(Some("Resource")), "resource").unwrap();
        assert_eq!(result.collection.as_deref(), Some("resource"));
    }

    #[test]
    fn missing_notes_default_to_empty() {
        let result = validate_notes(header(Some("blog"))).unwrap();
        assert_eq!(result.notes, Some(Notes::Text(String::new())));
    }

    #[test]
    fn challenge_requires_notes() {
        let err = validate_notes(header(Some("challenge"))).unwrap_err();
        assert!(err.message().contains("short"));
    }

    #[test]
    fn challenge_accepts_real_notes() {
        let mut h = header(Some("challenge"));
        h.notes = Some(Notes::Text("ok notes".into()));
        let result = validate_notes(h).unwrap();
        assert_eq!(result.notes, Some(Notes::Text("ok notes".into())));
    }

    #[test]
    fn challenge_accepts_notes_list() {
        let mut h = header(Some("challenge"));
        h.notes = Some(Notes::Lines(vec!["notes for a challenge".into()]));
        assert!(validate_notes(h).is_ok());
    }

    #[test]
    fn naming_check_never_fails() {
        let mut h = header(Some("blog"));
        h.name = "completely-different".into();
        h.version = "9.9".into();
        validate_naming(&h, &PathBuf::from("docs/my_doc_0.1.md"));
    }

    #[test]
    fn missing_paths_are_validation_errors() {
        let err = validate_file(&PathBuf::from("no/such/file.md")).unwrap_err();
        assert!(err.message().contains("file does not exist"));
        let err = validate_dir(&PathBuf::from("no/such/dir")).unwrap_err();
        assert!(err.message().contains("directory does not exist"));
    }
}
