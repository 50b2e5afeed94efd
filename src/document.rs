//! Reading document files: a YAML front-matter header between `---`
//! delimiter lines, followed by a Markdown body.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::CapError;

/// Notes can be written as a plain string or a list of lines.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Notes {
    Text(String),
    Lines(Vec<String>),
}

/// Parsed front-matter of a document file. Identity fields default to
/// empty strings; YAML numbers (e.g. `version: 0.2`) coerce to text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocHeader {
    #[serde(deserialize_with = "de_scalar_string")]
    pub uuid: String,
    #[serde(deserialize_with = "de_scalar_string")]
    pub name: String,
    #[serde(deserialize_with = "de_scalar_string")]
    pub version: String,
    #[serde(deserialize_with = "de_scalar_string")]
    pub title: String,
    /// Space-delimited in the file, split when building the payload.
    #[serde(deserialize_with = "de_scalar_string")]
    pub tags: String,
    pub collection: Option<String>,
    pub notes: Option<Notes>,
    /// Placeholder name -> literal value or relative path to a file
    /// whose content replaces it.
    #[serde(deserialize_with = "de_string_map")]
    pub context: BTreeMap<String, String>,
    /// Sibling files to upload and URL-substitute into the body.
    pub support: Vec<String>,
    pub datafile: Option<String>,
    pub datafile_source: Option<String>,
    pub datafile_license: Option<String>,
}

/// Payload for document create/update requests, sent verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocBody {
    pub action: String,
    pub name: String,
    pub version: String,
    pub title: String,
    pub tags: Vec<String>,
    pub content: String,
}

fn scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

fn de_scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

fn de_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_yaml::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| (k, scalar_to_string(&v)))
        .collect())
}

enum ParseState {
    Start,
    Header,
    Content,
}

/// Split a document file into its front-matter header and body.
pub fn read_header_content(path: &Path) -> Result<(DocHeader, String), CapError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| CapError::client(format!("could not read {}: {e}", path.display())))?;
    parse_header_content(&raw)
}

/// The first line must start with `---`; header lines run until the
/// next `---`; a blank line inside the header is malformed; reaching
/// end-of-file before the body section starts is malformed.
pub fn parse_header_content(raw: &str) -> Result<(DocHeader, String), CapError> {
    let mut state = ParseState::Start;
    let mut header_lines: Vec<&str> = Vec::new();
    let mut content_lines: Vec<&str> = Vec::new();
    for line in raw.lines() {
        match state {
            ParseState::Start => {
                if !line.starts_with("---") {
                    return Err(CapError::client("first line should start with ---"));
                }
                state = ParseState::Header;
            }
            ParseState::Header => {
                if line.starts_with("---") {
                    state = ParseState::Content;
                } else if line.trim().is_empty() {
                    return Err(CapError::client("empty line in header"));
                } else {
                    header_lines.push(line);
                }
            }
            ParseState::Content => content_lines.push(line),
        }
    }
    if !matches!(state, ParseState::Content) {
        return Err(CapError::client("no content"));
    }
    let header_text = header_lines.join("\n");
    let header = serde_yaml::from_str::<Option<DocHeader>>(&header_text)
        .map_err(|e| CapError::client(format!("malformed document header: {e}")))?
        .unwrap_or_default();
    Ok((header, content_lines.join("\n").trim().to_string()))
}

/// Build the request payload for a document action.
pub fn doc_body(header: &DocHeader, content: &str, action: &str) -> DocBody {
    DocBody {
        action: action.to_string(),
        name: header.name.clone(),
        version: header.version.clone(),
        title: header.title.clone(),
        tags: header.tags.split_whitespace().map(str::to_string).collect(),
        content: content.to_string(),
    }
}

/// Parse a document file and build its payload in one step.
pub fn prep_input(path: &Path, action: &str) -> Result<(DocHeader, DocBody), CapError> {
    let (header, content) = read_header_content(path)?;
    let body = doc_body(&header, &content, action);
    Ok((header, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "---\ncollection: blog\nname: my-doc\nversion: 0.1\ntitle: My doc\ntags: a b\n---\n\nHello world.\n";

    #[test]
    fn parses_header_and_body() {
        let (header, content) = parse_header_content(GOOD).unwrap();
        assert_eq!(header.collection.as_deref(), Some("blog"));
        assert_eq!(header.name, "my-doc");
        assert_eq!(header.version, "0.1");
        assert_eq!(content, "Hello world.");
    }

    #[test]
    fn rejects_missing_delimiter() {
        let err = parse_header_content("collection: blog\n---\nbody\n").unwrap_err();
        assert!(err.message().contains("first line"));
    }

    #[test]
    fn rejects_blank_line_in_header() {
        let err = parse_header_content("---\nname: x\n\ncollection: blog\n---\nbody\n").unwrap_err();
        assert!(err.message().contains("empty line"));
    }

    #[test]
    fn rejects_unclosed_header() {
        let err = parse_header_content("---\nname: x\ncollection: blog\n").unwrap_err();
        assert!(err.message().contains("no content"));
    }

    #[test]
    fn rejects_empty_file() {
        let err = parse_header_content("").unwrap_err();
        assert!(err.message().contains("no content"));
    }

    #[test]
    fn numeric_version_coerces_to_string() {
        let raw = "---\nname: x\nversion: 2\ncollection: blog\n---\nbody\n";
        let (header, _) = parse_header_content(raw).unwrap();
        assert_eq!(header.version, "2");
    }

    #[test]
    fn notes_accept_string_or_list() {
        let raw = "---\nname: x\nnotes: plain text\n---\nbody\n";
        let (header, _) = parse_header_content(raw).unwrap();
        assert_eq!(header.notes, Some(Notes::Text("plain text".into())));

        let raw = "---\nname: x\nnotes:\n  - first\n  - second\n---\nbody\n";
        let (header, _) = parse_header_content(raw).unwrap();
        assert_eq!(
            header.notes,
            Some(Notes::Lines(vec!["first".into(), "second".into()]))
        );
    }

    #[test]
    fn body_splits_tags_on_whitespace() {
        let (header, content) = parse_header_content(GOOD).unwrap();
        let body = doc_body(&header, &content, "publish");
        assert_eq!(body.tags, vec!["a", "b"]);
        assert_eq!(body.action, "publish");
    }

    #[test]
    fn empty_tags_yield_no_entries() {
        let header = DocHeader::default();
        let body = doc_body(&header, "text", "");
        assert!(body.tags.is_empty());
    }
}
