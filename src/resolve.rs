//! Context and support-file substitution applied to document text
//! before it is sent to the server.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::datafiles::RemoteFile;
use crate::document::Notes;

/// Resolve a context value: a relative filename under `base_dir` whose
/// content replaces the value when such a file exists, otherwise the
/// trimmed literal. Large text blocks live in separate files while
/// small values stay inline.
pub fn context_text(value: &str, base_dir: &Path) -> String {
    let candidate = base_dir.join(value);
    if candidate.is_file() {
        if let Ok(content) = fs::read_to_string(&candidate) {
            return content.trim().to_string();
        }
    }
    value.trim().to_string()
}

/// Replace `{placeholder}` tokens, and a text that is exactly a bare
/// placeholder key, with the resolved context value.
pub fn inject_context(text: &str, context: &BTreeMap<String, String>, base_dir: &Path) -> String {
    let mut result = text.to_string();
    for (key, value) in context {
        let placeholder = format!("{{{key}}}");
        if text.contains(&placeholder) {
            result = result.replace(&placeholder, &context_text(value, base_dir));
        }
        if text.trim() == key {
            result = result.replace(key, &context_text(value, base_dir));
        }
    }
    result.trim().to_string()
}

/// Apply context substitution per notes line.
pub fn inject_context_notes(
    notes: &Notes,
    context: &BTreeMap<String, String>,
    base_dir: &Path,
) -> Notes {
    match notes {
        Notes::Text(text) => Notes::Text(inject_context(text, context, base_dir)),
        Notes::Lines(lines) => Notes::Lines(
            lines
                .iter()
                .map(|line| inject_context(line, context, base_dir))
                .collect(),
        ),
    }
}

/// Coerce notes into a markdown string: a list becomes bullet lines.
pub fn prep_notes(notes: &Notes) -> String {
    match notes {
        Notes::Text(text) => text.clone(),
        Notes::Lines(lines) => lines
            .iter()
            .map(|line| {
                if line.starts_with("- ") {
                    line.clone()
                } else {
                    format!("- {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Replace literal support-file names in `content` with absolute URLs
/// built from the API base URL and each file's server-assigned path.
/// Idempotent: a name that no longer appears is a no-op.
pub fn inject_support(
    content: &str,
    support: &[String],
    file_list: &[RemoteFile],
    api_url: &str,
) -> String {
    let mut result = content.to_string();
    for file in file_list {
        if !support.contains(&file.file_name) {
            continue;
        }
        let url = format!("{api_url}static/{}", file.path);
        result = replace_bare(&result, &file.file_name, &url);
    }
    result
}

/// Replace occurrences of `name` that are not part of a path. The
/// built URL ends with `name` after a `/`, so skipping slash-preceded
/// matches leaves already-substituted URLs alone.
fn replace_bare(text: &str, name: &str, url: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(name) {
        out.push_str(&rest[..pos]);
        if rest[..pos].ends_with('/') {
            out.push_str(name);
        } else {
            out.push_str(url);
        }
        rest = &rest[pos + name.len()..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_literal_value() {
        let dir = tempdir().unwrap();
        let result = inject_context("Hello {name}", &context(&[("name", "world")]), dir.path());
        assert_eq!(result, "Hello world");
    }

    #[test]
    fn substitutes_file_content() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("intro.txt"), "from a file\n").unwrap();
        let result = inject_context(
            "Hello {name}",
            &context(&[("name", "intro.txt")]),
            dir.path(),
        );
        assert_eq!(result, "Hello from a file");
    }

    #[test]
    fn substitutes_bare_key() {
        let dir = tempdir().unwrap();
        let result = inject_context("  intro  ", &context(&[("intro", "full text")]), dir.path());
        assert_eq!(result, "full text");
    }

    #[test]
    fn leaves_unknown_placeholders() {
        let dir = tempdir().unwrap();
        let result = inject_context("Hello {other}", &context(&[("name", "world")]), dir.path());
        assert_eq!(result, "Hello {other}");
    }

    #[test]
    fn notes_list_becomes_bullets() {
        let notes = Notes::Lines(vec!["- done".into(), "pending".into()]);
        assert_eq!(prep_notes(&notes), "- done\n- pending");
    }

    #[test]
    fn notes_text_passes_through() {
        assert_eq!(prep_notes(&Notes::Text("as is".into())), "as is");
    }

    fn remote(file_name: &str, path: &str) -> RemoteFile {
        RemoteFile {
            file_name: file_name.to_string(),
            path: path.to_string(),
            ..RemoteFile::default()
        }
    }

    #[test]
    fn support_replaces_names_with_urls() {
        let files = vec![remote("img.png", "files/u-1/img.png")];
        let result = inject_support(
            "see img.png here",
            &["img.png".to_string()],
            &files,
            "https://api.captest.io/",
        );
        assert_eq!(
            result,
            "see https://api.captest.io/static/files/u-1/img.png here"
        );
    }

    #[test]
    fn support_skips_unlisted_files() {
        let files = vec![remote("other.png", "files/u-1/other.png")];
        let result = inject_support(
            "see other.png here",
            &["img.png".to_string()],
            &files,
            "https://api.captest.io/",
        );
        assert_eq!(result, "see other.png here");
    }

    #[test]
    fn support_is_idempotent() {
        let files = vec![remote("img.png", "files/u-1/img.png")];
        let support = vec!["img.png".to_string()];
        let once = inject_support("see img.png", &support, &files, "https://api.captest.io/");
        assert_eq!(once, "see https://api.captest.io/static/files/u-1/img.png");
        let twice = inject_support(&once, &support, &files, "https://api.captest.io/");
        assert_eq!(once, twice);
    }

    #[test]
    fn support_leaves_embedded_urls_intact() {
        let files = vec![remote("img.png", "img.png")];
        let support = vec!["img.png".to_string()];
        let content = "link https://api.captest.io/static/img.png and img.png";
        let result = inject_support(content, &support, &files, "https://api.captest.io/");
        assert_eq!(
            result,
            "link https://api.captest.io/static/img.png and https://api.captest.io/static/img.png"
        );
    }
}
