//! Retrieval context assembly.
//!
//! Context text is whatever the caller wants the Idea stage to see before the
//! request: pasted notes, or documents read from disk.

use std::path::PathBuf;

use tracing::debug;

use contentpipe_shared::{ContentPipelineError, Result};

/// Separator placed between context documents.
const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Join inline context and the contents of `files` into one context string.
///
/// Inline text comes first, then files in the order given. Blank pieces are
/// dropped, so no input at all yields an empty string.
pub fn join_context(inline: Option<&str>, files: &[PathBuf]) -> Result<String> {
    let mut parts: Vec<String> = Vec::with_capacity(files.len() + 1);

    if let Some(text) = inline {
        parts.push(text.to_string());
    }

    for path in files {
        let text = std::fs::read_to_string(path).map_err(|e| ContentPipelineError::io(path, e))?;
        debug!(path = %path.display(), len = text.len(), "loaded context document");
        parts.push(text);
    }

    let joined = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR);

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("contentpipe-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("write temp file");
        path
    }

    #[test]
    fn no_input_is_empty() {
        assert_eq!(join_context(None, &[]).unwrap(), "");
    }

    #[test]
    fn inline_then_files_in_order() {
        let a = temp_file("a.txt", "Menu: espresso, drip\n");
        let b = temp_file("b.txt", "Open since 1998");

        let ctx = join_context(Some("Brand voice: warm"), &[a.clone(), b.clone()]).unwrap();
        assert_eq!(
            ctx,
            "Brand voice: warm\n\nMenu: espresso, drip\n\nOpen since 1998"
        );

        let _ = std::fs::remove_file(a);
        let _ = std::fs::remove_file(b);
    }

    #[test]
    fn blank_documents_are_skipped() {
        let blank = temp_file("blank.txt", "   \n");
        let ctx = join_context(Some(""), &[blank.clone()]).unwrap();
        assert_eq!(ctx, "");
        let _ = std::fs::remove_file(blank);
    }

    #[test]
    fn missing_file_is_io_error() {
        let missing = PathBuf::from("/definitely/not/here/context.txt");
        let err = join_context(None, &[missing]).unwrap_err();
        assert!(matches!(err, ContentPipelineError::Io { .. }));
    }
}
