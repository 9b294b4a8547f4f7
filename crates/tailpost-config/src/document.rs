//! Google Docs identifier extraction.

const DOCUMENT_PATH_MARKER: &str = "/document/d/";

/// Extract a document id from either a bare id or a full Google Docs URL.
///
/// The id is the `/document/d/<id>` path segment. Input that does not
/// contain that segment is returned trimmed and otherwise unchanged.
pub fn extract_document_id(url_or_id: &str) -> String {
    let trimmed = url_or_id.trim();
    let Some(start) = trimmed.find(DOCUMENT_PATH_MARKER) else {
        return trimmed.to_string();
    };

    let id: String = trimmed[start + DOCUMENT_PATH_MARKER.len()..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if id.is_empty() {
        trimmed.to_string()
    } else {
        id
    }
}
