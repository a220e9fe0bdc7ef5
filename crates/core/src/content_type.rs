//! Extension to MIME type mapping for served content.

use crate::constants::FALLBACK_CONTENT_TYPE;

/// Returns the `Content-Type` to serve for a file of the given (lower-cased) type.
pub fn content_type_for(file_type: &str) -> &'static str {
    match file_type {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "kt" => "text/plain",
        "js" => "text/javascript",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types() {
        assert_eq!(content_type_for("jpg"), "image/jpeg");
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("kt"), "text/plain");
        assert_eq!(content_type_for("js"), "text/javascript");
    }

    #[test]
    fn test_unknown_type_falls_back() {
        assert_eq!(content_type_for("pdf"), "application/octet-stream");
        assert_eq!(content_type_for(""), "application/octet-stream");
    }
}
