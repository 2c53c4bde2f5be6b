//! PDF text extraction (in-memory bytes).

use ragrelay_core::{Error, Result};

/// Best-effort sniff for PDF bytes (magic header).
pub fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Extract text from a PDF body.
///
/// `pdf-extract` is pure-Rust and works from memory. Extraction quality
/// varies by PDF (text layer vs scanned images); callers decide whether an
/// empty result is acceptable.
pub fn pdf_to_text(bytes: &[u8]) -> Result<String> {
    if !bytes_look_like_pdf(bytes) {
        return Err(Error::Extract("response body is not a PDF".to_string()));
    }
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| Error::Extract(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_the_magic_header() {
        assert!(bytes_look_like_pdf(b"%PDF-1.4 rest"));
        assert!(!bytes_look_like_pdf(b"<html>not a pdf</html>"));
        assert!(!bytes_look_like_pdf(b""));
    }

    #[test]
    fn non_pdf_bytes_are_rejected_before_extraction() {
        let err = pdf_to_text(b"<html>error page</html>").unwrap_err();
        assert!(err.to_string().contains("not a PDF"));
    }
}
