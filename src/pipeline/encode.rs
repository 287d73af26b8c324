//! Output encoding: `Document` → base64 string for the JSON response.

use crate::document::Document;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode a document's bytes with the standard (padded) base64 alphabet.
pub fn encode_document(document: &Document) -> String {
    let b64 = STANDARD.encode(document.bytes());
    debug!(
        "Encoded {}-page document → {} bytes base64",
        document.page_count(),
        b64.len()
    );
    b64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_padded_standard_base64() {
        let doc = Document::new(b"%PDF-".to_vec(), 1);
        let encoded = encode_document(&doc);
        assert_eq!(encoded, "JVBERi0=");
        assert_eq!(STANDARD.decode(encoded).unwrap(), b"%PDF-");
    }
}
