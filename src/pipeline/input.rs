//! Input decoding: turn a base64 payload or a local file into PDF bytes.
//!
//! Everything the request handler receives passes through here before the
//! pipeline runs. We validate the PDF magic bytes (`%PDF`) and the size limit
//! up front so callers get a meaningful error rather than a pdfium failure
//! deep inside the normaliser.

use crate::error::SplitError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Decode a base64 document payload.
///
/// ASCII whitespace is stripped first, so payloads wrapped at 76 columns
/// (MIME style) decode the same as single-line ones. The magic check is not
/// done here: a well-formed base64 string holding a non-PDF is a pipeline
/// failure, not a malformed request.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, SplitError> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SplitError::InvalidBase64(e.to_string()))?;

    debug!("Decoded {} base64 chars → {} bytes", compact.len(), bytes.len());
    Ok(bytes)
}

/// Reject documents over `limit` bytes.
pub fn check_size(bytes: &[u8], limit: usize) -> Result<(), SplitError> {
    if bytes.len() > limit {
        return Err(SplitError::InputTooLarge {
            size: bytes.len(),
            limit,
        });
    }
    Ok(())
}

/// Verify the `%PDF` magic bytes.
pub fn check_magic(bytes: &[u8]) -> Result<(), SplitError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(SplitError::NotAPdf {
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        });
    }
    Ok(())
}

/// Read a local PDF, validating existence, size and magic bytes.
pub async fn read_local(path: &Path, limit: usize) -> Result<Vec<u8>, SplitError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SplitError::FileNotFound {
            path: PathBuf::from(path),
        },
        _ => SplitError::Internal(format!("Failed to read {}: {}", path.display(), e)),
    })?;

    check_size(&bytes, limit)?;
    check_magic(&bytes)?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_payload() {
        let encoded = STANDARD.encode(b"%PDF-1.7 hello");
        let wrapped = format!("{}\n{}\r\n", &encoded[..8], &encoded[8..]);
        assert_eq!(decode_base64(&wrapped).unwrap(), b"%PDF-1.7 hello");
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_base64("not base64 at all!!").unwrap_err();
        assert!(matches!(err, SplitError::InvalidBase64(_)));
    }

    #[test]
    fn magic_check() {
        assert!(check_magic(b"%PDF-1.4\n").is_ok());
        match check_magic(b"PK\x03\x04rest").unwrap_err() {
            SplitError::NotAPdf { magic } => assert_eq!(magic, b"PK\x03\x04"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(check_magic(b"").is_err());
    }

    #[test]
    fn size_limit() {
        assert!(check_size(&[0u8; 10], 10).is_ok());
        assert!(matches!(
            check_size(&[0u8; 11], 10),
            Err(SplitError::InputTooLarge { size: 11, limit: 10 })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = read_local(Path::new("/no/such/file.pdf"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, SplitError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%%EOF").unwrap();
        let bytes = read_local(&path, 1024).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        std::fs::write(&path, b"hello").unwrap();
        assert!(matches!(
            read_local(&path, 1024).await,
            Err(SplitError::NotAPdf { .. })
        ));
    }
}
