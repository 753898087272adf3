//! Decoding of downloaded index files.
//!
//! Every file the indexer writes starts with a 12-byte signature once
//! decoded. Files may arrive already inflated (a server or CDN decoded
//! them) or still gzip-compressed; both are accepted.

use std::io::Read;

use flate2::read::GzDecoder;

use crate::error::{Result, SearchError};

/// Marker the indexer prepends to every decoded file.
pub const SIGNATURE: &[u8; 12] = b"pagefind_dcd";

/// Decode a downloaded file into its payload.
///
/// - Signature-prefixed input is returned without the signature; no
///   inflation is attempted.
/// - Anything else is gzip-inflated. If the inflated bytes carry the
///   signature it is stripped; if not, the inflated bytes are returned
///   as they are (files written before the signature existed).
///
/// `resource` names the file in logs and errors.
///
/// # Errors
///
/// Returns [`SearchError::Decode`] if the gzip stream is corrupt.
pub fn decompress(data: &[u8], resource: &str) -> Result<Vec<u8>> {
    if let Some(payload) = data.strip_prefix(SIGNATURE.as_slice()) {
        return Ok(payload.to_vec());
    }

    let mut inflated = Vec::with_capacity(data.len().saturating_mul(4));
    GzDecoder::new(data)
        .read_to_end(&mut inflated)
        .map_err(|e| SearchError::Decode(format!("{resource}: {e}")))?;

    match inflated.strip_prefix(SIGNATURE.as_slice()) {
        Some(payload) => Ok(payload.to_vec()),
        None => {
            tracing::warn!(resource, "decoded file is missing its signature");
            Ok(inflated)
        }
    }
}
