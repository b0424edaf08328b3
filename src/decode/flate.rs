use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;
use tracing::warn;

use crate::error::{PdfError, Result};

/// Decompress zlib data, accepting a truncated tail when some output was produced
pub fn flate_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let zlib = ZlibDecoder::new(data).read_to_end(&mut result);

    match zlib {
        Ok(_) => Ok(result),
        Err(e) if !result.is_empty() => {
            warn!(error = %e, bytes = result.len(), "truncated FlateDecode stream");
            Ok(result)
        }
        Err(zlib_err) => {
            // Some producers omit the zlib header
            let mut raw = Vec::new();
            DeflateDecoder::new(data)
                .read_to_end(&mut raw)
                .map_err(|_| PdfError::DecompressError(format!("FlateDecode failed: {}", zlib_err)))?;
            Ok(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, ZlibEncoder};
    use std::io::Write;

    #[test]
    fn test_flate_decode() {
        let original = b"BT /F1 9 Tf 40 700 Td (CEBU) Tj ET";
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(flate_decode(&compressed).unwrap(), original);
    }

    #[test]
    fn test_raw_deflate_without_header() {
        let original = b"0 0 1 rg 10 10 100 20 re f";
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(flate_decode(&compressed).unwrap(), original);
    }
}
