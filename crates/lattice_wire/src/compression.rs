//! Gzip framing for encoded payloads.
//!
//! Built without the `gzip` feature, [`compress`] returns its input unchanged.
//! [`decompress_auto`] accepts both forms by checking the gzip magic bytes, so
//! payloads from either build decode everywhere that can read them.

pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Whether this build can produce and read gzip frames.
pub const GZIP_AVAILABLE: bool = cfg!(feature = "gzip");

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("gzip stream failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload is gzip framed but gzip support is not built in")]
    Unsupported,
}

pub fn is_framed(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

#[cfg(feature = "gzip")]
pub async fn compress(bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    use async_compression::futures::write::GzipEncoder;
    use futures::AsyncWriteExt;

    let mut encoder = GzipEncoder::new(Vec::with_capacity(bytes.len() / 2 + 20));
    encoder.write_all(bytes).await?;
    encoder.close().await?;
    let compressed = encoder.into_inner();
    log::debug!("gzip {} -> {} bytes", bytes.len(), compressed.len());
    Ok(compressed)
}

#[cfg(not(feature = "gzip"))]
pub async fn compress(bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    Ok(bytes.to_vec())
}

#[cfg(feature = "gzip")]
pub async fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    use async_compression::futures::bufread::GzipDecoder;
    use futures::AsyncReadExt;

    let mut decoder = GzipDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).await?;
    Ok(out)
}

#[cfg(not(feature = "gzip"))]
pub async fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    if is_framed(bytes) {
        return Err(CompressionError::Unsupported);
    }
    Ok(bytes.to_vec())
}

/// Decompress framed input; pass anything else through.
pub async fn decompress_auto(bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    if is_framed(bytes) {
        decompress(bytes).await
    } else {
        Ok(bytes.to_vec())
    }
}

#[cfg(all(test, feature = "gzip"))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Decompressing a compressed buffer gives the input back.
        #[test]
        fn prop_gzip_is_transparent(input in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let framed = smol::block_on(compress(&input)).unwrap();
            prop_assert!(is_framed(&framed));
            prop_assert_eq!(smol::block_on(decompress(&framed)).unwrap(), input.clone());
            prop_assert_eq!(smol::block_on(decompress_auto(&framed)).unwrap(), input);
        }
    }

    #[test]
    fn test_auto_passes_raw_input_through() {
        let input = b"Lcard home home home home home home".to_vec();
        assert!(!is_framed(&input));
        assert_eq!(smol::block_on(decompress_auto(&input)).unwrap(), input);
        assert!(GZIP_AVAILABLE);
    }

    #[test]
    fn test_truncated_frame_fails() {
        let framed = smol::block_on(compress(&[7; 300])).unwrap();
        let cut = &framed[..framed.len() - 6];
        assert!(smol::block_on(decompress(cut)).is_err());
    }
}
