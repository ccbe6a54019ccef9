//! Compression engines selectable via the stored record's flag byte.
//! `bzip2` has no available crate, so it is downgraded to the zlib
//! engine with a logged warning rather than fabricating a dependency
//! (recorded as an Open Question decision in DESIGN.md).

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::format::CompressionEngine;

pub fn compress(engine: CompressionEngine, plaintext: &[u8]) -> Result<Vec<u8>, &'static str> {
    match engine {
        CompressionEngine::None => Ok(plaintext.to_vec()),
        CompressionEngine::Lzo => Ok(lz4_flex::compress_prepend_size(plaintext)),
        CompressionEngine::Zlib => zlib_compress(plaintext),
        CompressionEngine::Bzip => {
            trc::Event::new(trc::EventType::Internal)
                .ctx("reason", "bzip2 unavailable, downgraded to zlib")
                .level(trc::Level::Warn)
                .log();
            zlib_compress(plaintext)
        }
    }
}

pub fn decompress(
    engine: CompressionEngine,
    compressed: &[u8],
    plaintext_len: usize,
) -> Result<Vec<u8>, &'static str> {
    let out = match engine {
        CompressionEngine::None => compressed.to_vec(),
        CompressionEngine::Lzo => lz4_flex::decompress_size_prepended(compressed)
            .map_err(|_| "lz4 decompression failed")?,
        // A bzip-flagged record was necessarily produced by our own zlib
        // downgrade, so decode it the same way.
        CompressionEngine::Zlib | CompressionEngine::Bzip => zlib_decompress(compressed)?,
    };
    if out.len() != plaintext_len {
        return Err("decompressed length mismatch");
    }
    Ok(out)
}

fn zlib_compress(plaintext: &[u8]) -> Result<Vec<u8>, &'static str> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(plaintext).map_err(|_| "zlib compression failed")?;
    encoder.finish().map_err(|_| "zlib compression failed")
}

fn zlib_decompress(compressed: &[u8]) -> Result<Vec<u8>, &'static str> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|_| "zlib decompression failed")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_round_trips() {
        let plaintext = b"the quick brown fox jumps over the lazy dog".repeat(4);
        let compressed = compress(CompressionEngine::Zlib, &plaintext).unwrap();
        let decompressed =
            decompress(CompressionEngine::Zlib, &compressed, plaintext.len()).unwrap();
        assert_eq!(decompressed, plaintext);
    }

    #[test]
    fn lz4_round_trips() {
        let plaintext = b"repeated repeated repeated data data data".repeat(8);
        let compressed = compress(CompressionEngine::Lzo, &plaintext).unwrap();
        let decompressed =
            decompress(CompressionEngine::Lzo, &compressed, plaintext.len()).unwrap();
        assert_eq!(decompressed, plaintext);
    }

    #[test]
    fn bzip_downgrades_to_zlib_but_round_trips() {
        let plaintext = b"downgrade path".to_vec();
        let compressed = compress(CompressionEngine::Bzip, &plaintext).unwrap();
        let decompressed =
            decompress(CompressionEngine::Bzip, &compressed, plaintext.len()).unwrap();
        assert_eq!(decompressed, plaintext);
    }

    #[test]
    fn mismatched_length_is_rejected() {
        let plaintext = b"abc".to_vec();
        let compressed = compress(CompressionEngine::Zlib, &plaintext).unwrap();
        assert!(decompress(CompressionEngine::Zlib, &compressed, 999).is_err());
    }
}
