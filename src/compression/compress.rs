use crate::core::error::{Error, ErrorKind, Result};
use serde::{Serialize, Deserialize};

/// Tagged byte envelope: records how `data` was encoded so it can be reversed,
/// plus a CRC32 of the original bytes to catch corruption on the way back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedBlock {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compression: CompressionType,
    pub checksum: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    LZ4,      // Fast compression, ratio 2-3x
    Zstd,     // Better ratio (3-5x), slower
    Snappy,   // Balanced
}

impl CompressedBlock {
    pub fn compress(data: &[u8], compression: CompressionType) -> Result<Self> {
        let compressed = match compression {
            CompressionType::None => data.to_vec(),

            CompressionType::LZ4 => lz4_flex::block::compress(data),

            CompressionType::Zstd => {
                zstd::encode_all(data, 3)  // Level 3 is balanced
                    .map_err(|e| Error::new(ErrorKind::Compression, e.to_string()))?
            }

            CompressionType::Snappy => {
                use snap::raw::Encoder;
                let mut encoder = Encoder::new();
                encoder.compress_vec(data)?
            }
        };

        Ok(CompressedBlock {
            data: compressed,
            original_size: data.len(),
            compression,
            checksum: crc32fast::hash(data),
        })
    }

    /// Stored as-is, tagged uncompressed
    pub fn raw(data: Vec<u8>) -> Self {
        CompressedBlock {
            original_size: data.len(),
            checksum: crc32fast::hash(&data),
            data,
            compression: CompressionType::None,
        }
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        let decoded = match self.compression {
            CompressionType::None => self.data.clone(),

            CompressionType::LZ4 => lz4_flex::block::decompress(&self.data, self.original_size)?,

            CompressionType::Zstd => {
                zstd::decode_all(&self.data[..])
                    .map_err(|e| Error::new(ErrorKind::Compression, e.to_string()))?
            }

            CompressionType::Snappy => {
                use snap::raw::Decoder;
                let mut decoder = Decoder::new();
                decoder.decompress_vec(&self.data)?
            }
        };

        if decoded.len() != self.original_size {
            return Err(Error::new(
                ErrorKind::Integrity,
                format!("expected {} bytes after decompression, got {}", self.original_size, decoded.len()),
            ));
        }
        let checksum = crc32fast::hash(&decoded);
        if checksum != self.checksum {
            return Err(Error::new(
                ErrorKind::Integrity,
                format!("checksum mismatch: stored {:08x}, computed {:08x}", self.checksum, checksum),
            ));
        }

        Ok(decoded)
    }

    pub fn is_compressed(&self) -> bool {
        self.compression != CompressionType::None
    }

    /// Bytes held by the envelope, not the decoded size
    pub fn stored_size(&self) -> usize {
        self.data.len()
    }

    /// Choose compression based on use case
    pub fn compress_auto(data: &[u8], priority: CompressionPriority) -> Result<Self> {
        let compression = match priority {
            CompressionPriority::Speed => CompressionType::LZ4,      // Fastest
            CompressionPriority::Ratio => CompressionType::Zstd,     // Best compression
            CompressionPriority::Balanced => CompressionType::Snappy, // Middle ground
        };
        Self::compress(data, compression)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionPriority {
    Speed,     // LZ4 - hot cache entries
    Ratio,     // Zstd - large long-lived artifacts
    Balanced,  // Snappy
}
