//! Content fingerprint used to look a video up on the subtitle service
//!
//! The fingerprint is the file size plus the wrapping sum of the 64-bit
//! little-endian words found in the first and last 64 KiB of the file,
//! rendered as 16 lowercase hex digits.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::config::{HASH_CHUNK_SIZE, MIN_HASHABLE_SIZE};
use crate::error::FingerprintError;

/// Compute the fingerprint of the file at `path`
pub fn fingerprint(path: &Path) -> Result<String, FingerprintError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let hash = fingerprint_reader(BufReader::new(file), size)?;
    log::debug!("Fingerprint of {}: {} ({} bytes)", path.display(), hash, size);
    Ok(hash)
}

/// Compute the fingerprint of `size` bytes readable from `reader`
pub fn fingerprint_reader<R: Read + Seek>(mut reader: R, size: u64) -> Result<String, FingerprintError> {
    if size < MIN_HASHABLE_SIZE {
        return Err(FingerprintError::TooSmall { size, min: MIN_HASHABLE_SIZE });
    }

    let mut buffer = vec![0u8; HASH_CHUNK_SIZE as usize];
    let mut hash = size;

    reader.seek(SeekFrom::Start(0))?;
    reader.read_exact(&mut buffer)?;
    hash = hash.wrapping_add(sum_words(&buffer));

    reader.seek(SeekFrom::Start(size - HASH_CHUNK_SIZE))?;
    reader.read_exact(&mut buffer)?;
    hash = hash.wrapping_add(sum_words(&buffer));

    Ok(format!("{:016x}", hash))
}

fn sum_words(chunk: &[u8]) -> u64 {
    chunk
        .chunks_exact(8)
        .map(|word| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(word);
            u64::from_le_bytes(bytes)
        })
        .fold(0u64, |acc, word| acc.wrapping_add(word))
}
