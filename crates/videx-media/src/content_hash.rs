//! Fast content-change/orphan-matching hash: a 128-bit digest over just the
//! head and tail regions of a file, not the whole thing, so a multi-GB
//! video can be hashed without a full read.

use tokio::io::{AsyncReadExt, AsyncSeekExt};

const REGION_BYTES: u64 = 1024 * 1024;

pub async fn quick_hash(path: &str) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();

    let mut hasher = blake3::Hasher::new();
    hasher.update(&len.to_le_bytes());

    let head_len = REGION_BYTES.min(len);
    let mut head_buf = vec![0u8; head_len as usize];
    file.read_exact(&mut head_buf).await?;
    hasher.update(&head_buf);

    if len > REGION_BYTES {
        let tail_len = REGION_BYTES.min(len - head_len);
        let tail_start = len - tail_len;
        file.seek(std::io::SeekFrom::Start(tail_start)).await?;
        let mut tail_buf = vec![0u8; tail_len as usize];
        file.read_exact(&mut tail_buf).await?;
        hasher.update(&tail_buf);
    }

    let full = hasher.finalize();
    // Truncate to 128 bits (16 bytes) per the spec's "128-bit quick hash".
    Ok(full.as_bytes()[..16].iter().map(|b| format!("{b:02x}")).collect())
}

/// 16-hex-character djb2-style hash, used for the subtitle fallback
/// filename (spec §6) — intentionally non-cryptographic and stable across
/// platforms for a given UTF-8 path string.
pub fn djb2_hex(input: &str) -> String {
    let mut hash: u64 = 5381;
    for byte in input.as_bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(*byte as u64);
    }
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn quick_hash_is_stable_for_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        tokio::fs::write(&path, vec![7u8; 200]).await.unwrap();
        let h1 = quick_hash(path.to_str().unwrap()).await.unwrap();
        let h2 = quick_hash(path.to_str().unwrap()).await.unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 32);
    }

    #[tokio::test]
    async fn quick_hash_differs_for_different_content() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("a.bin");
        let p2 = dir.path().join("b.bin");
        tokio::fs::write(&p1, vec![1u8; 200]).await.unwrap();
        tokio::fs::write(&p2, vec![2u8; 200]).await.unwrap();
        let h1 = quick_hash(p1.to_str().unwrap()).await.unwrap();
        let h2 = quick_hash(p2.to_str().unwrap()).await.unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn djb2_hex_is_sixteen_chars() {
        let hash = djb2_hex("/vol/A.mp4");
        assert_eq!(hash.len(), 16);
        assert_eq!(djb2_hex("/vol/A.mp4"), hash);
    }
}
