//! Key-to-partition routing.

use sha2::{Digest, Sha256};

/// Maps `key` onto one of `partitions` partitions.
///
/// Uses the first four bytes of the key's SHA-256 digest (big-endian) modulo
/// the partition count, which is stable across processes and releases.
pub fn partition_for(key: &str, partitions: u32) -> u32 {
    let digest = Sha256::digest(key.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix % partitions.max(1)
}

/// Stream name backing one partition of a topic.
pub fn stream_key(prefix: &str, topic: &str, partition: u32) -> String {
    format!("{}:{}:{}", prefix, topic, partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_partition() {
        let a = partition_for("user@example.com", 8);
        let b = partition_for("user@example.com", 8);
        assert_eq!(a, b);
        assert!(a < 8);
    }

    #[test]
    fn test_single_partition() {
        assert_eq!(partition_for("anything", 1), 0);
        assert_eq!(partition_for("anything", 0), 0);
    }

    #[test]
    fn test_keys_spread_over_partitions() {
        let used: std::collections::HashSet<u32> = (0..200)
            .map(|i| partition_for(&format!("user{}@example.com", i), 4))
            .collect();
        assert_eq!(used.len(), 4);
    }

    #[test]
    fn test_stream_key_format() {
        assert_eq!(
            stream_key("dentra", "email.verification", 3),
            "dentra:email.verification:3"
        );
    }
}
