//! Keyspace encoding: buckets and objects into one flat byte-ordered map.

/// Prefix shared by all bucket markers.
pub const BUCKET_SCAN_PREFIX: &[u8] = b"B\0";

/// Marker key for a bucket: `B\0<bucket>`.
pub fn bucket_key(bucket: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(2 + bucket.len());
    k.extend_from_slice(BUCKET_SCAN_PREFIX);
    k.extend_from_slice(bucket.as_bytes());
    k
}

/// Prefix shared by all metadata keys of a bucket: `M\0<bucket>\0`.
pub fn meta_prefix(bucket: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(3 + bucket.len());
    k.extend_from_slice(b"M\0");
    k.extend_from_slice(bucket.as_bytes());
    k.push(0);
    k
}

/// Metadata key for an object: `M\0<bucket>\0<key>`.
pub fn meta_key(bucket: &str, key: &str) -> Vec<u8> {
    let mut k = meta_prefix(bucket);
    k.extend_from_slice(key.as_bytes());
    k
}

/// Data key for an object: `D\0<bucket>\0<key>`.
pub fn data_key(bucket: &str, key: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(3 + bucket.len() + key.len());
    k.extend_from_slice(b"D\0");
    k.extend_from_slice(bucket.as_bytes());
    k.push(0);
    k.extend_from_slice(key.as_bytes());
    k
}

/// Whether a name contains the reserved separator byte.
pub fn contains_nul(s: &str) -> bool {
    s.bytes().any(|b| b == 0)
}
