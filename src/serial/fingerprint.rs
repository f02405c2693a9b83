//! Configuration fingerprints.
//!
//! A fingerprint is `VERSION:<schema>:SHA256:<base64 digest>` over the DER
//! encoding of a snapshot. Because the encoding is canonical, the fingerprint
//! only depends on the names and values, never on how they were loaded.

use crate::core::snapshot::Snapshot;
use crate::serial::{der, SCHEMA_VERSION};
use crate::util::hash;

/// Fingerprint of the entries that participate in hashing, or of every
/// entry when `everything` is set.
pub fn fingerprint(snapshot: &Snapshot, everything: bool) -> String {
    let encoded = der::encode(snapshot, everything);
    let digest = hash::sha256_base64(&encoded);
    tracing::debug!(
        "fingerprinted {} octets from {} tunables",
        encoded.len(),
        snapshot.hashed(everything).count()
    );
    format!("VERSION:{}:SHA256:{}", SCHEMA_VERSION, digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::SnapshotEntry;
    use crate::core::value::Value;

    #[test]
    fn test_format() {
        let fp = fingerprint(&Snapshot::from_values([("Otsu", 1.0)]), false);
        let digest = fp.strip_prefix("VERSION:1:SHA256:").unwrap();
        assert_eq!(digest.len(), 44);
        assert!(digest.ends_with('='));
    }

    #[test]
    fn test_empty_snapshot() {
        let expected = format!(
            "VERSION:1:SHA256:{}",
            hash::sha256_base64(&[0x30, 0x05, 0x02, 0x01, 0x01, 0x30, 0x00])
        );
        assert_eq!(fingerprint(&Snapshot::new(), false), expected);
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let a = Snapshot::from_values([("x", 1), ("y", 2), ("z", 3)]);
        let b = Snapshot::from_values([("z", 3), ("x", 1), ("y", 2)]);
        assert_eq!(fingerprint(&a, false), fingerprint(&b, false));
    }

    #[test]
    fn test_unhashed_entries_ignored() {
        let base = Snapshot::from_values([("x", 1)]);
        let mut extended = base.clone();
        extended.insert(SnapshotEntry {
            name: "verbose".to_string(),
            value: Value::Bool(true),
            documentation: String::new(),
            hash: false,
        });

        assert_eq!(
            fingerprint(&base, false),
            fingerprint(&extended, false)
        );
        assert_ne!(
            fingerprint(&base, true),
            fingerprint(&extended, true)
        );
    }

    #[test]
    fn test_type_is_part_of_identity() {
        let int = Snapshot::from_values([("x", 1)]);
        let float = Snapshot::from_values([("x", 1.0)]);
        assert_ne!(fingerprint(&int, false), fingerprint(&float, false));
    }
}
