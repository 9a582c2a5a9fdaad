//! Generated artifact sets.
//!
//! An [`ArtifactSet`] is the whole output of one compile: a mapping from
//! relative path to text, plus a Merkle digest over its contents so two
//! compiles can be compared without diffing every file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ordered mapping of relative path to generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
    /// Human-readable title of the generated template.
    pub title: String,

    /// Relative path to file content, in path order.
    pub files: BTreeMap<String, String>,

    /// Merkle root over `(path, content)` pairs.
    pub digest: String,
}

impl ArtifactSet {
    /// Create an empty artifact set.
    pub fn new(title: impl Into<String>) -> Self {
        let mut set = Self {
            title: title.into(),
            files: BTreeMap::new(),
            digest: String::new(),
        };
        set.digest = set.compute_merkle_root();
        set
    }

    /// Add a file, replacing any previous content at the same path.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
        self.digest = self.compute_merkle_root();
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Relative paths in order.
    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Compute the Merkle root of the files.
    pub fn compute_merkle_root(&self) -> String {
        if self.files.is_empty() {
            return "0".repeat(64);
        }

        let mut hashes: Vec<Vec<u8>> = self
            .files
            .iter()
            .map(|(path, content)| {
                let mut hasher = Sha256::new();
                hasher.update(path.as_bytes());
                hasher.update([0u8]);
                hasher.update(content.as_bytes());
                hasher.finalize().to_vec()
            })
            .collect();

        while hashes.len() > 1 {
            let mut next_level = Vec::new();

            for chunk in hashes.chunks(2) {
                let mut hasher = Sha256::new();
                hasher.update(&chunk[0]);
                if chunk.len() > 1 {
                    hasher.update(&chunk[1]);
                } else {
                    // Duplicate last hash if odd number
                    hasher.update(&chunk[0]);
                }
                next_level.push(hasher.finalize().to_vec());
            }

            hashes = next_level;
        }

        hashes
            .first()
            .map(|h| hex_encode(h))
            .unwrap_or_else(|| "0".repeat(64))
    }

    /// Verify the digest matches the files.
    pub fn verify_digest(&self) -> bool {
        self.digest == self.compute_merkle_root()
    }
}

/// Lowercase hex encoding.
pub fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
}

/// SHA-256 of a string, hex encoded.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex_encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_digest() {
        let set = ArtifactSet::new("empty");
        assert_eq!(set.digest, "0".repeat(64));
        assert!(set.is_empty());
    }

    #[test]
    fn test_digest_tracks_content() {
        let mut a = ArtifactSet::new("t");
        a.insert("steps.json", "[]");
        a.insert("README.md", "# t");
        assert!(a.verify_digest());

        let mut b = ArtifactSet::new("t");
        b.insert("README.md", "# t");
        b.insert("steps.json", "[]");
        assert_eq!(a.digest, b.digest);

        b.insert("steps.json", "[1]");
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn test_paths_are_sorted() {
        let mut set = ArtifactSet::new("t");
        set.insert("workflow.rs", "");
        set.insert("critics.rs", "");
        assert_eq!(set.paths(), vec!["critics.rs", "workflow.rs"]);
    }
}
