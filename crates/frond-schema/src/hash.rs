//! Content hashing for emitted assets.

use serde::{Deserialize, Deserializer, Serialize};

/// Number of hex characters embedded in output filenames.
///
/// 16 chars = 64 bits of the BLAKE3 digest, plenty to make accidental
/// collisions between two bundles of the same logical name implausible while
/// keeping filenames readable.
const FILENAME_HASH_LEN: usize = 16;

/// BLAKE3 content hash of an emitted asset.
///
/// Equal content always produces an equal hash, so rebuilding unchanged
/// sources reuses the same output filename (long-lived caching) and any
/// content change produces a new one (cache busting).
///
/// The hash is validated at deserialization time, so a stored value is
/// always a full 64-hex-char digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Compute the BLAKE3 hash of a byte buffer.
    pub fn compute(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self(hash.to_hex().to_string())
    }

    /// Validate a stored hex digest (exactly 64 ASCII hex characters).
    ///
    /// # Errors
    ///
    /// Returns an error string if `s` is not a full lowercase-normalizable
    /// BLAKE3 digest.
    pub fn parse(s: &str) -> Result<Self, String> {
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(s.to_lowercase()))
        } else {
            Err(format!(
                "invalid content hash: expected 64 hex chars, got '{s}'"
            ))
        }
    }

    /// Compute the BLAKE3 hash of a file by reading it entirely into memory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn compute_file(path: &std::path::Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::compute(&data))
    }

    /// Return the full hex digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The truncated form embedded in output filenames.
    pub fn short(&self) -> &str {
        &self.0[..FILENAME_HASH_LEN]
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_works() {
        let hash = ContentHash::compute(b"body { margin: 0; }");
        assert_eq!(hash.as_str().len(), 64); // 32 bytes = 64 hex chars
        assert_eq!(hash.short().len(), FILENAME_HASH_LEN);
    }

    #[test]
    fn deterministic() {
        let h1 = ContentHash::compute(b"console.log('home')");
        let h2 = ContentHash::compute(b"console.log('home')");
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_inputs_different_hashes() {
        let h1 = ContentHash::compute(b"input 1");
        let h2 = ContentHash::compute(b"input 2");
        assert_ne!(h1, h2);
        assert_ne!(h1.short(), h2.short());
    }

    #[test]
    fn deserialization_rejects_truncated_digests() {
        #[derive(Deserialize)]
        struct Record {
            hash: ContentHash,
        }

        // A digest shorter than the filename truncation length must be
        // rejected up front rather than panic later in `short()`.
        assert!(toml::from_str::<Record>("hash = \"abc\"").is_err());
        assert!(toml::from_str::<Record>(&format!("hash = \"{}\"", "z".repeat(64))).is_err());

        let full = ContentHash::compute(b"body {}").to_string();
        let record: Record = toml::from_str(&format!("hash = \"{full}\"")).unwrap();
        assert_eq!(record.hash.short().len(), FILENAME_HASH_LEN);
    }

    #[test]
    fn parse_normalizes_case() {
        let upper = "A".repeat(64);
        assert_eq!(ContentHash::parse(&upper).unwrap().as_str(), "a".repeat(64));
    }

    #[test]
    fn compute_file_matches_compute() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("styles.css");
        std::fs::write(&path, b"a { color: red }").unwrap();
        assert_eq!(
            ContentHash::compute_file(&path).unwrap(),
            ContentHash::compute(b"a { color: red }")
        );
    }
}
