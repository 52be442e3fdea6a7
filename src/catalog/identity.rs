use sha1::{Digest, Sha1};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Domain-separation prefix for hashed resource identifiers.
///
/// Changing it changes every hashed id, so it stays compatible with catalogs
/// produced by earlier tooling.
pub const ID_HASH_PREFIX: &str = "mcm-luacat ID: ";

/// Resource identifier plus the human-readable comment it was derived from.
///
/// Equality and hashing consider only `value`; the comment is diagnostic.
#[derive(Clone, Debug)]
pub struct Id {
    pub value: u64,
    pub comment: String,
}

impl Id {
    /// An explicit id. The value is taken verbatim, without forcing bit 0.
    pub fn new(value: u64, comment: impl Into<String>) -> Self {
        Self {
            value,
            comment: comment.into(),
        }
    }

    /// Derive an id from its comment.
    pub fn hash(comment: &str) -> Self {
        Self {
            value: hash_bytes(comment.as_bytes()),
            comment: comment.to_string(),
        }
    }

    /// Like [`Id::hash`] for comments that are not valid UTF-8; the value is
    /// computed over the raw bytes.
    pub fn hash_bytes(comment: &[u8]) -> Self {
        Self {
            value: hash_bytes(comment),
            comment: String::from_utf8_lossy(comment).into_owned(),
        }
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comment.is_empty() {
            write!(f, "id:{:#018x}", self.value)
        } else {
            write!(f, "id:{:#018x} ({})", self.value, self.comment)
        }
    }
}

/// SHA-1 over the prefix and `comment`, first eight digest bytes read
/// little-endian, bit 0 forced on so a hashed id is never 0.
pub fn hash_bytes(comment: &[u8]) -> u64 {
    let mut hasher = Sha1::new();
    hasher.update(ID_HASH_PREFIX.as_bytes());
    hasher.update(comment);
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head) | 1
}
