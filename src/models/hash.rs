//! Content fingerprinting for working copies and releases.
//!
//! The digest identifies the semantic content of an entity independent of
//! storage or transport representation. Saving the same content twice must
//! produce the same hash, so callers can use hash equality to skip
//! redundant writes and detect drift between a draft and a release.

use crate::models::SchemaValue;
use sha2::{Digest, Sha256};

/// Incremental content digest.
///
/// Fields are fed in a fixed order, each terminated by a separator byte so
/// adjacent fields cannot alias (`"ab" + "c"` vs `"a" + "bc"`). Schema
/// fields contribute their canonical JSON form.
pub struct ContentDigest {
    hasher: Sha256,
}

impl ContentDigest {
    /// Start a digest for one entity kind. The kind tag keeps a prompt and
    /// a trigger with coincidentally equal fields from colliding.
    pub fn new(kind: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update([0u8]);
        Self { hasher }
    }

    /// Feed a text field.
    pub fn text(mut self, value: &str) -> Self {
        self.hasher.update(value.as_bytes());
        self.hasher.update([0u8]);
        self
    }

    /// Feed an optional text field. `None` and `Some("")` are distinct.
    pub fn opt_text(mut self, value: Option<&str>) -> Self {
        match value {
            Some(v) => {
                self.hasher.update([1u8]);
                self.hasher.update(v.as_bytes());
            }
            None => self.hasher.update([0u8]),
        }
        self.hasher.update([0u8]);
        self
    }

    /// Feed a list of text values, order-significant.
    pub fn text_list(mut self, values: &[String]) -> Self {
        for v in values {
            self.hasher.update([1u8]);
            self.hasher.update(v.as_bytes());
        }
        self.hasher.update([0u8]);
        self
    }

    /// Feed an optional schema document in canonical form.
    pub fn schema(self, value: Option<&SchemaValue>) -> Self {
        self.opt_text(value.map(|s| s.canonical_json()).as_deref())
    }

    /// Finish and render the digest as 64 lowercase hex characters.
    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}
