use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::hasher::Digest;
use crate::errors::{Result, TinylinkError};
use crate::storage::{MappingStore, UrlMapping};

/// Source of truth the allocator probes for an occupied code.
#[async_trait]
pub trait CodeLookup: Send + Sync {
    async fn lookup(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>>;
}

#[async_trait]
impl<T: MappingStore + ?Sized> CodeLookup for T {
    async fn lookup(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        self.find_by_code(code, now).await
    }
}

/// Outcome of a successful allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// Nobody holds this code yet; the caller inserts it.
    Vacant { code: String, offset: usize },
    /// The same long URL already owns this code.
    Existing(UrlMapping),
}

/// base64url (no padding) of the digest.
///
/// The url-safe alphabet never yields `+` or `/`; the replace only guards
/// the path-safety of codes if the engine ever changes.
pub fn encode_digest(digest: &Digest) -> String {
    URL_SAFE_NO_PAD.encode(digest).replace(['+', '/'], "_")
}

/// Turns a digest into a free code by sliding a fixed window over its encoding.
///
/// Probing is deterministic: the same long URL walks the same offsets in the
/// same order, which makes re-shortening converge on the code it got before
/// without any long-URL index.
#[derive(Debug, Clone, Copy)]
pub struct CodeAllocator {
    code_length: usize,
}

impl CodeAllocator {
    pub fn new(code_length: usize) -> Self {
        Self { code_length }
    }

    /// Candidate codes in probe order.
    pub fn candidates(&self, digest: &Digest) -> Vec<String> {
        let encoded = encode_digest(digest);
        if self.code_length == 0 || self.code_length > encoded.len() {
            return Vec::new();
        }
        (0..=encoded.len() - self.code_length)
            .map(|offset| encoded[offset..offset + self.code_length].to_string())
            .collect()
    }

    pub async fn allocate<L: CodeLookup + ?Sized>(
        &self,
        long_url: &str,
        digest: &Digest,
        lookup: &L,
        now: DateTime<Utc>,
    ) -> Result<Allocation> {
        self.allocate_from(long_url, digest, lookup, now, 0).await
    }

    /// Probe starting at `start`; used to resume after losing a code to a
    /// concurrent writer.
    pub async fn allocate_from<L: CodeLookup + ?Sized>(
        &self,
        long_url: &str,
        digest: &Digest,
        lookup: &L,
        now: DateTime<Utc>,
        start: usize,
    ) -> Result<Allocation> {
        let candidates = self.candidates(digest);
        let probes = candidates.len();

        for (offset, candidate) in candidates.into_iter().enumerate().skip(start) {
            match lookup.lookup(&candidate, now).await? {
                None => {
                    debug!("Allocated code '{}' at offset {}", candidate, offset);
                    return Ok(Allocation::Vacant {
                        code: candidate,
                        offset,
                    });
                }
                Some(existing) if existing.long_url == long_url => {
                    debug!("Reusing code '{}' for an already shortened URL", candidate);
                    return Ok(Allocation::Existing(existing));
                }
                Some(_) => {
                    debug!(
                        "Code '{}' collides at offset {}, advancing window",
                        candidate, offset
                    );
                }
            }
        }

        Err(TinylinkError::allocation_exhausted(format!(
            "all {} probe offsets are taken by other URLs",
            probes
        )))
    }
}
