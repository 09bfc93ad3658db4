/// Digest width in bytes (128-bit).
pub const DIGEST_LEN: usize = 16;

pub type Digest = [u8; DIGEST_LEN];

/// Content-addressing for long URLs.
///
/// Implementations must be pure: the same input always yields the same digest.
/// Collision resistance only needs to be good enough for deduplicating URLs;
/// the allocator's probing handles the rest.
pub trait Hasher: Send + Sync {
    fn digest(&self, long_url: &str) -> Digest;
}

/// MD5 over the raw URL bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Md5Hasher;

impl Hasher for Md5Hasher {
    fn digest(&self, long_url: &str) -> Digest {
        md5::compute(long_url.as_bytes()).0
    }
}
