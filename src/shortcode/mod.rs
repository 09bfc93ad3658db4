//! Tiny-code generation
//!
//! - `hasher`: long URL → fixed-length digest
//! - `allocator`: digest → collision-free code, probing the store

pub mod allocator;
pub mod hasher;

pub use allocator::{Allocation, CodeAllocator, CodeLookup, encode_digest};
pub use hasher::{DIGEST_LEN, Digest, Hasher, Md5Hasher};
