//! Literal-segment hashing for the tree's `HashMap<u64, ...>` children maps.
//!
//! Literal path segments are looked up by an identifier-wise hash rather than by the raw string,
//! following the same trick `rou3`'s route tree uses to avoid hashing the whole string on every
//! segment comparison during a hot-path traversal. Collisions are tolerated structurally (a
//! `Vec` of candidates per hash bucket) but we additionally guard every hit with an exact string
//! comparison, since a wrong match here would silently route a request to the wrong handler.

use ahash::AHasher;
use std::hash::{Hash, Hasher};

/// Hashes a literal path segment for use as a `SegmentTree` children-map key.
pub fn hash_segment(segment: &str) -> u64 {
    let mut hasher = AHasher::default();
    segment.hash(&mut hasher);
    hasher.finish()
}
