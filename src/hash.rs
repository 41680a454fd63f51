//! The hash collaborator: any deterministic `bytes -> uint` function wide
//! enough to cover the fingerprint's bit width.
//!
//! The default mirrors the reference implementation (MD5 interpreted as a
//! big integer); callers chasing throughput can swap in something like
//! FNV-1a instead.

use md5::{Digest, Md5};

/// A deterministic hash from UTF-8-encoded token bytes to an unsigned
/// integer of at least `f` bits, where `f` is the fingerprint width in use.
///
/// Implementations must be pure functions of their input: the same bytes
/// must always produce the same value, across calls and processes.
pub trait FingerprintHash: Send + Sync {
    /// Hash `bytes`, returning at least the low 128 bits of a wide digest.
    fn hash(&self, bytes: &[u8]) -> u128;
}

/// MD5 interpreted as a big integer, matching the reference implementation's
/// `int(hashlib.md5(x).hexdigest(), 16)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hash;

impl FingerprintHash for Md5Hash {
    fn hash(&self, bytes: &[u8]) -> u128 {
        let mut hasher = Md5::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        // MD5 digests are 16 bytes; the low 16 bytes of the big-integer
        // reading are exactly the digest itself, big-endian.
        u128::from_be_bytes(digest.into())
    }
}

/// FNV-1a, 64-bit output widened into the low bits of the accumulator.
///
/// Branch-free and allocation-free. Only safe to use with fingerprints of
/// `f <= 64`; wider fingerprints will see
/// the high bits pinned to zero, which is deterministic but not a good
/// idea for production recall.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1aHash;

impl FingerprintHash for Fnv1aHash {
    fn hash(&self, bytes: &[u8]) -> u128 {
        let mut h: u64 = 0xcbf29ce484222325;
        for &b in bytes {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        h as u128
    }
}
