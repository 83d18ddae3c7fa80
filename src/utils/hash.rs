//! Faster hashing functionalities by ignoring the cryptographically
//! security needs.
//!
//! The implementation is based on the Fx algorithm extracted from the rustc
//! compiler. It should not be used where DOS attacks are a concern.

use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::ops::BitXor;

/// A builder for default Fx hashers.
pub type FastBuildHasher = BuildHasherDefault<FxHasher64>;

/// A `HashMap` using a default Fx hasher.
pub type FastHashMap<K, V> = HashMap<K, V, FastBuildHasher>;

/// A `HashSet` using a default Fx hasher.
pub type FastHashSet<V> = HashSet<V, FastBuildHasher>;

/// A convenience function for when you need a quick 64-bit hash.
#[inline]
pub fn hash64<T: Hash + ?Sized>(v: &T) -> u64 {
    let mut state = FxHasher64::default();
    v.hash(&mut state);
    state.finish()
}

const ROTATE: u32 = 5;
const SEED64: u64 = 0x517c_c1b7_2722_0a95;

/// Hashes 8 bytes at a time, where the FNV algorithm works on one byte at
/// a time.
#[derive(Debug, Clone, Default)]
pub struct FxHasher64 {
    hash: u64,
}

impl FxHasher64 {
    #[inline]
    fn hash_word(&mut self, word: u64) {
        self.hash = self.hash.rotate_left(ROTATE).bitxor(word).wrapping_mul(SEED64);
    }
}

impl Hasher for FxHasher64 {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        let mut bytes = bytes;

        while bytes.len() >= 8 {
            let mut word = [0; 8];
            word.copy_from_slice(&bytes[..8]);
            self.hash_word(u64::from_le_bytes(word));
            bytes = &bytes[8..];
        }

        if bytes.len() >= 4 {
            let mut word = [0; 4];
            word.copy_from_slice(&bytes[..4]);
            self.hash_word(u64::from(u32::from_le_bytes(word)));
            bytes = &bytes[4..];
        }

        for byte in bytes {
            self.hash_word(u64::from(*byte));
        }
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.hash_word(u64::from(i));
    }

    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.hash_word(u64::from(i));
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.hash_word(u64::from(i));
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash_word(i);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.hash_word(i as u64);
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(hash64("foundry"), hash64("foundry"));
        assert_ne!(hash64("foundry"), hash64("foundri"));
    }

    #[test]
    fn collections() {
        let mut v: FastHashMap<&'static str, i32> = Default::default();
        v.insert("hahah", 123);
        assert_eq!(v.get("hahah"), Some(&123));
    }
}
