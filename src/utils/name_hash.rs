//! Uniqued identity of a canonical resource name.

use std::fmt;

use super::hash::hash64;

/// 64-bit hash of a canonical resource name. Two names compare equal iff
/// their canonical byte strings hash equal; the factory keys every intern
/// table on this value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameHash(u64);

impl NameHash {
    #[inline]
    pub fn of<T: AsRef<str>>(name: T) -> Self {
        NameHash(hash64(name.as_ref()))
    }

    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl<T: AsRef<str>> From<T> for NameHash {
    fn from(name: T) -> Self {
        NameHash::of(name)
    }
}

impl fmt::Debug for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NameHash({:#018x})", self.0)
    }
}
