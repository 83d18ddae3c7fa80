//! Commonly used utilities.

pub mod hash;
pub mod name_hash;

pub use self::hash::{hash64, FastHashMap, FastHashSet};
pub use self::name_hash::NameHash;
