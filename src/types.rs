// Fast hash maps using AHash instead of the default SipHash.
// Import with `use crate::types::{HashMap, HashMapExt}` when you need `::new()`.
pub(crate) type HashMap<K, V> = ahash::HashMap<K, V>;
pub(crate) use ahash::HashMapExt;
