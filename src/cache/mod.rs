//! Build cache identity
//!
//! Every package gets one key per run:
//!
//! ```text
//! <os>-<compiler>-<package>-<sha1 of the key input>
//! ```
//!
//! The same key names the cache entry and the published artifact, so a key
//! hit in either store means the exact same inputs were built before.
//!
//! # What goes into a key
//!
//! | Input | Source |
//! |-------|--------|
//! | tool version + suffix | crate version, `--cache-suffix` |
//! | CMake version | environment detection |
//! | build options | sorted option tokens |
//! | own commit | resolved ref |
//! | dependency commits | environment, filtered by the tree |
//! | dependency options | per-dependency option lines |

pub mod key;

pub use key::{
    compute_hash, compute_key, digest_hex, hash_input, CacheObject, KeyContext, Platform,
    TOOL_VERSION,
};
