//! Accelerated route matching for the Switchyard dispatch engine.
//!
//! Implements the matcher contract from `switchyard-core` with a segment
//! trie instead of a linear scan. The implementation is deliberately
//! independent of the reference matcher: the two share the segmentation
//! convention and the converter set, nothing else, and a generated-corpus
//! test keeps them in behavioral lockstep.
//!
//! See `docs/ARCHITECTURE.md` §3 for the equivalence argument.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

mod matcher;
mod trie;

pub use matcher::TrieMatcher;
