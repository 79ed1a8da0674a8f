//! Small collection helpers shared by the `ut` crates.
//!
//! - [`hash`]: `hashbrown` containers keyed through a fixed `foldhash` seed,
//!   so iteration order is reproducible between runs.
//! - [`TypeIdMap`]: a map keyed by [`TypeId`](core::any::TypeId) without
//!   re-hashing the already well distributed id.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod hash;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;
