//! Lightweight pointer wrappers used by the meta serialization engine.
//!
//! Reflection parameters observe the fields of an object graph that is
//! exclusively borrowed for the duration of one serialization call. Several
//! parameters may point into the same allocation (a struct and its first
//! field share an address), so plain `&mut T` cannot be stored.
//!
//! **Address**
//!
//! [`Address`] is a thin, hashable, comparable pointer identity. It never
//! grants access to the pointee and is used as a lookup key when resolving
//! deferred links.
//!
//! **PtrMut**
//!
//! [`PtrMut<'a, T>`] is a copyable `&'a mut T` equivalent. Access is `unsafe`
//! because the caller is responsible for not creating overlapping references.
#![expect(unsafe_code, reason = "Raw pointers are inherently unsafe.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Modules

mod address;
mod observed;

// -----------------------------------------------------------------------------
// Top-level exports

pub use address::Address;
pub use observed::PtrMut;
