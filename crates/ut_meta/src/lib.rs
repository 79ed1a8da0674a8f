//! Meta serialization: reflect an object graph into a [`Snapshot`] tree,
//! then write or read it as binary or as a text tree with one
//! [`Controller`].
//!
//! **Reflection**
//!
//! A type implements [`Reflect`], usually through the derive macro. Leaf
//! values, sequences, maps and pointers come with their own parameters.
//! Capturing an object creates one [`Snapshot`] node per reflected value.
//!
//! **Serialization**
//!
//! The [`Info`] of a snapshot selects what a payload carries: names, type
//! names, link ids, sizes. Reading matches nodes by name and skips what no
//! longer fits, so payloads survive added, removed and retyped fields.
//!
//! **Linking**
//!
//! With linkage info on, raw, shared and weak pointers are written as node
//! ids and resolved by a [`Linker`] once the whole payload is traversed.
//! Shared objects are written once, however many pointers own them.
//!
//! # Examples
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use ut_meta::stream::{MemoryReader, MemoryWriter};
//! use ut_meta::{Reflect, Snapshot};
//!
//! #[derive(Reflect, Default)]
//! struct Scene {
//!     title: String,
//!     left: Option<Rc<RefCell<u32>>>,
//!     right: Option<Rc<RefCell<u32>>>,
//! }
//!
//! let shared = Rc::new(RefCell::new(42));
//! let mut scene = Scene {
//!     title: "demo".into(),
//!     left: Some(shared.clone()),
//!     right: Some(shared),
//! };
//!
//! let mut bytes = MemoryWriter::new();
//! Snapshot::capture(&mut scene).unwrap().save_binary(&mut bytes).unwrap();
//!
//! let mut loaded = Scene::default();
//! let mut reader = MemoryReader::new(bytes.as_slice());
//! Snapshot::capture(&mut loaded).unwrap().load_binary(&mut reader).unwrap();
//!
//! let (left, right) = (loaded.left.unwrap(), loaded.right.unwrap());
//! assert_eq!(*left.borrow(), 42);
//! assert!(Rc::ptr_eq(&left, &right));
//! ```
#![expect(unsafe_code, reason = "parameters observe fields through raw pointers")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Extern Self

// Derive macros name this crate `ut_meta`, which must also resolve inside
// the crate itself.
extern crate self as ut_meta;

// -----------------------------------------------------------------------------
// no_std support

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod controller;
mod error;
mod info;
mod reflect;
mod registry;
mod snapshot;
mod value;

pub mod linker;
pub mod names;
pub mod parameter;
pub mod stream;
pub mod text;

// -----------------------------------------------------------------------------
// Top-level exports

#[doc(hidden)]
pub mod __macro_exports {
    pub use alloc::borrow::Cow;
    pub use alloc::boxed::Box;
    pub use alloc::rc::Rc;
    pub use core::cell::RefCell;

    pub use crate::registry::{create_boxed, create_shared};
}

pub use controller::{Controller, Mode, SerializationOptions, State, Uniform};
pub use error::{Error, ErrorKind, Result};
pub use info::{Endian, Flags, Info, LogHook};
pub use linker::{Link, Linker, SharedHolder};
pub use parameter::{Binary, ContainerOp, Parameter, ParameterRef, Traits};
pub use reflect::{Event, Pointee, Polymorphic, PolymorphicName, Reflect};
pub use registry::{Factory, Registry};
pub use snapshot::Snapshot;
pub use value::{Plain, Value};

pub use ut_meta_derive::{Polymorphic, Reflect};
