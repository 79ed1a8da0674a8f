use alloc::borrow::Cow;
use alloc::format;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

use ut_ptr::{Address, PtrMut};

use super::{Parameter, ParameterRef, share};
use crate::controller::Controller;
use crate::names::{node_names, type_names};
use crate::{Error, Plain, Reflect, Result};

// -----------------------------------------------------------------------------
// Binary

/// A sequence of plain numbers written as one block.
///
/// Binary payloads store the raw elements in the payload byte order. Text
/// payloads store the same bytes as a base64 string.
///
/// # Examples
///
/// ```
/// use ut_meta::{Binary, Snapshot, text};
///
/// let mut pixels = Binary(vec![0xFFu8, 0x80, 0x00]);
/// let mut document = text::Node::default();
/// Snapshot::capture(&mut pixels).unwrap().save_text(&mut document).unwrap();
///
/// let mut restored = Binary::<u8>::default();
/// Snapshot::capture(&mut restored).unwrap().load_text(&document).unwrap();
/// assert_eq!(restored, pixels);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Binary<T: Plain>(pub Vec<T>);

impl<T: Plain> From<Vec<T>> for Binary<T> {
    #[inline]
    fn from(value: Vec<T>) -> Self {
        Self(value)
    }
}

impl<T: Plain> Deref for Binary<T> {
    type Target = Vec<T>;

    #[inline]
    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T: Plain> DerefMut for Binary<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

// -----------------------------------------------------------------------------
// BinaryParameter

/// Parameter of a [`Binary`] block.
pub struct BinaryParameter<'a, T: Plain> {
    binary: PtrMut<'a, Binary<T>>,
}

impl<'a, T: Plain> BinaryParameter<'a, T> {
    #[inline]
    pub fn new(binary: &'a mut Binary<T>) -> Self {
        Self {
            binary: PtrMut::from_mut(binary),
        }
    }
}

impl<'a, T: Plain> Parameter<'a> for BinaryParameter<'a, T> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::BINARY)
    }

    #[inline]
    fn address(&self) -> Address {
        self.binary.address()
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        let endian = controller.info().endianness();
        // Safety: the block has no child nodes.
        let elements = unsafe { self.binary.as_ref() };

        let mut bytes = Vec::new();
        bytes.try_reserve(elements.len() * T::SIZE)?;
        for element in elements.iter() {
            element.put(endian, &mut bytes);
        }

        let size = u32::try_from(bytes.len()).map_err(|_| {
            Error::out_of_bounds(format!("{} bytes do not fit a u32 size", bytes.len()))
        })?;
        controller.write_attribute(node_names::SIZE, &size)?;
        controller.write_block(&bytes)
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        let endian = controller.info().endianness();
        let size = controller.read_attribute::<u32>(node_names::SIZE)? as usize;
        if size % T::SIZE != 0 {
            return Err(Error::out_of_bounds(format!(
                "{size} bytes are not a whole number of {} byte elements",
                T::SIZE
            )));
        }

        let bytes = controller.read_block(size)?;
        // Safety: see `save`.
        let elements = unsafe { self.binary.as_mut() };
        elements.clear();
        elements.try_reserve(size / T::SIZE)?;
        elements.extend(bytes.chunks_exact(T::SIZE).map(|chunk| T::get(chunk, endian)));
        Ok(())
    }
}

impl<T: Plain> Reflect for Binary<T> {
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::BINARY)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(BinaryParameter::new(self))
    }
}
