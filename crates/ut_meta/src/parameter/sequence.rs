use alloc::borrow::Cow;
use alloc::format;
use alloc::vec::Vec;

use ut_ptr::{Address, PtrMut};

use super::{
    ContainerFlags, ContainerOp, ContainerTraits, Parameter, ParameterRef, Traits, load_type,
    save_type, share,
};
use crate::controller::Controller;
use crate::names::{node_names, type_names};
use crate::{Error, Reflect, Result, Snapshot};

// -----------------------------------------------------------------------------
// SequenceParameter

/// Parameter of a growable sequence.
///
/// Elements are children named `p0`, `p1`, ... The node writes the element
/// count, and the element type with type info on. Loading resizes the
/// sequence before its elements are read.
pub struct SequenceParameter<'a, T> {
    vec: PtrMut<'a, Vec<T>>,
}

impl<'a, T: Reflect + Default> SequenceParameter<'a, T> {
    #[inline]
    pub fn new(vec: &'a mut Vec<T>) -> Self {
        Self {
            vec: PtrMut::from_mut(vec),
        }
    }
}

impl<'a, T: Reflect + Default> Parameter<'a> for SequenceParameter<'a, T> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::ARRAY)
    }

    #[inline]
    fn address(&self) -> Address {
        self.vec.address()
    }

    fn reflect(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        // Safety: elements are handed out once per reflection.
        for element in unsafe { self.vec.as_mut() } {
            snapshot.push(element)?;
        }
        Ok(())
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        if controller.info().has_type_info() {
            save_type(controller, node_names::VALUE_TYPE, &T::type_name())?;
        }
        // Safety: the sequence is not borrowed while its node is saved.
        let len = unsafe { self.vec.as_ref() }.len();
        let count = u32::try_from(len)
            .map_err(|_| Error::out_of_bounds(format!("{len} elements do not fit a u32 count")))?;
        controller.write_attribute(node_names::COUNT, &count)
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        if controller.info().has_type_info() {
            load_type(controller, node_names::VALUE_TYPE, &T::type_name())?;
        }
        let count = controller.read_count()?;

        // Safety: children are reflected again once the sequence is resized.
        let vec = unsafe { self.vec.as_mut() };
        vec.clear();
        vec.try_reserve(count)?;
        vec.resize_with(count, T::default);
        Ok(())
    }

    #[inline]
    fn is_dynamic(&self) -> bool {
        true
    }

    fn traits(&self) -> Traits {
        Traits {
            container: Some(ContainerTraits {
                flags: ContainerFlags::all(),
                element_type: T::type_name(),
                // Safety: read only.
                len: unsafe { self.vec.as_ref() }.len(),
            }),
        }
    }

    fn edit(&mut self, op: ContainerOp) -> Result<()> {
        // Safety: the owning snapshot reflects again after every edit.
        let vec = unsafe { self.vec.as_mut() };
        match op {
            ContainerOp::Reset => vec.clear(),
            ContainerOp::Push => {
                vec.try_reserve(1)?;
                vec.push(T::default());
            }
            ContainerOp::Remove(index) => {
                if index >= vec.len() {
                    return Err(Error::out_of_bounds(format!(
                        "cannot remove element {index} of {}",
                        vec.len()
                    )));
                }
                vec.remove(index);
            }
        }
        Ok(())
    }
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::ARRAY)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(SequenceParameter::new(self))
    }
}

// -----------------------------------------------------------------------------
// ArrayParameter

/// Parameter of a fixed-size array.
///
/// Written like a sequence; a payload with a different length cannot be
/// loaded and is skipped.
pub struct ArrayParameter<'a, T, const N: usize> {
    array: PtrMut<'a, [T; N]>,
}

impl<'a, T: Reflect, const N: usize> ArrayParameter<'a, T, N> {
    #[inline]
    pub fn new(array: &'a mut [T; N]) -> Self {
        Self {
            array: PtrMut::from_mut(array),
        }
    }
}

impl<'a, T: Reflect, const N: usize> Parameter<'a> for ArrayParameter<'a, T, N> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::ARRAY)
    }

    #[inline]
    fn address(&self) -> Address {
        self.array.address()
    }

    fn reflect(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        // Safety: elements are handed out once per reflection.
        for element in unsafe { self.array.as_mut() } {
            snapshot.push(element)?;
        }
        Ok(())
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        if controller.info().has_type_info() {
            save_type(controller, node_names::VALUE_TYPE, &T::type_name())?;
        }
        let count = u32::try_from(N)
            .map_err(|_| Error::out_of_bounds(format!("{N} elements do not fit a u32 count")))?;
        controller.write_attribute(node_names::COUNT, &count)
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        if controller.info().has_type_info() {
            load_type(controller, node_names::VALUE_TYPE, &T::type_name())?;
        }
        let count = controller.read_attribute::<u32>(node_names::COUNT)? as usize;
        if count != N {
            return Err(Error::types_not_match(format!(
                "array of {N} elements cannot hold {count}"
            )));
        }
        Ok(())
    }

    fn traits(&self) -> Traits {
        Traits {
            container: Some(ContainerTraits {
                flags: ContainerFlags::empty(),
                element_type: T::type_name(),
                len: N,
            }),
        }
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::ARRAY)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(ArrayParameter::new(self))
    }
}
