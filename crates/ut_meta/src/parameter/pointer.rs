use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;
use core::ptr::NonNull;

use ut_ptr::{Address, PtrMut};

use super::{LinkTarget, Parameter, ParameterRef, check_type_name, save_type, share};
use crate::controller::Controller;
use crate::names::{node_names, type_names};
use crate::{Error, Reflect, Result};

/// Parameter of a non-owning pointer to another reflected value.
///
/// The pointee must be part of the same payload: the pointer is written as
/// the link id of the node observing it, and re-pointed once every node is
/// loaded.
pub struct RawPointerParameter<'a, T> {
    ptr: PtrMut<'a, Option<NonNull<T>>>,
}

impl<'a, T: Reflect> RawPointerParameter<'a, T> {
    #[inline]
    pub fn new(ptr: &'a mut Option<NonNull<T>>) -> Self {
        Self {
            ptr: PtrMut::from_mut(ptr),
        }
    }
}

impl<'a, T: Reflect> Parameter<'a> for RawPointerParameter<'a, T> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::RAW_PTR)
    }

    #[inline]
    fn address(&self) -> Address {
        self.ptr.address()
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        // Safety: the pointer itself is observed by this node only.
        match unsafe { *self.ptr.as_ref() } {
            Some(target) => {
                let type_name = T::type_name();
                save_type(controller, node_names::VALUE_TYPE, &type_name)?;
                controller.write_link(Address::from_ptr(target.as_ptr()), &type_name)
            }
            None => save_type(controller, node_names::VALUE_TYPE, type_names::VOID),
        }
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        let found: String = controller.read_attribute(node_names::VALUE_TYPE)?;
        // Safety: see `save`.
        unsafe { *self.ptr.as_mut() = None };
        if found == type_names::VOID {
            return Ok(());
        }
        check_type_name(node_names::VALUE_TYPE, &T::type_name(), &found)?;
        controller.read_link()
    }

    fn link(&mut self, target: LinkTarget<'_>) -> Result<()> {
        let LinkTarget::Object { address, type_name } = target else {
            return Err(Error::types_not_match("raw pointers cannot own shared objects"));
        };
        check_type_name(node_names::VALUE_TYPE, &T::type_name(), type_name)?;
        let target = NonNull::new(address.as_ptr().cast::<T>().cast_mut())
            .ok_or_else(|| Error::empty(format!("null link target for `{}`", T::type_name())))?;
        // Safety: links run after the traversal, nothing else observes the pointer.
        unsafe { *self.ptr.as_mut() = Some(target) };
        Ok(())
    }
}

impl<T: Reflect> Reflect for Option<NonNull<T>> {
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::RAW_PTR)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(RawPointerParameter::new(self))
    }
}
