use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::String;

use ut_ptr::{Address, PtrMut};

use super::{Parameter, ParameterRef, save_type, share};
use crate::controller::Controller;
use crate::names::{node_names, positional, type_names};
use crate::{Pointee, Reflect, Result, Snapshot};

/// Parameter of an owning pointer, possibly to a trait object.
///
/// The pointee is written inline as child `p0`. Its run-time type name is
/// stored in `value_type` and used to create the pointee on load.
pub struct UniqueParameter<'a, T: ?Sized> {
    ptr: PtrMut<'a, Option<Box<T>>>,
}

impl<'a, T: ?Sized + Pointee> UniqueParameter<'a, T> {
    #[inline]
    pub fn new(ptr: &'a mut Option<Box<T>>) -> Self {
        Self {
            ptr: PtrMut::from_mut(ptr),
        }
    }
}

impl<'a, T: ?Sized + Pointee> Parameter<'a> for UniqueParameter<'a, T> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::UNIQUE_PTR)
    }

    #[inline]
    fn address(&self) -> Address {
        self.ptr.address()
    }

    fn reflect(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        // Safety: the pointee is handed out once per reflection.
        if let Some(pointee) = unsafe { self.ptr.as_mut() } {
            snapshot.add(&mut **pointee, positional(0))?;
        }
        Ok(())
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        // Safety: the pointee is not borrowed while its owner is saved.
        match unsafe { self.ptr.as_ref() } {
            Some(pointee) => save_type(
                controller,
                node_names::VALUE_TYPE,
                &pointee.pointee_type_name(),
            ),
            None => save_type(controller, node_names::VALUE_TYPE, type_names::VOID),
        }
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        let found: String = controller.read_attribute(node_names::VALUE_TYPE)?;
        let pointee = if found == type_names::VOID {
            None
        } else {
            Some(T::instantiate(&found, controller.registry())?)
        };
        // Safety: children are reflected again once the pointee is replaced.
        unsafe { *self.ptr.as_mut() = pointee };
        Ok(())
    }

    #[inline]
    fn is_dynamic(&self) -> bool {
        true
    }
}

impl<T: ?Sized + Pointee> Reflect for Option<Box<T>> {
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::UNIQUE_PTR)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(UniqueParameter::new(self))
    }
}
