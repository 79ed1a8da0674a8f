use alloc::borrow::Cow;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use core::cell::RefCell;

use ut_ptr::{Address, PtrMut};

use super::shared::{downcast_shared, pointee_type_name};
use super::{LinkTarget, Parameter, ParameterRef, save_type, share};
use crate::controller::Controller;
use crate::names::{node_names, type_names};
use crate::{Pointee, Reflect, Result};

// -----------------------------------------------------------------------------
// WeakSlot

/// A weak reference to a shared object.
pub trait WeakSlot: 'static {
    type Pointee: ?Sized + Pointee;

    fn upgrade(&self) -> Option<Rc<RefCell<Self::Pointee>>>;

    /// Points to `target`, or to nothing.
    fn set(&mut self, target: Option<&Rc<RefCell<Self::Pointee>>>);
}

impl<T: Pointee> WeakSlot for Weak<RefCell<T>> {
    type Pointee = T;

    #[inline]
    fn upgrade(&self) -> Option<Rc<RefCell<T>>> {
        Weak::upgrade(self)
    }

    fn set(&mut self, target: Option<&Rc<RefCell<T>>>) {
        *self = target.map_or_else(Weak::new, Rc::downgrade);
    }
}

impl<T: ?Sized + Pointee> WeakSlot for Option<Weak<RefCell<T>>> {
    type Pointee = T;

    #[inline]
    fn upgrade(&self) -> Option<Rc<RefCell<T>>> {
        self.as_ref().and_then(Weak::upgrade)
    }

    fn set(&mut self, target: Option<&Rc<RefCell<T>>>) {
        *self = target.map(Rc::downgrade);
    }
}

// -----------------------------------------------------------------------------
// WeakParameter

/// Parameter of a weak reference.
///
/// The target is not written: the weak reference stores the id of a shared
/// object written by a strong owner in the same payload. A target without
/// such an owner loads as empty.
pub struct WeakParameter<'a, W> {
    slot: PtrMut<'a, W>,
}

impl<'a, W: WeakSlot> WeakParameter<'a, W> {
    #[inline]
    pub fn new(slot: &'a mut W) -> Self {
        Self {
            slot: PtrMut::from_mut(slot),
        }
    }
}

impl<'a, W: WeakSlot> Parameter<'a> for WeakParameter<'a, W> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::WEAK_PTR)
    }

    #[inline]
    fn address(&self) -> Address {
        self.slot.address()
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        // Safety: the slot is observed by this node only.
        let Some(rc) = unsafe { self.slot.as_ref() }.upgrade() else {
            return save_type(controller, node_names::VALUE_TYPE, type_names::VOID);
        };
        save_type(controller, node_names::VALUE_TYPE, &pointee_type_name(&rc)?)?;
        controller.write_shared_link(Address::from_ptr(RefCell::as_ptr(&rc)), true)
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        let found: String = controller.read_attribute(node_names::VALUE_TYPE)?;
        // Safety: see `save`.
        unsafe { self.slot.as_mut() }.set(None);
        if found == type_names::VOID {
            return Ok(());
        }
        controller.read_weak_link()
    }

    fn link(&mut self, target: LinkTarget<'_>) -> Result<()> {
        let rc = downcast_shared::<W::Pointee>(target)?;
        // Safety: links run after the traversal.
        unsafe { self.slot.as_mut() }.set(Some(rc));
        Ok(())
    }
}

impl<T: Pointee> Reflect for Weak<RefCell<T>> {
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::WEAK_PTR)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(WeakParameter::new(self))
    }
}

impl<T: ?Sized + Pointee> Reflect for Option<Weak<RefCell<T>>> {
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::WEAK_PTR)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(WeakParameter::new(self))
    }
}
