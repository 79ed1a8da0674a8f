use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use core::any::Any;
use core::cell::RefCell;

use ut_ptr::{Address, PtrMut};

use super::{LinkTarget, Parameter, ParameterRef, save_type, share};
use crate::controller::{Controller, SerializationOptions};
use crate::linker::SharedHolder;
use crate::names::{node_names, type_names};
use crate::{Error, Event, Pointee, Reflect, Result, Snapshot};

// -----------------------------------------------------------------------------
// SharedObject

/// A shared pointee written once under `shared_objects`.
///
/// Created by [`SharedParameter`]: on save around an existing instance, on
/// load around the type name to instantiate.
pub struct SharedObject<'a, T: ?Sized> {
    type_name: String,
    // Declared before `object`: the snapshot observes it.
    snapshot: Option<Snapshot<'a>>,
    object: Option<Rc<RefCell<T>>>,
    post: Option<Event>,
    id: u32,
}

impl<'a, T: ?Sized + Pointee> SharedObject<'a, T> {
    /// Holder of an instance about to be written.
    pub fn output(object: Rc<RefCell<T>>, type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            snapshot: None,
            object: Some(object),
            post: None,
            id: 0,
        }
    }

    /// Holder of an instance to be created and read.
    pub fn input(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            snapshot: None,
            object: None,
            post: None,
            id: 0,
        }
    }

    fn capture(&mut self, name: &str, controller: &Controller<'_, 'a>) -> Result<&mut Snapshot<'a>> {
        let rc = self
            .object
            .as_ref()
            .ok_or_else(|| Error::empty(format!("shared `{}` has no instance", self.type_name)))?;
        // Safety: `self.object` keeps the allocation alive while the snapshot
        // stored next to it exists, and no `RefCell` borrow is handed out
        // during the call.
        let object: &'a mut T = unsafe { &mut *RefCell::as_ptr(rc) };
        let snapshot = Snapshot::capture_with(object, name, controller.info().clone())?;
        Ok(self.snapshot.insert(snapshot))
    }
}

const SHARED_OPTIONS: SerializationOptions = SerializationOptions {
    initialize: false,
    only_uniforms: false,
    force_size_info: true,
};

impl<'a, T: ?Sized + Pointee> SharedHolder<'a> for SharedObject<'a, T> {
    fn address(&self) -> Address {
        self.object
            .as_ref()
            .map_or(Address::NULL, |rc| Address::from_ptr(RefCell::as_ptr(rc)))
    }

    #[inline]
    fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    fn id(&self) -> u32 {
        self.id
    }

    fn shared(&self) -> Option<&dyn Any> {
        self.object.as_ref().map(|rc| rc as &dyn Any)
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>, name: &str) -> Result<()> {
        let snapshot = self.capture(name, controller)?;
        snapshot.dispatch(Event::PreSave)?;
        controller.write_node(snapshot, SHARED_OPTIONS)?;
        self.id = snapshot.id();
        self.post = Some(Event::PostSave);
        Ok(())
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>, name: &str) -> Result<()> {
        self.snapshot = None;
        self.object = Some(T::instantiate_shared(&self.type_name, controller.registry())?);
        let snapshot = self.capture(name, controller)?;
        snapshot.dispatch(Event::PreLoad)?;
        controller.read_node(snapshot, SHARED_OPTIONS)?;
        self.id = snapshot.id();
        self.post = Some(Event::PostLoad);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match (self.post.take(), self.snapshot.as_mut()) {
            (Some(event), Some(snapshot)) => snapshot.dispatch(event),
            _ => Ok(()),
        }
    }
}

// -----------------------------------------------------------------------------
// SharedParameter

/// Parameter of a shared pointer, possibly to a trait object.
///
/// The pointee is not a child: it is written once under `shared_objects`
/// however many pointers share it, and every pointer stores its id. Loading
/// restores the aliasing.
pub struct SharedParameter<'a, T: ?Sized> {
    ptr: PtrMut<'a, Option<Rc<RefCell<T>>>>,
}

impl<'a, T: ?Sized + Pointee> SharedParameter<'a, T> {
    #[inline]
    pub fn new(ptr: &'a mut Option<Rc<RefCell<T>>>) -> Self {
        Self {
            ptr: PtrMut::from_mut(ptr),
        }
    }
}

pub(super) fn pointee_type_name<T: ?Sized + Pointee>(rc: &Rc<RefCell<T>>) -> Result<Cow<'static, str>> {
    rc.try_borrow()
        .map(|object| object.pointee_type_name())
        .map_err(|_| Error::fail("shared object is mutably borrowed"))
}

pub(super) fn downcast_shared<T: ?Sized + Pointee>(
    target: LinkTarget<'_>,
) -> Result<&Rc<RefCell<T>>> {
    match target {
        LinkTarget::Shared(object) => object.downcast_ref::<Rc<RefCell<T>>>().ok_or_else(|| {
            Error::types_not_match("shared object has a different pointer type")
        }),
        LinkTarget::Object { type_name, .. } => Err(Error::types_not_match(format!(
            "`{type_name}` is not a shared object"
        ))),
    }
}

impl<'a, T: ?Sized + Pointee> Parameter<'a> for SharedParameter<'a, T> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::SHARED_PTR)
    }

    #[inline]
    fn address(&self) -> Address {
        self.ptr.address()
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        // Safety: the pointer itself is observed by this node only.
        let Some(rc) = (unsafe { self.ptr.as_ref() }) else {
            return save_type(controller, node_names::VALUE_TYPE, type_names::VOID);
        };
        let type_name = pointee_type_name(rc)?;
        save_type(controller, node_names::VALUE_TYPE, &type_name)?;

        let address = Address::from_ptr(RefCell::as_ptr(rc));
        controller.write_shared_object(Box::new(SharedObject::output(rc.clone(), type_name)))?;
        controller.write_shared_link(address, false)
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        let found: String = controller.read_attribute(node_names::VALUE_TYPE)?;
        // Safety: see `save`.
        unsafe { *self.ptr.as_mut() = None };
        if found == type_names::VOID {
            return Ok(());
        }
        controller.read_shared_link(Box::new(SharedObject::<T>::input(found)))
    }

    fn link(&mut self, target: LinkTarget<'_>) -> Result<()> {
        let rc = downcast_shared::<T>(target)?;
        // Safety: links run after the traversal.
        unsafe { *self.ptr.as_mut() = Some(rc.clone()) };
        Ok(())
    }
}

impl<T: ?Sized + Pointee> Reflect for Option<Rc<RefCell<T>>> {
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::SHARED_PTR)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(SharedParameter::new(self))
    }
}
