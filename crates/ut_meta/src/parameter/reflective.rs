use alloc::borrow::Cow;

use ut_ptr::{Address, PtrMut};

use super::Parameter;
use crate::names::type_names;
use crate::{Event, Reflect, Result, Snapshot};

/// Parameter of an aggregate: children come from [`Reflect::reflect`], the
/// node itself carries no payload.
pub struct ReflectiveParameter<'a, T: ?Sized> {
    object: PtrMut<'a, T>,
}

impl<'a, T: ?Sized + Reflect> ReflectiveParameter<'a, T> {
    #[inline]
    pub fn new(object: &'a mut T) -> Self {
        Self {
            object: PtrMut::from_mut(object),
        }
    }
}

impl<'a, T: ?Sized + Reflect> Parameter<'a> for ReflectiveParameter<'a, T> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::REFLECTIVE)
    }

    #[inline]
    fn address(&self) -> Address {
        self.object.address()
    }

    fn reflect(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        // Safety: fields are handed out once per reflection, each to its
        // own child node.
        unsafe { self.object.as_mut() }.reflect(snapshot)
    }

    fn on_event(&mut self, event: Event) -> Result<()> {
        // Safety: events run outside of any traversal.
        unsafe { self.object.as_mut() }.on_event(event)
    }
}
