use alloc::borrow::Cow;
use alloc::string::String;

use ut_ptr::{Address, PtrMut};

use super::{Parameter, ParameterRef, share};
use crate::controller::Controller;
use crate::{Reflect, Result, Value};

/// Parameter of a leaf value, see [`Value`].
pub struct ScalarParameter<'a, T> {
    value: PtrMut<'a, T>,
}

impl<'a, T: Value> ScalarParameter<'a, T> {
    #[inline]
    pub fn new(value: &'a mut T) -> Self {
        Self {
            value: PtrMut::from_mut(value),
        }
    }
}

impl<'a, T: Value> Parameter<'a> for ScalarParameter<'a, T> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(T::value_type_name())
    }

    #[inline]
    fn address(&self) -> Address {
        self.value.address()
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        // Safety: only this node observes the scalar.
        controller.write_value(unsafe { self.value.as_ref() })
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        let value = controller.read_value::<T>()?;
        // Safety: see `save`.
        unsafe { *self.value.as_mut() = value };
        Ok(())
    }
}

macro_rules! impl_reflect_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl Reflect for $ty {
            #[inline]
            fn type_name() -> Cow<'static, str> {
                Cow::Borrowed(<$ty as Value>::value_type_name())
            }

            fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
                share(ScalarParameter::new(self))
            }
        }
    )*};
}

impl_reflect_scalar!(
    i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, usize, isize, bool, String,
);
