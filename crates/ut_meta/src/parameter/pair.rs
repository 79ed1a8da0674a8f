use alloc::borrow::Cow;

use ut_ptr::{Address, PtrMut};

use super::{Parameter, ParameterRef, load_type, save_type, share};
use crate::controller::Controller;
use crate::names::{node_names, type_names};
use crate::{Reflect, Result, Snapshot};

/// Parameter of a two-element tuple, reflected as `p0` and `p1`.
pub struct PairParameter<'a, A, B> {
    pair: PtrMut<'a, (A, B)>,
}

impl<'a, A: Reflect, B: Reflect> PairParameter<'a, A, B> {
    #[inline]
    pub fn new(pair: &'a mut (A, B)) -> Self {
        Self {
            pair: PtrMut::from_mut(pair),
        }
    }
}

impl<'a, A: Reflect, B: Reflect> Parameter<'a> for PairParameter<'a, A, B> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::PAIR)
    }

    #[inline]
    fn address(&self) -> Address {
        self.pair.address()
    }

    fn reflect(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        // Safety: each half is handed out once per reflection.
        let (first, second) = unsafe { self.pair.as_mut() };
        snapshot.push(first)?.push(second)?;
        Ok(())
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        if controller.info().has_type_info() {
            save_type(controller, node_names::KEY_TYPE, &A::type_name())?;
            save_type(controller, node_names::VALUE_TYPE, &B::type_name())?;
        }
        Ok(())
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        if controller.info().has_type_info() {
            load_type(controller, node_names::KEY_TYPE, &A::type_name())?;
            load_type(controller, node_names::VALUE_TYPE, &B::type_name())?;
        }
        Ok(())
    }
}

impl<A: Reflect, B: Reflect> Reflect for (A, B) {
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::PAIR)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(PairParameter::new(self))
    }
}
