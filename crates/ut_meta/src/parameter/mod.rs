//! Type-erased handles observing one reflected value each.
//!
//! A [`Parameter`] is created by [`Reflect::parameter`](crate::Reflect::parameter)
//! and held by one [`Snapshot`] node. It does not own the value: it observes
//! it for the lifetime `'a` of the snapshot.

// -----------------------------------------------------------------------------
// Modules

mod binary;
mod map;
mod pair;
mod pointer;
mod reflective;
mod scalar;
mod sequence;
mod shared;
mod unique;
mod weak;

// -----------------------------------------------------------------------------
// Exports

pub use binary::{Binary, BinaryParameter};
pub use map::{MapLike, MapParameter};
pub use pair::PairParameter;
pub use pointer::RawPointerParameter;
pub use reflective::ReflectiveParameter;
pub use scalar::ScalarParameter;
pub use sequence::{ArrayParameter, SequenceParameter};
pub use shared::{SharedObject, SharedParameter};
pub use unique::UniqueParameter;
pub use weak::{WeakParameter, WeakSlot};

use alloc::borrow::Cow;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use core::any::Any;
use core::cell::RefCell;

use bitflags::bitflags;
use ut_ptr::Address;

use crate::controller::Controller;
use crate::{Error, Event, Result, Snapshot};

// -----------------------------------------------------------------------------
// Parameter

/// Shared handle to a parameter, kept by snapshot nodes and linker links.
pub type ParameterRef<'a> = Rc<RefCell<dyn Parameter<'a> + 'a>>;

/// Wraps a parameter into a [`ParameterRef`].
#[inline]
pub fn share<'a, P: Parameter<'a> + 'a>(parameter: P) -> ParameterRef<'a> {
    Rc::new(RefCell::new(parameter))
}

/// Capabilities of one reflected value.
///
/// Only [`type_name`](Self::type_name) and [`address`](Self::address) are
/// required; every other capability defaults to "nothing to do".
pub trait Parameter<'a> {
    /// Stable name of the managed type, compared case-insensitively on load.
    fn type_name(&self) -> Cow<'static, str>;

    /// Address of the managed value.
    fn address(&self) -> Address;

    /// Registers the children of the managed value.
    fn reflect(&mut self, _snapshot: &mut Snapshot<'a>) -> Result<()> {
        Ok(())
    }

    /// Writes the attributes needed to rebuild the value's structure.
    fn save(&mut self, _controller: &mut Controller<'_, 'a>) -> Result<()> {
        Ok(())
    }

    /// Reads what [`save`](Self::save) wrote.
    fn load(&mut self, _controller: &mut Controller<'_, 'a>) -> Result<()> {
        Ok(())
    }

    /// Returns `true` if loading may change the set of children, which
    /// are then reflected again before they are read.
    fn is_dynamic(&self) -> bool {
        false
    }

    /// Installs a resolved link target.
    fn link(&mut self, _target: LinkTarget<'_>) -> Result<()> {
        Err(Error::fail(format!(
            "`{}` parameter cannot be linked",
            self.type_name()
        )))
    }

    /// Tooling metadata, never consulted by save or load.
    fn traits(&self) -> Traits {
        Traits::default()
    }

    /// Applies a container operation.
    fn edit(&mut self, _op: ContainerOp) -> Result<()> {
        Err(Error::fail(format!(
            "`{}` parameter is not an editable container",
            self.type_name()
        )))
    }

    /// Called at traversal boundaries, see [`Event`].
    fn on_event(&mut self, _event: Event) -> Result<()> {
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// LinkTarget

/// What a deferred link resolved to.
#[derive(Clone, Copy, Debug)]
pub enum LinkTarget<'t> {
    /// Any reflected value, found by id.
    Object {
        address: Address,
        type_name: &'t str,
    },
    /// A reconstructed shared object: an `Rc<RefCell<T>>` behind `dyn Any`.
    Shared(&'t dyn Any),
}

// -----------------------------------------------------------------------------
// Traits

bitflags! {
    /// Operations a container parameter supports through [`Parameter::edit`].
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct ContainerFlags: u32 {
        const RESET  = 1 << 0;
        const PUSH   = 1 << 1;
        const REMOVE = 1 << 2;
    }
}

/// Description of a container value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerTraits {
    pub flags: ContainerFlags,
    pub element_type: Cow<'static, str>,
    pub len: usize,
}

/// Optional metadata for editors and tools.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Traits {
    pub container: Option<ContainerTraits>,
}

/// Container operation, see [`Snapshot::edit`](crate::Snapshot::edit).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerOp {
    /// Removes every element.
    Reset,
    /// Appends a default element.
    Push,
    /// Removes the element at an index.
    Remove(usize),
}

/// Compares a serialized type name against the current one.
pub(crate) fn check_type_name(attribute: &str, expected: &str, found: &str) -> Result<()> {
    if expected.eq_ignore_ascii_case(found) {
        Ok(())
    } else {
        Err(Error::types_not_match(format!(
            "`{attribute}`: expected `{expected}`, found `{found}`"
        )))
    }
}

/// Writes a type name attribute.
pub(crate) fn save_type(
    controller: &mut Controller<'_, '_>,
    attribute: &str,
    type_name: &str,
) -> Result<()> {
    controller.write_attribute(attribute, &String::from(type_name))
}

/// Reads a type name attribute and compares it against `expected`.
pub(crate) fn load_type(
    controller: &mut Controller<'_, '_>,
    attribute: &str,
    expected: &str,
) -> Result<()> {
    let found: String = controller.read_attribute(attribute)?;
    check_type_name(attribute, expected, &found)
}
