use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use core::any::Any;
use core::cell::RefCell;

use crate::names::type_names;
use crate::parameter::{ParameterRef, ReflectiveParameter, share};
use crate::{Error, Registry, Result, Snapshot};

// -----------------------------------------------------------------------------
// Event

/// Traversal boundaries at which snapshot callbacks run.
///
/// On an initializing call, pre events run parent-first before the
/// traversal, post events run children-first once links are resolved.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Event {
    PreSave,
    PostSave,
    PreLoad,
    PostLoad,
}

impl Event {
    /// Returns `true` for [`PreSave`](Self::PreSave) and [`PreLoad`](Self::PreLoad).
    #[inline]
    pub const fn is_pre(self) -> bool {
        matches!(self, Self::PreSave | Self::PreLoad)
    }
}

// -----------------------------------------------------------------------------
// Reflect

/// A type that can be captured into a [`Snapshot`].
///
/// Aggregates only implement [`reflect`](Self::reflect), registering each
/// field once, in the same order and with the same names on every call.
/// Leaf and container types override [`parameter`](Self::parameter) and
/// [`type_name`](Self::type_name) instead.
///
/// Usually derived:
///
/// ```
/// use ut_meta::{Reflect, Snapshot};
///
/// #[derive(Reflect, Default)]
/// struct Item {
///     count: u32,
///     #[reflect(name = "title")]
///     name: String,
///     #[reflect(skip)]
///     cached: u64,
/// }
///
/// let mut item = Item::default();
/// let snapshot = Snapshot::capture(&mut item).unwrap();
/// let names: Vec<_> = snapshot.iter().map(|c| c.name().to_owned()).collect();
/// assert_eq!(names, ["count", "title"]);
/// ```
///
/// Written by hand, the same registration reads:
///
/// ```
/// use ut_meta::{Reflect, Result, Snapshot};
///
/// #[derive(Default)]
/// struct Item {
///     count: u32,
///     name: String,
/// }
///
/// impl Reflect for Item {
///     fn reflect<'a>(&'a mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
///         snapshot.add(&mut self.count, "count")?;
///         snapshot.add(&mut self.name, "title")?;
///         Ok(())
///     }
/// }
/// # let mut item = Item::default();
/// # assert_eq!(Snapshot::capture(&mut item).unwrap().len(), 2);
/// ```
pub trait Reflect: Any {
    /// Type name written with type info; `"reflective"` for aggregates, so
    /// renaming an aggregate keeps old payloads readable.
    fn type_name() -> Cow<'static, str>
    where
        Self: Sized,
    {
        Cow::Borrowed(type_names::REFLECTIVE)
    }

    /// Registers the fields of an aggregate.
    fn reflect<'a>(&'a mut self, _snapshot: &mut Snapshot<'a>) -> Result<()> {
        Ok(())
    }

    /// Aggregate hook for [`Event`]s.
    fn on_event(&mut self, _event: Event) -> Result<()> {
        Ok(())
    }

    /// Creates the parameter observing `self`.
    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(ReflectiveParameter::new(self))
    }
}

// -----------------------------------------------------------------------------
// Polymorphism

/// A type whose run-time identity is written in place of its static one.
///
/// Base traits of polymorphic hierarchies extend it, so the concrete type
/// can be named through `dyn Base`:
///
/// ```
/// use ut_meta::{Polymorphic, Reflect};
///
/// trait Shape: Polymorphic {}
///
/// #[derive(Reflect, Polymorphic, Default)]
/// #[polymorphic(name = "circle")]
/// struct Circle {
///     radius: f32,
/// }
///
/// impl Shape for Circle {}
///
/// let shape: Box<dyn Shape> = Box::new(Circle::default());
/// assert_eq!(shape.identify(), "circle");
/// ```
pub trait Polymorphic: Reflect {
    fn identify(&self) -> Cow<'static, str>;
}

/// Static registration name of a [`Polymorphic`] type.
pub trait PolymorphicName {
    const NAME: &'static str;
}

// -----------------------------------------------------------------------------
// Pointee

/// A type that pointer parameters can point to and create.
///
/// Implemented for every `Reflect + Default` type. Trait object bases use
/// [`impl_pointee!`](crate::impl_pointee), which instantiates through a
/// [`Registry`].
pub trait Pointee: Reflect {
    /// Type name stored in a pointer's `value_type` attribute.
    fn pointee_type_name(&self) -> Cow<'static, str>;

    /// Creates a default instance named `type_name`.
    fn instantiate(type_name: &str, registry: Option<&Registry>) -> Result<Box<Self>>;

    /// Creates a default shared instance named `type_name`.
    fn instantiate_shared(type_name: &str, registry: Option<&Registry>)
    -> Result<Rc<RefCell<Self>>>;
}

fn check_static<T: Reflect>(type_name: &str) -> Result<()> {
    let expected = T::type_name();
    if expected.eq_ignore_ascii_case(type_name) {
        Ok(())
    } else {
        Err(Error::types_not_match(format!(
            "cannot create `{type_name}` in place of `{expected}`"
        )))
    }
}

impl<T: Reflect + Default> Pointee for T {
    #[inline]
    fn pointee_type_name(&self) -> Cow<'static, str> {
        T::type_name()
    }

    fn instantiate(type_name: &str, _: Option<&Registry>) -> Result<Box<Self>> {
        check_static::<T>(type_name)?;
        Ok(Box::new(T::default()))
    }

    fn instantiate_shared(type_name: &str, _: Option<&Registry>) -> Result<Rc<RefCell<Self>>> {
        check_static::<T>(type_name)?;
        Ok(Rc::new(RefCell::new(T::default())))
    }
}

/// Implements [`Pointee`] for trait object bases of polymorphic hierarchies.
///
/// The base trait must extend [`Polymorphic`]; concrete types are created
/// through the [`Registry`] handed to the controller.
///
/// ```
/// use ut_meta::{Polymorphic, impl_pointee};
///
/// pub trait Shape: Polymorphic {}
/// impl_pointee!(dyn Shape);
/// ```
#[macro_export]
macro_rules! impl_pointee {
    ($($base:ty),+ $(,)?) => {$(
        impl $crate::Pointee for $base {
            fn pointee_type_name(&self) -> $crate::__macro_exports::Cow<'static, str> {
                $crate::Polymorphic::identify(self)
            }

            fn instantiate(
                type_name: &str,
                registry: ::core::option::Option<&$crate::Registry>,
            ) -> $crate::Result<$crate::__macro_exports::Box<Self>> {
                $crate::__macro_exports::create_boxed::<Self>(type_name, registry)
            }

            fn instantiate_shared(
                type_name: &str,
                registry: ::core::option::Option<&$crate::Registry>,
            ) -> $crate::Result<$crate::__macro_exports::Rc<$crate::__macro_exports::RefCell<Self>>> {
                $crate::__macro_exports::create_shared::<Self>(type_name, registry)
            }
        }
    )+};
}

#[cfg(test)]
mod tests {
    use alloc::borrow::Cow;

    use super::{Event, Pointee, Reflect};
    use crate::ErrorKind;

    #[derive(Default)]
    struct Plain;

    impl Reflect for Plain {}

    #[test]
    fn default_type_name_is_reflective() {
        assert_eq!(<Plain as Reflect>::type_name(), Cow::Borrowed("reflective"));
        assert_eq!(<u32 as Reflect>::type_name(), "uint32");
    }

    #[test]
    fn sized_pointee_checks_name() {
        assert!(<u32 as Pointee>::instantiate("UINT32", None).is_ok());
        let error = <u32 as Pointee>::instantiate("float", None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::TypesNotMatch);
        assert_eq!(*<f32 as Pointee>::instantiate_shared("float", None).unwrap().borrow(), 0.0);
    }

    #[test]
    fn event_order() {
        assert!(Event::PreLoad.is_pre());
        assert!(!Event::PostSave.is_pre());
    }
}
