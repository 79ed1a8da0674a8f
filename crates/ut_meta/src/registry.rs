//! Run-time creation of polymorphic pointees.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use core::any::{Any, type_name};
use core::cell::RefCell;

use ut_utils::TypeIdMap;
use ut_utils::hash::HashMap;

use crate::{Error, Result};

// -----------------------------------------------------------------------------
// Factory

/// Creates default instances of one concrete type as a `B` base.
pub struct Factory<B: ?Sized> {
    boxed: fn() -> Box<B>,
    shared: fn() -> Rc<RefCell<B>>,
}

impl<B: ?Sized> Factory<B> {
    #[inline]
    pub const fn new(boxed: fn() -> Box<B>, shared: fn() -> Rc<RefCell<B>>) -> Self {
        Self { boxed, shared }
    }

    #[inline]
    pub fn create_boxed(&self) -> Box<B> {
        (self.boxed)()
    }

    #[inline]
    pub fn create_shared(&self) -> Rc<RefCell<B>> {
        (self.shared)()
    }
}

impl<B: ?Sized> Clone for Factory<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ?Sized> Copy for Factory<B> {}

// -----------------------------------------------------------------------------
// Registry

/// Factories of polymorphic types, per base and per name.
///
/// Names are the [`Polymorphic::identify`](crate::Polymorphic::identify)
/// results written in pointer nodes, and are compared case-insensitively.
///
/// # Examples
///
/// ```
/// use ut_meta::{Polymorphic, Reflect, Registry, impl_pointee, register};
///
/// pub trait Shape: Polymorphic {
///     fn area(&self) -> f32;
/// }
/// impl_pointee!(dyn Shape);
///
/// #[derive(Reflect, Polymorphic, Default)]
/// #[polymorphic(name = "square")]
/// struct Square {
///     side: f32,
/// }
///
/// impl Shape for Square {
///     fn area(&self) -> f32 {
///         self.side * self.side
///     }
/// }
///
/// let mut registry = Registry::new();
/// register!(registry, dyn Shape => Square);
///
/// let shape = registry.create_boxed::<dyn Shape>("Square").unwrap();
/// assert_eq!(shape.identify(), "square");
/// assert_eq!(shape.area(), 0.0);
/// ```
#[derive(Default)]
pub struct Registry {
    bases: TypeIdMap<HashMap<String, Box<dyn Any>>>,
}

impl Registry {
    #[inline]
    pub const fn new() -> Self {
        Self {
            bases: TypeIdMap::new(),
        }
    }

    /// Registers the type called `name` for base `B`. A previous factory
    /// with the same name is replaced.
    pub fn register<B: ?Sized + 'static>(
        &mut self,
        name: &str,
        boxed: fn() -> Box<B>,
        shared: fn() -> Rc<RefCell<B>>,
    ) {
        self.bases
            .get_or_insert_type::<B>(HashMap::default)
            .insert(name.to_ascii_lowercase(), Box::new(Factory::new(boxed, shared)));
    }

    /// Returns the factory of `name` for base `B`.
    pub fn get<B: ?Sized + 'static>(&self, name: &str) -> Option<&Factory<B>> {
        self.bases
            .get_type::<B>()?
            .get(&name.to_ascii_lowercase())?
            .downcast_ref::<Factory<B>>()
    }

    /// Returns `true` if `name` is registered for base `B`.
    pub fn contains<B: ?Sized + 'static>(&self, name: &str) -> bool {
        self.get::<B>(name).is_some()
    }

    /// Number of registered factories, all bases included.
    pub fn len(&self) -> usize {
        self.bases.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn factory<B: ?Sized + 'static>(&self, name: &str) -> Result<&Factory<B>> {
        self.get::<B>(name).ok_or_else(|| {
            Error::not_found(format!("`{name}` is not registered as `{}`", type_name::<B>()))
        })
    }

    /// Creates a default `name` instance as a `Box<B>`.
    pub fn create_boxed<B: ?Sized + 'static>(&self, name: &str) -> Result<Box<B>> {
        self.factory::<B>(name).map(Factory::create_boxed)
    }

    /// Creates a default `name` instance as an `Rc<RefCell<B>>`.
    pub fn create_shared<B: ?Sized + 'static>(&self, name: &str) -> Result<Rc<RefCell<B>>> {
        self.factory::<B>(name).map(Factory::create_shared)
    }
}

/// Registers concrete types for a polymorphic base.
///
/// Each type must implement `Default` and
/// [`PolymorphicName`](crate::PolymorphicName), and coerce to the base.
///
/// ```
/// use ut_meta::{Polymorphic, Reflect, Registry, register};
///
/// pub trait Animal: Polymorphic {}
///
/// #[derive(Reflect, Polymorphic, Default)]
/// #[polymorphic(name = "cat")]
/// struct Cat;
/// impl Animal for Cat {}
///
/// #[derive(Reflect, Polymorphic, Default)]
/// #[polymorphic(name = "dog")]
/// struct Dog;
/// impl Animal for Dog {}
///
/// let mut registry = Registry::new();
/// register!(registry, dyn Animal => Cat, Dog);
/// assert_eq!(registry.len(), 2);
/// assert!(registry.contains::<dyn Animal>("DOG"));
/// ```
#[macro_export]
macro_rules! register {
    ($registry:expr, $base:ty => $($ty:ty),+ $(,)?) => {$(
        $registry.register::<$base>(
            <$ty as $crate::PolymorphicName>::NAME,
            || -> $crate::__macro_exports::Box<$base> {
                $crate::__macro_exports::Box::new(<$ty as ::core::default::Default>::default())
            },
            || -> $crate::__macro_exports::Rc<$crate::__macro_exports::RefCell<$base>> {
                $crate::__macro_exports::Rc::new($crate::__macro_exports::RefCell::new(
                    <$ty as ::core::default::Default>::default(),
                ))
            },
        );
    )+};
}

// -----------------------------------------------------------------------------
// Macro helpers

/// Creates a boxed `B` through the registry, see [`impl_pointee!`](crate::impl_pointee).
pub fn create_boxed<B: ?Sized + 'static>(name: &str, registry: Option<&Registry>) -> Result<Box<B>> {
    missing(registry, name)?.create_boxed::<B>(name)
}

/// Creates a shared `B` through the registry, see [`impl_pointee!`](crate::impl_pointee).
pub fn create_shared<B: ?Sized + 'static>(
    name: &str,
    registry: Option<&Registry>,
) -> Result<Rc<RefCell<B>>> {
    missing(registry, name)?.create_shared::<B>(name)
}

fn missing<'r>(registry: Option<&'r Registry>, name: &str) -> Result<&'r Registry> {
    registry.ok_or_else(|| Error::fail(format!("no registry to create `{name}`")))
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    use super::{Registry, create_boxed, create_shared};
    use crate::ErrorKind;

    trait Named {
        fn name(&self) -> &'static str;
    }

    #[derive(Default)]
    struct First;

    impl Named for First {
        fn name(&self) -> &'static str {
            "first"
        }
    }

    #[test]
    fn lookup_is_per_base_and_case_insensitive() {
        let mut registry = Registry::new();
        registry.register::<dyn Named>(
            "First",
            || Box::new(First),
            || Rc::new(RefCell::new(First)),
        );

        assert_eq!(registry.create_boxed::<dyn Named>("FIRST").unwrap().name(), "first");
        assert_eq!(
            registry.create_shared::<dyn Named>("first").unwrap().borrow().name(),
            "first"
        );
        assert!(!registry.contains::<dyn core::fmt::Debug>("first"));
        assert_eq!(
            registry.create_boxed::<dyn Named>("second").err().map(|e| e.kind()),
            Some(ErrorKind::NotFound)
        );
        assert_eq!(
            registry.create_shared::<dyn Named>("second").err().map(|e| e.kind()),
            Some(ErrorKind::NotFound)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_registry_fails() {
        let Err(error) = create_shared::<dyn Named>("first", None) else {
            panic!("created without a registry");
        };
        assert_eq!(error.kind(), ErrorKind::Fail);
        assert!(create_boxed::<dyn Named>("first", None).is_err());
    }
}
