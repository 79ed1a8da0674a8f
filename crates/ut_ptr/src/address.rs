use core::fmt;

/// A thin pointer identity.
///
/// `Address` erases both the pointee type and any pointer metadata, so a
/// `*const dyn Trait` and the `*const T` it was created from compare equal.
/// It keeps the provenance of the pointer it was created from, so a
/// resolved link can be turned back into a pointer with [`Address::as_ptr`].
///
/// # Examples
///
/// ```
/// use ut_ptr::Address;
///
/// let x = 5u32;
/// let a = Address::of(&x);
/// let b = Address::from_ptr(&raw const x);
///
/// assert_eq!(a, b);
/// assert!(!a.is_null());
/// assert!(Address::NULL.is_null());
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Address(*const u8);

impl Address {
    /// The null address.
    pub const NULL: Self = Self(core::ptr::null());

    /// Returns the address of a reference.
    #[inline(always)]
    pub fn of<T: ?Sized>(r: &T) -> Self {
        Self::from_ptr(r)
    }

    /// Returns the address of a raw pointer, dropping its metadata.
    #[inline(always)]
    pub fn from_ptr<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<u8>())
    }

    /// Returns `true` if this is [`Address::NULL`].
    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Returns the raw numeric address.
    #[inline(always)]
    pub fn get(self) -> usize {
        self.0.addr()
    }

    /// Returns the erased pointer this address was created from.
    ///
    /// Dereferencing it after a cast is only valid while the original
    /// pointee is alive and of the cast type.
    #[inline(always)]
    pub const fn as_ptr(self) -> *const u8 {
        self.0
    }
}

impl Default for Address {
    #[inline]
    fn default() -> Self {
        Self::NULL
    }
}

impl<T: ?Sized> From<&T> for Address {
    #[inline]
    fn from(value: &T) -> Self {
        Self::of(value)
    }
}

impl fmt::Pointer for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.get())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#x})", self.get())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::Address;

    extern crate alloc;
    use alloc::boxed::Box;
    use alloc::format;

    trait Named {
        fn name(&self) -> &'static str;
    }

    struct Thing(u64);

    impl Named for Thing {
        fn name(&self) -> &'static str {
            if self.0 > 0 { "thing" } else { "nothing" }
        }
    }

    #[test]
    fn fat_and_thin_pointers_agree() {
        let boxed: Box<dyn Named> = Box::new(Thing(7));
        let fat: &dyn Named = &*boxed;
        let thin = (fat as *const dyn Named).cast::<Thing>();

        assert_eq!(Address::of(fat), Address::from_ptr(thin));
        assert_eq!(fat.name(), "thing");
    }

    #[test]
    fn formatting() {
        assert_eq!(format!("{}", Address::NULL), "0x0");
        assert_eq!(format!("{:?}", Address::NULL), "Address(0x0)");
        assert_eq!(Address::default(), Address::NULL);
    }

    #[test]
    fn pointer_round_trip() {
        let value = 17u16;
        let address = Address::of(&value);
        let back = address.as_ptr().cast::<u16>();
        assert_eq!(unsafe { *back }, 17);
    }
}
