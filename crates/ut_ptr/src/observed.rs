use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::Address;

/// A copyable, lifetime-bound `&'a mut T` equivalent.
///
/// Unlike a reference, several `PtrMut` may point into the same object at
/// once (an aggregate and each of its fields). Turning one into a reference is
/// `unsafe`; the caller must make sure no other live reference overlaps the
/// one being created.
///
/// # Examples
///
/// ```
/// use ut_ptr::PtrMut;
///
/// let mut pair = (1u8, 2u16);
/// let whole = PtrMut::from_mut(&mut pair);
/// let second = PtrMut::from_mut(unsafe { &mut whole.as_mut().1 });
///
/// unsafe { *second.as_mut() = 9 };
/// assert_eq!(unsafe { whole.as_ref() }.1, 9);
/// ```
#[repr(transparent)]
pub struct PtrMut<'a, T: ?Sized>(NonNull<T>, PhantomData<&'a mut T>);

impl<'a, T: ?Sized> PtrMut<'a, T> {
    /// Creates a `PtrMut` from a mutable reference with the same lifetime.
    #[inline(always)]
    pub fn from_mut(r: &'a mut T) -> Self {
        Self(NonNull::from(r), PhantomData)
    }

    /// Creates a `PtrMut` from a raw non-null pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` must point to a valid `T` for the whole lifetime `'a`.
    /// - No other code may free or move the pointee during `'a`.
    #[inline(always)]
    pub const unsafe fn new(ptr: NonNull<T>) -> Self {
        Self(ptr, PhantomData)
    }

    /// Returns the thin address of the pointee.
    #[inline(always)]
    pub fn address(&self) -> Address {
        Address::from_ptr(self.0.as_ptr())
    }

    /// Acquires the underlying pointer.
    #[inline(always)]
    pub const fn as_ptr(&self) -> *mut T {
        self.0.as_ptr()
    }

    /// Returns a shared reference to the pointee.
    ///
    /// # Safety
    ///
    /// No mutable reference to any part of the pointee may be alive while the
    /// returned reference is used.
    #[inline(always)]
    pub unsafe fn as_ref(&self) -> &'a T {
        // Safety: valid for `'a` by construction, aliasing upheld by the caller.
        unsafe { self.0.as_ref() }
    }

    /// Returns a mutable reference to the pointee.
    ///
    /// # Safety
    ///
    /// No other reference to any part of the pointee may be alive while the
    /// returned reference is used.
    #[inline(always)]
    #[expect(clippy::mut_from_ref, reason = "the pointer is an observing handle")]
    pub unsafe fn as_mut(&self) -> &'a mut T {
        // Safety: valid for `'a` by construction, aliasing upheld by the caller.
        unsafe { &mut *self.0.as_ptr() }
    }
}

impl<T: ?Sized> Clone for PtrMut<'_, T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for PtrMut<'_, T> {}

impl<T: ?Sized> fmt::Pointer for PtrMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.address(), f)
    }
}

impl<T: ?Sized> fmt::Debug for PtrMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PtrMut({:#x})", self.address().get())
    }
}

#[cfg(test)]
mod tests {
    use super::PtrMut;
    use crate::Address;

    #[test]
    fn address_matches_reference() {
        let mut value = [0u32; 4];
        let expected = Address::of(&value);
        let ptr = PtrMut::from_mut(&mut value);
        assert_eq!(ptr.address(), expected);
    }

    #[test]
    fn write_through_copy() {
        let mut value = 1i64;
        let a = PtrMut::from_mut(&mut value);
        let b = a;
        unsafe { *b.as_mut() += 41 };
        assert_eq!(unsafe { *a.as_ref() }, 42);
    }
}
