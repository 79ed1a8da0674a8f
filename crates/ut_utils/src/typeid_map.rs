use core::any::TypeId;
use core::fmt::Debug;

use crate::hash::NoOpHashState;
use crate::hash::hashbrown::HashMap;
use crate::hash::hashbrown::hash_map::Entry;

// -----------------------------------------------------------------------------
// TypeIdMap

/// A map with [`TypeId`] as the fixed key type.
///
/// Keys may name unsized types as well, `TypeIdMap` is how the meta registry
/// keeps one factory table per `dyn Trait` base.
///
/// # Examples
///
/// ```
/// use ut_utils::TypeIdMap;
///
/// let mut map = TypeIdMap::new();
/// map.insert_type::<str>("text");
///
/// assert_eq!(map.get_type::<str>(), Some(&"text"));
/// assert!(map.get_type::<u8>().is_none());
/// ```
pub struct TypeIdMap<V>(HashMap<TypeId, V, NoOpHashState>);

impl<V> TypeIdMap<V> {
    /// Creates an empty `TypeIdMap`.
    #[inline]
    pub const fn new() -> Self {
        Self(HashMap::with_hasher(NoOpHashState))
    }

    /// Gets a mutable reference to the value of `type_id`, inserting the
    /// result of `f` if the key is not present.
    #[inline]
    pub fn get_or_insert(&mut self, type_id: TypeId, f: impl FnOnce() -> V) -> &mut V {
        match self.0.entry(type_id) {
            Entry::Vacant(entry) => entry.insert(f()),
            Entry::Occupied(entry) => entry.into_mut(),
        }
    }

    /// Same as [`get_or_insert`](Self::get_or_insert), keyed by `T`.
    #[inline(always)]
    pub fn get_or_insert_type<T: ?Sized + 'static>(&mut self, f: impl FnOnce() -> V) -> &mut V {
        self.get_or_insert(TypeId::of::<T>(), f)
    }

    /// Returns a reference to the value of `type_id`.
    pub fn get(&self, type_id: &TypeId) -> Option<&V> {
        self.0.get(type_id)
    }

    /// Returns a reference to the value of `T`.
    #[inline(always)]
    pub fn get_type<T: ?Sized + 'static>(&self) -> Option<&V> {
        self.get(&TypeId::of::<T>())
    }

    /// Inserts a key-value pair, returning the previous value.
    pub fn insert(&mut self, type_id: TypeId, v: V) -> Option<V> {
        self.0.insert(type_id, v)
    }

    /// Inserts the value of `T`, returning the previous value.
    #[inline(always)]
    pub fn insert_type<T: ?Sized + 'static>(&mut self, v: V) -> Option<V> {
        self.insert(TypeId::of::<T>(), v)
    }

    /// Returns `true` if the map contains a value for `T`.
    #[inline(always)]
    pub fn contains_type<T: ?Sized + 'static>(&self) -> bool {
        self.0.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of elements in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// An iterator visiting all values in arbitrary order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.0.values()
    }
}

// -----------------------------------------------------------------------------
// Traits

impl<T> Default for TypeIdMap<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> Debug for TypeIdMap<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::TypeIdMap;

    trait Shape {}

    #[test]
    fn get_or_insert_once() {
        let mut map = TypeIdMap::<u32>::default();
        *map.get_or_insert_type::<dyn Shape>(|| 1) += 1;
        *map.get_or_insert_type::<dyn Shape>(|| 100) += 1;

        assert_eq!(map.get_type::<dyn Shape>(), Some(&3));
        assert_eq!(map.len(), 1);
        assert!(map.contains_type::<dyn Shape>());
        assert!(!map.contains_type::<u32>());
    }
}
